use crate::fit::levenberg::CurveModel;

pub const IC50: usize = 0;
pub const HILL: usize = 1;
pub const TOP: usize = 2;
pub const BOTTOM: usize = 3;

/// `y = bottom + (top - bottom) / (1 + (x / ic50)^hill)`.
pub fn inhibitory_hill(x: f64, ic50: f64, hill: f64, top: f64, bottom: f64) -> f64 {
    bottom + (top - bottom) * transition(x, ic50, hill)
}

/// `1 / (1 + (x / ic50)^hill)`, the fraction of the way from bottom to top.
fn transition(x: f64, ic50: f64, hill: f64) -> f64 {
    if x == 0.0 {
        // (0 / ic50)^hill diverges for hill < 0 and vanishes for hill > 0.
        return if hill < 0.0 { 0.0 } else { 1.0 };
    }
    1.0 / (1.0 + (x / ic50).powf(hill))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InhibitoryHill;

impl CurveModel<4> for InhibitoryHill {
    fn value(&self, x: f64, p: &[f64; 4]) -> f64 {
        inhibitory_hill(x, p[IC50], p[HILL], p[TOP], p[BOTTOM])
    }

    fn gradient(&self, x: f64, p: &[f64; 4]) -> [f64; 4] {
        let (ic50, hill, top, bottom) = (p[IC50], p[HILL], p[TOP], p[BOTTOM]);
        let s = transition(x, ic50, hill);
        let span = top - bottom;
        // d s / d u = -s^2 with u = (x/ic50)^hill, and u * s^2 = s * (1 - s).
        let su = s * (1.0 - s);
        let (d_ic50, d_hill) = if x > 0.0 && su > 0.0 {
            (span * su * hill / ic50, -span * su * (x / ic50).ln())
        } else {
            (0.0, 0.0)
        };
        let mut g = [0.0; 4];
        g[IC50] = d_ic50;
        g[HILL] = d_hill;
        g[TOP] = s;
        g[BOTTOM] = 1.0 - s;
        g
    }
}
