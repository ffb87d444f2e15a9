use crate::fit::FitError;

/// A scalar curve `y = f(x; p)` with an analytic gradient in `p`.
pub trait CurveModel<const N: usize> {
    fn value(&self, x: f64, p: &[f64; N]) -> f64;
    fn gradient(&self, x: f64, p: &[f64; N]) -> [f64; N];
}

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 5000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-14,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LmSolution<const N: usize> {
    pub params: [f64; N],
    pub cost: f64,
    pub evaluations: usize,
    pub iterations: usize,
}

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// Box-constrained Levenberg-Marquardt on `sum (f(x_i; p) - y_i)^2`.
///
/// Trial points are projected onto `[lower, upper]`; parameters sitting on a
/// bound whose descent direction points outside the box are frozen for that
/// iteration. Running out of evaluations is a non-convergence error. Giving up
/// on a step after any trial evaluated to a non-finite cost is a non-finite
/// error, since the starting point was never shown to be a minimum.
pub fn minimize<M: CurveModel<N>, const N: usize>(
    model: &M,
    x: &[f64],
    y: &[f64],
    p0: [f64; N],
    lower: [f64; N],
    upper: [f64; N],
    opts: &LmOptions,
) -> Result<LmSolution<N>, FitError> {
    let project = |p: [f64; N]| {
        let mut out = p;
        for i in 0..N {
            out[i] = out[i].clamp(lower[i], upper[i]);
        }
        out
    };

    let mut p = project(p0);
    let mut cost = sum_squares(model, x, y, &p);
    let mut evaluations = 1usize;
    if !cost.is_finite() {
        return Err(FitError::NonFinite);
    }

    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0usize;

    loop {
        iterations += 1;
        let (jtj, g) = normal_equations(model, x, y, &p);
        if jtj.iter().flatten().chain(g.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let mut free = [true; N];
        for i in 0..N {
            let at_lower = p[i] <= lower[i] && g[i] > 0.0;
            let at_upper = p[i] >= upper[i] && g[i] < 0.0;
            free[i] = !(at_lower || at_upper);
        }
        let projected_grad = (0..N)
            .filter(|&i| free[i])
            .map(|i| g[i].abs())
            .fold(0.0f64, f64::max);
        if projected_grad <= opts.gtol * (1.0 + cost) {
            return Ok(LmSolution {
                params: p,
                cost,
                evaluations,
                iterations,
            });
        }

        let mut non_finite_trial = false;
        loop {
            let mut a = jtj;
            let mut rhs = [0.0; N];
            for i in 0..N {
                if free[i] {
                    a[i][i] += lambda * jtj[i][i].max(1e-12);
                    rhs[i] = -g[i];
                } else {
                    for k in 0..N {
                        a[i][k] = 0.0;
                        a[k][i] = 0.0;
                    }
                    a[i][i] = 1.0;
                }
            }

            let Some(delta) = solve(a, rhs) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return Err(FitError::NonConvergence { evaluations });
                }
                continue;
            };

            let mut trial = p;
            for i in 0..N {
                trial[i] += delta[i];
            }
            let trial = project(trial);

            let small_step =
                (0..N).all(|i| (trial[i] - p[i]).abs() <= opts.xtol * (p[i].abs() + opts.xtol));
            if small_step {
                if non_finite_trial {
                    return Err(FitError::NonFinite);
                }
                return Ok(LmSolution {
                    params: p,
                    cost,
                    evaluations,
                    iterations,
                });
            }

            if evaluations >= opts.max_evaluations {
                return Err(FitError::NonConvergence { evaluations });
            }
            let trial_cost = sum_squares(model, x, y, &trial);
            evaluations += 1;
            if !trial_cost.is_finite() {
                non_finite_trial = true;
            }

            if trial_cost.is_finite() && trial_cost < cost {
                let relative = if cost > 0.0 {
                    (cost - trial_cost) / cost
                } else {
                    0.0
                };
                p = trial;
                cost = trial_cost;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                if relative <= opts.ftol || cost == 0.0 {
                    return Ok(LmSolution {
                        params: p,
                        cost,
                        evaluations,
                        iterations,
                    });
                }
                break;
            }

            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                if non_finite_trial {
                    return Err(FitError::NonFinite);
                }
                // No downhill step exists at any damping: local minimum.
                return Ok(LmSolution {
                    params: p,
                    cost,
                    evaluations,
                    iterations,
                });
            }
        }
    }
}

pub fn sum_squares<M: CurveModel<N>, const N: usize>(
    model: &M,
    x: &[f64],
    y: &[f64],
    p: &[f64; N],
) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = model.value(xi, p) - yi;
            r * r
        })
        .sum()
}

/// Returns `(J^T J, J^T r)` with `r = f(x) - y`.
fn normal_equations<M: CurveModel<N>, const N: usize>(
    model: &M,
    x: &[f64],
    y: &[f64],
    p: &[f64; N],
) -> ([[f64; N]; N], [f64; N]) {
    let mut jtj = [[0.0; N]; N];
    let mut g = [0.0; N];
    for (&xi, &yi) in x.iter().zip(y) {
        let r = model.value(xi, p) - yi;
        let grad = model.gradient(xi, p);
        for a in 0..N {
            g[a] += grad[a] * r;
            for b in 0..N {
                jtj[a][b] += grad[a] * grad[b];
            }
        }
    }
    (jtj, g)
}

/// Gaussian elimination with partial pivoting; `None` if singular.
fn solve<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if !(a[pivot][col].abs() > 1e-300) {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = [0.0; N];
    for row in (0..N).rev() {
        let mut acc = b[row];
        for k in (row + 1)..N {
            acc -= a[row][k] * out[k];
        }
        out[row] = acc / a[row][row];
    }
    if out.iter().all(|v| v.is_finite()) {
        Some(out)
    } else {
        None
    }
}
