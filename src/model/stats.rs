/// Count, mean, sample SD (n - 1) and SEM over one group of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
    pub sem: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sample_sd(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

pub fn group_stats(values: &[f64]) -> GroupStats {
    let n = values.len();
    let sd = sample_sd(values);
    let sem = if n > 1 { sd / (n as f64).sqrt() } else { 0.0 };
    GroupStats {
        n,
        mean: mean(values),
        sd,
        sem,
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) * 0.5)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/stats.rs"]
mod tests;
