//! Bivariate association statistics: Pearson, Spearman and Kendall's tau-b,
//! each with a two-sided p-value.
//!
//! p-values for Pearson and Spearman come from Student's t distribution with
//! `n - 2` degrees of freedom (statrs). Kendall uses the exact permutation
//! distribution for small tie-free samples and the tie-corrected normal
//! approximation otherwise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::function::erf::erfc;

use super::rank::{rank_average, tie_groups};
use crate::error::{AnalysisError, Result};

/// Largest tie-free sample for which Kendall's p-value is computed exactly.
const KENDALL_EXACT_MAX_N: usize = 33;

// ---------------------------------------------------------------------------
// MetricKind
// ---------------------------------------------------------------------------

/// Supported correlation statistics. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricKind {
    Pearson,
    Spearman,
    Kendall,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Pearson,
        MetricKind::Spearman,
        MetricKind::Kendall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Pearson => "pearson",
            MetricKind::Spearman => "spearman",
            MetricKind::Kendall => "kendall",
        }
    }

    /// Fewest paired observations for which the statistic is defined.
    pub fn min_observations(self) -> usize {
        2
    }

    /// The supported names, comma separated, as shown in error messages.
    pub fn supported_list() -> String {
        MetricKind::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        MetricKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AnalysisError::UnsupportedMetric {
                given: s.to_string(),
                supported: MetricKind::supported_list(),
            })
    }
}

impl TryFrom<String> for MetricKind {
    type Error = AnalysisError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MetricKind> for String {
    fn from(kind: MetricKind) -> String {
        kind.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Association result
// ---------------------------------------------------------------------------

/// Coefficient and two-sided p-value of one statistic.
///
/// Both are `NaN` when the statistic is undefined for the sample (a side
/// with zero variance, or every rank tied).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Association {
    pub r: f64,
    pub p: f64,
    /// Number of paired observations used.
    pub n: usize,
}

impl Association {
    fn undefined(n: usize) -> Self {
        Association {
            r: f64::NAN,
            p: f64::NAN,
            n,
        }
    }
}

/// Compute one association statistic between two equal-length samples.
///
/// The samples must not contain missing values; filter them first with
/// [`crate::data::filter::pairwise_complete`].
pub fn compute_correlation(x: &[f64], y: &[f64], kind: MetricKind) -> Result<Association> {
    if x.len() != y.len() {
        return Err(AnalysisError::LengthMismatch(x.len(), y.len()));
    }
    let n = x.len();
    if n < kind.min_observations() {
        return Err(AnalysisError::InsufficientData {
            context: format!("{kind} correlation"),
            found: n,
            required: kind.min_observations(),
        });
    }
    match kind {
        MetricKind::Pearson => pearson(x, y),
        MetricKind::Spearman => spearman(x, y),
        MetricKind::Kendall => Ok(kendall(x, y)),
    }
}

/// Same as [`compute_correlation`] but parses the metric name first.
pub fn compute_correlation_named(x: &[f64], y: &[f64], kind: &str) -> Result<Association> {
    compute_correlation(x, y, kind.parse()?)
}

/// Round to 4 decimal places; `NaN` stays `NaN`.
///
/// Rounds the exact binary value (`0.33335` is stored just below the tie and
/// becomes `0.3333`), matching Python's `round(v, 4)`.
pub fn round4(v: f64) -> f64 {
    format!("{v:.4}").parse().unwrap_or(v)
}

// ---------------------------------------------------------------------------
// Pearson / Spearman
// ---------------------------------------------------------------------------

/// Deviations from the mean divided by their largest magnitude, so sums of
/// squares stay in range for very large or very small inputs. `None` when
/// every deviation is zero.
fn scaled_deviations(values: &[f64]) -> Option<Vec<f64>> {
    let first = *values.first()?;
    if values.iter().all(|&v| v == first) {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|v| v / n).sum::<f64>();
    let dev: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let max_abs = dev.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
    if max_abs == 0.0 || !max_abs.is_finite() {
        return None;
    }
    Some(dev.into_iter().map(|d| d / max_abs).collect())
}

fn pearson_r(x: &[f64], y: &[f64]) -> Option<f64> {
    let dx = scaled_deviations(x)?;
    let dy = scaled_deviations(y)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in dx.iter().zip(dy.iter()) {
        sxy += a * b;
        sxx += a * a;
        syy += b * b;
    }

    let denominator = sxx.sqrt() * syy.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((sxy / denominator).clamp(-1.0, 1.0))
}

/// Two-tailed p-value for a correlation coefficient under H0: rho = 0.
///
/// t = r × sqrt(n-2) / sqrt(1-r²) with n-2 degrees of freedom.
fn t_test_p_value(r: f64, n: usize) -> Result<f64> {
    if n < 3 {
        // two points always lie on a line
        return Ok(1.0);
    }
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t_stat = r * (df / (1.0 - r * r)).sqrt();
    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::Numerical(format!("Student's t with df={df}: {e}")))?;
    Ok((2.0 * (1.0 - t_dist.cdf(t_stat.abs()))).clamp(0.0, 1.0))
}

fn pearson(x: &[f64], y: &[f64]) -> Result<Association> {
    let n = x.len();
    match pearson_r(x, y) {
        Some(r) => Ok(Association {
            r,
            p: t_test_p_value(r, n)?,
            n,
        }),
        None => Ok(Association::undefined(n)),
    }
}

fn spearman(x: &[f64], y: &[f64]) -> Result<Association> {
    pearson(&rank_average(x), &rank_average(y))
}

// ---------------------------------------------------------------------------
// Kendall tau-b
// ---------------------------------------------------------------------------

fn sign(v: f64) -> i64 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

fn kendall(x: &[f64], y: &[f64]) -> Association {
    let n = x.len();

    // S = concordant - discordant
    let mut s: i64 = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            s += sign(x[i] - x[j]) * sign(y[i] - y[j]);
        }
    }

    let x_ties = tie_groups(x);
    let y_ties = tie_groups(y);
    let pairs = |groups: &[usize]| -> f64 {
        groups.iter().map(|&t| (t * (t - 1) / 2) as f64).sum()
    };
    let total = (n * (n - 1) / 2) as f64;
    let x_tied = pairs(&x_ties);
    let y_tied = pairs(&y_ties);

    let denominator = ((total - x_tied) * (total - y_tied)).sqrt();
    if denominator == 0.0 {
        return Association::undefined(n);
    }
    let tau = (s as f64 / denominator).clamp(-1.0, 1.0);

    let total_pairs = n * (n - 1) / 2;
    // without ties every pair is concordant or discordant
    let discordant = ((total_pairs as i64 - s) / 2) as usize;
    let fewest = discordant.min(total_pairs - discordant);
    let untied = x_ties.is_empty() && y_ties.is_empty();
    let p = if untied && (n <= KENDALL_EXACT_MAX_N || fewest <= 1) {
        kendall_exact_p(n, fewest)
    } else {
        kendall_asymptotic_p(s as f64, n, &x_ties, &y_ties)
    };

    Association { r: tau, p, n }
}

/// Two-sided exact p-value: 2 × P(inversions ≤ c) over uniform permutations
/// of `n` items, where `c` is the smaller of the discordant and concordant
/// pair counts.
fn kendall_exact_p(n: usize, c: usize) -> f64 {
    // dist[k] = P(permutation of m items has k inversions), truncated to k <= c
    let mut dist = vec![0.0; c + 1];
    dist[0] = 1.0;
    for m in 2..=n {
        let mut next = vec![0.0; c + 1];
        for (k, slot) in next.iter_mut().enumerate() {
            let lo = k.saturating_sub(m - 1);
            *slot = dist[lo..=k].iter().sum::<f64>() / m as f64;
        }
        dist = next;
    }
    (2.0 * dist.iter().sum::<f64>()).min(1.0)
}

/// Normal approximation with tie correction for the variance of S.
fn kendall_asymptotic_p(s: f64, n: usize, x_ties: &[usize], y_ties: &[usize]) -> f64 {
    let tie_sums = |groups: &[usize]| -> (f64, f64, f64) {
        groups.iter().fold((0.0, 0.0, 0.0), |(pairs, v0, v1), &t| {
            let t = t as f64;
            (
                pairs + t * (t - 1.0) / 2.0,
                v0 + t * (t - 1.0) * (t - 2.0),
                v1 + t * (t - 1.0) * (2.0 * t + 5.0),
            )
        })
    };
    let (x_pairs, x0, x1) = tie_sums(x_ties);
    let (y_pairs, y0, y1) = tie_sums(y_ties);

    let nf = n as f64;
    let m = nf * (nf - 1.0);
    let mut var = (m * (2.0 * nf + 5.0) - x1 - y1) / 18.0 + (2.0 * x_pairs * y_pairs) / m;
    if n > 2 {
        var += x0 * y0 / (9.0 * m * (nf - 2.0));
    }
    if var <= 0.0 || !var.is_finite() {
        return f64::NAN;
    }
    let z = s / var.sqrt();
    erfc(z.abs() / std::f64::consts::SQRT_2).clamp(0.0, 1.0)
}
