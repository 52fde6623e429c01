//! Mann–Whitney U comparison of active vs inactive compounds.
//!
//! # Method
//!
//! Both samples are ranked together with ties sharing their average rank.
//! The statistic is U for the first (active) sample. Small samples (both
//! under 8 values) without ties use the exact null distribution; everything
//! else uses the normal approximation with tie and continuity correction.
//! The p-value is two-sided.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{AnalysisError, Result};
use crate::records::{ClassCounts, CompoundRecord, PotencyClass};

pub const ALPHA: f64 = 0.05;

/// Columns compared between the active and inactive groups, in report order.
pub const TESTED_DESCRIPTORS: [&str; 5] = ["pIC50", "MW", "LogP", "NumHDonors", "NumHAcceptors"];

const EXACT_MAX_SAMPLE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Exact,
    Asymptotic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitney {
    pub statistic: f64,
    pub p_value: f64,
    pub method: Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpretation {
    #[serde(rename = "Different distribution (reject H0)")]
    DifferentDistribution,
    #[serde(rename = "Same distribution (fail to reject H0)")]
    SameDistribution,
}

impl Interpretation {
    pub fn from_p_value(p: f64, alpha: f64) -> Self {
        if p <= alpha {
            Interpretation::DifferentDistribution
        } else {
            Interpretation::SameDistribution
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpretation::DifferentDistribution => "Different distribution (reject H0)",
            Interpretation::SameDistribution => "Same distribution (fail to reject H0)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MannWhitneyResult {
    pub descriptor: String,
    pub statistic: f64,
    pub p_value: f64,
    pub interpretation: Interpretation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub mann_whitney_tests: Vec<MannWhitneyResult>,
    pub summary: ClassCounts,
}

/// Two-sided Mann–Whitney U test of `x` against `y`.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<MannWhitney> {
    if x.is_empty() || y.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "both groups need values (got {} and {})",
            x.len(),
            y.len()
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::Validation("non-finite value in sample".into()));
    }

    let (n1, n2) = (x.len(), y.len());
    let combined: Vec<f64> = x.iter().chain(y).copied().collect();
    let (ranks, tie_term) = rank_average(&combined);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;

    if n1 < EXACT_MAX_SAMPLE && n2 < EXACT_MAX_SAMPLE && tie_term == 0.0 {
        let u_min = u1.min(u2).round() as usize;
        let p = (2.0 * exact_cdf(u_min, n1, n2)).min(1.0);
        return Ok(MannWhitney { statistic: u1, p_value: p, method: Method::Exact });
    }

    let n = (n1 + n2) as f64;
    let mu = (n1 * n2) as f64 / 2.0;
    let var = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    let p = if var <= 0.0 {
        1.0
    } else {
        let z = (u1.max(u2) - mu - 0.5) / var.sqrt();
        (2.0 * normal_sf(z)).clamp(0.0, 1.0)
    };
    Ok(MannWhitney { statistic: u1, p_value: p, method: Method::Asymptotic })
}

/// 1-based ranks with ties averaged, plus the tie term Σ(t³ − t).
pub fn rank_average(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j share the average of ranks i+1..=j.
        let avg = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        let t = (j - i) as f64;
        tie_term += t * t * t - t;
        i = j;
    }
    (ranks, tie_term)
}

/// P(U <= k) under the null for sample sizes `m` and `n` without ties.
fn exact_cdf(k: usize, m: usize, n: usize) -> f64 {
    let max_u = m * n;
    // counts[i][j][u]: arrangements of i and j values with statistic u.
    let mut counts = vec![vec![vec![0.0f64; max_u + 1]; n + 1]; m + 1];
    for i in 0..=m {
        for j in 0..=n {
            if i == 0 || j == 0 {
                counts[i][j][0] = 1.0;
                continue;
            }
            for u in 0..=i * j {
                let with_top_in_x = if u >= j { counts[i - 1][j][u - j] } else { 0.0 };
                counts[i][j][u] = with_top_in_x + counts[i][j - 1][u];
            }
        }
    }
    let dist = &counts[m][n];
    let total: f64 = dist.iter().sum();
    let below: f64 = dist[..=k.min(max_u)].iter().sum();
    below / total
}

/// Upper tail of the standard normal.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Complementary error function, Chebyshev fit with relative error < 1.2e-7.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Test every descriptor in [`TESTED_DESCRIPTORS`] on the active and
/// inactive records. A descriptor that cannot be tested is logged and
/// skipped.
pub fn run_statistics(records: &[CompoundRecord]) -> StatisticsReport {
    let summary = ClassCounts::tally(records.iter().map(|r| &r.class));

    let active: Vec<&CompoundRecord> =
        records.iter().filter(|r| r.class == PotencyClass::Active).collect();
    let inactive: Vec<&CompoundRecord> =
        records.iter().filter(|r| r.class == PotencyClass::Inactive).collect();

    if active.is_empty() && inactive.is_empty() {
        warn!("No active/inactive compounds for statistical testing");
        return StatisticsReport { mann_whitney_tests: Vec::new(), summary };
    }

    let column = |rows: &[&CompoundRecord], name: &str| -> Vec<f64> {
        rows.iter().filter_map(|r| r.column(name)).collect()
    };

    let mut tests = Vec::with_capacity(TESTED_DESCRIPTORS.len());
    for descriptor in TESTED_DESCRIPTORS {
        match mann_whitney_u(&column(&active, descriptor), &column(&inactive, descriptor)) {
            Ok(result) => {
                info!("Mann-Whitney test for {}: p={:.2e}", descriptor, result.p_value);
                tests.push(MannWhitneyResult {
                    descriptor: descriptor.to_string(),
                    statistic: result.statistic,
                    p_value: result.p_value,
                    interpretation: Interpretation::from_p_value(result.p_value, ALPHA),
                });
            }
            Err(e) => error!("Failed Mann-Whitney test for {}: {}", descriptor, e),
        }
    }

    StatisticsReport { mann_whitney_tests: tests, summary }
}
