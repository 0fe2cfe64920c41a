//! Contribution distribution and velocity.

use serde::{Deserialize, Serialize};

/// Gini coefficient of per-contributor counts.
///
/// Counts are sorted ascending and fed to the discrete formula
/// `G = 2·Σ(i·xᵢ) / (n·Σx) − (n+1)/n` with 1-based `i`. Returns 0 for fewer
/// than two contributors or no activity.
pub fn gini(counts: &[u64]) -> f64 {
    let n = counts.len();
    let total: u64 = counts.iter().sum();
    if n < 2 || total == 0 {
        return 0.0;
    }

    let mut sorted = counts.to_vec();
    sorted.sort_unstable();

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| (i + 1) as f64 * x as f64)
        .sum();
    let n = n as f64;
    let g = (2.0 * weighted) / (n * total as f64) - (n + 1.0) / n;
    g.clamp(0.0, 1.0)
}

/// How evenly work is spread across contributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    NoActivity,
    SingleContributor,
    WellDistributed,
    ModeratelyDistributed,
    Concentrated,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoActivity => "no_activity",
            Self::SingleContributor => "single_contributor",
            Self::WellDistributed => "well_distributed",
            Self::ModeratelyDistributed => "moderately_distributed",
            Self::Concentrated => "concentrated",
        }
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label a Gini value for `contributors` people.
pub fn distribution_label(contributors: usize, gini: f64) -> Distribution {
    match contributors {
        0 => Distribution::NoActivity,
        1 => Distribution::SingleContributor,
        _ if gini < 0.3 => Distribution::WellDistributed,
        _ if gini < 0.6 => Distribution::ModeratelyDistributed,
        _ => Distribution::Concentrated,
    }
}

/// Gini and its label over per-contributor counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub gini: f64,
    pub distribution: Distribution,
}

pub fn distribution(counts: &[u64]) -> DistributionStats {
    let active = counts.iter().filter(|&&c| c > 0).count();
    let g = gini(counts);
    DistributionStats {
        gini: g,
        distribution: distribution_label(active, g),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityDirection {
    InsufficientData,
    Increasing,
    Decreasing,
    Stable,
}

impl VelocityDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient_data",
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Direction of a chronological activity series plus the averages it was
/// derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityTrend {
    pub direction: VelocityDirection,
    pub recent_average: f64,
    pub early_average: f64,
}

/// Compare the tail of a chronological series with its head.
///
/// Uses the mean of the last (first) three points, or the single last
/// (first) point when fewer than three exist.
pub fn velocity(series: &[u64]) -> VelocityTrend {
    if series.len() < 2 {
        return VelocityTrend {
            direction: VelocityDirection::InsufficientData,
            recent_average: 0.0,
            early_average: 0.0,
        };
    }

    let (recent, early) = if series.len() >= 3 {
        (mean(&series[series.len() - 3..]), mean(&series[..3]))
    } else {
        (series[series.len() - 1] as f64, series[0] as f64)
    };

    let direction = if recent > early * 1.2 {
        VelocityDirection::Increasing
    } else if recent < early * 0.8 {
        VelocityDirection::Decreasing
    } else {
        VelocityDirection::Stable
    };

    VelocityTrend {
        direction,
        recent_average: recent,
        early_average: early,
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
