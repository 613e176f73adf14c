//! Quality analysis report types.

use std::collections::BTreeMap;

use serde::Serialize;

/// One named quality check: a score in `[0, 10]`, the measured quantities
/// behind it, and recommendation keys from the fixed catalog.
#[derive(Debug, Clone, Serialize)]
pub struct QualityCheck {
    pub name: &'static str,
    pub score: f32,
    pub details: BTreeMap<&'static str, f32>,
    pub recommendations: Vec<&'static str>,
}

impl QualityCheck {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            score: 10.0,
            details: BTreeMap::new(),
            recommendations: Vec::new(),
        }
    }

    /// Neutral placeholder for a check that failed to run.
    pub(crate) fn failed(name: &'static str) -> Self {
        Self {
            name,
            score: 5.0,
            details: BTreeMap::new(),
            recommendations: vec![crate::quality::recommendations::CHECK_FAILED],
        }
    }
}

/// Full analysis result: seven checks plus the clamped mean score.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub checks: Vec<QualityCheck>,
    pub overall_score: f32,
    pub generated_at_unix_secs: u64,
}

impl QualityReport {
    pub fn check(&self, name: &str) -> Option<&QualityCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// All recommendations across checks, in check order.
    pub fn all_recommendations(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .flat_map(|c| c.recommendations.iter().copied())
            .collect()
    }
}
