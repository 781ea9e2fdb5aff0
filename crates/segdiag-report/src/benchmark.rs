//! Latency benchmark artifact produced by the external timing harness.

use serde::{Deserialize, Serialize};

/// Latency statistics in milliseconds for one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BenchmarkStatus {
    Pass,
    Fail,
    Unknown,
}

/// Contents of `inference_benchmark.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub cpu: TimingStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<TimingStats>,
    pub requirement: String,
    pub status: BenchmarkStatus,
}

/// The part of a benchmark that a failure report carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkAnnotation {
    pub requirement: String,
    pub status: BenchmarkStatus,
}

/// Parses a `<Nms` requirement into its bound in milliseconds.
pub fn parse_requirement(requirement: &str) -> Option<f64> {
    let bound = requirement.trim().strip_prefix('<')?;
    let bound = bound.trim().strip_suffix("ms").unwrap_or(bound);
    bound.trim().parse().ok()
}

impl BenchmarkResult {
    pub fn devices(&self) -> impl Iterator<Item = (&'static str, &TimingStats)> {
        std::iter::once(("cpu", &self.cpu)).chain(self.gpu.as_ref().map(|gpu| ("gpu", gpu)))
    }

    /// Status implied by the requirement: every measured device mean strictly below the bound.
    ///
    /// `None` when the requirement cannot be parsed.
    pub fn expected_status(&self) -> Option<BenchmarkStatus> {
        let bound = parse_requirement(&self.requirement)?;
        let pass = self.devices().all(|(_, stats)| stats.mean < bound);
        Some(if pass {
            BenchmarkStatus::Pass
        } else {
            BenchmarkStatus::Fail
        })
    }

    /// Whether the recorded status agrees with the requirement.
    pub fn is_consistent(&self) -> bool {
        match self.expected_status() {
            Some(expected) => self.status == BenchmarkStatus::Unknown || self.status == expected,
            None => true,
        }
    }

    /// Copies requirement and status verbatim.
    pub fn annotation(&self) -> BenchmarkAnnotation {
        BenchmarkAnnotation {
            requirement: self.requirement.clone(),
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(mean: f64) -> TimingStats {
        TimingStats {
            mean,
            std: 1.0,
            min: mean - 2.0,
            max: mean + 2.0,
        }
    }

    fn result(mean: f64, status: BenchmarkStatus) -> BenchmarkResult {
        BenchmarkResult {
            cpu: stats(mean),
            gpu: None,
            requirement: "<50ms".to_string(),
            status,
        }
    }

    #[test]
    fn fast_model_passes() {
        let benchmark = result(42.5, BenchmarkStatus::Pass);
        assert_eq!(benchmark.expected_status(), Some(BenchmarkStatus::Pass));
        assert!(benchmark.is_consistent());
    }

    #[test]
    fn slow_model_fails() {
        let benchmark = result(55.0, BenchmarkStatus::Fail);
        assert_eq!(benchmark.expected_status(), Some(BenchmarkStatus::Fail));
    }

    #[test]
    fn any_slow_device_fails() {
        let mut benchmark = result(12.0, BenchmarkStatus::Pass);
        benchmark.gpu = Some(stats(50.0));
        assert_eq!(benchmark.expected_status(), Some(BenchmarkStatus::Fail));
        assert!(!benchmark.is_consistent());
    }

    #[test]
    fn annotation_copies_recorded_status() {
        // Recorded status disagrees with the timings; the annotation keeps it anyway.
        let benchmark = result(55.0, BenchmarkStatus::Pass);
        let annotation = benchmark.annotation();
        assert_eq!(annotation.status, BenchmarkStatus::Pass);
        assert_eq!(annotation.requirement, "<50ms");
    }

    #[test]
    fn parses_harness_output() {
        let json = r#"{
            "cpu": {"mean": 42.5, "std": 3.1, "min": 39.0, "max": 51.2},
            "gpu": {"mean": 8.0, "std": 0.4, "min": 7.5, "max": 9.1},
            "requirement": "<50ms",
            "status": "PASS"
        }"#;
        let benchmark: BenchmarkResult = serde_json::from_str(json).unwrap();
        assert_eq!(benchmark.status, BenchmarkStatus::Pass);
        assert_eq!(benchmark.gpu.map(|g| g.mean), Some(8.0));
        assert_eq!(benchmark.devices().count(), 2);
    }

    #[test]
    fn requirement_parsing() {
        assert_eq!(parse_requirement("<50ms"), Some(50.0));
        assert_eq!(parse_requirement(" < 33.3 ms"), Some(33.3));
        assert_eq!(parse_requirement("<20"), Some(20.0));
        assert_eq!(parse_requirement("fast"), None);
        assert!(result(80.0, BenchmarkStatus::Unknown).is_consistent());
    }
}
