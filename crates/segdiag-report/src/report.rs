//! Per-case diagnostics and the aggregated failure report.

use std::sync::Arc;

use segdiag_eval::{EvaluatedCase, EvaluationOutcome};
use segdiag_metric::{ClassIou, ClassRegistry};
use serde::{Deserialize, Serialize};

use crate::{
    benchmark::BenchmarkAnnotation,
    error::{ReportError, ReportResult},
    rules::{CaseMetrics, RuleSet},
};

/// Format of [`FailureReport::timestamp`]: local ISO-8601 with microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One of a case's lowest-IoU classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstClass {
    pub class_id: usize,
    pub class_name: String,
    pub iou: f64,
}

/// Diagnosis of one retained case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    /// 1-based position in the worst-case ranking.
    pub rank: usize,
    pub sample_id: String,
    pub mean_iou: f64,
    #[serde(rename = "worst_3_classes")]
    pub worst_classes: Vec<WorstClass>,
    pub likely_causes: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Contents of `failure_analysis.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub timestamp: String,
    /// Samples that could not be evaluated.
    #[serde(default)]
    pub skipped_samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkAnnotation>,
    pub worst_cases: Vec<CaseReport>,
}

impl FailureReport {
    /// Checks that cases are ranked 1..=n, ascending by mean IoU and at most `max_cases` long.
    pub fn validate(&self, max_cases: usize) -> ReportResult<()> {
        if self.worst_cases.len() > max_cases {
            return Err(ReportError::InvalidReport {
                reason: format!(
                    "{} cases exceed the configured limit of {max_cases}",
                    self.worst_cases.len()
                ),
            });
        }
        for (position, case) in self.worst_cases.iter().enumerate() {
            if case.rank != position + 1 {
                return Err(ReportError::InvalidReport {
                    reason: format!("case at position {position} has rank {}", case.rank),
                });
            }
        }
        if let Some(pair) = self
            .worst_cases
            .windows(2)
            .find(|pair| pair[0].mean_iou > pair[1].mean_iou)
        {
            return Err(ReportError::InvalidReport {
                reason: format!(
                    "rank {} (mean IoU {}) scores above rank {} (mean IoU {})",
                    pair[0].rank, pair[0].mean_iou, pair[1].rank, pair[1].mean_iou
                ),
            });
        }
        Ok(())
    }
}

/// Turns ranked cases into [`CaseReport`]s using a [`RuleSet`].
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    registry: Arc<ClassRegistry>,
    rules: RuleSet,
    worst_class_count: usize,
}

impl ReportGenerator {
    pub fn new(registry: Arc<ClassRegistry>, rules: RuleSet, worst_class_count: usize) -> Self {
        Self {
            registry,
            rules,
            worst_class_count,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The lowest defined class IoUs, ascending, ties by class id.
    pub fn worst_classes(&self, class_iou: &ClassIou) -> Vec<WorstClass> {
        class_iou
            .worst(self.worst_class_count)
            .into_iter()
            .map(|(class_id, iou)| WorstClass {
                class_id,
                class_name: self
                    .registry
                    .name(class_id)
                    .map_or_else(|| format!("class {class_id}"), str::to_string),
                iou,
            })
            .collect()
    }

    pub fn case_report(&self, rank: usize, case: &EvaluatedCase) -> ReportResult<CaseReport> {
        let mean_iou = case.mean_iou.ok_or_else(|| ReportError::InvalidReport {
            reason: format!("case {} has no defined mean IoU", case.sample_id),
        })?;
        let metrics = CaseMetrics {
            mean_iou,
            worst_classes: self.worst_classes(&case.class_iou),
        };
        let diagnosis = self.rules.evaluate(&metrics);

        Ok(CaseReport {
            rank,
            sample_id: case.sample_id.clone(),
            mean_iou,
            worst_classes: metrics.worst_classes,
            likely_causes: diagnosis.causes,
            recommendations: diagnosis.recommendations,
        })
    }

    /// Builds the report for an evaluation outcome, whose cases are already ranked.
    pub fn generate(
        &self,
        outcome: &EvaluationOutcome,
        benchmark: Option<BenchmarkAnnotation>,
        timestamp: String,
    ) -> ReportResult<FailureReport> {
        let worst_cases = outcome
            .worst_cases
            .iter()
            .enumerate()
            .map(|(position, case)| self.case_report(position + 1, case))
            .collect::<ReportResult<Vec<_>>>()?;

        Ok(FailureReport {
            timestamp,
            skipped_samples: outcome.summary.skipped_count,
            benchmark,
            worst_cases,
        })
    }
}

/// Current local time formatted with [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use image::RgbImage;
    use segdiag_metric::{ClassMap, ConfusionMatrix};

    use super::*;

    fn generator() -> ReportGenerator {
        ReportGenerator::new(
            Arc::new(ClassRegistry::offroad_terrain()),
            RuleSet::default(),
            3,
        )
    }

    fn case(index: usize, ground_truth: ClassMap, prediction: ClassMap) -> EvaluatedCase {
        let confusion = ConfusionMatrix::from_maps(&ground_truth, &prediction, 11).unwrap();
        let class_iou = confusion.per_class_iou();
        let (height, width) = ground_truth.dims();
        EvaluatedCase {
            index,
            sample_id: format!("sample_{index}"),
            image: RgbImage::new(width as u32, height as u32),
            prediction,
            ground_truth,
            mean_iou: class_iou.mean(),
            class_iou,
        }
    }

    #[test]
    fn perfect_background_case_is_clean() {
        let case = case(0, ClassMap::filled(10, 10, 0), ClassMap::filled(10, 10, 0));
        let report = generator().case_report(1, &case).unwrap();

        assert_eq!(report.mean_iou, 1.0);
        assert_eq!(
            report.worst_classes,
            vec![WorstClass {
                class_id: 0,
                class_name: "Background".to_string(),
                iou: 1.0
            }]
        );
        assert!(report.likely_causes.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn missed_flowers_are_diagnosed() {
        let mut labels = vec![0u16; 1000];
        labels[..10].fill(6);
        let ground_truth = ClassMap::new(10, 100, labels).unwrap();
        let case = case(3, ground_truth, ClassMap::filled(10, 100, 0));

        let report = generator().case_report(1, &case).unwrap();

        assert_eq!(report.mean_iou, 0.495);
        assert_eq!(report.worst_classes[0].class_name, "Flowers");
        assert_eq!(report.worst_classes[0].iou, 0.0);
        assert_eq!(report.worst_classes[1].class_id, 0);
        assert!(report
            .likely_causes
            .contains(&"Flowers class almost missed (IOU=0.000)".to_string()));
        assert!(report
            .recommendations
            .contains(&"Flowers class is small - increase loss weight".to_string()));
    }

    #[test]
    fn serialises_with_report_field_names() {
        let case = case(0, ClassMap::filled(2, 2, 0), ClassMap::filled(2, 2, 0));
        let report = FailureReport {
            timestamp: "2026-01-01T00:00:00.000000".to_string(),
            skipped_samples: 0,
            benchmark: None,
            worst_cases: vec![generator().case_report(1, &case).unwrap()],
        };
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["worst_cases"][0]["worst_3_classes"].is_array());
        assert!(json.get("benchmark").is_none());
        let parsed: FailureReport = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn validation_rejects_unsorted_and_oversized_reports() {
        let report_for = |ious: &[f64]| FailureReport {
            timestamp: String::new(),
            skipped_samples: 0,
            benchmark: None,
            worst_cases: ious
                .iter()
                .enumerate()
                .map(|(i, &mean_iou)| CaseReport {
                    rank: i + 1,
                    sample_id: format!("s{i}"),
                    mean_iou,
                    worst_classes: Vec::new(),
                    likely_causes: Vec::new(),
                    recommendations: Vec::new(),
                })
                .collect(),
        };

        assert!(report_for(&[0.1, 0.2, 0.2]).validate(3).is_ok());
        assert!(report_for(&[0.1, 0.2, 0.2]).validate(2).is_err());
        assert!(report_for(&[0.3, 0.2]).validate(5).is_err());
    }

    #[test]
    fn timestamp_has_microseconds() {
        let stamp = timestamp_now();
        let (_, fraction) = stamp.rsplit_once('.').unwrap();
        assert_eq!(fraction.len(), 6);
        assert!(stamp.contains('T'));
    }
}
