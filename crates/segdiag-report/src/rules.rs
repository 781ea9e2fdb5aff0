//! Declarative failure-cause rules.
//!
//! A [`RuleSet`] is an ordered table. Every rule whose condition holds appends its texts,
//! in table order, to the case's causes and recommendations, so one case may collect the
//! output of several rules. Evaluation is a pure function of the case metrics.

use serde::{Deserialize, Serialize};

use crate::report::WorstClass;

/// Metrics a rule may look at.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseMetrics {
    pub mean_iou: f64,
    /// Lowest-IoU classes of the case, ascending.
    pub worst_classes: Vec<WorstClass>,
}

/// Recommendations attached to one class name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAdvice {
    pub class_name: String,
    pub recommendations: Vec<String>,
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// Fires when the case mean IoU is strictly below `threshold`.
    MeanIouBelow {
        threshold: f64,
        causes: Vec<String>,
        recommendations: Vec<String>,
    },
    /// Fires once per worst class whose IoU is strictly below `threshold`.
    ///
    /// `cause` may use `{class}` and `{iou}` placeholders. When the class has an entry in
    /// `advice`, its recommendations follow.
    ClassNearlyMissed {
        threshold: f64,
        cause: String,
        advice: Vec<ClassAdvice>,
    },
}

impl Rule {
    fn apply(&self, metrics: &CaseMetrics, diagnosis: &mut Diagnosis) {
        match self {
            Self::MeanIouBelow {
                threshold,
                causes,
                recommendations,
            } => {
                if metrics.mean_iou < *threshold {
                    diagnosis.causes.extend(causes.iter().cloned());
                    diagnosis
                        .recommendations
                        .extend(recommendations.iter().cloned());
                }
            }
            Self::ClassNearlyMissed {
                threshold,
                cause,
                advice,
            } => {
                for class in metrics
                    .worst_classes
                    .iter()
                    .filter(|class| class.iou < *threshold)
                {
                    diagnosis
                        .causes
                        .push(render_template(cause, &class.class_name, class.iou));
                    if let Some(advice) = advice.iter().find(|a| a.class_name == class.class_name) {
                        diagnosis
                            .recommendations
                            .extend(advice.recommendations.iter().cloned());
                    }
                }
            }
        }
    }
}

fn render_template(template: &str, class_name: &str, iou: f64) -> String {
    template
        .replace("{class}", class_name)
        .replace("{iou}", &format!("{iou:.3}"))
}

/// Causes and recommendations produced for one case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnosis {
    pub causes: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Ordered rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&self, metrics: &CaseMetrics) -> Diagnosis {
        let mut diagnosis = Diagnosis::default();
        for rule in &self.rules {
            rule.apply(metrics, &mut diagnosis);
        }
        diagnosis
    }

    /// Rules tuned for the offroad terrain taxonomy, where Flowers and Logs are the
    /// known small/sparse classes.
    pub fn offroad_terrain() -> Self {
        Self::new(vec![
            Rule::MeanIouBelow {
                threshold: 0.3,
                causes: vec![
                    "Very low IoU - likely significant class confusion or occlusion".to_string(),
                ],
                recommendations: vec![
                    "Review image for occlusion or unusual conditions".to_string(),
                    "Consider class weighting to improve minority classes".to_string(),
                ],
            },
            Rule::MeanIouBelow {
                threshold: 0.5,
                causes: vec!["Thin objects not detected well (likely Flowers or Logs)".to_string()],
                recommendations: vec![
                    "Apply class weighting (higher weight for 600, 700)".to_string(),
                    "Use CRF post-processing for boundary refinement".to_string(),
                ],
            },
            Rule::ClassNearlyMissed {
                threshold: 0.1,
                cause: "{class} class almost missed (IOU={iou})".to_string(),
                advice: vec![
                    ClassAdvice {
                        class_name: "Flowers".to_string(),
                        recommendations: vec![
                            "Flowers class is small - increase loss weight".to_string(),
                            "Consider morphological post-processing".to_string(),
                        ],
                    },
                    ClassAdvice {
                        class_name: "Logs".to_string(),
                        recommendations: vec![
                            "Logs are sparse - increase loss weight and use focal loss".to_string(),
                        ],
                    },
                ],
            },
        ])
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::offroad_terrain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worst(entries: &[(usize, &str, f64)]) -> Vec<WorstClass> {
        entries
            .iter()
            .map(|&(class_id, name, iou)| WorstClass {
                class_id,
                class_name: name.to_string(),
                iou,
            })
            .collect()
    }

    #[test]
    fn perfect_case_fires_nothing() {
        let metrics = CaseMetrics {
            mean_iou: 1.0,
            worst_classes: worst(&[(0, "Background", 1.0)]),
        };
        assert_eq!(RuleSet::default().evaluate(&metrics), Diagnosis::default());
    }

    #[test]
    fn severe_case_accumulates_both_mean_rules_in_order() {
        let metrics = CaseMetrics {
            mean_iou: 0.25,
            worst_classes: worst(&[(3, "Dry Grass", 0.2)]),
        };
        let diagnosis = RuleSet::default().evaluate(&metrics);

        assert_eq!(
            diagnosis.causes,
            vec![
                "Very low IoU - likely significant class confusion or occlusion",
                "Thin objects not detected well (likely Flowers or Logs)",
            ]
        );
        assert_eq!(diagnosis.recommendations.len(), 4);
        assert_eq!(
            diagnosis.recommendations[0],
            "Review image for occlusion or unusual conditions"
        );
        assert_eq!(
            diagnosis.recommendations[3],
            "Use CRF post-processing for boundary refinement"
        );
    }

    #[test]
    fn thresholds_are_strict() {
        let metrics = CaseMetrics {
            mean_iou: 0.5,
            worst_classes: worst(&[(6, "Flowers", 0.1)]),
        };
        assert_eq!(RuleSet::default().evaluate(&metrics), Diagnosis::default());
    }

    #[test]
    fn missed_flowers_get_class_specific_advice() {
        let metrics = CaseMetrics {
            mean_iou: 0.495,
            worst_classes: worst(&[(6, "Flowers", 0.0), (0, "Background", 0.99)]),
        };
        let diagnosis = RuleSet::default().evaluate(&metrics);

        assert_eq!(
            diagnosis.causes,
            vec![
                "Thin objects not detected well (likely Flowers or Logs)",
                "Flowers class almost missed (IOU=0.000)",
            ]
        );
        assert_eq!(
            &diagnosis.recommendations[2..],
            &[
                "Flowers class is small - increase loss weight",
                "Consider morphological post-processing",
            ]
        );
    }

    #[test]
    fn class_advice_follows_worst_class_order() {
        let metrics = CaseMetrics {
            mean_iou: 0.6,
            worst_classes: worst(&[
                (7, "Logs", 0.01),
                (5, "Ground Clutter", 0.05),
                (6, "Flowers", 0.08),
            ]),
        };
        let diagnosis = RuleSet::default().evaluate(&metrics);

        assert_eq!(
            diagnosis.causes,
            vec![
                "Logs class almost missed (IOU=0.010)",
                "Ground Clutter class almost missed (IOU=0.050)",
                "Flowers class almost missed (IOU=0.080)",
            ]
        );
        assert_eq!(
            diagnosis.recommendations,
            vec![
                "Logs are sparse - increase loss weight and use focal loss",
                "Flowers class is small - increase loss weight",
                "Consider morphological post-processing",
            ]
        );
    }

    #[test]
    fn evaluation_is_repeatable() {
        let metrics = CaseMetrics {
            mean_iou: 0.05,
            worst_classes: worst(&[(6, "Flowers", 0.0), (7, "Logs", 0.0)]),
        };
        let rules = RuleSet::default();
        assert_eq!(rules.evaluate(&metrics), rules.evaluate(&metrics));
    }

    #[test]
    fn rule_table_round_trips_through_json() {
        let json = serde_json::to_string(&RuleSet::default()).unwrap();
        assert!(json.contains(r#""kind":"mean_iou_below""#));
        let parsed: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RuleSet::default());
    }
}
