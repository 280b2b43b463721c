//! Scheduling settings
//!
//! `ScheduleSettings` is owned by an engine instance. Callers adjust it with a
//! `SettingsPatch`: top-level fields replace, promotion rules merge field by
//! field, the ladder is replaced wholesale. Every merge is followed by
//! `sanitized()` so out-of-range input never reaches the scheduler.

use serde::{Deserialize, Serialize};

/// Thresholds for one stage transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRule {
    /// Minimum virtual Leitner box
    pub min_box: usize,
    /// Minimum presentations in the source mode
    pub min_shown: u32,
    /// Minimum accuracy in the source mode
    pub min_acc: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromotionRulePatch {
    pub min_box: Option<usize>,
    pub min_shown: Option<u32>,
    pub min_acc: Option<f64>,
}

impl PromotionRule {
    fn merge(&mut self, patch: &PromotionRulePatch) {
        if let Some(min_box) = patch.min_box {
            self.min_box = min_box;
        }
        if let Some(min_shown) = patch.min_shown {
            self.min_shown = min_shown;
        }
        if let Some(min_acc) = patch.min_acc {
            self.min_acc = min_acc;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    /// Day thresholds of the virtual Leitner ladder, ascending
    pub leitner_days: Vec<f64>,
    pub to_chunking: PromotionRule,
    pub to_composing: PromotionRule,
    /// Longest interval the scheduler may produce
    pub max_interval_days: f64,
    /// Fraction of the library the learner should have been introduced to
    pub target_new_share: f64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            leitner_days: vec![0.0, 1.0, 3.0, 7.0, 15.0, 30.0, 60.0],
            to_chunking: PromotionRule {
                min_box: 3,
                min_shown: 5,
                min_acc: 0.75,
            },
            to_composing: PromotionRule {
                min_box: 2,
                min_shown: 10,
                min_acc: 0.70,
            },
            max_interval_days: 60.0,
            target_new_share: 0.6,
        }
    }
}

/// Partial settings, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub leitner_days: Option<Vec<f64>>,
    pub to_chunking: Option<PromotionRulePatch>,
    pub to_composing: Option<PromotionRulePatch>,
    pub max_interval_days: Option<f64>,
    pub target_new_share: Option<f64>,
}

impl SettingsPatch {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl ScheduleSettings {
    /// Apply a patch and return the sanitized result.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(ref days) = patch.leitner_days {
            next.leitner_days = days.clone();
        }
        if let Some(ref rule) = patch.to_chunking {
            next.to_chunking.merge(rule);
        }
        if let Some(ref rule) = patch.to_composing {
            next.to_composing.merge(rule);
        }
        if let Some(max) = patch.max_interval_days {
            next.max_interval_days = max;
        }
        if let Some(share) = patch.target_new_share {
            next.target_new_share = share;
        }
        next.sanitized()
    }

    /// Clamp values into ranges the scheduler can work with.
    pub fn sanitized(mut self) -> Self {
        let defaults = ScheduleSettings::default();

        self.leitner_days.retain(|d| d.is_finite() && *d >= 0.0);
        self.leitner_days
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if self.leitner_days.is_empty() {
            tracing::warn!("empty leitner ladder, falling back to defaults");
            self.leitner_days = defaults.leitner_days.clone();
        }

        if !(self.max_interval_days.is_finite() && self.max_interval_days > 0.0) {
            tracing::warn!(
                max_interval_days = self.max_interval_days,
                "invalid max interval, falling back to default"
            );
            self.max_interval_days = defaults.max_interval_days;
        }

        self.target_new_share = if self.target_new_share.is_finite() {
            self.target_new_share.clamp(0.0, 1.0)
        } else {
            defaults.target_new_share
        };

        for (rule, fallback) in [
            (&mut self.to_chunking, &defaults.to_chunking),
            (&mut self.to_composing, &defaults.to_composing),
        ] {
            rule.min_acc = if rule.min_acc.is_finite() {
                rule.min_acc.clamp(0.0, 1.0)
            } else {
                fallback.min_acc
            };
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merges_nested_rule_fieldwise() {
        let base = ScheduleSettings::default();
        let patch = SettingsPatch {
            to_chunking: Some(PromotionRulePatch {
                min_shown: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = base.merged(&patch);
        assert_eq!(merged.to_chunking.min_shown, 2);
        assert_eq!(merged.to_chunking.min_box, 3);
        assert_eq!(merged.to_chunking.min_acc, 0.75);
        assert_eq!(merged.to_composing, base.to_composing);
    }

    #[test]
    fn test_patch_from_partial_json() {
        let patch =
            SettingsPatch::from_json(r#"{"targetNewShare":0.3,"toComposing":{"minAcc":0.8}}"#)
                .unwrap();
        let merged = ScheduleSettings::default().merged(&patch);
        assert_eq!(merged.target_new_share, 0.3);
        assert_eq!(merged.to_composing.min_acc, 0.8);
        assert_eq!(merged.to_composing.min_shown, 10);
        assert_eq!(merged.max_interval_days, 60.0);
    }

    #[test]
    fn test_ladder_replaced_and_sorted() {
        let patch = SettingsPatch {
            leitner_days: Some(vec![5.0, 0.0, f64::NAN, 2.0]),
            ..Default::default()
        };
        let merged = ScheduleSettings::default().merged(&patch);
        assert_eq!(merged.leitner_days, vec![0.0, 2.0, 5.0]);
    }

    #[test]
    fn test_sanitize_out_of_range_values() {
        let settings = ScheduleSettings {
            max_interval_days: -3.0,
            target_new_share: 4.0,
            leitner_days: vec![],
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.max_interval_days, 60.0);
        assert_eq!(settings.target_new_share, 1.0);
        assert_eq!(settings.leitner_days.len(), 7);
    }
}
