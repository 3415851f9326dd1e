//! Keyword tables and scheduling tables.
//!
//! These are plain configuration values owned by the parser and the engine.
//! Every field has a default, so a TOML profile only needs to list what it
//! changes (for example a different rationale tone or another language's
//! keywords).

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::suggest::MAX_COUNT;
use crate::task::{Category, Priority};
use crate::time::{hhmm, hhmm_list, is_quiet_time};

/// Upper bound for every day-count in [`SuggestionRules`].
pub const MAX_WINDOW_DAYS: i64 = 366;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn hours(items: &[u32]) -> Vec<NaiveTime> {
    items
        .iter()
        .filter_map(|h| NaiveTime::from_hms_opt(*h, 0, 0))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Whole-word vocabulary mapped to an effort estimate in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortTier {
    pub hours: u32,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeRules {
    /// Checked before the low list; the first hit wins.
    pub high_priority_keywords: Vec<String>,
    pub low_priority_keywords: Vec<String>,
    /// Leading announcements stripped from titles, e.g. "urgent:".
    pub priority_prefixes: Vec<String>,
    /// Words that usually introduce a date ("due Friday").
    pub connector_words: Vec<String>,
    pub default_effort: u32,
    pub default_category: Category,
    #[serde(with = "hhmm")]
    pub default_due_time: NaiveTime,
    pub examples: Vec<String>,
    /// Scanned in declared order.
    pub categories: Vec<CategoryKeywords>,
    /// Scanned in declared order.
    pub effort_tiers: Vec<EffortTier>,
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self {
            high_priority_keywords: strings(&[
                "urgent",
                "important",
                "asap",
                "critical",
                "high priority",
                "high-priority",
                "!",
                "!!",
                "!!!",
            ]),
            low_priority_keywords: strings(&[
                "low priority",
                "low-priority",
                "whenever",
                "not urgent",
                "minor",
                "optional",
            ]),
            priority_prefixes: strings(&[
                "urgent:",
                "important:",
                "low priority:",
                "high priority:",
            ]),
            connector_words: strings(&["due", "by", "on", "at", "before", "until", "deadline"]),
            categories: vec![
                CategoryKeywords {
                    category: Category::School,
                    keywords: strings(&[
                        "school", "class", "assignment", "homework", "exam", "quiz", "test",
                        "lecture", "lab", "project", "essay", "paper", "study", "midterm",
                        "final",
                    ]),
                },
                CategoryKeywords {
                    category: Category::Work,
                    keywords: strings(&[
                        "work",
                        "job",
                        "meeting",
                        "client",
                        "deadline",
                        "report",
                        "presentation",
                        "office",
                    ]),
                },
                CategoryKeywords {
                    category: Category::Personal,
                    keywords: strings(&[
                        "personal",
                        "home",
                        "gym",
                        "health",
                        "doctor",
                        "appointment",
                        "errand",
                        "shopping",
                    ]),
                },
            ],
            effort_tiers: vec![
                EffortTier {
                    hours: 10,
                    words: strings(&[
                        "final",
                        "major",
                        "big",
                        "large",
                        "comprehensive",
                        "thesis",
                        "dissertation",
                    ]),
                },
                EffortTier {
                    hours: 6,
                    words: strings(&["project", "paper", "essay", "report", "presentation"]),
                },
                EffortTier {
                    hours: 4,
                    words: strings(&["assignment", "homework", "lab"]),
                },
                EffortTier {
                    hours: 2,
                    words: strings(&["quiz", "reading", "review", "notes"]),
                },
            ],
            default_effort: 4,
            default_category: Category::School,
            default_due_time: crate::time::end_of_day(),
            examples: strings(&[
                "Math homework due tomorrow at 5pm",
                "Urgent: Final project presentation Friday 2pm",
                "Low priority: clean up notes",
                "CS assignment due November 30th 11:59pm",
                "Study for midterm exam next Monday",
            ]),
        }
    }
}

/// Ordered preferred start times per priority level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferredTimes {
    #[serde(with = "hhmm_list")]
    pub high: Vec<NaiveTime>,
    #[serde(with = "hhmm_list")]
    pub medium: Vec<NaiveTime>,
    #[serde(with = "hhmm_list")]
    pub low: Vec<NaiveTime>,
}

impl Default for PreferredTimes {
    fn default() -> Self {
        Self {
            high: hours(&[9, 10, 8, 14, 15]),
            medium: hours(&[10, 14, 15, 16, 11]),
            low: hours(&[14, 16, 17, 19, 20]),
        }
    }
}

impl PreferredTimes {
    pub fn for_priority(&self, priority: Priority) -> &[NaiveTime] {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }
}

/// Word swapped in rationales of weekend-dated blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekendPhrase {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionRules {
    /// Minutes, ordered shortest to longest.
    pub durations: Vec<u32>,
    /// Every start time the engine may use.
    #[serde(with = "hhmm_list")]
    pub slots: Vec<NaiveTime>,
    pub rationales: Vec<String>,
    /// The window never reaches further than this past "now".
    pub horizon_days: i64,
    /// Window length used when the due date leaves no room.
    pub fallback_days: i64,
    pub max_candidate_dates: usize,
    /// How many fresh candidates a swap draws.
    pub swap_batch: usize,
    #[serde(with = "hhmm_list")]
    pub swap_fallback_slots: Vec<NaiveTime>,
    pub swap_fallback_rationales: Vec<String>,
    pub preferred: PreferredTimes,
    pub weekend_phrase: WeekendPhrase,
}

impl Default for SuggestionRules {
    fn default() -> Self {
        Self {
            durations: vec![60, 90, 120],
            slots: hours(&[7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21]),
            preferred: PreferredTimes::default(),
            rationales: strings(&[
                "Morning focus window – optimal for deep work",
                "Post-lunch productivity slot – matches your energy patterns",
                "Afternoon steady state – good for sustained effort",
                "Early evening wind-down – ideal for review tasks",
                "Weekend morning – uninterrupted study time",
                "Midday break slot – quick progress session",
                "Pre-deadline push – concentrated effort block",
                "Low-distraction window – minimal calendar conflicts",
                "Peak cognitive hours – based on typical student patterns",
                "Strategic buffer – builds in time before due date",
            ]),
            weekend_phrase: WeekendPhrase {
                from: "typical".to_string(),
                to: "weekend".to_string(),
            },
            horizon_days: 10,
            fallback_days: 7,
            max_candidate_dates: 14,
            swap_batch: 10,
            swap_fallback_slots: hours(&[7, 8, 9, 11, 13, 15, 17, 19]),
            swap_fallback_rationales: strings(&[
                "Alternative slot – fresh perspective time",
                "Backup window – good fallback option",
                "Flexible slot – adapts to your schedule",
                "Recovery window – optimal after rest",
            ]),
        }
    }
}

impl SuggestionRules {
    /// Reject tables that would let the engine break a hard constraint.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.durations.is_empty() {
            return Err(RulesError::invalid("durations", "at least one duration is required"));
        }
        if let Some(d) = self.durations.iter().find(|d| !(1..=240).contains(*d)) {
            return Err(RulesError::invalid(
                "durations",
                format!("{d} minutes is outside 1..=240"),
            ));
        }
        if self.slots.is_empty() {
            return Err(RulesError::invalid("slots", "at least one slot is required"));
        }
        if self.rationales.is_empty() {
            return Err(RulesError::invalid("rationales", "the rationale pool is empty"));
        }
        if self.swap_fallback_rationales.is_empty() {
            return Err(RulesError::invalid(
                "swap_fallback_rationales",
                "the fallback rationale pool is empty",
            ));
        }
        if self.swap_fallback_slots.is_empty() {
            return Err(RulesError::invalid(
                "swap_fallback_slots",
                "at least one fallback slot is required",
            ));
        }
        if !(1..=MAX_COUNT).contains(&self.swap_batch) {
            return Err(RulesError::invalid(
                "swap_batch",
                format!("{} is outside 1..={MAX_COUNT}", self.swap_batch),
            ));
        }
        let days = [
            ("horizon_days", self.horizon_days),
            ("fallback_days", self.fallback_days),
            ("max_candidate_dates", i64::try_from(self.max_candidate_dates).unwrap_or(i64::MAX)),
        ];
        for (key, value) in days {
            if !(1..=MAX_WINDOW_DAYS).contains(&value) {
                return Err(RulesError::invalid(
                    key,
                    format!("{value} days is outside 1..={MAX_WINDOW_DAYS}"),
                ));
            }
        }

        let tables: [(&str, &[NaiveTime]); 5] = [
            ("slots", &self.slots),
            ("preferred.high", &self.preferred.high),
            ("preferred.medium", &self.preferred.medium),
            ("preferred.low", &self.preferred.low),
            ("swap_fallback_slots", &self.swap_fallback_slots),
        ];
        for (key, times) in tables {
            if let Some(t) = times.iter().find(|t| is_quiet_time(**t)) {
                return Err(RulesError::invalid(
                    key,
                    format!("{} falls inside the 22:00-07:00 quiet window", t.format("%H:%M")),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let rules = SuggestionRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.rationales.len(), 10);
        assert_eq!(rules.slots.len(), 15);
    }

    #[test]
    fn test_quiet_slot_is_rejected() {
        let mut rules = SuggestionRules::default();
        rules.preferred.low.push(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        let err = rules.validate().unwrap_err();
        assert!(err.to_string().contains("preferred.low"));
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let rules = SuggestionRules {
            rationales: vec![],
            ..SuggestionRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_window_lengths_are_bounded() {
        let huge = SuggestionRules {
            horizon_days: i64::MAX / 100,
            ..SuggestionRules::default()
        };
        let err = huge.validate().unwrap_err();
        assert!(err.to_string().contains("horizon_days"));

        let zero = SuggestionRules {
            fallback_days: 0,
            ..SuggestionRules::default()
        };
        assert!(zero.validate().unwrap_err().to_string().contains("fallback_days"));

        let dates = SuggestionRules {
            max_candidate_dates: usize::MAX,
            ..SuggestionRules::default()
        };
        assert!(dates.validate().unwrap_err().to_string().contains("max_candidate_dates"));

        let year = SuggestionRules {
            horizon_days: MAX_WINDOW_DAYS,
            fallback_days: MAX_WINDOW_DAYS,
            ..SuggestionRules::default()
        };
        assert!(year.validate().is_ok());
    }

    #[test]
    fn test_swap_batch_is_bounded() {
        for swap_batch in [0, MAX_COUNT + 1] {
            let rules = SuggestionRules {
                swap_batch,
                ..SuggestionRules::default()
            };
            assert!(rules.validate().unwrap_err().to_string().contains("swap_batch"));
        }
    }

    #[test]
    fn test_partial_profile_keeps_other_defaults() {
        let json = r#"{ "rationales": ["Just do it"], "preferred": { "high": ["07:00"] } }"#;
        let rules: SuggestionRules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.rationales, vec!["Just do it".to_string()]);
        assert_eq!(rules.preferred.high, hours(&[7]));
        assert_eq!(rules.preferred.low, PreferredTimes::default().low);
        assert_eq!(rules.durations, vec![60, 90, 120]);
    }

    #[test]
    fn test_default_category_order() {
        let rules = IntakeRules::default();
        let order: Vec<Category> = rules.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, vec![Category::School, Category::Work, Category::Personal]);
    }
}
