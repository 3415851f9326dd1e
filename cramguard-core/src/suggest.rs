//! Block suggestion engine: propose concrete work windows ("commit blocks")
//! for a task.
//!
//! Algorithm (heuristic, not an optimizer):
//! 1) derive the candidate window: tomorrow 00:00 .. min(due, now + horizon),
//!    or now + fallback days when the due date leaves no room
//! 2) enumerate up to `max_candidate_dates` days that still have an eligible slot
//! 3) for each requested block, spread the date across the window with 0-1
//!    days of jitter, take the priority's preferred time first, then a free slot
//! 4) bias durations by priority/effort and draw a rationale not yet used
//! 5) return the blocks in chronological order

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use uuid::Uuid;

use crate::error::{PlanError, RulesError};
use crate::random::RandomSource;
use crate::rules::SuggestionRules;
use crate::task::{Block, Priority, Task};

pub const DEFAULT_COUNT: usize = 5;
/// Largest block count a single call will produce.
pub const MAX_COUNT: usize = 100;

/// Effort (hours) from which durations lean long regardless of priority.
const LONG_EFFORT_HOURS: u32 = 6;

/// The span of days the engine may place blocks in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// True when the due date had already passed and the fixed fallback span is used.
    pub fallback: bool,
    /// Blocks must start strictly before this instant (the due date), if set.
    pub latest_start: Option<NaiveDateTime>,
    pub dates: Vec<NaiveDate>,
}

impl CandidateWindow {
    pub fn derive(due: NaiveDateTime, now: NaiveDateTime, rules: &SuggestionRules) -> Self {
        let start = (now.date() + Duration::days(1)).and_time(NaiveTime::MIN);
        let cap = days_after(now, rules.horizon_days);
        let mut end = due.min(cap);
        let mut latest_start = Some(due);
        let mut fallback = false;

        if end <= start {
            end = days_after(now, rules.fallback_days);
            latest_start = None;
            fallback = true;
        }

        let mut window = Self {
            start,
            end,
            fallback,
            latest_start,
            dates: Vec::new(),
        };

        let mut day = start.date();
        while day.and_time(NaiveTime::MIN) < end && window.dates.len() < rules.max_candidate_dates {
            if !window.slots_on(day, rules).is_empty() {
                window.dates.push(day);
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        window
    }

    /// Start times usable on `date`.
    pub fn slots_on(&self, date: NaiveDate, rules: &SuggestionRules) -> Vec<NaiveTime> {
        rules
            .slots
            .iter()
            .copied()
            .filter(|t| self.latest_start.is_none_or(|limit| date.and_time(*t) < limit))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockSuggestionEngine {
    rules: SuggestionRules,
}

impl BlockSuggestionEngine {
    pub fn new(rules: SuggestionRules) -> Result<Self, RulesError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &SuggestionRules {
        &self.rules
    }

    pub fn suggest_default(
        &self,
        task: &Task,
        now: NaiveDateTime,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<Block>, PlanError> {
        self.suggest(task, DEFAULT_COUNT, now, rng)
    }

    /// Up to `count` blocks for `task`, sorted by (date, start time).
    ///
    /// An empty list means no feasible window, not an error.
    pub fn suggest(
        &self,
        task: &Task,
        count: usize,
        now: NaiveDateTime,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<Block>, PlanError> {
        task.validate()?;
        if count == 0 {
            return Err(PlanError::ZeroCount);
        }
        if count > MAX_COUNT {
            return Err(PlanError::CountTooLarge { count, max: MAX_COUNT });
        }

        let rules = &self.rules;
        let window = CandidateWindow::derive(task.due, now, rules);
        let n = window.dates.len();
        if n == 0 {
            tracing::debug!(task_id = %task.id, due = %task.due, "no candidate dates for task");
            return Ok(Vec::new());
        }

        let preferred = rules.preferred.for_priority(task.priority);
        let mut used_slots: HashSet<(NaiveDate, NaiveTime)> = HashSet::new();
        let mut used_reasons: HashSet<&str> = HashSet::new();
        let mut blocks = Vec::with_capacity(count);

        for i in 0..count {
            let index = (i * n / count + rng.pick(2)).min(n - 1);
            let date = window.dates[index];
            let slots = window.slots_on(date, rules);

            let start_time = match preferred.get(i) {
                Some(t) if slots.contains(t) => *t,
                _ => {
                    let free: Vec<NaiveTime> = slots
                        .iter()
                        .copied()
                        .filter(|t| !used_slots.contains(&(date, *t)))
                        .collect();
                    if free.is_empty() {
                        slots[rng.pick(slots.len())]
                    } else {
                        free[rng.pick(free.len())]
                    }
                }
            };
            used_slots.insert((date, start_time));

            let duration = self.duration_for(task, i);

            let available: Vec<&str> = rules
                .rationales
                .iter()
                .map(String::as_str)
                .filter(|r| !used_reasons.contains(r))
                .collect();
            let picked = if available.is_empty() {
                rules.rationales[i % rules.rationales.len()].as_str()
            } else {
                available[rng.pick(available.len())]
            };
            used_reasons.insert(picked);

            let reason = if is_weekend(date) {
                picked.replace(&rules.weekend_phrase.from, &rules.weekend_phrase.to)
            } else {
                picked.to_string()
            };

            blocks.push(Block {
                id: format!("block-{}-{}", task.id, Uuid::new_v4().simple()),
                task_id: task.id.clone(),
                date,
                start_time,
                duration,
                reason,
            });
        }

        blocks.sort_by_key(|b| (b.date, b.start_time));

        tracing::debug!(
            task_id = %task.id,
            window_start = %window.start,
            window_end = %window.end,
            fallback = window.fallback,
            dates = n,
            produced = blocks.len(),
            "suggested blocks"
        );

        Ok(blocks)
    }

    /// Pick a duration: longer for urgent or heavy tasks, shorter for low priority.
    fn duration_for(&self, task: &Task, i: usize) -> u32 {
        let durations = &self.rules.durations;
        let len = durations.len();
        let step = i % len;
        let index = if task.priority == Priority::High || task.effort >= LONG_EFFORT_HOURS {
            (step + 1).min(len - 1)
        } else if task.priority == Priority::Low {
            step.saturating_sub(1)
        } else {
            step
        };
        durations[index]
    }
}

/// `now` plus `days`, saturating at the end of the calendar.
fn days_after(now: NaiveDateTime, days: i64) -> NaiveDateTime {
    Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(NaiveDateTime::MAX)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, StdRandom};
    use crate::task::Priority;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Wednesday 2026-03-04, 10:00.
    fn now() -> NaiveDateTime {
        at(2026, 3, 4, 10, 0)
    }

    #[test]
    fn test_window_is_capped_by_horizon() {
        let rules = SuggestionRules::default();
        let w = CandidateWindow::derive(at(2026, 3, 30, 23, 59), now(), &rules);
        assert!(!w.fallback);
        assert_eq!(w.start, at(2026, 3, 5, 0, 0));
        assert_eq!(w.end, at(2026, 3, 14, 10, 0));
        assert_eq!(w.dates.len(), 10);
        assert_eq!(w.dates.first(), NaiveDate::from_ymd_opt(2026, 3, 5).as_ref());
        assert_eq!(w.dates.last(), NaiveDate::from_ymd_opt(2026, 3, 14).as_ref());
    }

    #[test]
    fn test_past_due_uses_fallback_window() {
        let w = CandidateWindow::derive(at(2026, 3, 1, 12, 0), now(), &SuggestionRules::default());
        assert!(w.fallback);
        assert_eq!(w.end, at(2026, 3, 11, 10, 0));
        assert_eq!(w.dates.len(), 7);
        assert_eq!(w.latest_start, None);
    }

    #[test]
    fn test_due_date_trims_last_day_slots() {
        let rules = SuggestionRules::default();
        let w = CandidateWindow::derive(at(2026, 3, 5, 12, 0), now(), &rules);
        assert_eq!(w.dates, vec![NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()]);
        let slots = w.slots_on(w.dates[0], &rules);
        assert_eq!(slots, vec![hm(7, 0), hm(8, 0), hm(9, 0), hm(10, 0), hm(11, 0)]);
    }

    #[test]
    fn test_no_feasible_dates_yields_empty_list() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Pset", at(2026, 3, 5, 6, 0));
        let blocks = engine
            .suggest(&task, 5, now(), &mut ScriptedRandom::zeros())
            .unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_high_priority_uses_preferred_times_and_long_blocks() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Final exam prep", at(2026, 3, 30, 23, 59))
            .with_priority(Priority::High);
        let blocks = engine
            .suggest(&task, 5, now(), &mut ScriptedRandom::zeros())
            .unwrap();

        let got: Vec<(NaiveDate, NaiveTime, u32)> =
            blocks.iter().map(|b| (b.date, b.start_time, b.duration)).collect();
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        assert_eq!(
            got,
            vec![
                (d(5), hm(9, 0), 90),
                (d(7), hm(10, 0), 120),
                (d(9), hm(8, 0), 120),
                (d(11), hm(14, 0), 90),
                (d(13), hm(15, 0), 120),
            ]
        );
        assert!(blocks.iter().all(|b| b.task_id == "t1" && b.id.starts_with("block-t1-")));
    }

    #[test]
    fn test_low_priority_prefers_short_blocks() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Tidy notes", at(2026, 3, 30, 23, 59))
            .with_priority(Priority::Low)
            .with_effort(2);
        let blocks = engine
            .suggest(&task, 6, now(), &mut StdRandom::seeded(3))
            .unwrap();
        let total: u32 = blocks.iter().map(|b| b.duration).sum();
        assert_eq!(total, 60 + 60 + 90 + 60 + 60 + 90);
    }

    #[test]
    fn test_ineligible_preferred_time_falls_back_to_free_slot() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Quiz", at(2026, 3, 5, 9, 30)).with_priority(Priority::High);
        let blocks = engine
            .suggest(&task, 2, now(), &mut ScriptedRandom::zeros())
            .unwrap();
        let times: Vec<NaiveTime> = blocks.iter().map(|b| b.start_time).collect();
        assert_eq!(times, vec![hm(7, 0), hm(9, 0)]);
    }

    #[test]
    fn test_weekend_rationale_is_reframed() {
        let rules = SuggestionRules {
            rationales: vec!["Quiet hours for typical students".to_string()],
            ..SuggestionRules::default()
        };
        let engine = BlockSuggestionEngine::new(rules).unwrap();
        // Friday evening, so the first candidate day is Saturday.
        let task = Task::new("t1", "Essay", at(2026, 3, 20, 23, 59));
        let blocks = engine
            .suggest(&task, 1, at(2026, 3, 6, 18, 0), &mut ScriptedRandom::zeros())
            .unwrap();
        assert_eq!(blocks[0].date.weekday(), Weekday::Sat);
        assert_eq!(blocks[0].reason, "Quiet hours for weekend students");
    }

    #[test]
    fn test_reasons_repeat_only_after_pool_is_exhausted() {
        let rules = SuggestionRules {
            rationales: vec!["A".to_string(), "B".to_string()],
            ..SuggestionRules::default()
        };
        let engine = BlockSuggestionEngine::new(rules).unwrap();
        let task = Task::new("t1", "Essay", at(2026, 3, 30, 23, 59));
        let blocks = engine
            .suggest(&task, 3, now(), &mut StdRandom::seeded(11))
            .unwrap();
        assert_eq!(blocks.len(), 3);
        let mut reasons: Vec<&str> = blocks.iter().map(|b| b.reason.as_str()).collect();
        reasons.sort();
        reasons.dedup();
        assert_eq!(reasons, vec!["A", "B"]);
    }

    #[test]
    fn test_rejects_zero_count_and_invalid_task() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Essay", at(2026, 3, 30, 23, 59));
        let mut rng = ScriptedRandom::zeros();
        assert_eq!(engine.suggest(&task, 0, now(), &mut rng), Err(PlanError::ZeroCount));

        let blank = Task::new("", "Essay", at(2026, 3, 30, 23, 59));
        assert!(matches!(
            engine.suggest(&blank, 5, now(), &mut rng),
            Err(PlanError::InvalidTask(_))
        ));
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Essay", at(2026, 3, 30, 23, 59));
        let mut rng = StdRandom::seeded(3);
        assert_eq!(
            engine.suggest(&task, usize::MAX, now(), &mut rng),
            Err(PlanError::CountTooLarge { count: usize::MAX, max: MAX_COUNT })
        );
        let blocks = engine.suggest(&task, MAX_COUNT, now(), &mut rng).unwrap();
        assert_eq!(blocks.len(), MAX_COUNT);
    }

    #[test]
    fn test_default_count_is_five() {
        let engine = BlockSuggestionEngine::default();
        let task = Task::new("t1", "Essay", at(2026, 3, 30, 23, 59));
        let blocks = engine
            .suggest_default(&task, now(), &mut StdRandom::seeded(8))
            .unwrap();
        assert_eq!(blocks.len(), DEFAULT_COUNT);
    }

    #[test]
    fn test_unbounded_horizon_saturates() {
        let rules = SuggestionRules {
            horizon_days: i64::MAX / 100,
            fallback_days: i64::MAX,
            ..SuggestionRules::default()
        };
        let w = CandidateWindow::derive(at(2026, 3, 30, 23, 59), now(), &rules);
        assert_eq!(w.end, at(2026, 3, 30, 23, 59));
        assert_eq!(w.dates.len(), rules.max_candidate_dates);

        let past = CandidateWindow::derive(at(2026, 3, 1, 12, 0), now(), &rules);
        assert!(past.fallback);
        assert_eq!(past.end, NaiveDateTime::MAX);
        assert_eq!(past.dates.len(), rules.max_candidate_dates);
    }
}
