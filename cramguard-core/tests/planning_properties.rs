use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use cramguard_core::{
    BlockSuggestionEngine, CandidateWindow, IntakeParser, Priority, StdRandom, Task, is_quiet_time,
    resolve_swap,
};
use proptest::prelude::*;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 4)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn priority(i: usize) -> Priority {
    [Priority::Low, Priority::Medium, Priority::High][i % 3]
}

proptest! {
    #[test]
    fn test_suggestions_respect_hard_constraints(
        now_offset in 0i64..60 * 24 * 60,
        due_offset in -3i64 * 24 * 60..30 * 24 * 60,
        p in 0usize..3,
        effort in 1u32..12,
        count in 1usize..=10,
        seed in any::<u64>(),
    ) {
        let engine = BlockSuggestionEngine::default();
        let now = base() + Duration::minutes(now_offset);
        let due = now + Duration::minutes(due_offset);
        let task = Task::new("t1", "Essay", due)
            .with_priority(priority(p))
            .with_effort(effort);

        let window = CandidateWindow::derive(due, now, engine.rules());
        let blocks = engine.suggest(&task, count, now, &mut StdRandom::seeded(seed)).unwrap();

        if window.dates.is_empty() {
            prop_assert!(blocks.is_empty());
        } else {
            prop_assert_eq!(blocks.len(), count);
        }

        for b in &blocks {
            prop_assert!(!is_quiet_time(b.start_time));
            prop_assert!(b.date > now.date());
            prop_assert!(b.date <= window.end.date());
            if !window.fallback {
                prop_assert!(b.starts_at() < due);
            }
        }

        let keys: Vec<_> = blocks.iter().map(|b| (b.date, b.start_time)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);

        let reasons: HashSet<&str> = blocks.iter().map(|b| b.reason.as_str()).collect();
        prop_assert_eq!(reasons.len(), blocks.len());
    }

    #[test]
    fn test_swap_is_conflict_free_and_keeps_id(
        now_offset in 0i64..60 * 24 * 60,
        due_days in 2i64..30,
        p in 0usize..3,
        pick in 0usize..5,
        seed in any::<u64>(),
    ) {
        let engine = BlockSuggestionEngine::default();
        let now = base() + Duration::minutes(now_offset);
        let task = Task::new("t1", "Essay", now + Duration::days(due_days))
            .with_priority(priority(p));
        let mut rng = StdRandom::seeded(seed);

        let known = engine.suggest(&task, 5, now, &mut rng).unwrap();
        prop_assume!(!known.is_empty());
        let current = known[pick % known.len()].clone();

        let swapped = resolve_swap(&engine, &task, &current, &known, now, &mut rng).unwrap();
        prop_assert_eq!(&swapped.id, &current.id);
        prop_assert_eq!(&swapped.task_id, &current.task_id);
        prop_assert!(!is_quiet_time(swapped.start_time));
        prop_assert!(known.iter().all(|b| b.slot() != swapped.slot()));
    }
}

#[test]
fn test_same_seed_same_plan() {
    let engine = BlockSuggestionEngine::default();
    let now = base() + Duration::hours(10);
    let task = Task::new("t1", "Final exam prep", now + Duration::days(12))
        .with_priority(Priority::High);

    let shape = |seed| {
        engine
            .suggest(&task, 5, now, &mut StdRandom::seeded(seed))
            .unwrap()
            .into_iter()
            .map(|b| (b.date, b.start_time, b.duration, b.reason))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(99), shape(99));
}

#[test]
fn test_parsed_due_dates_are_in_the_future() {
    let parser = IntakeParser::with_defaults().unwrap();
    let now = base() + Duration::hours(10);
    for phrase in [
        "Essay due tomorrow",
        "Essay due friday 2pm",
        "Essay due next monday",
        "Essay due in 3 days",
    ] {
        let draft = parser.parse_at(phrase, now).unwrap();
        let due = draft.due.unwrap_or_else(|| panic!("no due date for {phrase:?}"));
        assert!(due > now, "{phrase:?} resolved to {due}");
        assert_eq!(draft.title, "Essay");
    }
}
