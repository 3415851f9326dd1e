//! Swap one block for a non-conflicting alternative while keeping its id.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::PlanError;
use crate::random::RandomSource;
use crate::suggest::BlockSuggestionEngine;
use crate::task::{Block, Task};

/// Replace `current` with a block whose `(date, start_time)` is not taken by
/// `current` itself or any block in `known`.
///
/// Draws a fresh batch from the engine first. When every candidate
/// conflicts, moves `current` to a fallback slot on its own date instead;
/// that path is best-effort and may still collide if every fallback slot
/// is taken.
pub fn resolve_swap(
    engine: &BlockSuggestionEngine,
    task: &Task,
    current: &Block,
    known: &[Block],
    now: NaiveDateTime,
    rng: &mut dyn RandomSource,
) -> Result<Block, PlanError> {
    let conflicts: HashSet<(NaiveDate, NaiveTime)> = known
        .iter()
        .chain(std::iter::once(current))
        .map(Block::slot)
        .collect();

    let batch = engine.suggest(task, engine.rules().swap_batch, now, rng)?;
    if let Some(candidate) = batch.into_iter().find(|b| !conflicts.contains(&b.slot())) {
        tracing::debug!(
            block_id = %current.id,
            date = %candidate.date,
            start = %candidate.start_time,
            "swapped to fresh candidate"
        );
        return Ok(Block {
            id: current.id.clone(),
            ..candidate
        });
    }

    let rules = engine.rules();
    let start_time = match rules
        .swap_fallback_slots
        .iter()
        .find(|t| !conflicts.contains(&(current.date, **t)))
    {
        Some(t) => *t,
        None => {
            tracing::warn!(
                block_id = %current.id,
                date = %current.date,
                "every fallback slot is taken; swapped block may collide"
            );
            rules.swap_fallback_slots[rng.pick(rules.swap_fallback_slots.len())]
        }
    };
    let duration = rules.durations[rng.pick(rules.durations.len())];
    let pool = &rules.swap_fallback_rationales;
    let reason = pool[rng.pick(pool.len())].clone();

    Ok(Block {
        start_time,
        duration,
        reason,
        ..current.clone()
    })
}
