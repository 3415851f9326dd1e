//! PlannerBoard: the single-user planning state.
//!
//! Holds tasks, the current suggestion list per task, and committed blocks.
//! No I/O; callers persist it through serde.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::random::RandomSource;
use crate::suggest::BlockSuggestionEngine;
use crate::swap::resolve_swap;
use crate::task::{Block, Task};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerBoard {
    #[serde(default)]
    tasks: HashMap<String, Task>,
    /// task id -> suggestions currently on offer, in display order.
    #[serde(default)]
    suggested: HashMap<String, Vec<Block>>,
    #[serde(default)]
    committed: Vec<Block>,
}

impl PlannerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), BoardError> {
        task.validate()?;
        if self.tasks.contains_key(&task.id) {
            return Err(BoardError::DuplicateTask(task.id));
        }
        tracing::debug!(task_id = %task.id, due = %task.due, "task added");
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks, earliest due first.
    pub fn tasks(&self) -> Vec<&Task> {
        let mut out: Vec<&Task> = self.tasks.values().collect();
        out.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn open_tasks(&self) -> Vec<&Task> {
        self.tasks().into_iter().filter(|t| !t.is_completed()).collect()
    }

    /// Remove a task together with its suggested and committed blocks.
    pub fn delete_task(&mut self, id: &str) -> Result<Task, BoardError> {
        let task = self
            .tasks
            .remove(id)
            .ok_or_else(|| BoardError::UnknownTask(id.to_string()))?;
        self.suggested.remove(id);
        self.committed.retain(|b| b.task_id != id);
        Ok(task)
    }

    pub fn set_suggestions(&mut self, task_id: &str, blocks: Vec<Block>) -> Result<(), BoardError> {
        self.require_task(task_id)?;
        self.suggested.insert(task_id.to_string(), blocks);
        Ok(())
    }

    pub fn suggested(&self, task_id: &str) -> &[Block] {
        self.suggested.get(task_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Swap a suggested block in place, keeping its id and list position.
    ///
    /// The replacement avoids every slot already on the board, suggested or
    /// committed, for any task. Committed blocks cannot be swapped.
    pub fn swap_suggestion(
        &mut self,
        block_id: &str,
        engine: &BlockSuggestionEngine,
        now: NaiveDateTime,
        rng: &mut dyn RandomSource,
    ) -> Result<&Block, BoardError> {
        if self.is_committed(block_id) {
            return Err(BoardError::BlockCommitted(block_id.to_string()));
        }
        let (task_id, pos) = self
            .find_suggested(block_id)
            .ok_or_else(|| BoardError::UnknownBlock(block_id.to_string()))?;
        let task = self.require_task(&task_id)?;

        let known = self.blocks_in_play();
        let current = &self.suggested[&task_id][pos];
        let replacement = resolve_swap(engine, task, current, &known, now, rng)?;

        let list = self
            .suggested
            .get_mut(&task_id)
            .ok_or_else(|| BoardError::UnknownBlock(block_id.to_string()))?;
        list[pos] = replacement;
        Ok(&list[pos])
    }

    /// Commit a suggested block. Committing an already-committed id is a no-op.
    ///
    /// Returns how many hours ahead of the due date the block starts.
    pub fn commit(&mut self, block_id: &str) -> Result<i64, BoardError> {
        if !self.is_committed(block_id) {
            let (task_id, pos) = self
                .find_suggested(block_id)
                .ok_or_else(|| BoardError::UnknownBlock(block_id.to_string()))?;
            let block = self.suggested[&task_id][pos].clone();
            tracing::debug!(block_id, task_id = %block.task_id, "block committed");
            self.committed.push(block);
        }
        let block = self
            .committed
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| BoardError::UnknownBlock(block_id.to_string()))?;
        let task = self.require_task(&block.task_id)?;
        Ok(block.hours_ahead_of(task))
    }

    pub fn uncommit(&mut self, block_id: &str) -> Result<Block, BoardError> {
        let pos = self
            .committed
            .iter()
            .position(|b| b.id == block_id)
            .ok_or_else(|| BoardError::UnknownBlock(block_id.to_string()))?;
        Ok(self.committed.remove(pos))
    }

    pub fn is_committed(&self, block_id: &str) -> bool {
        self.committed.iter().any(|b| b.id == block_id)
    }

    /// Committed blocks, optionally for one task, in chronological order.
    pub fn committed(&self, task_id: Option<&str>) -> Vec<Block> {
        let mut out: Vec<Block> = self
            .committed
            .iter()
            .filter(|b| task_id.is_none_or(|id| b.task_id == id))
            .cloned()
            .collect();
        out.sort_by_key(|b| (b.date, b.start_time));
        out
    }

    /// Smallest hours-ahead value over committed blocks, floored at 0.
    /// Returns 0 when nothing is committed.
    pub fn min_hours_ahead(&self) -> i64 {
        self.committed
            .iter()
            .filter_map(|b| self.tasks.get(&b.task_id).map(|t| b.hours_ahead_of(t)))
            .min()
            .unwrap_or(0)
            .max(0)
    }

    pub fn set_completed(
        &mut self,
        task_id: &str,
        done: bool,
        now: NaiveDateTime,
    ) -> Result<&Task, BoardError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        task.completed_at = done.then_some(now);
        Ok(task)
    }

    fn require_task(&self, id: &str) -> Result<&Task, BoardError> {
        self.tasks
            .get(id)
            .ok_or_else(|| BoardError::UnknownTask(id.to_string()))
    }

    /// Committed blocks plus every task's suggestions, one entry per id.
    fn blocks_in_play(&self) -> Vec<Block> {
        let mut seen = HashSet::new();
        self.committed
            .iter()
            .chain(self.suggested.values().flatten())
            .filter(|b| seen.insert(b.id.as_str()))
            .cloned()
            .collect()
    }

    fn find_suggested(&self, block_id: &str) -> Option<(String, usize)> {
        self.suggested.iter().find_map(|(task_id, blocks)| {
            blocks
                .iter()
                .position(|b| b.id == block_id)
                .map(|pos| (task_id.clone(), pos))
        })
    }
}
