//! iCalendar export of committed blocks.
//!
//! Times are written as floating local time (no `Z`, no TZID), so calendar
//! apps place the block at the same wall-clock time it was planned for.
//! Lines are CRLF-terminated; every event carries two display alarms.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use uuid::Uuid;

use crate::error::ExportError;
use crate::task::{Block, Task};

const CRLF: &str = "\r\n";
const SLUG_MAX: usize = 30;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

pub struct ExportRequest<'a> {
    pub blocks: &'a [Block],
    pub tasks: &'a [Task],
    /// Export only this task's blocks when set.
    pub selected_task_id: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub block_count: usize,
    pub task_title: Option<String>,
}

pub fn export_ics(
    req: &ExportRequest<'_>,
    now: NaiveDateTime,
) -> Result<CalendarFile, ExportError> {
    let selected = select_blocks(req.blocks, req.selected_task_id);
    if selected.is_empty() {
        return Err(ExportError::NoBlocks);
    }

    let by_id: HashMap<&str, &Task> = req.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let stamp = format_ics_datetime(now);

    let events: Vec<String> = selected
        .iter()
        .filter_map(|b| match by_id.get(b.task_id.as_str()) {
            Some(task) => Some(vevent(b, task, &stamp)),
            None => {
                tracing::warn!(
                    block_id = %b.id,
                    task_id = %b.task_id,
                    "skipping block for unknown task"
                );
                None
            }
        })
        .collect();
    if events.is_empty() {
        return Err(ExportError::NoValidEvents);
    }

    let header = [
        "BEGIN:VCALENDAR",
        "VERSION:2.0",
        "PRODID:-//CramGuard//Study Planner//EN",
        "CALSCALE:GREGORIAN",
        "METHOD:PUBLISH",
        "X-WR-CALNAME:CramGuard Study Blocks",
    ]
    .join(CRLF);
    let content = format!("{header}{CRLF}{}{CRLF}END:VCALENDAR", events.join(CRLF));

    let day = now.date().format("%Y-%m-%d");
    let filename = match req.selected_task_id {
        Some(id) => {
            let slug = by_id
                .get(id)
                .map(|t| slugify(&t.title))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "task".to_string());
            format!("cramguard-{slug}-{day}.ics")
        }
        None => format!("cramguard-all-blocks-{day}.ics"),
    };

    tracing::debug!(%filename, events = events.len(), "built calendar export");
    Ok(CalendarFile { filename, content })
}

pub fn export_summary(
    blocks: &[Block],
    tasks: &[Task],
    selected_task_id: Option<&str>,
) -> ExportSummary {
    ExportSummary {
        block_count: select_blocks(blocks, selected_task_id).len(),
        task_title: selected_task_id
            .and_then(|id| tasks.iter().find(|t| t.id == id))
            .map(|t| t.title.clone()),
    }
}

fn select_blocks<'a>(blocks: &'a [Block], selected: Option<&str>) -> Vec<&'a Block> {
    blocks
        .iter()
        .filter(|b| selected.is_none_or(|id| b.task_id == id))
        .collect()
}

fn vevent(block: &Block, task: &Task, stamp: &str) -> String {
    let summary = format!("Study: {}", escape_ics(&task.title));
    let description = match task.description.as_deref() {
        Some(d) if !d.is_empty() => escape_ics(&format!("{d}\n\nReason: {}", block.reason)),
        _ => escape_ics(&format!("Reason: {}", block.reason)),
    };

    [
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@cramguard", Uuid::new_v4()),
        format!("DTSTAMP:{stamp}"),
        format!("DTSTART:{}", format_ics_datetime(block.starts_at())),
        format!("DTEND:{}", format_ics_datetime(block.ends_at())),
        format!("SUMMARY:{summary}"),
        format!("DESCRIPTION:{description}"),
        "CATEGORIES:Study,CramGuard".to_string(),
        "STATUS:CONFIRMED".to_string(),
        "BEGIN:VALARM".to_string(),
        "TRIGGER:-PT24H".to_string(),
        "ACTION:DISPLAY".to_string(),
        format!("DESCRIPTION:Reminder: {summary} starts in 24 hours"),
        "END:VALARM".to_string(),
        "BEGIN:VALARM".to_string(),
        "TRIGGER:-PT2H".to_string(),
        "ACTION:DISPLAY".to_string(),
        format!("DESCRIPTION:Reminder: {summary} starts in 2 hours"),
        "END:VALARM".to_string(),
        "END:VEVENT".to_string(),
    ]
    .join(CRLF)
}

fn format_ics_datetime(dt: NaiveDateTime) -> String {
    dt.with_nanosecond(0)
        .unwrap_or(dt)
        .format("%Y%m%dT%H%M%S")
        .to_string()
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn slugify(title: &str) -> String {
    let slug = NON_ALNUM.replace_all(&title.to_lowercase(), "-").into_owned();
    slug.chars().take(SLUG_MAX).collect()
}
