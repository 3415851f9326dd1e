//! cramguard-core: deadline-aware study planning.
//!
//! Free-text intake, commit-block suggestions, swaps, the planner board and
//! calendar export. No I/O; the clock and randomness are passed in.

pub mod board;
pub mod error;
pub mod ics;
pub mod intake;
pub mod random;
pub mod rules;
pub mod suggest;
pub mod swap;
pub mod task;
pub mod temporal;
pub mod time;

pub use board::PlannerBoard;
pub use error::{BoardError, ExportError, IntakeError, PlanError, RulesError, TimeError};
pub use ics::{CalendarFile, ExportRequest, ExportSummary, export_ics, export_summary};
pub use intake::IntakeParser;
pub use random::{RandomSource, ScriptedRandom, StdRandom};
pub use rules::{IntakeRules, MAX_WINDOW_DAYS, PreferredTimes, SuggestionRules};
pub use suggest::{BlockSuggestionEngine, CandidateWindow, DEFAULT_COUNT, MAX_COUNT};
pub use swap::resolve_swap;
pub use task::{Block, Category, Priority, Task, TaskDraft};
pub use temporal::{ResolveOptions, RuleBasedResolver, TemporalMatch, TemporalResolver};
pub use time::{is_quiet_time, local_now, parse_local_datetime, parse_timezone};
