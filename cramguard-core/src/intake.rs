//! Free-text task intake: turn "Math homework due tomorrow at 5pm" into a
//! structured `TaskDraft`.
//!
//! Everything is keyword driven and deterministic for a given clock:
//! - due date: first expression found by the `TemporalResolver`
//! - priority: substring scan, high list before low list
//! - category: substring scan over the category sets in declared order
//! - effort: whole-word scan over the effort tiers in declared order
//! - title: what is left after removing the date span, priority words and
//!   connector words like "due" or "by"

use chrono::{Local, NaiveDateTime};
use regex::Regex;

use crate::error::{IntakeError, RulesError};
use crate::rules::IntakeRules;
use crate::task::{Category, Priority, TaskDraft};
use crate::temporal::{ResolveOptions, RuleBasedResolver, TemporalMatch, TemporalResolver};

const MIN_INPUT_CHARS: usize = 3;
const MIN_TITLE_CHARS: usize = 2;

/// Regex matching any of `words` as whole words, case-insensitively.
///
/// Word boundaries are only required on sides where the word itself starts or
/// ends with a word character, so punctuation keywords like "!" still match.
fn whole_words(words: &[String]) -> Result<Option<Regex>, regex::Error> {
    let mut sorted: Vec<&String> = words.iter().filter(|w| !w.trim().is_empty()).collect();
    if sorted.is_empty() {
        return Ok(None);
    }
    // Longest first so "not urgent" wins over "urgent".
    sorted.sort_by_key(|w| std::cmp::Reverse(w.len()));

    let alternatives: Vec<String> = sorted
        .iter()
        .map(|w| {
            let lead = if w.starts_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            let tail = if w.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            format!("{lead}{}{tail}", regex::escape(w))
        })
        .collect();
    Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))).map(Some)
}

pub struct IntakeParser<R = RuleBasedResolver> {
    rules: IntakeRules,
    resolver: R,
    prefix: Option<Regex>,
    connectors: Option<Regex>,
    priority_words: Option<Regex>,
    effort_tiers: Vec<(u32, Regex)>,
    bangs: Regex,
    spaces: Regex,
    lead_punct: Regex,
    tail_punct: Regex,
}

impl IntakeParser<RuleBasedResolver> {
    /// Parser with the default keyword tables and the built-in resolver.
    pub fn with_defaults() -> Result<Self, RulesError> {
        Self::new(IntakeRules::default(), RuleBasedResolver::new())
    }
}

impl<R: TemporalResolver> IntakeParser<R> {
    pub fn new(rules: IntakeRules, resolver: R) -> Result<Self, RulesError> {
        let prefix = if rules.priority_prefixes.is_empty() {
            None
        } else {
            let alts: Vec<String> =
                rules.priority_prefixes.iter().map(|p| regex::escape(p)).collect();
            Some(
                Regex::new(&format!(r"(?i)^\s*(?:{})\s*", alts.join("|")))
                    .map_err(bad("priority_prefixes"))?,
            )
        };

        let connectors = match whole_words(&rules.connector_words)
            .map_err(bad("connector_words"))?
        {
            Some(re) => Some(
                Regex::new(&format!(r"{}\s*", re.as_str())).map_err(bad("connector_words"))?,
            ),
            None => None,
        };

        let mut all_priority = rules.high_priority_keywords.clone();
        all_priority.extend(rules.low_priority_keywords.iter().cloned());
        let priority_words = whole_words(&all_priority).map_err(bad("priority_keywords"))?;

        let mut effort_tiers = Vec::with_capacity(rules.effort_tiers.len());
        for tier in &rules.effort_tiers {
            if let Some(re) = whole_words(&tier.words).map_err(bad("effort_tiers"))? {
                effort_tiers.push((tier.hours, re));
            }
        }

        Ok(Self {
            rules,
            resolver,
            prefix,
            connectors,
            priority_words,
            effort_tiers,
            bangs: Regex::new(r"!+").map_err(bad("title"))?,
            spaces: Regex::new(r"\s+").map_err(bad("title"))?,
            lead_punct: Regex::new(r"^\s*[,\-:]\s*").map_err(bad("title"))?,
            tail_punct: Regex::new(r"\s*[,\-:]\s*$").map_err(bad("title"))?,
        })
    }

    pub fn rules(&self) -> &IntakeRules {
        &self.rules
    }

    /// Example phrasings to show when a parse fails.
    pub fn example_inputs(&self) -> &[String] {
        &self.rules.examples
    }

    /// Parse against the local wall clock.
    pub fn parse(&self, input: &str) -> Result<TaskDraft, IntakeError> {
        self.parse_at(input, Local::now().naive_local())
    }

    /// Parse with an explicit "now".
    pub fn parse_at(&self, input: &str, now: NaiveDateTime) -> Result<TaskDraft, IntakeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IntakeError::EmptyInput);
        }
        if trimmed.chars().count() < MIN_INPUT_CHARS {
            return Err(IntakeError::InputTooShort);
        }

        let found = self
            .resolver
            .resolve(trimmed, now, ResolveOptions { prefer_future: true })
            .into_iter()
            .next();

        let title = self.extract_title(trimmed, found.as_ref());
        if title.chars().count() < MIN_TITLE_CHARS {
            let example = self
                .rules
                .examples
                .first()
                .cloned()
                .unwrap_or_else(|| "Assignment 4 due Friday".to_string());
            return Err(IntakeError::TitleExtractionFailed { example });
        }

        let priority = self.detect_priority(trimmed);
        let category = self.detect_category(trimmed);
        let effort = self.estimate_effort(trimmed);

        let due = found.as_ref().map(|m| {
            if m.time_certain {
                m.start
            } else {
                m.start.date().and_time(self.rules.default_due_time)
            }
        });

        tracing::debug!(
            %title,
            %priority,
            %category,
            effort,
            due = ?due,
            date_text = ?found.as_ref().map(|m| m.text.as_str()),
            "parsed task input"
        );

        Ok(TaskDraft {
            title,
            due,
            priority,
            category,
            effort,
            original_input: trimmed.to_string(),
            date_text: found.map(|m| m.text),
        })
    }

    pub fn detect_priority(&self, text: &str) -> Priority {
        let lower = text.to_lowercase();
        let hit = |words: &[String]| words.iter().any(|w| lower.contains(&w.to_lowercase()));
        if hit(&self.rules.high_priority_keywords) {
            Priority::High
        } else if hit(&self.rules.low_priority_keywords) {
            Priority::Low
        } else {
            Priority::Medium
        }
    }

    pub fn detect_category(&self, text: &str) -> Category {
        let lower = text.to_lowercase();
        self.rules
            .categories
            .iter()
            .find(|set| set.keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
            .map(|set| set.category)
            .unwrap_or(self.rules.default_category)
    }

    pub fn estimate_effort(&self, text: &str) -> u32 {
        self.effort_tiers
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(hours, _)| *hours)
            .unwrap_or(self.rules.default_effort)
    }

    fn extract_title(&self, text: &str, found: Option<&TemporalMatch>) -> String {
        let mut title = match found {
            Some(m) if m.end() <= text.len() => format!("{}{}", &text[..m.index], &text[m.end()..]),
            _ => text.to_string(),
        };

        if let Some(re) = &self.prefix {
            title = re.replace(&title, "").into_owned();
        }
        if let Some(re) = &self.connectors {
            title = re.replace_all(&title, "").into_owned();
        }
        if let Some(re) = &self.priority_words {
            title = re.replace_all(&title, "").into_owned();
        }

        title = self.bangs.replace_all(&title, "").into_owned();
        title = self.spaces.replace_all(&title, " ").into_owned();
        title = self.lead_punct.replace(&title, "").into_owned();
        title = self.tail_punct.replace(&title, "").into_owned();

        capitalize(title.trim())
    }
}

fn bad(key: &'static str) -> impl Fn(regex::Error) -> RulesError {
    move |e| RulesError::invalid(key, e.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
