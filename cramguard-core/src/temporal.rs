//! Temporal expression resolution: find phrases like "tomorrow at 5pm" or
//! "Nov 30th" in free text and turn them into concrete local datetimes.
//!
//! The intake parser only depends on the `TemporalResolver` trait. The
//! built-in `RuleBasedResolver` is deterministic and regex driven:
//! 1) scan for date pieces and time pieces independently
//! 2) drop overlapping pieces (earliest, then longest wins)
//! 3) merge a date with an adjacent time ("Friday 2pm", "5pm on Friday")
//! 4) roll results forward when future interpretations are preferred

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Prefer the upcoming interpretation ("Friday" = next Friday, never a past one).
    pub prefer_future: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { prefer_future: true }
    }
}

/// One recognized temporal expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalMatch {
    /// Matched substring, exactly as it appears in the input.
    pub text: String,
    /// Byte offset of `text` in the input.
    pub index: usize,
    pub start: NaiveDateTime,
    /// False when the expression named a day but no time-of-day.
    pub time_certain: bool,
}

impl TemporalMatch {
    pub fn end(&self) -> usize {
        self.index + self.text.len()
    }
}

pub trait TemporalResolver {
    /// All expressions found in `text`, ordered by position, non-overlapping.
    fn resolve(
        &self,
        text: &str,
        reference: NaiveDateTime,
        opts: ResolveOptions,
    ) -> Vec<TemporalMatch>;
}

const MONTH: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const FULL_MONTH: &str = r"january|february|march|april|june|july|august|september|october|november|december";

/// How a resolved piece moves forward when it lands in the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Roll {
    Fixed,
    Day,
    Week,
    Year,
}

#[derive(Debug, Clone, Copy)]
enum PieceKind {
    Date { date: NaiveDate, roll: Roll },
    Time(NaiveTime),
    Instant(NaiveDateTime),
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    kind: PieceKind,
}

/// Regex-based resolver covering the phrasings people type into a quick-add box.
#[derive(Debug, Clone)]
pub struct RuleBasedResolver {
    relative_day: Regex,
    weekday: Regex,
    next_unit: Regex,
    offset: Regex,
    month_first: Regex,
    day_first: Regex,
    iso: Regex,
    numeric: Regex,
    time: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in temporal pattern must compile")
}

impl Default for RuleBasedResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedResolver {
    pub fn new() -> Self {
        Self {
            relative_day: compile(
                r"(?i)\b(?P<word>(?:the\s+)?day\s+after\s+tomorrow|today|tonight|tomorrow|tmrw|tmr)\b",
            ),
            weekday: compile(
                r"(?i)\b(?:(?P<qual>next|this|coming)\s+)?(?P<day>monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sunday|weekend)\b",
            ),
            next_unit: compile(r"(?i)\bnext\s+(?P<unit>week|month|year)\b"),
            offset: compile(
                r"(?i)\bin\s+(?P<n>\d{1,3}|an?|one|two|three|four|five|six|seven|eight|nine|ten|a\s+couple\s+of|couple\s+of|a\s+few|few)\s+(?P<unit>minutes?|mins?|hours?|hrs?|days?|weeks?|months?)\b",
            ),
            month_first: compile(&format!(
                r"(?i)\b(?P<month>{MONTH})\.?\s+(?P<day>\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(?P<year>\d{{4}})\b)?"
            )),
            day_first: compile(&format!(
                r"(?i)\b(?:(?P<oday>\d{{1,2}})(?:st|nd|rd|th)\s+(?:of\s+)?(?P<omonth>{MONTH})|(?P<day>\d{{1,2}})\s+(?:of\s+)?(?P<month>{FULL_MONTH}))\b(?:,?\s+(?P<year>\d{{4}})\b)?"
            )),
            iso: compile(r"\b(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})\b"),
            numeric: compile(r"\b(?P<m>\d{1,2})/(?P<d>\d{1,2})(?:/(?P<y>\d{4}|\d{2}))?\b"),
            time: compile(
                r"(?i)(?:(?:\bat|@)\s*)?(?:\b(?P<h12>1[0-2]|0?[1-9])(?::(?P<m12>[0-5]\d))?\s*(?P<ampm>[ap])\.?m\b\.?|\b(?P<h24>[01]?\d|2[0-3]):(?P<m24>[0-5]\d)\b|\b(?P<word>noon|midnight)\b)",
            ),
        }
    }

    fn scan(&self, text: &str, reference: NaiveDateTime) -> Vec<Piece> {
        let today = reference.date();
        let mut pieces = Vec::new();

        for caps in self.relative_day.captures_iter(text) {
            let word = caps["word"].to_lowercase();
            let days = if word.ends_with("after tomorrow") {
                2
            } else if word.starts_with("to") && word != "tomorrow" {
                0
            } else {
                1
            };
            push_date(&mut pieces, &caps, today + Duration::days(days), Roll::Fixed);
        }

        for caps in self.weekday.captures_iter(text) {
            let day = caps["day"].to_lowercase();
            let target = match weekday_from(&day) {
                Some(w) => w,
                None => continue,
            };
            let qual = caps.name("qual").map(|m| m.as_str().to_lowercase());
            let date = match qual.as_deref() {
                Some("next") => next_weekday(today, target),
                _ => upcoming_weekday(today, target),
            };
            push_date(&mut pieces, &caps, date, Roll::Week);
        }

        for caps in self.next_unit.captures_iter(text) {
            let date = match caps["unit"].to_lowercase().as_str() {
                "week" => Some(today + Duration::days(7)),
                "month" => today.checked_add_months(Months::new(1)),
                _ => today.checked_add_months(Months::new(12)),
            };
            if let Some(date) = date {
                push_date(&mut pieces, &caps, date, Roll::Fixed);
            }
        }

        for caps in self.offset.captures_iter(text) {
            let Some(n) = amount_from(&caps["n"]) else { continue };
            let unit = caps["unit"].to_lowercase();
            let whole = caps.get(0).map(|m| (m.start(), m.end()));
            let Some((start, end)) = whole else { continue };
            let kind = if unit.starts_with("min") {
                PieceKind::Instant(reference + Duration::minutes(n))
            } else if unit.starts_with('h') {
                PieceKind::Instant(reference + Duration::hours(n))
            } else if unit.starts_with('d') {
                PieceKind::Date { date: today + Duration::days(n), roll: Roll::Fixed }
            } else if unit.starts_with('w') {
                PieceKind::Date { date: today + Duration::weeks(n), roll: Roll::Fixed }
            } else {
                match u32::try_from(n).ok().and_then(|m| today.checked_add_months(Months::new(m))) {
                    Some(date) => PieceKind::Date { date, roll: Roll::Fixed },
                    None => continue,
                }
            };
            pieces.push(Piece { start, end, kind });
        }

        for caps in self.month_first.captures_iter(text) {
            let month = month_from(&caps["month"]);
            let day = caps["day"].parse::<u32>().ok();
            if let (Some(month), Some(day)) = (month, day) {
                push_calendar_date(&mut pieces, &caps, today, caps.name("year"), month, day);
            }
        }

        for caps in self.day_first.captures_iter(text) {
            let month = caps
                .name("omonth")
                .or_else(|| caps.name("month"))
                .and_then(|m| month_from(m.as_str()));
            let day = caps
                .name("oday")
                .or_else(|| caps.name("day"))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            if let (Some(month), Some(day)) = (month, day) {
                push_calendar_date(&mut pieces, &caps, today, caps.name("year"), month, day);
            }
        }

        for caps in self.iso.captures_iter(text) {
            let parsed = (
                caps["y"].parse::<i32>(),
                caps["m"].parse::<u32>(),
                caps["d"].parse::<u32>(),
            );
            if let (Ok(y), Ok(m), Ok(d)) = parsed {
                if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                    push_date(&mut pieces, &caps, date, Roll::Fixed);
                }
            }
        }

        for caps in self.numeric.captures_iter(text) {
            let month = caps["m"].parse::<u32>().ok();
            let day = caps["d"].parse::<u32>().ok();
            if let (Some(month), Some(day)) = (month, day) {
                push_calendar_date(&mut pieces, &caps, today, caps.name("y"), month, day);
            }
        }

        for caps in self.time.captures_iter(text) {
            let Some(time) = time_from(&caps) else { continue };
            if let Some(m) = caps.get(0) {
                pieces.push(Piece {
                    start: m.start(),
                    end: m.end(),
                    kind: PieceKind::Time(time),
                });
            }
        }

        pieces.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then((b.end - b.start).cmp(&(a.end - a.start)))
        });
        let mut kept: Vec<Piece> = Vec::with_capacity(pieces.len());
        for p in pieces {
            if kept.last().is_some_and(|last| p.start < last.end) {
                continue;
            }
            kept.push(p);
        }
        kept
    }
}

impl TemporalResolver for RuleBasedResolver {
    fn resolve(
        &self,
        text: &str,
        reference: NaiveDateTime,
        opts: ResolveOptions,
    ) -> Vec<TemporalMatch> {
        let pieces = self.scan(text, reference);
        let mut out = Vec::new();

        let mut i = 0;
        while i < pieces.len() {
            let piece = pieces[i];
            let next = pieces.get(i + 1).copied();

            let merged = match (piece.kind, next.map(|n| n.kind)) {
                (PieceKind::Date { date, roll }, Some(PieceKind::Time(time)))
                    if joinable(&text[piece.end..next.map_or(piece.end, |n| n.start)], false) =>
                {
                    Some((date.and_time(time), roll, true))
                }
                (PieceKind::Time(time), Some(PieceKind::Date { date, roll }))
                    if joinable(&text[piece.end..next.map_or(piece.end, |n| n.start)], true) =>
                {
                    Some((date.and_time(time), roll, true))
                }
                _ => None,
            };

            let (start, end, at, roll, certain) = match (merged, next) {
                (Some((at, roll, certain)), Some(n)) => {
                    i += 2;
                    (piece.start, n.end, at, roll, certain)
                }
                _ => {
                    i += 1;
                    let (at, roll, certain) = match piece.kind {
                        PieceKind::Date { date, roll } => {
                            (date.and_time(implied_noon()), roll, false)
                        }
                        PieceKind::Time(time) => (reference.date().and_time(time), Roll::Day, true),
                        PieceKind::Instant(at) => (at, Roll::Fixed, true),
                    };
                    (piece.start, piece.end, at, roll, certain)
                }
            };

            let at = if opts.prefer_future {
                roll_forward(at, roll, certain, reference)
            } else {
                at
            };

            out.push(TemporalMatch {
                text: text[start..end].to_string(),
                index: start,
                start: at,
                time_certain: certain,
            });
        }

        out
    }
}

fn push_date(pieces: &mut Vec<Piece>, caps: &Captures<'_>, date: NaiveDate, roll: Roll) {
    if let Some(m) = caps.get(0) {
        pieces.push(Piece {
            start: m.start(),
            end: m.end(),
            kind: PieceKind::Date { date, roll },
        });
    }
}

fn push_calendar_date(
    pieces: &mut Vec<Piece>,
    caps: &Captures<'_>,
    today: NaiveDate,
    year: Option<regex::Match<'_>>,
    month: u32,
    day: u32,
) {
    let (year, roll) = match year.and_then(|y| y.as_str().parse::<i32>().ok()) {
        Some(y) if y < 100 => (2000 + y, Roll::Fixed),
        Some(y) => (y, Roll::Fixed),
        None => (today.year(), Roll::Year),
    };
    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
        push_date(pieces, caps, date, roll);
    }
}

/// Text allowed between a date and a time for them to read as one expression.
fn joinable(gap: &str, allow_on: bool) -> bool {
    let trimmed = gap.trim_matches(|c: char| c == ',' || c.is_whitespace());
    trimmed.is_empty() || (allow_on && trimmed.eq_ignore_ascii_case("on"))
}

fn roll_forward(
    at: NaiveDateTime,
    roll: Roll,
    certain: bool,
    reference: NaiveDateTime,
) -> NaiveDateTime {
    let passed = if certain {
        at <= reference
    } else {
        at.date() < reference.date()
    };
    if !passed {
        return at;
    }
    match roll {
        // Named days and explicit dates are never moved, even when already past.
        Roll::Fixed => at,
        Roll::Day => at + Duration::days(1),
        Roll::Week => at + Duration::days(7),
        Roll::Year => at.with_year(at.year() + 1).unwrap_or(at),
    }
}

fn implied_noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn weekday_from(s: &str) -> Option<Weekday> {
    let w = match s {
        "weekend" => Weekday::Sat,
        _ if s.starts_with("mon") => Weekday::Mon,
        _ if s.starts_with("tu") => Weekday::Tue,
        _ if s.starts_with("wed") => Weekday::Wed,
        _ if s.starts_with("th") => Weekday::Thu,
        _ if s.starts_with("fri") => Weekday::Fri,
        _ if s.starts_with("sat") => Weekday::Sat,
        _ if s.starts_with("sun") => Weekday::Sun,
        _ => return None,
    };
    Some(w)
}

/// Days from `from` forward to the next `to`, 0 when they match.
fn days_between(from: Weekday, to: Weekday) -> i64 {
    (7 + i64::from(to.num_days_from_monday()) - i64::from(from.num_days_from_monday())) % 7
}

/// The next occurrence of `target`, counting today.
fn upcoming_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let ahead = days_between(today.weekday(), target);
    today + Duration::days(ahead)
}

/// "next <weekday>": the first occurrence after today that is not in the current week.
fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let mut ahead = days_between(today.weekday(), target);
    if ahead == 0 {
        ahead = 7;
    }
    if ahead + (today.weekday().num_days_from_monday() as i64) < 7 {
        ahead += 7;
    }
    today + Duration::days(ahead)
}

fn month_from(s: &str) -> Option<u32> {
    let key: String = s.to_lowercase().chars().take(3).collect();
    let m = match key.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

fn amount_from(s: &str) -> Option<i64> {
    let s = s.to_lowercase();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    let words: Vec<&str> = s.split_whitespace().collect();
    let n = match words.as_slice() {
        ["a"] | ["an"] | ["one"] => 1,
        ["two"] => 2,
        ["three"] => 3,
        ["four"] => 4,
        ["five"] => 5,
        ["six"] => 6,
        ["seven"] => 7,
        ["eight"] => 8,
        ["nine"] => 9,
        ["ten"] => 10,
        [.., "couple", "of"] => 2,
        [.., "few"] => 3,
        _ => return None,
    };
    Some(n)
}

fn time_from(caps: &Captures<'_>) -> Option<NaiveTime> {
    if let Some(h) = caps.name("h12") {
        let hour: u32 = h.as_str().parse().ok()?;
        let minute: u32 = caps.name("m12").map_or(Some(0), |m| m.as_str().parse().ok())?;
        let pm = caps
            .name("ampm")
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("p"));
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    if let Some(h) = caps.name("h24") {
        let hour: u32 = h.as_str().parse().ok()?;
        let minute: u32 = caps.name("m24")?.as_str().parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    match caps.name("word")?.as_str().to_lowercase().as_str() {
        "noon" => NaiveTime::from_hms_opt(12, 0, 0),
        _ => Some(NaiveTime::MIN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday 2026-03-04, 10:00.
    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 4)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn first(text: &str) -> TemporalMatch {
        RuleBasedResolver::new()
            .resolve(text, reference(), ResolveOptions::default())
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no match in {text:?}"))
    }

    #[test]
    fn test_tomorrow_with_time_is_one_match() {
        let m = first("Math homework due tomorrow at 5pm");
        assert_eq!(m.text, "tomorrow at 5pm");
        assert_eq!(m.start, at(2026, 3, 5, 17, 0));
        assert!(m.time_certain);
        assert_eq!(&"Math homework due tomorrow at 5pm"[m.index..m.end()], m.text);
    }

    #[test]
    fn test_weekday_with_time() {
        let m = first("Urgent: Final project presentation Friday 2pm");
        assert_eq!(m.text, "Friday 2pm");
        assert_eq!(m.start, at(2026, 3, 6, 14, 0));
    }

    #[test]
    fn test_time_before_weekday() {
        let m = first("submit lab 5pm on Friday");
        assert_eq!(m.text, "5pm on Friday");
        assert_eq!(m.start, at(2026, 3, 6, 17, 0));
    }

    #[test]
    fn test_same_weekday_in_the_past_rolls_a_week() {
        let m = first("standup Wednesday 9am");
        assert_eq!(m.start, at(2026, 3, 11, 9, 0));
    }

    #[test]
    fn test_next_weekday_skips_current_week() {
        assert_eq!(
            first("next Friday").start.date(),
            NaiveDate::from_ymd_opt(2026, 3, 13).unwrap()
        );
        let m = first("Study for midterm exam next Monday");
        assert_eq!(m.text, "next Monday");
        assert_eq!(m.start.date(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert!(!m.time_certain);
    }

    #[test]
    fn test_month_name_date_with_time() {
        let m = first("CS assignment due November 30th 11:59pm");
        assert_eq!(m.text, "November 30th 11:59pm");
        assert_eq!(m.start, at(2026, 11, 30, 23, 59));
    }

    #[test]
    fn test_past_month_date_rolls_to_next_year() {
        assert_eq!(first("essay Jan 5").start.date(), NaiveDate::from_ymd_opt(2027, 1, 5).unwrap());
        assert_eq!(
            first("essay 5th of January").start.date(),
            NaiveDate::from_ymd_opt(2027, 1, 5).unwrap()
        );
        assert_eq!(
            first("essay Jan 5, 2026").start.date(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_bare_time_rolls_to_tomorrow_once_passed() {
        assert_eq!(first("call mom at 8am").start, at(2026, 3, 5, 8, 0));
        assert_eq!(first("call mom at 8pm").start, at(2026, 3, 4, 20, 0));
    }

    #[test]
    fn test_relative_offsets() {
        let m = first("review notes in 3 days");
        assert_eq!(m.start.date(), NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        assert!(!m.time_certain);

        let m = first("ping client in two hours");
        assert_eq!(m.start, at(2026, 3, 4, 12, 0));
        assert!(m.time_certain);

        assert_eq!(
            first("paper next week").start.date(),
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
        );
    }

    #[test]
    fn test_numeric_dates() {
        let m = first("report 2026-04-01 17:00");
        assert_eq!(m.text, "2026-04-01 17:00");
        assert_eq!(m.start, at(2026, 4, 1, 17, 0));

        assert_eq!(
            first("quiz 3/20").start.date(),
            NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
        );
    }

    #[test]
    fn test_no_temporal_expression() {
        let r = RuleBasedResolver::new();
        assert!(r.resolve("clean up notes", reference(), ResolveOptions::default()).is_empty());
        let m = r.resolve("Assignment 4 may be long", reference(), ResolveOptions::default());
        assert!(m.is_empty());
    }

    #[test]
    fn test_without_future_preference_keeps_past_weekday_time() {
        let r = RuleBasedResolver::new();
        let m = r.resolve("Wednesday 9am", reference(), ResolveOptions { prefer_future: false });
        assert_eq!(m[0].start, at(2026, 3, 4, 9, 0));
    }

    #[test]
    fn test_multiple_matches_are_ordered() {
        let r = RuleBasedResolver::new();
        let text = "draft Monday, final Friday at noon";
        let m = r.resolve(text, reference(), ResolveOptions::default());
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].text, "Monday");
        assert_eq!(m[1].text, "Friday at noon");
        assert_eq!(m[1].start, at(2026, 3, 6, 12, 0));
    }
}
