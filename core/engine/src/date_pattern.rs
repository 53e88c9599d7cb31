//! FILENAME: core/engine/src/date_pattern.rs
//! PURPOSE: Tokenizer and renderer for the date patterns stored in theme date formats.
//! CONTEXT: Themes map each granularity to a pattern such as `d MMM`, `MMM yy` or
//! `eee HH:mm`. The pattern letters follow the Unicode/date-fns convention: runs of
//! the same letter form one field, text inside single quotes is literal and `''`
//! is an escaped quote. Patterns are parsed once (config validation) and rendered
//! per value.

use chrono::{Datelike, Timelike};

use crate::error::{EngineError, EngineResult};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A parsed field from a date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    /// `y`, `yyyy`: full year
    Year,
    /// `yy`: two digit year
    Year2,
    /// `Q`: quarter number
    Quarter,
    /// `QQ`: zero padded quarter
    Quarter2,
    /// `QQQ`: `Q1`
    QuarterShort,
    /// `QQQQ`: `1st quarter`
    QuarterLong,
    /// `M`
    Month1,
    /// `MM`
    Month2,
    /// `MMM`: `Jan`
    MonthName3,
    /// `MMMM`: `January`
    MonthName4,
    /// `MMMMM`: `J`
    MonthName1,
    /// `d`
    Day1,
    /// `dd`
    Day2,
    /// `do`: `1st`
    DayOrdinal,
    /// `E`, `EE`, `EEE`, `eee`: `Mon`
    DayName3,
    /// `EEEE`, `eeee`: `Monday`
    DayName4,
    /// `EEEEE`, `eeeee`: `M`
    DayName1,
    /// `e`: local day of week, Sunday = 1
    DayOfWeek,
    /// `H`
    Hour24_1,
    /// `HH`
    Hour24_2,
    /// `h`
    Hour12_1,
    /// `hh`
    Hour12_2,
    /// `m`
    Minute1,
    /// `mm`
    Minute2,
    /// `s`
    Second1,
    /// `ss`
    Second2,
    /// `S`..`SSSSSSSSS`: fraction of second, n digits
    Fraction(u8),
    /// `a`, `aa`: `AM`
    AmPmUpper,
    /// `aaa`: `am`
    AmPmLower,
    Literal(String),
}

/// A fully parsed date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    pub tokens: Vec<PatternToken>,
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse a date pattern into tokens. Unknown pattern letters are rejected.
pub fn parse_date_pattern(pattern: &str) -> EngineResult<DatePattern> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens: Vec<PatternToken> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is a literal quote, otherwise read until the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                push_literal(&mut tokens, "'");
                i += 2;
                continue;
            }
            let mut text = String::new();
            let mut j = i + 1;
            let mut closed = false;
            while j < chars.len() {
                if chars[j] == '\'' {
                    if chars.get(j + 1) == Some(&'\'') {
                        text.push('\'');
                        j += 2;
                        continue;
                    }
                    closed = true;
                    break;
                }
                text.push(chars[j]);
                j += 1;
            }
            if !closed {
                return Err(EngineError::InvalidConfig(format!(
                    "unterminated quote in date pattern '{}'",
                    pattern
                )));
            }
            push_literal(&mut tokens, &text);
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut tokens, &c.to_string());
            i += 1;
            continue;
        }

        let run = count_run(&chars, i, c);

        // `do` is the only two-letter field
        if c == 'd' && run == 1 && chars.get(i + 1) == Some(&'o') {
            tokens.push(PatternToken::DayOrdinal);
            i += 2;
            continue;
        }

        tokens.push(field_token(c, run).ok_or_else(|| {
            EngineError::InvalidConfig(format!(
                "unsupported field '{}' in date pattern '{}'",
                c.to_string().repeat(run),
                pattern
            ))
        })?);
        i += run;
    }

    Ok(DatePattern { tokens })
}

fn count_run(chars: &[char], start: usize, target: char) -> usize {
    chars[start..].iter().take_while(|&&c| c == target).count()
}

fn push_literal(tokens: &mut Vec<PatternToken>, text: &str) {
    if let Some(PatternToken::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(PatternToken::Literal(text.to_string()));
    }
}

fn field_token(c: char, run: usize) -> Option<PatternToken> {
    use PatternToken::*;
    let token = match (c, run) {
        ('y', 2) => Year2,
        ('y', _) => Year,
        ('Q', 1) => Quarter,
        ('Q', 2) => Quarter2,
        ('Q', 3) => QuarterShort,
        ('Q', 4) => QuarterLong,
        ('M', 1) => Month1,
        ('M', 2) => Month2,
        ('M', 3) => MonthName3,
        ('M', 4) => MonthName4,
        ('M', 5) => MonthName1,
        ('d', 1) => Day1,
        ('d', 2) => Day2,
        ('E', 1..=3) => DayName3,
        ('E', 4) => DayName4,
        ('E', 5) => DayName1,
        ('e', 1) => DayOfWeek,
        ('e', 3) => DayName3,
        ('e', 4) => DayName4,
        ('e', 5) => DayName1,
        ('H', 1) => Hour24_1,
        ('H', 2) => Hour24_2,
        ('h', 1) => Hour12_1,
        ('h', 2) => Hour12_2,
        ('m', 1) => Minute1,
        ('m', 2) => Minute2,
        ('s', 1) => Second1,
        ('s', 2) => Second2,
        ('S', n @ 1..=9) => Fraction(n as u8),
        ('a', 1..=2) => AmPmUpper,
        ('a', 3) => AmPmLower,
        _ => return None,
    };
    Some(token)
}

// ============================================================================
// RENDERING
// ============================================================================

impl DatePattern {
    /// Render a date/time value with this pattern.
    pub fn render<T: Datelike + Timelike>(&self, value: &T) -> String {
        use PatternToken::*;
        let mut out = String::new();

        for token in &self.tokens {
            match token {
                Year => out.push_str(&value.year().to_string()),
                Year2 => out.push_str(&format!("{:02}", value.year().rem_euclid(100))),
                Quarter => out.push_str(&quarter_of(value.month()).to_string()),
                Quarter2 => out.push_str(&format!("{:02}", quarter_of(value.month()))),
                QuarterShort => out.push_str(&format!("Q{}", quarter_of(value.month()))),
                QuarterLong => {
                    out.push_str(&format!("{} quarter", ordinal(quarter_of(value.month()))))
                }
                Month1 => out.push_str(&value.month().to_string()),
                Month2 => out.push_str(&format!("{:02}", value.month())),
                MonthName3 => out.push_str(&month_name_full(value.month())[..3]),
                MonthName4 => out.push_str(month_name_full(value.month())),
                MonthName1 => out.push_str(&month_name_full(value.month())[..1]),
                Day1 => out.push_str(&value.day().to_string()),
                Day2 => out.push_str(&format!("{:02}", value.day())),
                DayOrdinal => out.push_str(&ordinal(value.day())),
                DayName3 => out.push_str(&day_name_full(value.weekday())[..3]),
                DayName4 => out.push_str(day_name_full(value.weekday())),
                DayName1 => out.push_str(&day_name_full(value.weekday())[..1]),
                DayOfWeek => out.push_str(&value.weekday().number_from_sunday().to_string()),
                Hour24_1 => out.push_str(&value.hour().to_string()),
                Hour24_2 => out.push_str(&format!("{:02}", value.hour())),
                Hour12_1 => out.push_str(&value.hour12().1.to_string()),
                Hour12_2 => out.push_str(&format!("{:02}", value.hour12().1)),
                Minute1 => out.push_str(&value.minute().to_string()),
                Minute2 => out.push_str(&format!("{:02}", value.minute())),
                Second1 => out.push_str(&value.second().to_string()),
                Second2 => out.push_str(&format!("{:02}", value.second())),
                Fraction(n) => {
                    let nanos = format!("{:09}", value.nanosecond() % 1_000_000_000);
                    out.push_str(&nanos[..*n as usize]);
                }
                AmPmUpper => out.push_str(if value.hour12().0 { "PM" } else { "AM" }),
                AmPmLower => out.push_str(if value.hour12().0 { "pm" } else { "am" }),
                Literal(text) => out.push_str(text),
            }
        }

        out
    }
}

/// Parse `pattern` and render `value` with it.
pub fn format_date<T: Datelike + Timelike>(value: &T, pattern: &str) -> EngineResult<String> {
    Ok(parse_date_pattern(pattern)?.render(value))
}

fn quarter_of(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

pub(crate) fn month_name_full(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

fn day_name_full(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}
