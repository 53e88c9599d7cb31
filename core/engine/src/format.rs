//! FILENAME: core/engine/src/format.rs
//! PURPOSE: Converts raw cell values into display strings for charts and tables.
//! CONTEXT: Every component formats its labels, tooltips and table cells through
//! `format_value`. Formatting is dispatched on the declared value type, never on
//! what the raw string happens to look like. Exactly one branch applies per call,
//! in this order: number, date, truncate, date pattern, passthrough.
//!
//! Number rendering follows en-US conventions: `,` grouping, `.` decimals, and
//! compact short notation (`1.5K`, `2.3M`) when abbreviation is requested.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use crate::cell::{parse_float_prefix, CellValue};
use crate::date_pattern::parse_date_pattern;
use crate::log_warn;
use crate::timezone::{to_zoned_date, ZoneOffset};

/// What a date renders as when its string cannot be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

/// Sentinel marking a value as a pure date rather than a timestamp.
const MIDNIGHT_SUFFIX: &str = "T00:00:00.000";

// ============================================================================
// OPTIONS
// ============================================================================

/// The declared semantic type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Date,
    String,
}

/// Text wrapped around every formatted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatMeta {
    pub pretext: Option<String>,
    pub posttext: Option<String>,
}

/// Formatting options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatOptions {
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
    /// Decimal places. `None` means the default precision policy.
    pub dps: Option<u8>,
    pub abbreviate_long_numbers: bool,
    /// Pre-resolved date pattern; the caller maps granularity to pattern.
    pub date_format: Option<String>,
    pub meta: Option<FormatMeta>,
    /// Maximum length (in characters) before the value is cut and ellipsized.
    pub truncate: Option<usize>,
    /// Zone that zoned timestamps are shown in. Defaults to UTC.
    pub time_zone: Option<ZoneOffset>,
}

impl FormatOptions {
    pub fn of_type(value_type: ValueType) -> Self {
        FormatOptions {
            value_type: Some(value_type),
            ..Default::default()
        }
    }

    pub fn number() -> Self {
        Self::of_type(ValueType::Number)
    }

    pub fn date() -> Self {
        Self::of_type(ValueType::Date)
    }

    pub fn with_dps(mut self, dps: u8) -> Self {
        self.dps = Some(dps);
        self
    }

    pub fn abbreviated(mut self) -> Self {
        self.abbreviate_long_numbers = true;
        self
    }

    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = Some(pattern.into());
        self
    }

    pub fn with_meta(mut self, pretext: Option<&str>, posttext: Option<&str>) -> Self {
        self.meta = Some(FormatMeta {
            pretext: pretext.map(str::to_string),
            posttext: posttext.map(str::to_string),
        });
        self
    }

    pub fn truncated(mut self, max_len: usize) -> Self {
        self.truncate = Some(max_len);
        self
    }

    pub fn in_zone(mut self, zone: ZoneOffset) -> Self {
        self.time_zone = Some(zone);
        self
    }

    fn pretext(&self) -> &str {
        self.meta.as_ref().and_then(|m| m.pretext.as_deref()).unwrap_or("")
    }

    fn posttext(&self) -> &str {
        self.meta.as_ref().and_then(|m| m.posttext.as_deref()).unwrap_or("")
    }

    fn wrap(&self, v: &str) -> String {
        format!("{}{}{}", self.pretext(), v, self.posttext())
    }
}

/// Either a bare value type or full options; resolved once before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatSpec {
    Shorthand(ValueType),
    Full(FormatOptions),
}

impl FormatSpec {
    pub fn resolve(self) -> FormatOptions {
        match self {
            FormatSpec::Shorthand(value_type) => FormatOptions::of_type(value_type),
            FormatSpec::Full(options) => options,
        }
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        FormatSpec::Shorthand(ValueType::String)
    }
}

impl From<ValueType> for FormatSpec {
    fn from(value_type: ValueType) -> Self {
        FormatSpec::Shorthand(value_type)
    }
}

impl From<FormatOptions> for FormatSpec {
    fn from(options: FormatOptions) -> Self {
        FormatSpec::Full(options)
    }
}

impl From<&FormatOptions> for FormatSpec {
    fn from(options: &FormatOptions) -> Self {
        FormatSpec::Full(options.clone())
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Format a raw value. `None` in gives `None` out.
pub fn format_value(raw: Option<&str>, spec: impl Into<FormatSpec>) -> Option<String> {
    let options = spec.into().resolve();
    format_with(raw, &options)
}

/// Format a row cell. Null cells stay `None`.
pub fn format_cell(cell: &CellValue, spec: impl Into<FormatSpec>) -> Option<String> {
    let raw = cell.as_raw();
    format_value(raw.as_deref(), spec)
}

/// Format a raw value with already-resolved options.
pub fn format_with(raw: Option<&str>, options: &FormatOptions) -> Option<String> {
    let raw = raw?;

    match options.value_type {
        Some(ValueType::Number) => return Some(format_number_value(raw, options)),
        Some(ValueType::Date) => return Some(options.wrap(&format_date_value(raw, options))),
        _ => {}
    }

    if let Some(max_len) = options.truncate.filter(|n| *n > 0) {
        if raw.chars().count() > max_len {
            let head: String = raw.chars().take(max_len).collect();
            return Some(format!("{}{}...", options.pretext(), head));
        }
        return Some(options.wrap(raw));
    }

    if let Some(pattern) = options.date_format.as_deref() {
        if !raw.is_empty() {
            return Some(options.wrap(&format_with_pattern(raw, pattern, options.time_zone)));
        }
    }

    Some(raw.to_string())
}

// ============================================================================
// NUMBERS
// ============================================================================

fn format_number_value(raw: &str, options: &FormatOptions) -> String {
    let num = match parse_float_prefix(raw) {
        Some(n) => n,
        None => return options.wrap(raw),
    };

    if !num.is_finite() {
        let inf = if num < 0.0 { "-∞" } else { "∞" };
        return options.wrap(inf);
    }

    let is_integer = num.fract() == 0.0;

    let text = if options.abbreviate_long_numbers {
        format_compact(num, options.dps)
    } else if let Some(dps) = options.dps {
        if is_integer {
            format_grouped(num, 0)
        } else {
            format_grouped(num, dps as usize)
        }
    } else if is_integer {
        format_grouped(num, 0)
    } else {
        trim_fraction(&format_grouped(num, 3))
    };

    options.wrap(&text)
}

/// Fixed decimals with thousands grouping.
pub fn format_grouped(value: f64, decimal_places: usize) -> String {
    let magnitude = round_half_expand(value.abs(), decimal_places);
    let grouped = add_thousands_separator(&magnitude);
    if value < 0.0 && magnitude.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// en-US compact short notation. `max_fraction` overrides the default rounding
/// (keep integer digits when there are two or more, else two significant digits).
pub fn format_compact(value: f64, max_fraction: Option<u8>) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    let abs = value.abs();
    let mut unit_index = UNITS.iter().position(|(size, _)| abs >= *size);

    let mut digits = loop {
        let divisor = unit_index.map(|i| UNITS[i].0).unwrap_or(1.0);
        let scaled = abs / divisor;
        let places = match max_fraction {
            Some(places) => places as usize,
            None => compact_fraction_digits(scaled),
        };
        let rounded = trim_fraction(&round_half_expand(scaled, places));

        // 999.95K rounds to 1000K, which must be shown as 1M
        let next_unit = match unit_index {
            Some(0) => None,
            Some(i) => Some(i - 1),
            None => Some(UNITS.len() - 1),
        };
        match (next_unit, rounded.parse::<f64>()) {
            (Some(next), Ok(r)) if r >= 1000.0 => unit_index = Some(next),
            _ => break rounded,
        }
    };

    digits = add_thousands_separator(&digits);
    let suffix = unit_index.map(|i| UNITS[i].1).unwrap_or("");
    let sign = if value < 0.0 && digits.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    format!("{}{}{}", sign, digits, suffix)
}

fn compact_fraction_digits(scaled: f64) -> usize {
    if scaled == 0.0 {
        return 0;
    }
    let integer_digits = scaled.log10().floor() as i32 + 1;
    (2 - integer_digits).max(0) as usize
}

/// Rounds a non-negative value to `places` decimals, ties away from zero.
fn round_half_expand(value: f64, places: usize) -> String {
    const GUARD: usize = 20;
    let wide = format!("{:.*}", places + GUARD, value);
    let (head, tail) = wide.split_at(wide.len() - GUARD);
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');

    if is_tie {
        increment_last_digit(head.trim_end_matches('.'))
    } else {
        format!("{:.*}", places, value)
    }
}

fn increment_last_digit(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    let mut i = chars.len();
    loop {
        if i == 0 {
            chars.insert(0, '1');
            break;
        }
        i -= 1;
        match chars[i] {
            '.' => continue,
            '9' => chars[i] = '0',
            d => {
                chars[i] = char::from(d as u8 + 1);
                break;
            }
        }
    }
    chars.into_iter().collect()
}

/// Drops trailing fractional zeros and a dangling decimal point.
fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Add thousands separators to a numeric string.
fn add_thousands_separator(s: &str) -> String {
    let parts: Vec<&str> = s.split('.').collect();
    let integer_part = parts[0];
    let decimal_part = parts.get(1);

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    let len = digits.len();

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if negative {
        result = format!("-{}", result);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

// ============================================================================
// DATES
// ============================================================================

fn format_date_value(raw: &str, options: &FormatOptions) -> String {
    let zoned = match to_zoned_date(raw, options.time_zone) {
        Ok(dt) => dt,
        Err(_) => return INVALID_DATE.to_string(),
    };

    if raw.ends_with(MIDNIGHT_SUFFIX) {
        locale_date(&zoned)
    } else {
        locale_date_time(&zoned)
    }
}

/// en-US default date rendering: `1/31/2024`
pub fn locale_date(dt: &DateTime<FixedOffset>) -> String {
    format!("{}/{}/{}", dt.month(), dt.day(), dt.year())
}

/// en-US default date-time rendering: `1/31/2024, 3:04:05 PM`
pub fn locale_date_time(dt: &DateTime<FixedOffset>) -> String {
    let (pm, hour) = dt.hour12();
    format!(
        "{}, {}:{:02}:{:02} {}",
        locale_date(dt),
        hour,
        dt.minute(),
        dt.second(),
        if pm { "PM" } else { "AM" }
    )
}

fn format_with_pattern(raw: &str, pattern: &str, zone: Option<ZoneOffset>) -> String {
    let zoned = match to_zoned_date(raw, zone) {
        Ok(dt) => dt,
        Err(_) => return INVALID_DATE.to_string(),
    };

    match parse_date_pattern(pattern) {
        Ok(parsed) => parsed.render(&zoned),
        Err(e) => {
            log_warn!("FORMAT", "date pattern rejected, showing raw value: {}", e);
            raw.to_string()
        }
    }
}
