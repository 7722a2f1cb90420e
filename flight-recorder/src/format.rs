//! Message template formatting
//!
//! Substitutes positional payload values into an event's message template:
//!
//! ```rust
//! use flight_recorder::{format_message, EventLevel, RawEvent};
//!
//! let event = RawEvent::new("Echo", EventLevel::Informational)
//!     .with_message("Value={0}, Name={1}")
//!     .with_payload("value", 42)
//!     .with_payload("name", "x");
//!
//! assert_eq!(format_message(&event), "Value=42, Name=x");
//! ```
//!
//! Templates that never reference index 0 are returned unchanged. A
//! placeholder whose index has no payload value (or whose value is null)
//! becomes [`MISSING_VALUE`]. `{{` and `}}` are literal braces.
//!
//! Format items take an optional alignment and format string,
//! `{index[,alignment][:format]}`. A positive alignment right-aligns the
//! value in that many characters, a negative one left-aligns it. Numeric
//! values understand these format strings:
//!
//! | Format | Meaning | `1234.5` |
//! |---|---|---|
//! | `F<n>` | fixed point, `n` decimals (default 2) | `1234.50` |
//! | `N<n>` | fixed point with group separators | `1,234.50` |
//! | `D<n>` | integer zero-padded to `n` digits | (integers only) |
//!
//! Any other format string renders the value as if none were given.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::RawEvent;

/// Rendered in place of a missing or null payload value
pub const MISSING_VALUE: &str = "(null)";

/// Upper bound for alignments and precisions taken from a template
const MAX_FIELD_WIDTH: usize = 999;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{(\d+)(?:,(-?\d+))?(?::([^}]*))?\}")
            .expect("placeholder pattern is a valid regex")
    })
}

/// Numeric format string of a format item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberFormat {
    Fixed(usize),
    Grouped(usize),
    Decimal(usize),
}

impl NumberFormat {
    fn parse(spec: &str) -> Option<Self> {
        let mut chars = spec.trim().chars();
        let kind = chars.next()?;
        let digits = chars.as_str();
        let precision = if digits.is_empty() {
            None
        } else {
            Some(digits.parse::<usize>().ok()?.min(MAX_FIELD_WIDTH))
        };

        match kind.to_ascii_uppercase() {
            'F' => Some(NumberFormat::Fixed(precision.unwrap_or(2))),
            'N' => Some(NumberFormat::Grouped(precision.unwrap_or(2))),
            'D' => Some(NumberFormat::Decimal(precision.unwrap_or(0))),
            _ => None,
        }
    }
}

fn align(text: String, alignment: Option<i64>) -> String {
    let Some(alignment) = alignment else {
        return text;
    };
    let width = (alignment.unsigned_abs() as usize).min(MAX_FIELD_WIDTH);
    if alignment < 0 {
        format!("{:<width$}", text)
    } else {
        format!("{:>width$}", text)
    }
}

fn references_first_value(template: &str) -> bool {
    template.contains("{0}") || template.contains("{0,") || template.contains("{0:")
}

/// Culture-specific rendering of payload values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCulture {
    /// Culture name, empty for the invariant culture
    pub name: String,
    /// Separator between integer and fractional digits
    pub decimal_separator: char,
    /// Separator between digit groups for the `N` format
    #[serde(default = "default_group_separator")]
    pub group_separator: char,
}

fn default_group_separator() -> char {
    ','
}

impl FormatCulture {
    /// Culture-independent rendering (`.` decimal separator)
    pub fn invariant() -> Self {
        Self {
            name: String::new(),
            decimal_separator: '.',
            group_separator: ',',
        }
    }

    /// Named culture with its own decimal separator
    ///
    /// Digit groups are separated by `.` when the decimal separator is `,`
    /// and by `,` otherwise.
    pub fn new(name: impl Into<String>, decimal_separator: char) -> Self {
        let group_separator = if decimal_separator == ',' { '.' } else { ',' };
        Self {
            name: name.into(),
            decimal_separator,
            group_separator,
        }
    }

    /// Override the digit group separator
    pub fn with_group_separator(mut self, group_separator: char) -> Self {
        self.group_separator = group_separator;
        self
    }

    /// Render one payload value
    pub fn render(&self, value: &Value) -> String {
        match value {
            Value::Null => MISSING_VALUE.to_string(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.is_f64() && self.decimal_separator != '.' => n
                .to_string()
                .replace('.', &self.decimal_separator.to_string()),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => value.to_string(),
        }
    }

    /// Render one payload value with the format string of a format item
    pub fn render_with(&self, value: &Value, spec: Option<&str>) -> String {
        let (Some(format), Value::Number(n)) = (spec.and_then(NumberFormat::parse), value) else {
            return self.render(value);
        };

        match (format, n.as_f64()) {
            (NumberFormat::Decimal(_), _) if n.is_f64() => self.render(value),
            (NumberFormat::Decimal(width), _) => {
                let digits = n.to_string();
                match digits.strip_prefix('-') {
                    Some(magnitude) => format!("-{:0>width$}", magnitude),
                    None => format!("{:0>width$}", digits),
                }
            }
            (NumberFormat::Fixed(precision), Some(v)) => self.fixed(v, precision),
            (NumberFormat::Grouped(precision), Some(v)) => self.grouped(v, precision),
            (_, None) => self.render(value),
        }
    }

    fn fixed(&self, value: f64, precision: usize) -> String {
        format!("{:.*}", precision, value).replace('.', &self.decimal_separator.to_string())
    }

    fn grouped(&self, value: f64, precision: usize) -> String {
        let fixed = format!("{:.*}", precision, value.abs());
        let (integer, fraction) = match fixed.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::with_capacity(fixed.len() + integer.len() / 3 + 1);
        if value < 0.0 {
            out.push('-');
        }
        for (i, digit) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                out.push(self.group_separator);
            }
            out.push(digit);
        }
        if let Some(fraction) = fraction {
            out.push(self.decimal_separator);
            out.push_str(fraction);
        }
        out
    }
}

impl Default for FormatCulture {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Format the event message with the invariant culture
pub fn format_message(event: &RawEvent) -> String {
    format_message_with(event, &FormatCulture::invariant())
}

/// Format the event message with `culture`
///
/// An event without a template formats as an empty string.
pub fn format_message_with(event: &RawEvent, culture: &FormatCulture) -> String {
    let Some(template) = event.message.as_deref() else {
        return String::new();
    };

    if template.trim().is_empty() || !references_first_value(template) {
        return template.to_string();
    }

    placeholder_pattern()
        .replace_all(template, |caps: &Captures<'_>| match caps.get(1) {
            Some(index) => {
                let rendered = index
                    .as_str()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| event.payload_value(i))
                    .map(|value| culture.render_with(value, caps.get(3).map(|m| m.as_str())))
                    .unwrap_or_else(|| MISSING_VALUE.to_string());
                let alignment = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
                align(rendered, alignment)
            }
            None if &caps[0] == "{{" => "{".to_string(),
            None => "}".to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLevel;
    use serde_json::json;

    fn event(message: &str) -> RawEvent {
        RawEvent::new("Echo", EventLevel::Informational).with_message(message)
    }

    #[test]
    fn test_positional_substitution() {
        let e = event("Value={0}, Name={1}")
            .with_payload("value", 42)
            .with_payload("name", "x");
        assert_eq!(format_message(&e), "Value=42, Name=x");
    }

    #[test]
    fn test_no_placeholders_unchanged() {
        let e = event("plain message").with_payload("ignored", 1);
        assert_eq!(format_message(&e), "plain message");
    }

    #[test]
    fn test_brace_without_index_zero_unchanged() {
        let e = event("json {\"a\": 1}").with_payload("a", 1);
        assert_eq!(format_message(&e), "json {\"a\": 1}");
    }

    #[test]
    fn test_missing_payload_uses_marker() {
        let e = event("{0} and {1} and {5}").with_payload("only", "one");
        assert_eq!(format_message(&e), "one and (null) and (null)");
    }

    #[test]
    fn test_null_payload_uses_marker() {
        let e = event("got {0}").with_payload("nothing", Value::Null);
        assert_eq!(format_message(&e), "got (null)");
    }

    #[test]
    fn test_repeated_placeholder_and_escapes() {
        let e = event("{{{0}}} {0}").with_payload("v", "x");
        assert_eq!(format_message(&e), "{x} x");
    }

    #[test]
    fn test_missing_template() {
        let e = RawEvent::new("Echo", EventLevel::Informational);
        assert_eq!(format_message(&e), "");
    }

    #[test]
    fn test_culture_decimal_separator() {
        let e = event("ratio {0}, count {1}")
            .with_payload("ratio", 0.5)
            .with_payload("count", 3);
        let culture = FormatCulture::new("de-DE", ',');

        assert_eq!(format_message(&e), "ratio 0.5, count 3");
        assert_eq!(format_message_with(&e, &culture), "ratio 0,5, count 3");
    }

    #[test]
    fn test_format_and_alignment_items() {
        let e = event("ratio={0:F2} pad=[{1,5}]")
            .with_payload("ratio", 1.5)
            .with_payload("name", "ab");
        assert_eq!(format_message(&e), "ratio=1.50 pad=[   ab]");
    }

    #[test]
    fn test_left_alignment_with_format() {
        let e = event("[{0,-8:F1}] [{1,-4}]")
            .with_payload("ms", 12.345)
            .with_payload("code", 7);
        assert_eq!(format_message(&e), "[12.3    ] [7   ]");
    }

    #[test]
    fn test_group_separator_format() {
        let e = event("total {0:N2}, count {1:N0}, small {2:n}")
            .with_payload("total", 1234567.891)
            .with_payload("count", -9876543)
            .with_payload("small", 12);
        assert_eq!(
            format_message(&e),
            "total 1,234,567.89, count -9,876,543, small 12.00"
        );

        let culture = FormatCulture::new("de-DE", ',');
        assert_eq!(
            format_message_with(&e, &culture),
            "total 1.234.567,89, count -9.876.543, small 12,00"
        );
    }

    #[test]
    fn test_fixed_format_uses_culture_separator() {
        let e = event("{0:F3} {1:f}").with_payload("a", 2).with_payload("b", -0.126);
        let culture = FormatCulture::new("fr-FR", ',').with_group_separator(' ');
        assert_eq!(format_message(&e), "2.000 -0.13");
        assert_eq!(format_message_with(&e, &culture), "2,000 -0,13");
    }

    #[test]
    fn test_decimal_format_pads_integers() {
        let e = event("#{0:D4} #{1:D3} {2:D5}")
            .with_payload("id", 42)
            .with_payload("neg", -7)
            .with_payload("ratio", 0.5);
        assert_eq!(format_message(&e), "#0042 #-007 0.5");
    }

    #[test]
    fn test_unknown_format_and_non_numeric_values_render_plainly() {
        let e = event("{0:X8} {1:F2} {2,6:F2}")
            .with_payload("n", 255)
            .with_payload("s", "text")
            .with_payload("missing", Value::Null);
        assert_eq!(format_message(&e), "255 text (null)");
    }

    #[test]
    fn test_missing_value_is_aligned() {
        let e = event("{0}|{1,8}|").with_payload("only", "x");
        assert_eq!(format_message(&e), "x|  (null)|");
    }

    #[test]
    fn test_first_value_with_format_item_enables_formatting() {
        let e = event("{0:F1} and {{literal}}").with_payload("v", 2);
        assert_eq!(format_message(&e), "2.0 and {literal}");
    }

    #[test]
    fn test_render_structured_values() {
        let culture = FormatCulture::invariant();
        assert_eq!(culture.render(&json!(true)), "true");
        assert_eq!(culture.render(&json!([1, 2])), "[1,2]");
        assert_eq!(culture.render(&json!({"k": "v"})), "{\"k\":\"v\"}");
    }
}
