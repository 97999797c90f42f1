// ABOUTME: Output buffer for the streaming JSON encoder with optional pretty printing.
// ABOUTME: Also holds the string quoting and floating-point formatting shared by the JSON writers.

use std::fmt::Write as _;

/// Accumulates JSON text and tracks indentation.
///
/// `writing_first` is true right after a structure opens, so the caller knows
/// whether a separator is needed before the next item.
pub(crate) struct Composer {
    out: String,
    indent: Option<String>,
    level: usize,
    pub(crate) writing_first: bool,
}

impl Composer {
    pub(crate) fn new(indent: Option<String>) -> Self {
        Self {
            out: String::with_capacity(128),
            indent,
            level: 0,
            writing_first: true,
        }
    }

    pub(crate) fn indent(&mut self) {
        self.writing_first = true;
        self.level += 1;
    }

    pub(crate) fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Starts a new item: a newline plus indentation when pretty printing.
    pub(crate) fn next_item(&mut self) {
        self.writing_first = false;
        if let Some(indent) = &self.indent {
            self.out.push('\n');
            for _ in 0..self.level {
                self.out.push_str(indent);
            }
        }
    }

    pub(crate) fn next_item_if_not_first(&mut self) {
        if self.writing_first {
            self.writing_first = false;
        } else {
            self.next_item();
        }
    }

    pub(crate) fn space(&mut self) {
        if self.indent.is_some() {
            self.out.push(' ');
        }
    }

    pub(crate) fn print(&mut self, c: char) {
        self.out.push(c);
    }

    pub(crate) fn print_raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub(crate) fn print_quoted(&mut self, s: &str) {
        push_quoted(&mut self.out, s);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

/// Appends `value` as a JSON string literal.
pub(crate) fn push_quoted(out: &mut String, value: &str) {
    out.reserve(value.len() + 2);
    out.push('"');
    let bytes = value.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let escape = match b {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            0x08 => "\\b",
            0x0c => "\\f",
            0x00..=0x1f => "",
            _ => continue,
        };
        out.push_str(&value[start..i]);
        if escape.is_empty() {
            let _ = write!(out, "\\u{b:04x}");
        } else {
            out.push_str(escape);
        }
        start = i + 1;
    }
    out.push_str(&value[start..]);
    out.push('"');
}

/// Text of a non-finite double, or `None` for finite values.
pub(crate) fn special_double(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("Infinity")
    } else if value == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}

/// Shortest round-trip text; integral values keep a `.0` suffix.
pub(crate) fn format_double(value: f64) -> String {
    match special_double(value) {
        Some(text) => text.to_owned(),
        None => format!("{value:?}"),
    }
}

pub(crate) fn format_float(value: f32) -> String {
    match special_double(f64::from(value)) {
        Some(text) => text.to_owned(),
        None => format!("{value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> String {
        let mut out = String::new();
        push_quoted(&mut out, s);
        out
    }

    #[test]
    fn test_quoting_escapes() {
        assert_eq!(quoted("plain"), r#""plain""#);
        assert_eq!(quoted("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(quoted("line\nbreak\ttab"), r#""line\nbreak\ttab""#);
        assert_eq!(quoted("\u{1}"), r#""\u0001""#);
        assert_eq!(quoted("é😀"), "\"é😀\"");
    }

    #[test]
    fn test_double_formatting() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(0.1), "0.1");
        assert_eq!(format_double(-2.5), "-2.5");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_float(0.1), "0.1");
    }

    #[test]
    fn test_pretty_items() {
        let mut composer = Composer::new(Some("  ".into()));
        composer.print('{');
        composer.indent();
        composer.next_item();
        composer.print_quoted("a");
        composer.print(':');
        composer.space();
        composer.print_raw("1");
        composer.unindent();
        composer.next_item_if_not_first();
        composer.print('}');
        assert_eq!(composer.finish(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_empty_structure_stays_on_one_line() {
        let mut composer = Composer::new(Some("  ".into()));
        composer.print('[');
        composer.indent();
        composer.unindent();
        composer.next_item_if_not_first();
        composer.print(']');
        assert_eq!(composer.finish(), "[]");
    }
}
