use crate::Result;
use crate::log::record::Record;
use regex::Regex;

/// Marker line the evaluator writes when debug output starts.
const START_DEBUG: &str = "@start-debug";

// Stand-ins for `;` inside quoted spans. Each quote style gets its own so the
// two passes never see each other's substitutions.
const SINGLE_QUOTED_SEMI: char = '\u{1}';
const DOUBLE_QUOTED_SEMI: char = '\u{2}';

/// Splits profile log lines into fields.
///
/// Line shape:
/// @<kind>;<field>;<field>;...
///
/// Fields are separated by `;` with optional surrounding whitespace. A `;`
/// inside a single- or double-quoted span is part of the field; the quote
/// characters themselves are kept.
#[derive(Debug, Clone)]
pub struct LineParser {
    separator: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            separator: Regex::new(r"\s*;\s*")?,
        })
    }

    /// Parse one line. Returns `None` for lines that carry no event.
    pub fn parse_line(&self, line: &str) -> Option<Record> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.starts_with('@') || line == START_DEBUG {
            return None;
        }

        Some(Record {
            raw: line.to_string(),
            fields: self.split_fields(&line[1..]),
        })
    }

    /// Split a record body (without the leading `@`).
    pub fn split_fields(&self, body: &str) -> Vec<String> {
        let shielded = if body.contains('\'') || body.contains('"') {
            let pass = shield(body, '\'', SINGLE_QUOTED_SEMI);
            shield(&pass, '"', DOUBLE_QUOTED_SEMI)
        } else {
            body.to_string()
        };

        let mut fields: Vec<String> = self
            .separator
            .split(&shielded)
            .map(|f| f.replace([SINGLE_QUOTED_SEMI, DOUBLE_QUOTED_SEMI], ";"))
            .collect();

        // Trailing separators do not produce empty fields.
        while fields.len() > 1 && fields.last().is_some_and(String::is_empty) {
            fields.pop();
        }
        fields
    }
}

/// Replace every `;` between balanced `quote` characters with `sentinel`.
fn shield(text: &str, quote: char, sentinel: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quoted = false;
    let mut escaped = false;

    for c in text.chars() {
        if c == quote && !escaped {
            quoted = !quoted;
        }
        escaped = c == '\\' && !escaped;

        if quoted && c == ';' {
            out.push(sentinel);
        } else {
            out.push(c);
        }
    }
    out
}
