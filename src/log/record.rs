use std::str::FromStr;
use thiserror::Error;

/// Failure to interpret a record's positional fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("'{kind}' record has no field {index}")]
    MissingField { kind: String, index: usize },

    #[error("'{kind}' record field {index} is not a number: {value:?}")]
    BadNumber {
        kind: String,
        index: usize,
        value: String,
    },
}

/// One parsed `@`-line of the profile log.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The line as read, for diagnostics.
    pub raw: String,
    /// Field 0 is the event kind.
    pub fields: Vec<String>,
}

impl Record {
    pub fn kind(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    pub fn field(&self, index: usize) -> Result<&str, RecordError> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| RecordError::MissingField {
                kind: self.kind().to_string(),
                index,
            })
    }

    /// Parse field `index` as a number (surrounding whitespace tolerated).
    pub fn number<T: FromStr>(&self, index: usize) -> Result<T, RecordError> {
        let value = self.field(index)?;
        value.trim().parse().map_err(|_| RecordError::BadNumber {
            kind: self.kind().to_string(),
            index,
            value: value.to_string(),
        })
    }
}

/// What a record's kind string says it measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Time,
    Tuples,
    Copy,
    Other,
}

/// Classified event kind.
///
/// Kinds are compound strings such as `t-nonrecursive-relation` or
/// `n-recursive-rule`: the leading character selects the measure, the
/// substrings select scope and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Runtime,
    NonRecursiveRelation(Measure),
    NonRecursiveRule(Measure),
    RecursiveRelation(Measure),
    RecursiveRule(Measure),
    /// Anything else the evaluator emits (start time, relation reads, ...).
    Ignored,
}

impl EventKind {
    pub fn classify(kind: &str) -> EventKind {
        if kind == "runtime" {
            return EventKind::Runtime;
        }

        let measure = match kind.chars().next() {
            Some('t') => Measure::Time,
            Some('n') => Measure::Tuples,
            Some('c') => Measure::Copy,
            _ => Measure::Other,
        };
        let is_rule = kind.contains("rule");
        let is_relation = kind.contains("relation");

        // "nonrecursive" contains "recursive", so it must be tested first.
        if kind.contains("nonrecursive") {
            if is_relation {
                EventKind::NonRecursiveRelation(measure)
            } else if is_rule {
                EventKind::NonRecursiveRule(measure)
            } else {
                EventKind::Ignored
            }
        } else if kind.contains("recursive") {
            if is_rule {
                EventKind::RecursiveRule(measure)
            } else if is_relation {
                EventKind::RecursiveRelation(measure)
            } else {
                EventKind::Ignored
            }
        } else {
            EventKind::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(fields: &[&str]) -> Record {
        Record {
            raw: format!("@{}", fields.join(";")),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn classifies_compound_kinds() {
        assert_eq!(EventKind::classify("runtime"), EventKind::Runtime);
        assert_eq!(
            EventKind::classify("t-nonrecursive-relation"),
            EventKind::NonRecursiveRelation(Measure::Time)
        );
        assert_eq!(
            EventKind::classify("n-nonrecursive-rule"),
            EventKind::NonRecursiveRule(Measure::Tuples)
        );
        assert_eq!(
            EventKind::classify("c-recursive-relation"),
            EventKind::RecursiveRelation(Measure::Copy)
        );
        assert_eq!(
            EventKind::classify("t-recursive-rule"),
            EventKind::RecursiveRule(Measure::Time)
        );
    }

    #[test]
    fn unrelated_kinds_are_ignored() {
        assert_eq!(EventKind::classify("time"), EventKind::Ignored);
        assert_eq!(EventKind::classify("relation-reads"), EventKind::Ignored);
        assert_eq!(EventKind::classify("frequency-atom"), EventKind::Ignored);
        assert_eq!(EventKind::classify("runtime-extra"), EventKind::Ignored);
    }

    #[test]
    fn numeric_fields_report_position_and_value() {
        let rec = record(&["t-nonrecursive-relation", "edge", "loc", "abc"]);
        assert_eq!(
            rec.number::<f64>(3),
            Err(RecordError::BadNumber {
                kind: "t-nonrecursive-relation".to_string(),
                index: 3,
                value: "abc".to_string(),
            })
        );
        assert_eq!(
            rec.number::<i64>(4),
            Err(RecordError::MissingField {
                kind: "t-nonrecursive-relation".to_string(),
                index: 4,
            })
        );
        assert_eq!(rec.field(1), Ok("edge"));
    }
}
