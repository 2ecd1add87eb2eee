//! Event -> model mapping.
//!
//! Record layouts (field 0 is the kind):
//!   runtime;<seconds>
//!   <m>-nonrecursive-relation;<relation>;<locator>;<value>
//!   <m>-nonrecursive-rule;<relation>;<locator>;<rule>;<value>
//!   <m>-recursive-relation;<relation>;<locator>;<value>
//!   <m>-recursive-rule;<relation>;<version>;<locator>;<rule>;<value>
//!
//! where `<m>` is `t` (time), `n` (tuples) or `c` (copy time).

use super::{ProgramRun, Relation, Rule};
use crate::log::{EventKind, Measure, Record, RecordError};

impl ProgramRun {
    /// Apply one record to the model.
    ///
    /// Values are parsed before anything is touched, so a malformed record
    /// leaves the model as it was apart from creating the named relation.
    pub fn process(&mut self, record: &Record) -> Result<(), RecordError> {
        let kind = EventKind::classify(record.kind());
        match kind {
            EventKind::Runtime => {
                self.runtime = Some(record.number(1)?);
            }
            EventKind::Ignored => {}
            EventKind::NonRecursiveRelation(measure) => {
                let rel = self.relation_entry(record.field(1)?);
                match measure {
                    Measure::Time => {
                        let time = record.number(3)?;
                        rel.runtime = time;
                        rel.locator = record.field(2)?.to_string();
                    }
                    Measure::Tuples => rel.num_tuples = record.number(3)?,
                    Measure::Copy | Measure::Other => {}
                }
            }
            EventKind::NonRecursiveRule(measure) => {
                let rel = self.relation_entry(record.field(1)?);
                update_nonrecursive_rule(rel, measure, record)?;
            }
            EventKind::RecursiveRelation(measure) => {
                let rel = self.relation_entry(record.field(1)?);
                update_recursive_relation(rel, measure, record)?;
            }
            EventKind::RecursiveRule(measure) => {
                let rel = self.relation_entry(record.field(1)?);
                update_recursive_rule(rel, measure, record)?;
            }
        }
        Ok(())
    }
}

fn update_nonrecursive_rule(
    rel: &mut Relation,
    measure: Measure,
    record: &Record,
) -> Result<(), RecordError> {
    let locator = record.field(2)?;
    let name = record.field(3)?;

    match measure {
        Measure::Time => {
            let time = record.number(4)?;
            let rule = nonrecursive_rule_entry(rel, name);
            rule.runtime = time;
            rule.locator = locator.to_string();
        }
        Measure::Tuples => {
            // The log reports a running total for the relation; each rule
            // event is credited with the increase since the previous one.
            let cumulative: i64 = record.number(4)?;
            let baseline = rel.prev_num_tuples;
            nonrecursive_rule_entry(rel, name).num_tuples = cumulative.saturating_sub(baseline);
            rel.prev_num_tuples = cumulative;
        }
        Measure::Copy | Measure::Other => {
            nonrecursive_rule_entry(rel, name);
        }
    }
    Ok(())
}

fn nonrecursive_rule_entry<'a>(rel: &'a mut Relation, name: &str) -> &'a mut Rule {
    let Relation {
        rules,
        rule_counter,
        number,
        ..
    } = rel;
    rules.entry(name.to_string()).or_insert_with(|| {
        *rule_counter += 1;
        Rule::new(name, format!("N{}.{}", number, rule_counter))
    })
}

fn update_recursive_relation(
    rel: &mut Relation,
    measure: Measure,
    record: &Record,
) -> Result<(), RecordError> {
    match measure {
        Measure::Time => {
            let time = record.number(3)?;
            let locator = record.field(2)?.to_string();
            let iter = rel.current_iteration();
            iter.runtime = time;
            iter.locator = locator.clone();
            rel.locator = locator;
        }
        Measure::Tuples => {
            let tuples = record.number(3)?;
            rel.current_iteration().num_tuples = tuples;
        }
        Measure::Copy => {
            let copy_time = record.number(3)?;
            rel.current_iteration().copy_time = copy_time;
            rel.ready = true;
        }
        Measure::Other => {
            rel.current_iteration();
        }
    }
    Ok(())
}

fn update_recursive_rule(
    rel: &mut Relation,
    measure: Measure,
    record: &Record,
) -> Result<(), RecordError> {
    let version: u32 = record.number(2)?;
    let locator = record.field(3)?;
    let name = record.field(4)?;
    let time: Option<f64> = match measure {
        Measure::Time => Some(record.number(5)?),
        _ => None,
    };
    let tuples: Option<i64> = match measure {
        Measure::Tuples => Some(record.number(5)?),
        _ => None,
    };

    let id = rel.recursive_rule_id(name);
    let iter = rel.current_iteration();
    let rule = iter
        .rules
        .entry(name.to_string())
        .or_insert_with(|| Rule::new(name, id));
    rule.version = version;
    rule.locator = locator.to_string();
    if let Some(time) = time {
        rule.runtime = time;
    }
    if let Some(tuples) = tuples {
        rule.num_tuples = tuples;
    }
    Ok(())
}
