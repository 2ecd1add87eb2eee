//! Aggregation: derive display tables from the profile model.
//!
//! Everything here is recomputed from the model on every call.

pub mod format;

use crate::model::{ProgramRun, Relation, Rule};
use format::Cell;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationRow {
    pub total_time: f64,
    pub nonrecursive_time: f64,
    pub recursive_time: f64,
    pub copy_time: f64,
    pub tuples: i64,
    pub name: String,
    pub id: String,
    pub locator: String,
    pub throughput: f64,
}

impl RelationRow {
    pub const HEADERS: [&'static str; 9] = [
        "TOT_T", "NREC_T", "REC_T", "COPY_T", "TUPLES", "REL_NAME", "ID", "SRC", "PERFOR",
    ];

    pub fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Float(self.total_time),
            Cell::Float(self.nonrecursive_time),
            Cell::Float(self.recursive_time),
            Cell::Float(self.copy_time),
            Cell::Count(self.tuples),
            Cell::Text(self.name.clone()),
            Cell::Text(self.id.clone()),
            text_or_empty(&self.locator),
            Cell::Float(self.throughput),
        ]
    }
}

/// A rule row; also used for the per-version breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRow {
    pub total_time: f64,
    pub nonrecursive_time: f64,
    pub recursive_time: f64,
    /// Estimated: recursive copy time is only logged per iteration.
    pub copy_time: f64,
    pub tuples: i64,
    pub name: String,
    pub id: String,
    pub relation: String,
    pub version: u32,
    pub throughput: f64,
    pub locator: String,
}

impl RuleRow {
    pub const HEADERS: [&'static str; 11] = [
        "TOT_T", "NREC_T", "REC_T", "COPY_T", "TUPLES", "RUL_NAME", "ID", "REL_NAME", "VER",
        "PERFOR", "SRC",
    ];

    pub fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Float(self.total_time),
            Cell::Float(self.nonrecursive_time),
            Cell::Float(self.recursive_time),
            Cell::Float(self.copy_time),
            Cell::Count(self.tuples),
            Cell::Text(self.name.clone()),
            Cell::Text(self.id.clone()),
            Cell::Text(self.relation.clone()),
            Cell::Text(self.version.to_string()),
            Cell::Float(self.throughput),
            text_or_empty(&self.locator),
        ]
    }

    fn nonrecursive(rel: &Relation, rule: &Rule) -> Self {
        Self {
            total_time: 0.0,
            nonrecursive_time: rule.runtime(),
            recursive_time: 0.0,
            copy_time: 0.0,
            tuples: rule.num_tuples(),
            name: rule.name().to_string(),
            id: rule.id().to_string(),
            relation: rel.name().to_string(),
            version: 0,
            throughput: 0.0,
            locator: rule.locator().to_string(),
        }
    }

    fn recursive(rel: &Relation, rule: &Rule) -> Self {
        Self {
            total_time: 0.0,
            nonrecursive_time: 0.0,
            recursive_time: rule.runtime(),
            copy_time: 0.0,
            tuples: rule.num_tuples(),
            name: rule.name().to_string(),
            id: rule.id().to_string(),
            relation: rel.name().to_string(),
            version: rule.version(),
            throughput: 0.0,
            locator: rule.locator().to_string(),
        }
    }

    /// Fill in copy time share, total and throughput.
    fn finish(&mut self, rel: &Relation, recursive_tuples: i64) {
        self.copy_time =
            copy_time_share(rel.copy_time(), rel.recursive_rule_tuples(), recursive_tuples);
        self.total_time = self.nonrecursive_time + self.recursive_time + self.copy_time;
        self.throughput = throughput(self.tuples, self.total_time);
    }
}

/// Tuples per second. A total time of exactly zero divides by one.
pub fn throughput(tuples: i64, total_time: f64) -> f64 {
    let denominator = if total_time == 0.0 { 1.0 } else { total_time };
    tuples as f64 / denominator
}

/// Copy time apportioned to a rule by its share of recursive tuples.
pub fn copy_time_share(copy_time: f64, recursive_tuples: i64, rule_tuples: i64) -> f64 {
    if recursive_tuples == 0 {
        return 0.0;
    }
    copy_time * rule_tuples as f64 / recursive_tuples as f64
}

pub fn relation_table(run: &ProgramRun) -> Vec<RelationRow> {
    run.relations()
        .values()
        .map(|rel| {
            let total_time = rel.total_time();
            let tuples = rel.total_tuples();
            RelationRow {
                total_time,
                nonrecursive_time: rel.nonrecursive_time(),
                recursive_time: rel.recursive_time(),
                copy_time: rel.copy_time(),
                tuples,
                name: rel.name().to_string(),
                id: rel.id().to_string(),
                locator: rel.locator().to_string(),
                throughput: throughput(tuples, total_time),
            }
        })
        .collect()
}

/// One row per non-recursive rule, plus recursive rules collapsed across
/// iterations by name. A recursive rule sharing a name with a
/// non-recursive rule of the same relation is folded into that row.
pub fn rule_table(run: &ProgramRun) -> Vec<RuleRow> {
    let mut out = Vec::new();

    for rel in run.relations().values() {
        // name -> (row, recursive tuples accumulated into it)
        let mut rows: BTreeMap<&str, (RuleRow, i64)> = BTreeMap::new();

        for rule in rel.rules().values() {
            rows.insert(rule.name(), (RuleRow::nonrecursive(rel, rule), 0));
        }

        for rule in rel.recursive_rules() {
            match rows.get_mut(rule.name()) {
                Some((row, rec_tuples)) => {
                    row.recursive_time += rule.runtime();
                    row.tuples = row.tuples.saturating_add(rule.num_tuples());
                    *rec_tuples = rec_tuples.saturating_add(rule.num_tuples());
                }
                None => {
                    rows.insert(
                        rule.name(),
                        (RuleRow::recursive(rel, rule), rule.num_tuples()),
                    );
                }
            }
        }

        out.extend(rows.into_values().map(|(mut row, rec_tuples)| {
            row.finish(rel, rec_tuples);
            row
        }));
    }

    out
}

/// Occurrences of one recursive rule of one relation, bucketed by
/// `(name, locator, version)`.
pub fn version_table(run: &ProgramRun, relation_id: &str, rule_id: &str) -> Vec<RuleRow> {
    let Some(rel) = run.relation_by_id(relation_id) else {
        return Vec::new();
    };

    let mut rows: BTreeMap<(&str, &str, u32), RuleRow> = BTreeMap::new();
    for rule in rel.recursive_rules().filter(|r| r.id() == rule_id) {
        let key = (rule.name(), rule.locator(), rule.version());
        match rows.get_mut(&key) {
            Some(row) => {
                row.recursive_time += rule.runtime();
                row.tuples = row.tuples.saturating_add(rule.num_tuples());
            }
            None => {
                rows.insert(key, RuleRow::recursive(rel, rule));
            }
        }
    }

    rows.into_values()
        .map(|mut row| {
            let tuples = row.tuples;
            row.finish(rel, tuples);
            row
        })
        .collect()
}

fn text_or_empty(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LineParser;
    use pretty_assertions::assert_eq;

    fn run_from(lines: &[&str]) -> ProgramRun {
        let parser = LineParser::new().unwrap();
        let mut run = ProgramRun::new();
        for line in lines {
            if let Some(rec) = parser.parse_line(line) {
                run.process(&rec).unwrap();
            }
        }
        run
    }

    #[test]
    fn copy_time_is_apportioned_by_tuples() {
        assert_eq!(copy_time_share(9.0, 300, 100), 3.0);
        assert_eq!(copy_time_share(9.0, 0, 0), 0.0);
    }

    #[test]
    fn zero_time_throughput_is_the_tuple_count() {
        assert_eq!(throughput(42, 0.0), 42.0);
        assert_eq!(throughput(42, 2.0), 21.0);
    }

    #[test]
    fn relation_rows_sum_all_phases() {
        let run = run_from(&[
            "@t-nonrecursive-relation;path;p.dl [1:1-1:9];1.0",
            "@n-nonrecursive-relation;path;p.dl [1:1-1:9];10",
            "@t-recursive-relation;path;p.dl [2:1-2:9];2.0",
            "@n-recursive-relation;path;p.dl [2:1-2:9];30",
            "@c-recursive-relation;path;p.dl [2:1-2:9];0.5",
            "@t-recursive-relation;path;p.dl [2:1-2:9];0.5",
            "@n-recursive-relation;path;p.dl [2:1-2:9];0",
            "@c-recursive-relation;path;p.dl [2:1-2:9];0.0",
        ]);
        let rows = relation_table(&run);
        assert_eq!(
            rows,
            vec![RelationRow {
                total_time: 4.0,
                nonrecursive_time: 1.0,
                recursive_time: 2.5,
                copy_time: 0.5,
                tuples: 40,
                name: "path".to_string(),
                id: "R1".to_string(),
                locator: "p.dl [2:1-2:9]".to_string(),
                throughput: 10.0,
            }]
        );
    }

    #[test]
    fn empty_relation_throughput_does_not_divide_by_zero() {
        let run = run_from(&["@n-nonrecursive-relation;facts;f.facts;42"]);
        let rows = relation_table(&run);
        assert_eq!(rows[0].total_time, 0.0);
        assert_eq!(rows[0].throughput, 42.0);
    }

    #[test]
    fn recursive_rules_collapse_and_share_copy_time() {
        let run = run_from(&[
            "@t-nonrecursive-rule;path;l0;base;0.25",
            "@n-nonrecursive-rule;path;l0;base;50",
            // iteration 1
            "@t-recursive-rule;path;0;l1;step;1.0",
            "@n-recursive-rule;path;0;l1;step;100",
            "@t-recursive-rule;path;0;l2;join;0.5",
            "@n-recursive-rule;path;0;l2;join;100",
            "@c-recursive-relation;path;l;6.0",
            // iteration 2
            "@t-recursive-rule;path;0;l1;step;2.0",
            "@n-recursive-rule;path;0;l1;step;100",
            "@c-recursive-relation;path;l;3.0",
        ]);
        let rows = rule_table(&run);
        assert_eq!(rows.len(), 3);

        let base = rows.iter().find(|r| r.name == "base").unwrap();
        assert_eq!(base.id, "N1.1");
        assert_eq!(base.tuples, 50);
        assert_eq!(base.copy_time, 0.0);
        assert_eq!(base.total_time, 0.25);
        assert_eq!(base.throughput, 200.0);

        let step = rows.iter().find(|r| r.name == "step").unwrap();
        assert_eq!(step.id, "C1.1");
        assert_eq!(step.recursive_time, 3.0);
        assert_eq!(step.tuples, 200);
        // 9.0 copy time over 300 recursive tuples.
        assert_eq!(step.copy_time, 6.0);
        assert_eq!(step.total_time, 9.0);
        assert_eq!(step.relation, "path");

        let join = rows.iter().find(|r| r.name == "join").unwrap();
        assert_eq!(join.id, "C1.2");
        assert_eq!(join.copy_time, 3.0);
        assert_eq!(join.total_time, 3.5);
    }

    #[test]
    fn same_rule_name_in_two_relations_stays_separate() {
        let run = run_from(&[
            "@n-nonrecursive-rule;a;l;r;5",
            "@n-nonrecursive-rule;b;l;r;7",
        ]);
        let rows = rule_table(&run);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].relation, "a");
        assert_eq!(rows[0].tuples, 5);
        assert_eq!(rows[1].relation, "b");
        assert_eq!(rows[1].tuples, 7);
    }

    #[test]
    fn versions_split_by_locator_and_version() {
        let run = run_from(&[
            "@n-recursive-rule;path;0;l1;step;100",
            "@t-recursive-rule;path;0;l1;step;1.0",
            "@c-recursive-relation;path;l;2.0",
            "@n-recursive-rule;path;1;l1;step;50",
            "@t-recursive-rule;path;1;l1;step;0.5",
            "@c-recursive-relation;path;l;1.0",
            "@n-recursive-rule;path;0;l1;step;50",
            "@t-recursive-rule;path;0;l1;step;0.5",
            "@c-recursive-relation;path;l;1.0",
        ]);
        let rows = version_table(&run, "R1", "C1.1");
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].version, 0);
        assert_eq!(rows[0].tuples, 150);
        assert_eq!(rows[0].recursive_time, 1.5);
        // 4.0 copy time over 200 recursive tuples.
        assert_eq!(rows[0].copy_time, 3.0);

        assert_eq!(rows[1].version, 1);
        assert_eq!(rows[1].tuples, 50);
        assert_eq!(rows[1].copy_time, 1.0);

        assert!(version_table(&run, "R9", "C1.1").is_empty());
        assert!(version_table(&run, "R1", "C1.2").is_empty());
    }
}
