//! Profile data model: one program run, its relations, rules and the
//! iterations of recursive evaluation.
//!
//! The model is only mutated through [`ProgramRun::process`] (see
//! `dispatch`). All identifier counters live on the entities so that a
//! restored snapshot keeps minting the same identifiers.

mod dispatch;

use crate::report::format::format_time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramRun {
    relations: BTreeMap<String, Relation>,
    /// Wall-clock runtime of the whole program, once reported.
    runtime: Option<f64>,
    relation_counter: u32,
}

impl ProgramRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relations(&self) -> &BTreeMap<String, Relation> {
        &self.relations
    }

    #[cfg(test)]
    pub fn relation_by_name(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relation_by_id(&self, id: &str) -> Option<&Relation> {
        self.relations.values().find(|r| r.id == id)
    }

    pub fn runtime(&self) -> Option<f64> {
        self.runtime
    }

    /// Runtime as shown in summaries; `--` until the run reports it.
    pub fn runtime_display(&self) -> String {
        match self.runtime {
            Some(t) => format_time(t),
            None => "--".to_string(),
        }
    }

    pub fn total_tuples(&self) -> i64 {
        saturating_sum(self.relations.values().map(Relation::total_tuples))
    }

    pub fn total_recursive_tuples(&self) -> i64 {
        saturating_sum(self.relations.values().map(Relation::recursive_rule_tuples))
    }

    pub fn total_copy_time(&self) -> f64 {
        self.relations.values().map(Relation::copy_time).sum()
    }

    pub fn total_time(&self) -> f64 {
        self.relations.values().map(Relation::total_time).sum()
    }

    /// Look up a relation by name, creating it with the next `R<n>` id.
    fn relation_entry(&mut self, name: &str) -> &mut Relation {
        let counter = &mut self.relation_counter;
        self.relations.entry(name.to_string()).or_insert_with(|| {
            *counter += 1;
            Relation::new(name, *counter)
        })
    }
}

/// Tuple counts come straight from the log; clamp instead of overflowing.
pub fn saturating_sum(counts: impl Iterator<Item = i64>) -> i64 {
    counts.fold(0, i64::saturating_add)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    name: String,
    id: String,
    /// Numeric part of `id`, reused in rule identifiers.
    number: u32,
    runtime: f64,
    num_tuples: i64,
    /// Last cumulative tuple count seen on a non-recursive rule event.
    prev_num_tuples: i64,
    locator: String,
    /// Set by a copy-time event; the next recursive event opens an iteration.
    ready: bool,
    rules: BTreeMap<String, Rule>,
    iterations: Vec<Iteration>,
    rule_counter: u32,
    recursive_counter: u32,
    /// Recursive rule name -> identifier minted on first sight.
    recursive_ids: BTreeMap<String, String>,
}

impl Relation {
    fn new(name: &str, number: u32) -> Self {
        Self {
            name: name.to_string(),
            id: format!("R{}", number),
            number,
            runtime: 0.0,
            num_tuples: 0,
            prev_num_tuples: 0,
            locator: String::new(),
            ready: true,
            rules: BTreeMap::new(),
            iterations: Vec::new(),
            rule_counter: 0,
            recursive_counter: 0,
            recursive_ids: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Tuple count reported for the non-recursive evaluation.
    #[cfg(test)]
    pub fn num_tuples(&self) -> i64 {
        self.num_tuples
    }

    #[cfg(test)]
    pub fn prev_num_tuples(&self) -> i64 {
        self.prev_num_tuples
    }

    /// Non-recursive rules keyed by name.
    pub fn rules(&self) -> &BTreeMap<String, Rule> {
        &self.rules
    }

    #[cfg(test)]
    pub fn iterations(&self) -> &[Iteration] {
        &self.iterations
    }

    pub fn nonrecursive_time(&self) -> f64 {
        self.runtime
    }

    pub fn recursive_time(&self) -> f64 {
        self.iterations.iter().map(|i| i.runtime).sum()
    }

    pub fn copy_time(&self) -> f64 {
        self.iterations.iter().map(|i| i.copy_time).sum()
    }

    pub fn total_time(&self) -> f64 {
        self.nonrecursive_time() + self.recursive_time() + self.copy_time()
    }

    /// Relation tuples plus the tuples of every iteration.
    pub fn total_tuples(&self) -> i64 {
        self.num_tuples
            .saturating_add(saturating_sum(self.iterations.iter().map(|i| i.num_tuples)))
    }

    /// Sum of tuples over every recursive rule occurrence.
    pub fn recursive_rule_tuples(&self) -> i64 {
        saturating_sum(self.recursive_rules().map(|r| r.num_tuples))
    }

    /// Every recursive rule occurrence, iteration by iteration.
    pub fn recursive_rules(&self) -> impl Iterator<Item = &Rule> {
        self.iterations.iter().flat_map(|i| i.rules.values())
    }

    /// Identifier for a recursive rule: stable across iterations by name.
    fn recursive_rule_id(&mut self, rule_name: &str) -> String {
        if let Some(id) = self.recursive_ids.get(rule_name) {
            return id.clone();
        }
        self.recursive_counter += 1;
        let id = format!("C{}.{}", self.number, self.recursive_counter);
        self.recursive_ids.insert(rule_name.to_string(), id.clone());
        id
    }

    /// The iteration a recursive event applies to. Opens a new one after a
    /// copy-time event or when none exists yet.
    fn current_iteration(&mut self) -> &mut Iteration {
        if self.ready || self.iterations.is_empty() {
            self.iterations.push(Iteration::default());
            self.ready = false;
        }
        let last = self.iterations.len() - 1;
        &mut self.iterations[last]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    name: String,
    id: String,
    runtime: f64,
    /// Tuples produced by this occurrence only.
    num_tuples: i64,
    locator: String,
    version: u32,
}

impl Rule {
    fn new(name: &str, id: String) -> Self {
        Self {
            name: name.to_string(),
            id,
            runtime: 0.0,
            num_tuples: 0,
            locator: String::new(),
            version: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn runtime(&self) -> f64 {
        self.runtime
    }

    pub fn num_tuples(&self) -> i64 {
        self.num_tuples
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

/// One semi-naive pass over a recursive relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    runtime: f64,
    num_tuples: i64,
    copy_time: f64,
    locator: String,
    rules: BTreeMap<String, Rule>,
}

#[cfg(test)]
impl Iteration {
    pub fn runtime(&self) -> f64 {
        self.runtime
    }

    pub fn num_tuples(&self) -> i64 {
        self.num_tuples
    }

    pub fn copy_time(&self) -> f64 {
        self.copy_time
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn rules(&self) -> &BTreeMap<String, Rule> {
        &self.rules
    }
}
