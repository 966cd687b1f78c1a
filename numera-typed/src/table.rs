//! Dispatch table construction.
//!
//! A dispatch table owns every (signature, implementation) pair of one typed
//! function plus the derived decision structure. Construction expands union
//! signatures into concrete branches, validates the set for duplicates and
//! ambiguity, and indexes the branches first by argument count and then by a
//! per-position type trie, so call-time lookup walks O(arity) nodes rather
//! than scanning every signature.

use crate::conversion::ConversionGraph;
use crate::error::BuildError;
use crate::registry::{TypeId, TypeRegistry};
use crate::resolver::ResolutionPlan;
use crate::signature::Signature;
use crate::typed::Implementation;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Tuning knobs for one dispatch table
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Longest conversion chain considered when no signature matches exactly.
    /// Kept at 1 by default so conversion resolution stays predictable.
    pub max_conversion_hops: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            max_conversion_hops: 1,
        }
    }
}

/// One declared signature with its materialized implementation body
#[derive(Clone)]
pub(crate) struct TableEntry {
    pub signature: Signature,
    pub implementation: Implementation,
}

/// A concrete expansion of a declared signature: one type per fixed position,
/// plus the accepted set for rest-consumed positions
#[derive(Debug, Clone)]
pub(crate) struct Branch {
    pub entry: usize,
    pub fixed: Vec<TypeId>,
    pub rest: Option<Vec<TypeId>>,
}

impl Branch {
    pub fn arity_covers(&self, count: usize) -> bool {
        match self.rest {
            // A rest parameter consumes at least one argument.
            Some(_) => count > self.fixed.len(),
            None => count == self.fixed.len(),
        }
    }

    /// Accepted types at a positional argument of a call this branch covers
    pub fn accepted_at(&self, position: usize) -> &[TypeId] {
        if position < self.fixed.len() {
            std::slice::from_ref(&self.fixed[position])
        } else {
            self.rest
                .as_deref()
                .expect("positions past the fixed prefix exist only on rest branches")
        }
    }
}

/// Specificity of a candidate at a concrete arity. Lower compares as better:
/// per-position ranks lexicographically, then fixed-over-rest, then fewer
/// rest-consumed positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Score {
    pub ranks: Vec<u32>,
    pub variadic: u8,
    pub loose: u32,
}

/// Specificity of a declared signature at arity `count`, independent of any
/// concrete call: each position contributes its most specific accepted rank.
pub(crate) fn static_score(registry: &TypeRegistry, signature: &Signature, count: usize) -> Score {
    let ranks = (0..count)
        .map(|position| {
            signature
                .accepted_at(position)
                .expect("arity was checked against the signature")
                .iter()
                .map(|&id| registry.rank_of(id))
                .min()
                .expect("parameters always accept at least one type")
        })
        .collect();
    let fixed = if signature.is_variadic() {
        signature.params().len() - 1
    } else {
        signature.params().len()
    };
    Score {
        ranks,
        variadic: signature.is_variadic() as u8,
        loose: count.saturating_sub(fixed) as u32,
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    edges: HashMap<TypeId, usize>,
    leaves: Vec<usize>,
}

/// Discrimination trie over the fixed positions of same-arity branches
#[derive(Debug)]
pub(crate) struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    fn insert(&mut self, path: &[TypeId], branch: usize) {
        let mut node = 0;
        for &id in path {
            let next = match self.nodes[node].edges.get(&id) {
                Some(&existing) => existing,
                None => {
                    let created = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].edges.insert(id, created);
                    created
                }
            };
            node = next;
        }
        self.nodes[node].leaves.push(branch);
    }

    /// Walk the trie with the per-argument classification lists, following
    /// every edge a classification matches, and collect the branches that
    /// terminate at full depth
    pub(crate) fn lookup(&self, classifications: &[Vec<TypeId>]) -> Vec<usize> {
        let mut current = vec![0usize];
        for classification in classifications {
            let mut next = Vec::new();
            for &node in &current {
                for id in classification {
                    if let Some(&target) = self.nodes[node].edges.get(id) {
                        if !next.contains(&target) {
                            next.push(target);
                        }
                    }
                }
            }
            if next.is_empty() {
                return Vec::new();
            }
            current = next;
        }
        let mut matches: Vec<usize> = current
            .iter()
            .flat_map(|&node| self.nodes[node].leaves.iter().copied())
            .collect();
        matches.sort_unstable();
        matches.dedup();
        matches
    }
}

/// Summary of a built table's decision structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub signatures: usize,
    pub branches: usize,
    pub fixed_arities: usize,
    pub variadic_branches: usize,
}

/// Immutable dispatch table for one named typed function
pub struct DispatchTable {
    pub(crate) name: String,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) conversions: Arc<ConversionGraph>,
    pub(crate) options: TableOptions,
    pub(crate) entries: Vec<TableEntry>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) fixed_index: HashMap<usize, Trie>,
    pub(crate) variadic: Vec<usize>,
    /// Memoized resolution plans keyed on classification tuples, never on
    /// values; resolution outcomes are identical with or without a hit.
    pub(crate) memo: RwLock<HashMap<Vec<Vec<TypeId>>, Arc<ResolutionPlan>>>,
}

impl DispatchTable {
    pub(crate) fn build(
        name: String,
        registry: Arc<TypeRegistry>,
        conversions: Arc<ConversionGraph>,
        options: TableOptions,
        entries: Vec<TableEntry>,
    ) -> Result<Self, BuildError> {
        for first in 0..entries.len() {
            for second in first + 1..entries.len() {
                validate_pair(
                    &name,
                    &registry,
                    &entries[first].signature,
                    &entries[second].signature,
                )?;
            }
        }

        let mut branches = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            expand_entry(index, &entry.signature, &mut branches);
        }

        let mut fixed_index: HashMap<usize, Trie> = HashMap::new();
        let mut variadic = Vec::new();
        for (branch_index, branch) in branches.iter().enumerate() {
            if branch.rest.is_some() {
                variadic.push(branch_index);
            } else {
                fixed_index
                    .entry(branch.fixed.len())
                    .or_insert_with(Trie::new)
                    .insert(&branch.fixed, branch_index);
            }
        }

        Ok(Self {
            name,
            registry,
            conversions,
            options,
            entries,
            branches,
            fixed_index,
            variadic,
            memo: RwLock::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> TableOptions {
        self.options
    }

    /// Declared signatures in declaration order
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.entries.iter().map(|entry| &entry.signature)
    }

    /// Smallest and largest argument counts any signature accepts;
    /// `None` = unbounded because of a rest parameter
    pub fn arity_bounds(&self) -> (usize, Option<usize>) {
        let min = self
            .entries
            .iter()
            .map(|entry| entry.signature.min_arity())
            .min()
            .unwrap_or(0);
        let mut max = Some(0usize);
        for entry in &self.entries {
            max = match (max, entry.signature.max_arity()) {
                (Some(current), Some(candidate)) => Some(current.max(candidate)),
                _ => None,
            };
        }
        (min, max)
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            signatures: self.entries.len(),
            branches: self.branches.len(),
            fixed_arities: self.fixed_index.len(),
            variadic_branches: self.variadic.len(),
        }
    }
}

fn expand_entry(entry: usize, signature: &Signature, branches: &mut Vec<Branch>) {
    if signature.is_variadic() {
        let fixed_params = &signature.params()[..signature.params().len() - 1];
        let sets: Vec<&[TypeId]> = fixed_params.iter().map(|p| p.accepted()).collect();
        let rest = signature
            .params()
            .last()
            .map(|p| p.accepted().to_vec())
            .expect("variadic signatures have a final rest parameter");
        for fixed in cartesian(&sets) {
            branches.push(Branch {
                entry,
                fixed,
                rest: Some(rest.clone()),
            });
        }
    } else {
        for count in signature.min_arity()..=signature.params().len() {
            let sets: Vec<&[TypeId]> = signature.params()[..count]
                .iter()
                .map(|p| p.accepted())
                .collect();
            for fixed in cartesian(&sets) {
                branches.push(Branch {
                    entry,
                    fixed,
                    rest: None,
                });
            }
        }
    }
}

fn cartesian(sets: &[&[TypeId]]) -> Vec<Vec<TypeId>> {
    let mut rows = vec![Vec::new()];
    for set in sets {
        let mut next = Vec::with_capacity(rows.len() * set.len());
        for prefix in &rows {
            for &id in *set {
                let mut row = prefix.clone();
                row.push(id);
                next.push(row);
            }
        }
        rows = next;
    }
    rows
}

/// Reject signature pairs that could never be told apart at call time:
/// identical patterns are duplicates, and statically overlapping patterns
/// with equal specificity have no defined precedence.
fn validate_pair(
    name: &str,
    registry: &TypeRegistry,
    first: &Signature,
    second: &Signature,
) -> Result<(), BuildError> {
    if first.pattern() == second.pattern() {
        return Err(BuildError::DuplicateSignature {
            function: name.to_string(),
            signature: first.source().to_string(),
        });
    }

    let low = first.min_arity().max(second.min_arity());
    let probe_limit = first.params().len().max(second.params().len()) + 1;
    let high = match (first.max_arity(), second.max_arity()) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        // Past one rest-consumed position the structure repeats, so probing
        // further arities cannot reveal new overlaps.
        (None, None) => probe_limit,
    };

    for count in low..=high {
        if !first.covers_arity(count) || !second.covers_arity(count) {
            continue;
        }
        let overlaps = (0..count).all(|position| {
            let a = first
                .accepted_at(position)
                .expect("arity is covered by the signature");
            let b = second
                .accepted_at(position)
                .expect("arity is covered by the signature");
            a.iter().any(|id| b.contains(id))
        });
        if overlaps
            && static_score(registry, first, count) == static_score(registry, second, count)
        {
            return Err(BuildError::AmbiguousSignatures {
                function: name.to_string(),
                first: first.source().to_string(),
                second: second.source().to_string(),
                arity: count,
            });
        }
    }
    Ok(())
}
