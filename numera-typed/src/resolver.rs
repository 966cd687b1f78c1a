//! Call-time resolution.
//!
//! Resolution inspects the runtime classification of every argument, walks
//! the table's decision structure for exact candidates, and falls back to
//! conversion search when nothing matches exactly. The winning plan is
//! memoized per classification tuple; applying a plan re-runs conversions on
//! the concrete values, so a cache hit and a cold resolution always behave
//! identically.

use crate::conversion::ConversionPath;
use crate::error::CallError;
use crate::registry::TypeId;
use crate::table::{Branch, DispatchTable, Score};
use crate::typed::Implementation;
use numera_values::Value;
use std::sync::Arc;

/// A memoized resolution outcome: the winning branch and the conversion
/// chain (if any) per argument position
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    pub(crate) branch: usize,
    pub(crate) conversions: Vec<Option<ConversionPath>>,
}

/// A successful resolution: the implementation to run and the concrete
/// (possibly converted) argument list
pub struct Resolution {
    pub implementation: Implementation,
    pub arguments: Vec<Value>,
    /// Index of the winning declared signature
    pub signature_index: usize,
}

impl Resolution {
    /// Run the resolved implementation on the converted arguments
    pub fn invoke(&self) -> Result<Value, CallError> {
        (self.implementation.as_ref())(&self.arguments)
    }
}

impl DispatchTable {
    /// Select the most specific implementation for the given arguments
    pub fn resolve(&self, args: &[Value]) -> Result<Resolution, CallError> {
        let classifications: Vec<Vec<TypeId>> = args
            .iter()
            .map(|arg| self.registry.classify_ids(arg))
            .collect();

        if let Some(plan) = self
            .memo
            .read()
            .ok()
            .and_then(|memo| memo.get(&classifications).cloned())
        {
            return self.apply_plan(&plan, args);
        }

        let plan = Arc::new(self.resolve_uncached(args, &classifications)?);
        if let Ok(mut memo) = self.memo.write() {
            memo.insert(classifications, plan.clone());
        }
        self.apply_plan(&plan, args)
    }

    fn resolve_uncached(
        &self,
        args: &[Value],
        classifications: &[Vec<TypeId>],
    ) -> Result<ResolutionPlan, CallError> {
        let count = args.len();

        // Exact phase: trie walk over the fixed-arity bucket, plus the
        // variadic side list.
        let mut candidates = self
            .fixed_index
            .get(&count)
            .map(|trie| trie.lookup(classifications))
            .unwrap_or_default();
        for &branch_index in &self.variadic {
            let branch = &self.branches[branch_index];
            if branch.arity_covers(count) && self.branch_matches(branch, classifications) {
                candidates.push(branch_index);
            }
        }

        if !candidates.is_empty() {
            return self.pick_exact(&candidates, classifications);
        }

        // Conversion phase: cheapest total conversion cost over all branches
        // covering this arity.
        self.pick_with_conversions(classifications)
    }

    fn branch_matches(&self, branch: &Branch, classifications: &[Vec<TypeId>]) -> bool {
        classifications.iter().enumerate().all(|(position, class)| {
            let accepted = branch.accepted_at(position);
            class.iter().any(|id| accepted.contains(id))
        })
    }

    /// Specificity of an exact candidate: per position, the rank of the most
    /// specific classified type the branch accepts
    fn call_score(&self, branch: &Branch, classifications: &[Vec<TypeId>]) -> Score {
        let ranks = classifications
            .iter()
            .enumerate()
            .map(|(position, class)| {
                let accepted = branch.accepted_at(position);
                class
                    .iter()
                    .filter(|id| accepted.contains(id))
                    .map(|&id| self.registry.rank_of(id))
                    .min()
                    .expect("exact candidates intersect at every position")
            })
            .collect();
        Score {
            ranks,
            variadic: branch.rest.is_some() as u8,
            loose: classifications.len().saturating_sub(branch.fixed.len()) as u32,
        }
    }

    fn pick_exact(
        &self,
        candidates: &[usize],
        classifications: &[Vec<TypeId>],
    ) -> Result<ResolutionPlan, CallError> {
        let mut best: Option<(Score, usize)> = None;
        let mut tied: Vec<usize> = Vec::new();
        for &branch_index in candidates {
            let branch = &self.branches[branch_index];
            let score = self.call_score(branch, classifications);
            let replaces = match &best {
                None => true,
                Some((best_score, _)) => score < *best_score,
            };
            if replaces {
                best = Some((score, branch_index));
                tied.clear();
            } else if let Some((best_score, best_branch)) = &best {
                if score == *best_score && branch.entry != self.branches[*best_branch].entry {
                    tied.push(branch.entry);
                }
            }
        }

        let (_, winner) = best.expect("pick_exact is only called with candidates");
        if !tied.is_empty() {
            return Err(self.ambiguous(self.branches[winner].entry, &tied, classifications));
        }
        Ok(ResolutionPlan {
            branch: winner,
            conversions: vec![None; classifications.len()],
        })
    }

    fn pick_with_conversions(
        &self,
        classifications: &[Vec<TypeId>],
    ) -> Result<ResolutionPlan, CallError> {
        let count = classifications.len();
        let mut best: Option<(u32, Score, usize, Vec<Option<ConversionPath>>)> = None;
        let mut tied: Vec<usize> = Vec::new();

        for (branch_index, branch) in self.branches.iter().enumerate() {
            if !branch.arity_covers(count) {
                continue;
            }

            let mut plan = Vec::with_capacity(count);
            let mut ranks = Vec::with_capacity(count);
            let mut total = 0u32;
            let mut resolvable = true;
            for (position, class) in classifications.iter().enumerate() {
                let accepted = branch.accepted_at(position);
                if let Some(rank) = class
                    .iter()
                    .filter(|id| accepted.contains(id))
                    .map(|&id| self.registry.rank_of(id))
                    .min()
                {
                    plan.push(None);
                    ranks.push(rank);
                    continue;
                }

                // Convert from the argument's most specific type to the
                // cheapest reachable accepted type; ties go to the more
                // specific target.
                let from = class[0];
                let mut chosen: Option<(u32, u32, ConversionPath)> = None;
                for &target in accepted {
                    if let Some(path) =
                        self.conversions
                            .find_path(from, target, self.options.max_conversion_hops)
                    {
                        let target_rank = self.registry.rank_of(target);
                        let improves = match &chosen {
                            None => true,
                            Some((cost, rank, _)) => (path.total_cost, target_rank) < (*cost, *rank),
                        };
                        if improves {
                            chosen = Some((path.total_cost, target_rank, path));
                        }
                    }
                }
                match chosen {
                    Some((cost, target_rank, path)) => {
                        total += cost;
                        ranks.push(target_rank);
                        plan.push(Some(path));
                    }
                    None => {
                        resolvable = false;
                        break;
                    }
                }
            }
            if !resolvable {
                continue;
            }

            let score = Score {
                ranks,
                variadic: branch.rest.is_some() as u8,
                loose: count.saturating_sub(branch.fixed.len()) as u32,
            };
            let replaces = match &best {
                None => true,
                Some((best_total, best_score, _, _)) => (total, &score) < (*best_total, best_score),
            };
            if replaces {
                best = Some((total, score, branch_index, plan));
                tied.clear();
            } else if let Some((best_total, best_score, best_branch, _)) = &best {
                if total == *best_total
                    && score == *best_score
                    && branch.entry != self.branches[*best_branch].entry
                {
                    tied.push(branch.entry);
                }
            }
        }

        match best {
            Some((_, _, winner, plan)) if tied.is_empty() => Ok(ResolutionPlan {
                branch: winner,
                conversions: plan,
            }),
            Some((_, _, winner, _)) => {
                Err(self.ambiguous(self.branches[winner].entry, &tied, classifications))
            }
            None => Err(self.no_match(classifications)),
        }
    }

    fn apply_plan(&self, plan: &ResolutionPlan, args: &[Value]) -> Result<Resolution, CallError> {
        let branch = &self.branches[plan.branch];
        let mut arguments = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            match plan.conversions.get(position).and_then(|p| p.as_ref()) {
                Some(path) => arguments.push(self.conversions.apply(path, arg)?),
                None => arguments.push(arg.clone()),
            }
        }
        let entry = &self.entries[branch.entry];
        Ok(Resolution {
            implementation: entry.implementation.clone(),
            arguments,
            signature_index: branch.entry,
        })
    }

    fn provided_names(&self, classifications: &[Vec<TypeId>]) -> Vec<&str> {
        classifications
            .iter()
            .map(|class| self.registry.name_of(class[0]))
            .collect()
    }

    fn ambiguous(
        &self,
        winner_entry: usize,
        tied: &[usize],
        classifications: &[Vec<TypeId>],
    ) -> CallError {
        let mut entries: Vec<usize> = std::iter::once(winner_entry)
            .chain(tied.iter().copied())
            .collect();
        entries.sort_unstable();
        entries.dedup();
        let candidates: Vec<&str> = entries
            .iter()
            .map(|&entry| self.entries[entry].signature.source())
            .collect();
        CallError::ambiguous_call(&self.name, &self.provided_names(classifications), &candidates)
    }

    fn no_match(&self, classifications: &[Vec<TypeId>]) -> CallError {
        let expected: Vec<&str> = self
            .entries
            .iter()
            .map(|entry| entry.signature.source())
            .collect();
        CallError::no_match(&self.name, &self.provided_names(classifications), &expected)
    }
}
