use std::collections::BTreeSet;

use hashbrown::HashSet;

use crate::{
    region::{Region, RegionSpace},
    separation::SeparationProblem,
    ts::TransitionSystem,
};

/// Every separation problem of the reachable part, event/state problems first.
/// State problems are only listed if `include_states` is set.
pub fn separation_problems(
    ts: &TransitionSystem,
    space: &RegionSpace,
    include_states: bool,
) -> Vec<SeparationProblem> {
    let reachable = space.reachable_states();
    let mut problems = vec![];

    for &state in reachable {
        for event in 0..ts.event_count() {
            if !ts.is_enabled(state, event) {
                problems.push(SeparationProblem::EventState { state, event });
            }
        }
    }

    if include_states {
        for (i, &first) in reachable.iter().enumerate() {
            for &second in &reachable[(i + 1)..] {
                problems.push(SeparationProblem::StateState { first, second });
            }
        }
    }

    problems
}

/// Reduces a set of regions to one that still solves every problem the full
/// set solves.
///
/// This is a greedy cover and the result is not necessarily the smallest
/// such set:
///
/// 1. For every problem collect the regions solving it. Problems without any
///    solving region are ignored.
/// 2. A problem with a single candidate makes that region required. This is
///    done in one pass, candidates are not removed and re-checked afterwards.
/// 3. The remaining problems without a required solver are grouped by their
///    candidate set. Every group that is not hit by the selection so far adds
///    its first candidate.
#[derive(Debug, Clone)]
pub struct RegionSetMinimizer {
    problems: Vec<SeparationProblem>,
}

impl RegionSetMinimizer {
    pub fn new(problems: Vec<SeparationProblem>) -> Self {
        RegionSetMinimizer { problems }
    }

    pub fn for_system(ts: &TransitionSystem, space: &RegionSpace, include_states: bool) -> Self {
        Self::new(separation_problems(ts, space, include_states))
    }

    pub fn problems(&self) -> &[SeparationProblem] {
        &self.problems
    }

    fn candidates(&self, regions: &[Region]) -> Vec<Vec<usize>> {
        self.problems
            .iter()
            .map(|problem| {
                (0..regions.len())
                    .filter(|r| problem.is_solved_by(&regions[*r]))
                    .collect::<Vec<_>>()
            })
            .filter(|candidates| !candidates.is_empty())
            .collect()
    }

    pub fn minimize(&self, regions: &[Region]) -> Vec<Region> {
        let candidates = self.candidates(regions);

        let required: BTreeSet<usize> = candidates
            .iter()
            .filter(|c| c.len() == 1)
            .map(|c| c[0])
            .collect();

        let mut seen = HashSet::new();
        let buckets: Vec<&Vec<usize>> = candidates
            .iter()
            .filter(|c| !c.iter().any(|r| required.contains(r)))
            .filter(|c| seen.insert((*c).clone()))
            .collect();

        let mut selected = required.clone();
        for bucket in buckets {
            if !bucket.iter().any(|r| selected.contains(r)) {
                selected.insert(bucket[0]);
            }
        }

        tracing::debug!(
            "Kept {} of {} regions, {} of them required",
            selected.len(),
            regions.len(),
            required.len()
        );

        selected.into_iter().map(|r| regions[r].clone()).collect()
    }

    /// Drops regions one by one, in order, as long as every problem solved by
    /// the input is still solved. The result is irredundant but may still be
    /// larger than necessary.
    pub fn remove_redundant(&self, regions: Vec<Region>) -> Vec<Region> {
        let candidates = self.candidates(&regions);
        let mut kept = vec![true; regions.len()];

        for r in 0..regions.len() {
            kept[r] = false;
            let covered = candidates.iter().all(|c| c.iter().any(|x| kept[*x]));
            if !covered {
                kept[r] = true;
            }
        }

        regions
            .into_iter()
            .zip(kept)
            .filter(|(_, keep)| *keep)
            .map(|(region, _)| region)
            .collect()
    }
}
