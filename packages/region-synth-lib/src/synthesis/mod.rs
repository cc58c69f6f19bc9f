use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::{Duration, Instant},
};

use num::{BigInt, One, Signed, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::SynthesisConfig,
    equivalence::EquivalenceRelation,
    logger::{LogLevel, Logger},
    net::{NetError, PetriNet},
    properties::PropertySet,
    region::{Region, RegionError, RegionSpace},
    separation::{Separation, SeparationError, SeparationProblem, create_separation},
    ts::{EventId, StateId, TransitionSystem, TsError, language::language_transform},
    utils::is_cancellation_requested,
    validation::{assert_isomorphic, assert_region_valid, assert_same_language, property_violations},
};

pub mod minimizer;
pub mod report;

pub use minimizer::RegionSetMinimizer;
pub use report::{SynthesisReport, SynthesisStatistics};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("the transition system has no initial state")]
    MissingInitialState,
    #[error(transparent)]
    Separation(#[from] SeparationError),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error("synthesis was cancelled")]
    Cancelled,
    #[error("synthesis exceeded its time limit of {0:?}")]
    Timeout(Duration),
    #[error("the language transform exceeded {0} states")]
    UnfoldingLimitExceeded(usize),
}

impl From<TsError> for SynthesisError {
    fn from(error: TsError) -> Self {
        match error {
            TsError::MissingInitialState => SynthesisError::MissingInitialState,
            TsError::UnfoldingLimitExceeded(limit) => SynthesisError::UnfoldingLimitExceeded(limit),
        }
    }
}

/// What the behavior of the synthesized net has to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisMode {
    /// The reachability graph is isomorphic to the transition system.
    Isomorphic,
    /// The net has the same language as the transition system.
    Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesisPhase {
    Init,
    SolvingEssp,
    SolvingSsp,
    Minimizing,
    Done,
}

/// Separation problems no region could be found for.
///
/// Event/state failures are grouped by event. State pairs that could not be
/// separated are joined in an equivalence relation, so every group of states
/// that are transitively confused is reported once.
#[derive(Debug, Clone, Default)]
pub struct FailureRecord {
    events: BTreeMap<EventId, BTreeSet<StateId>>,
    states: EquivalenceRelation<StateId>,
}

impl FailureRecord {
    pub fn record_event(&mut self, state: StateId, event: EventId) {
        self.events.entry(event).or_default().insert(state);
    }

    pub fn record_states(&mut self, first: StateId, second: StateId) {
        self.states.join_classes(&first, &second);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.states.is_empty()
    }

    pub fn failed_event_separation(&self) -> &BTreeMap<EventId, BTreeSet<StateId>> {
        &self.events
    }

    pub fn failed_state_separation(&self) -> Vec<BTreeSet<StateId>> {
        self.states
            .classes()
            .into_iter()
            .map(|class| class.into_iter().collect())
            .collect()
    }
}

/// Synthesizes a Petri net from a transition system with region theory.
///
/// The whole run happens while the engine is built:
///
/// 1. Every event/state separation problem of the reachable part is solved,
///    known regions are tried before the separation strategy is asked.
/// 2. Unless only the language matters, the states are split into families
///    by the markings the known regions assign. Every pair of states within a
///    family is a state separation problem and is solved the same way.
/// 3. The regions are reduced with a [RegionSetMinimizer].
/// 4. Events no region consumes from get a side condition place, so every
///    transition has a nonempty preset.
///
/// Unsolvable problems are recorded and do not stop the run unless
/// `quick_fail` is configured. With `verify` set, every region and the final
/// net are checked and a violation panics.
#[derive(Debug)]
pub struct SynthesisEngine {
    ts: TransitionSystem,
    space: Arc<RegionSpace>,
    properties: PropertySet,
    config: SynthesisConfig,
    mode: SynthesisMode,
    phase: SynthesisPhase,
    regions: Vec<Region>,
    failures: FailureRecord,
    statistics: SynthesisStatistics,
}

impl SynthesisEngine {
    /// Synthesizes a net whose reachability graph is isomorphic to `ts`.
    pub fn isomorphic(
        ts: &TransitionSystem,
        properties: PropertySet,
        config: SynthesisConfig,
        logger: Option<&Logger>,
    ) -> Result<Self, SynthesisError> {
        Self::with_regions(ts, properties, config, SynthesisMode::Isomorphic, &[], logger)
    }

    /// Synthesizes a net with the same language as `ts`. The transition system
    /// is made deterministic and minimal first.
    pub fn language(
        ts: &TransitionSystem,
        properties: PropertySet,
        config: SynthesisConfig,
        logger: Option<&Logger>,
    ) -> Result<Self, SynthesisError> {
        Self::with_regions(ts, properties, config, SynthesisMode::Language, &[], logger)
    }

    /// Like [SynthesisEngine::isomorphic] or [SynthesisEngine::language], but
    /// starts out with the given regions. Regions that are inconsistent with
    /// `ts`, do not fit its alphabet or miss a requested property are ignored.
    pub fn with_regions(
        ts: &TransitionSystem,
        properties: PropertySet,
        config: SynthesisConfig,
        mode: SynthesisMode,
        regions: &[Region],
        logger: Option<&Logger>,
    ) -> Result<Self, SynthesisError> {
        let start = Instant::now();

        let ts = match mode {
            SynthesisMode::Isomorphic => ts.clone(),
            SynthesisMode::Language => {
                language_transform(ts, *config.get_max_unfolding_states())?
            }
        };
        if ts.initial().is_none() {
            return Err(SynthesisError::MissingInitialState);
        }

        let space = Arc::new(RegionSpace::new(&ts)?);
        let separation = create_separation(space.clone(), properties, &config)?;

        let mut seeded = vec![];
        for region in regions {
            let region = match region.rebase(space.clone()) {
                Ok(region) => region,
                Err(e) => {
                    tracing::debug!("Ignoring seeded {}: {}", region, e);
                    continue;
                }
            };
            if region.check_consistency().is_ok() && region.satisfies(&properties) {
                if !seeded.contains(&region) {
                    seeded.push(region);
                }
            } else {
                tracing::debug!("Ignoring seeded {}", region);
            }
        }

        let mut engine = SynthesisEngine {
            ts,
            space,
            properties,
            config,
            mode,
            phase: SynthesisPhase::Init,
            regions: seeded,
            failures: FailureRecord::default(),
            statistics: SynthesisStatistics::default(),
        };

        engine.print_start_banner(logger);
        engine.run(separation.as_ref(), start, logger)?;
        engine.statistics.time = start.elapsed();
        engine.print_end_banner(logger);

        if *engine.config.get_verify() {
            engine.verify();
        }

        Ok(engine)
    }

    fn run(
        &mut self,
        separation: &dyn Separation,
        start: Instant,
        logger: Option<&Logger>,
    ) -> Result<(), SynthesisError> {
        self.solve_essp(separation, start, logger)?;

        if self.phase != SynthesisPhase::Done && self.mode == SynthesisMode::Isomorphic {
            self.solve_ssp(separation, start, logger)?;
        }

        if self.phase != SynthesisPhase::Done {
            self.minimize(logger);
            self.add_guard_regions()?;
        }

        self.phase = SynthesisPhase::Done;
        Ok(())
    }

    fn check_interrupt(&self, start: Instant) -> Result<(), SynthesisError> {
        if is_cancellation_requested() {
            return Err(SynthesisError::Cancelled);
        }

        if let Some(timeout) = self.config.get_timeout()
            && start.elapsed() >= *timeout
        {
            return Err(SynthesisError::Timeout(*timeout));
        }

        Ok(())
    }

    /// Tries the known regions first, then the strategy. Returns whether the
    /// problem is solved.
    fn solve_problem(&mut self, problem: SeparationProblem, separation: &dyn Separation) -> bool {
        if self.regions.iter().any(|r| problem.is_solved_by(r)) {
            self.statistics.reused_regions += 1;
            return true;
        }

        self.statistics.strategy_calls += 1;
        let Some(region) = separation.separate(problem) else {
            return false;
        };

        if *self.config.get_verify() {
            assert_region_valid(&region, &self.properties);
            assert!(
                problem.is_solved_by(&region),
                "{} returned for {} does not solve it",
                region,
                problem
            );
        }

        tracing::debug!("{} solved by {}", problem, region);

        if !self.regions.contains(&region) {
            self.regions.push(region);
            self.statistics.new_regions += 1;
        }

        true
    }

    fn solve_essp(
        &mut self,
        separation: &dyn Separation,
        start: Instant,
        logger: Option<&Logger>,
    ) -> Result<(), SynthesisError> {
        self.phase = SynthesisPhase::SolvingEssp;

        let reachable = self.space.reachable_states().to_vec();
        for state in reachable {
            self.check_interrupt(start)?;

            for event in 0..self.ts.event_count() {
                if self.ts.is_enabled(state, event) {
                    continue;
                }

                self.statistics.event_problems += 1;
                let problem = SeparationProblem::EventState { state, event };
                if self.solve_problem(problem, separation) {
                    continue;
                }

                if let Some(l) = logger {
                    l.info(&format!(
                        "Event '{}' cannot be disabled in state '{}'",
                        self.ts.event_label(event),
                        self.ts.state_name(state)
                    ));
                }
                self.failures.record_event(state, event);

                if *self.config.get_quick_fail() {
                    if let Some(l) = logger {
                        l.warn("Stopping at the first unsolvable problem");
                    }
                    self.phase = SynthesisPhase::Done;
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    fn solve_ssp(
        &mut self,
        separation: &dyn Separation,
        start: Instant,
        logger: Option<&Logger>,
    ) -> Result<(), SynthesisError> {
        self.phase = SynthesisPhase::SolvingSsp;

        let mut families: Vec<Vec<StateId>> = vec![self.ts.states().collect()];
        for region in &self.regions {
            if families.iter().all(|f| f.len() <= 1) {
                break;
            }

            families = families
                .into_iter()
                .flat_map(|family| split_family(region, family))
                .filter(|family| family.len() > 1)
                .collect();
        }

        for family in families {
            let members: Vec<StateId> = family
                .into_iter()
                .filter(|s| self.space.is_reachable(*s))
                .collect();

            for (i, &first) in members.iter().enumerate() {
                for &second in &members[(i + 1)..] {
                    self.check_interrupt(start)?;

                    self.statistics.state_problems += 1;
                    let problem = SeparationProblem::StateState { first, second };
                    if self.solve_problem(problem, separation) {
                        continue;
                    }

                    if let Some(l) = logger {
                        l.info(&format!(
                            "States '{}' and '{}' cannot be separated",
                            self.ts.state_name(first),
                            self.ts.state_name(second)
                        ));
                    }
                    self.failures.record_states(first, second);

                    if *self.config.get_quick_fail() {
                        if let Some(l) = logger {
                            l.warn("Stopping at the first unsolvable problem");
                        }
                        self.phase = SynthesisPhase::Done;
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    fn minimize(&mut self, logger: Option<&Logger>) {
        self.phase = SynthesisPhase::Minimizing;
        self.statistics.regions_before_minimization = self.regions.len();

        let minimizer = RegionSetMinimizer::for_system(
            &self.ts,
            &self.space,
            self.mode == SynthesisMode::Isomorphic,
        );
        let mut regions = minimizer.minimize(&self.regions);
        if *self.config.get_minimize() {
            regions = minimizer.remove_redundant(regions);
        }

        if let Some(l) = logger {
            l.debug(&format!(
                "Minimized {} regions to {}",
                self.regions.len(),
                regions.len()
            ));
        }

        self.regions = regions;
        self.statistics.regions_after_minimization = self.regions.len();
    }

    /// Adds a place with one token and a loop of weight one for every event
    /// that no region consumes from. Such a place never changes its marking,
    /// so the behavior stays the same. Skipped if pure nets are requested or
    /// places may not hold a token.
    fn add_guard_regions(&mut self) -> Result<(), SynthesisError> {
        if self.properties.is_pure() || self.properties.bound() == Some(0) {
            return Ok(());
        }

        let event_count = self.space.event_count();
        for event in 0..event_count {
            if self
                .regions
                .iter()
                .any(|r| r.backward_weight(event).is_positive())
            {
                continue;
            }

            let mut loop_weights = vec![BigInt::zero(); event_count];
            loop_weights[event] = BigInt::one();
            let guard = Region::new(
                self.space.clone(),
                loop_weights.clone(),
                loop_weights,
                BigInt::one(),
            )?;

            tracing::debug!("Adding side condition {}", guard);
            self.regions.push(guard);
            self.statistics.guard_regions += 1;
        }

        Ok(())
    }

    fn verify(&self) {
        for region in &self.regions {
            assert_region_valid(region, &self.properties);
        }

        let net = match self.synthesize_petri_net() {
            Ok(Some(net)) => net,
            Ok(None) => return,
            Err(e) => panic!("Failed to build the net of a successful synthesis: {}", e),
        };

        // the reachability graph can not be larger than the transition system
        let graph = match net.reachability_graph(self.ts.state_count() + 1) {
            Ok(graph) => graph,
            Err(e) => panic!("Failed to explore the synthesized net: {}", e),
        };

        match self.mode {
            SynthesisMode::Isomorphic => assert_isomorphic(&graph.ts, &self.ts),
            SynthesisMode::Language => assert_same_language(
                &graph.ts,
                &self.ts,
                *self.config.get_max_unfolding_states(),
            ),
        }

        let violations = property_violations(&net, &graph, &self.properties, &self.ts);
        assert!(
            violations.is_empty(),
            "The synthesized net violates requested properties: {}",
            violations.join(", ")
        );
    }

    pub fn was_successfully_separated(&self) -> bool {
        self.failures.is_empty()
    }

    /// The net, `None` if some separation problem is unsolved.
    pub fn synthesize_petri_net(&self) -> Result<Option<PetriNet>, NetError> {
        if !self.was_successfully_separated() {
            return Ok(None);
        }

        PetriNet::from_regions(self.ts.name(), &self.space, &self.regions).map(Some)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn failures(&self) -> &FailureRecord {
        &self.failures
    }

    pub fn failed_event_separation(&self) -> &BTreeMap<EventId, BTreeSet<StateId>> {
        self.failures.failed_event_separation()
    }

    pub fn failed_state_separation(&self) -> Vec<BTreeSet<StateId>> {
        self.failures.failed_state_separation()
    }

    pub fn statistics(&self) -> &SynthesisStatistics {
        &self.statistics
    }

    pub fn phase(&self) -> SynthesisPhase {
        self.phase
    }

    pub fn mode(&self) -> SynthesisMode {
        self.mode
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// The transition system the regions belong to. In language mode this is
    /// the transformed system.
    pub fn transition_system(&self) -> &TransitionSystem {
        &self.ts
    }

    pub fn space(&self) -> &Arc<RegionSpace> {
        &self.space
    }

    pub fn report(&self) -> Result<SynthesisReport, NetError> {
        let state_names = |states: &BTreeSet<StateId>| {
            states
                .iter()
                .map(|s| self.ts.state_name(*s).to_string())
                .collect::<Vec<_>>()
        };

        Ok(SynthesisReport {
            name: self.ts.name().to_string(),
            mode: self.mode,
            properties: self.properties,
            success: self.was_successfully_separated(),
            failed_event_separation: self
                .failed_event_separation()
                .iter()
                .map(|(event, states)| (self.ts.event_label(*event).to_string(), state_names(states)))
                .collect(),
            failed_state_separation: self
                .failed_state_separation()
                .iter()
                .map(state_names)
                .collect(),
            regions: self.regions.iter().map(|r| r.to_string()).collect(),
            statistics: self.statistics.clone(),
            net: self.synthesize_petri_net()?,
        })
    }

    fn print_start_banner(&self, logger: Option<&Logger>) {
        if let Some(l) = logger {
            l.object("Synthesis Info")
                .add_field("name", self.ts.name())
                .add_field("mode", format!("{:?}", self.mode))
                .add_field("properties", self.properties)
                .add_field("strategy", self.config.get_strategy())
                .add_field("states", self.ts.state_count())
                .add_field("events", self.ts.event_count())
                .add_field("basis size", self.space.basis().len())
                .log(LogLevel::Info);
        }
    }

    fn print_end_banner(&self, logger: Option<&Logger>) {
        if let Some(l) = logger {
            l.object("Result")
                .add_field("success", self.was_successfully_separated())
                .add_field("event problems", self.statistics.event_problems)
                .add_field("state problems", self.statistics.state_problems)
                .add_field("strategy calls", self.statistics.strategy_calls)
                .add_field("new regions", self.statistics.new_regions)
                .add_field("places", self.regions.len())
                .add_field("time", format!("{:?}", self.statistics.time))
                .log(LogLevel::Info);
        }
    }
}

/// Groups the states of a family by their marking under `region`. States the
/// region assigns no marking to are dropped.
fn split_family(region: &Region, family: Vec<StateId>) -> Vec<Vec<StateId>> {
    let mut groups: BTreeMap<BigInt, Vec<StateId>> = BTreeMap::new();
    for state in family {
        if let Ok(marking) = region.marking_for_state(state) {
            groups.entry(marking).or_default().push(state);
        }
    }

    groups.into_values().collect()
}
