use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use num::BigInt;
use region_synth_lib::{
    config::{SeparationStrategyKind, SynthesisConfig},
    net::format::to_pn_format,
    properties::PropertySet,
    region::{Region, RegionSpace},
    separation::SeparationError,
    synthesis::{SynthesisEngine, SynthesisError, SynthesisMode, SynthesisPhase, SynthesisReport},
    ts::TransitionSystem,
    validation::{isomorphic, same_language},
};

fn config() -> SynthesisConfig {
    SynthesisConfig::default().with_verify(true)
}

/// `a` and `b` both lead from `s0` to `s1`.
fn choice() -> TransitionSystem {
    let mut ts = TransitionSystem::named("choice");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s0, "b", s1);
    ts.set_initial(s0);
    ts
}

/// A single state with an `a` loop.
fn self_loop() -> TransitionSystem {
    let mut ts = TransitionSystem::named("loop");
    let s0 = ts.add_state("s0");
    ts.add_arc_labeled(s0, "a", s0);
    ts.set_initial(s0);
    ts
}

/// `s0 --a--> s1 --b--> s2 --c--> s0`
fn three_cycle() -> TransitionSystem {
    let mut ts = TransitionSystem::named("ring");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    let s2 = ts.add_state("s2");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s1, "b", s2);
    ts.add_arc_labeled(s2, "c", s0);
    ts.set_initial(s0);
    ts
}

/// `a` nondeterministically leads into two copies of `b`.
fn split_choice() -> TransitionSystem {
    let mut ts = TransitionSystem::named("split");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    let s2 = ts.add_state("s2");
    let s3 = ts.add_state("s3");
    let s4 = ts.add_state("s4");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s0, "a", s2);
    ts.add_arc_labeled(s1, "b", s3);
    ts.add_arc_labeled(s2, "b", s4);
    ts.set_initial(s0);
    ts
}

fn assert_net_matches(engine: &SynthesisEngine, ts: &TransitionSystem) {
    let net = engine.synthesize_petri_net().unwrap().unwrap();
    let graph = net.reachability_graph(ts.state_count() + 1).unwrap();
    assert!(isomorphic(&graph.ts, ts));
}

#[test]
fn test_shared_place() {
    let ts = choice();
    let engine = SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None).unwrap();

    assert!(engine.was_successfully_separated());
    assert_eq!(engine.phase(), SynthesisPhase::Done);
    assert_eq!(engine.mode(), SynthesisMode::Isomorphic);
    assert_net_matches(&engine, &ts);

    // some place is consumed by both events
    let net = engine.synthesize_petri_net().unwrap().unwrap();
    assert!((0..net.place_count()).any(|p| net.postset(p).len() == 2));
}

#[test]
fn test_output_nonbranching_failure() {
    let ts = choice();
    let s1 = ts.require_state("s1").unwrap();
    let properties = PropertySet::new().set_output_nonbranching(true);

    let engine = SynthesisEngine::isomorphic(&ts, properties, config(), None).unwrap();

    assert!(!engine.was_successfully_separated());
    assert_eq!(
        engine.failed_event_separation(),
        &BTreeMap::from([(0, BTreeSet::from([s1])), (1, BTreeSet::from([s1]))])
    );
    assert!(engine.failed_state_separation().is_empty());
    assert!(engine.synthesize_petri_net().unwrap().is_none());
}

#[test]
fn test_quick_fail() {
    let ts = choice();
    let s1 = ts.require_state("s1").unwrap();
    let properties = PropertySet::new().set_output_nonbranching(true);

    let engine =
        SynthesisEngine::isomorphic(&ts, properties, config().with_quick_fail(true), None).unwrap();

    assert_eq!(
        engine.failed_event_separation(),
        &BTreeMap::from([(0, BTreeSet::from([s1]))])
    );
    assert_eq!(engine.phase(), SynthesisPhase::Done);
    assert_eq!(engine.statistics().strategy_calls, 1);
    assert_eq!(engine.statistics().regions_after_minimization, 0);
}

#[test]
fn test_side_condition() {
    let ts = self_loop();
    let engine =
        SynthesisEngine::isomorphic(&ts, PropertySet::new().require_safe(), config(), None).unwrap();

    assert!(engine.was_successfully_separated());
    assert_eq!(engine.statistics().new_regions, 0);
    assert_eq!(engine.statistics().guard_regions, 1);

    let net = engine.synthesize_petri_net().unwrap().unwrap();
    assert_eq!(net.place_count(), 1);
    assert_eq!(net.initial_marking(), vec![1]);
    assert_eq!(net.transition(0).input(), &[(1, 0)]);
    assert_eq!(net.transition(0).output(), &[(1, 0)]);
    assert_net_matches(&engine, &ts);
}

#[test]
fn test_no_side_condition_for_pure_nets() {
    let ts = self_loop();
    let engine =
        SynthesisEngine::isomorphic(&ts, PropertySet::new().set_pure(true), config(), None).unwrap();

    let net = engine.synthesize_petri_net().unwrap().unwrap();
    assert_eq!(net.place_count(), 0);
    assert_net_matches(&engine, &ts);
}

#[test]
fn test_marked_graph_ring() {
    let ts = three_cycle();
    let properties = PropertySet::new().set_marked_graph(true).require_safe();

    let engine = SynthesisEngine::isomorphic(&ts, properties, config(), None).unwrap();

    assert!(engine.was_successfully_separated());
    assert_eq!(engine.statistics().event_problems, 6);
    assert_net_matches(&engine, &ts);

    let net = engine.synthesize_petri_net().unwrap().unwrap();
    for place in 0..net.place_count() {
        assert_eq!(net.postset(place).len(), 1);
        assert_eq!(net.preset(place).len(), 1);
    }
}

#[test]
fn test_confused_states_are_grouped() {
    let mut ts = TransitionSystem::named("fan");
    let s0 = ts.add_state("s0");
    let targets: Vec<_> = (1..=3).map(|i| ts.add_state(format!("s{}", i))).collect();
    for target in &targets {
        ts.add_arc_labeled(s0, "a", *target);
    }
    ts.set_initial(s0);

    let engine = SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None).unwrap();

    assert!(engine.failed_event_separation().is_empty());
    assert_eq!(
        engine.failed_state_separation(),
        vec![targets.iter().copied().collect::<BTreeSet<_>>()]
    );
    assert_eq!(engine.statistics().state_problems, 3);
    assert!(!engine.was_successfully_separated());
}

#[test]
fn test_language_equivalence() {
    let ts = split_choice();

    let engine = SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None).unwrap();
    assert!(!engine.was_successfully_separated());
    assert_eq!(engine.failed_state_separation().len(), 2);

    let engine = SynthesisEngine::language(&ts, PropertySet::new(), config(), None).unwrap();
    assert!(engine.was_successfully_separated());
    assert_eq!(engine.mode(), SynthesisMode::Language);
    assert_eq!(engine.transition_system().state_count(), 3);
    assert_eq!(engine.statistics().state_problems, 0);

    let net = engine.synthesize_petri_net().unwrap().unwrap();
    let graph = net.reachability_graph(10).unwrap();
    assert!(same_language(&graph.ts, &ts, 100));
}

#[test]
fn test_unfolding_limit() {
    let config = config().with_max_unfolding_states(2);

    assert!(matches!(
        SynthesisEngine::language(&split_choice(), PropertySet::new(), config, None),
        Err(SynthesisError::UnfoldingLimitExceeded(2))
    ));
}

#[test]
fn test_missing_initial_state() {
    let mut ts = TransitionSystem::named("headless");
    ts.add_state("s0");

    assert!(matches!(
        SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None),
        Err(SynthesisError::MissingInitialState)
    ));
    assert!(matches!(
        SynthesisEngine::language(&ts, PropertySet::new(), config(), None),
        Err(SynthesisError::MissingInitialState)
    ));
}

#[test]
fn test_timeout() {
    let config = config().with_timeout(Some(Duration::ZERO));

    assert!(matches!(
        SynthesisEngine::isomorphic(&three_cycle(), PropertySet::new(), config, None),
        Err(SynthesisError::Timeout(_))
    ));
}

#[test]
fn test_seeded_regions_are_reused() {
    let ts = three_cycle();
    let properties = PropertySet::new().require_safe();
    let first = SynthesisEngine::isomorphic(&ts, properties, config(), None).unwrap();
    assert!(first.statistics().new_regions > 0);

    let second = SynthesisEngine::with_regions(
        &ts,
        properties,
        config(),
        SynthesisMode::Isomorphic,
        first.regions(),
        None,
    )
    .unwrap();

    assert!(second.was_successfully_separated());
    assert_eq!(second.statistics().new_regions, 0);
    assert_eq!(second.statistics().strategy_calls, 0);
    assert_eq!(second.statistics().state_problems, 0);
}

#[test]
fn test_invalid_seeds_are_ignored() {
    let ts = three_cycle();
    let space = SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None)
        .unwrap()
        .space()
        .clone();

    let zero = BigInt::from(0);
    let one = BigInt::from(1);
    // a produces a token that never leaves
    let broken = Region::new(
        space.clone(),
        vec![zero.clone(), zero.clone(), zero.clone()],
        vec![one.clone(), zero.clone(), zero.clone()],
        zero.clone(),
    )
    .unwrap();
    // consistent, but not safe
    let heavy = Region::new(
        space,
        vec![zero.clone(), zero.clone(), BigInt::from(2)],
        vec![BigInt::from(2), zero.clone(), zero.clone()],
        zero,
    )
    .unwrap();
    assert!(heavy.check_consistency().is_ok());

    let engine = SynthesisEngine::with_regions(
        &ts,
        PropertySet::new().require_safe(),
        config(),
        SynthesisMode::Isomorphic,
        &[broken.clone(), heavy.clone()],
        None,
    )
    .unwrap();

    assert!(engine.was_successfully_separated());
    assert!(!engine.regions().contains(&broken));
    assert!(!engine.regions().contains(&heavy));

    // built for an alphabet with a single event
    let foreign_space = Arc::new(RegionSpace::new(&self_loop()).unwrap());
    let foreign = Region::new(foreign_space, vec![one.clone()], vec![one.clone()], one).unwrap();

    let engine = SynthesisEngine::with_regions(
        &ts,
        PropertySet::new(),
        config(),
        SynthesisMode::Isomorphic,
        &[foreign],
        None,
    )
    .unwrap();

    assert!(engine.was_successfully_separated());
    assert_net_matches(&engine, &ts);
}

/// `s0 --a--> s1 --b--> s0` plus a state `lost` that only has arcs of its own.
fn cycle_with_lost_state() -> TransitionSystem {
    let mut ts = TransitionSystem::named("lost");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    let lost = ts.add_state("lost");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s1, "b", s0);
    ts.add_arc_labeled(lost, "a", lost);
    ts.add_arc_labeled(lost, "b", s0);
    ts.set_initial(s0);
    ts
}

#[test]
fn test_unreachable_states_are_skipped() {
    let ts = cycle_with_lost_state();
    let engine = SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None).unwrap();

    assert!(engine.was_successfully_separated());
    assert!(engine.failed_event_separation().is_empty());
    assert!(engine.failed_state_separation().is_empty());
    // b in s0 and a in s1, nothing for lost
    assert_eq!(engine.statistics().event_problems, 2);
    assert_eq!(engine.statistics().state_problems, 0);
    assert_net_matches(&engine, &ts);
}

#[test]
fn test_unreachable_states_are_not_confused() {
    let mut ts = TransitionSystem::named("fan");
    let s0 = ts.add_state("s0");
    let targets: Vec<_> = (1..=3).map(|i| ts.add_state(format!("s{}", i))).collect();
    for target in &targets {
        ts.add_arc_labeled(s0, "a", *target);
    }
    let lost = ts.add_state("lost");
    ts.add_arc_labeled(lost, "a", lost);
    ts.set_initial(s0);

    let engine = SynthesisEngine::isomorphic(&ts, PropertySet::new(), config(), None).unwrap();

    // only the pairs of the three reachable targets
    assert_eq!(engine.statistics().state_problems, 3);
    let groups = engine.failed_state_separation();
    assert_eq!(groups, vec![targets.iter().copied().collect::<BTreeSet<_>>()]);
    assert!(groups.iter().all(|group| !group.contains(&lost)));
}

#[test]
fn test_minimize_option() {
    let ts = three_cycle();
    let engine =
        SynthesisEngine::isomorphic(&ts, PropertySet::new(), config().with_minimize(true), None)
            .unwrap();

    let statistics = engine.statistics();
    assert!(statistics.regions_after_minimization <= statistics.regions_before_minimization);
    assert_net_matches(&engine, &ts);
}

#[test]
fn test_pure_basis_strategy() {
    let ts = three_cycle();
    let config = config().with_strategy(SeparationStrategyKind::PureBasis);

    let engine = SynthesisEngine::isomorphic(
        &ts,
        PropertySet::new().set_pure(true).require_safe(),
        config.clone(),
        None,
    )
    .unwrap();
    assert!(engine.was_successfully_separated());
    assert_net_matches(&engine, &ts);

    assert!(matches!(
        SynthesisEngine::isomorphic(&ts, PropertySet::new().set_tnet(true), config, None),
        Err(SynthesisError::Separation(
            SeparationError::UnsupportedProperties { .. }
        ))
    ));
}

#[test]
fn test_missing_location_is_reported() {
    let mut ts = choice();
    ts.add_event_with_location("a", "left");

    assert!(matches!(
        SynthesisEngine::isomorphic(&ts, PropertySet::new().set_distributed(true), config(), None),
        Err(SynthesisError::Separation(SeparationError::MissingLocation(_)))
    ));
}

#[test]
fn test_report() {
    let ts = choice();
    let engine = SynthesisEngine::isomorphic(
        &ts,
        PropertySet::new().set_output_nonbranching(true),
        config(),
        None,
    )
    .unwrap();

    let report = engine.report().unwrap();
    assert_eq!(report.name, "choice");
    assert!(!report.success);
    assert!(report.net.is_none());
    assert_eq!(
        report.failed_event_separation,
        BTreeMap::from([
            ("a".to_string(), vec!["s1".to_string()]),
            ("b".to_string(), vec!["s1".to_string()]),
        ])
    );

    let json = report.to_json().unwrap();
    assert!(json.contains("\"success\": false"));
    assert_eq!(SynthesisReport::from_json(&json).unwrap(), report);
}

#[test]
fn test_pn_output() {
    let ts = self_loop();
    let engine =
        SynthesisEngine::isomorphic(&ts, PropertySet::new().require_safe(), config(), None).unwrap();
    let net = engine.synthesize_petri_net().unwrap().unwrap();

    let text = to_pn_format(&net);
    println!("{}", text);
    assert!(text.contains(".name \"loop\""));
    assert!(text.contains("a: {p0} -> {p0}\n"));
    assert!(text.ends_with(".initial_marking {p0}\n"));
}
