use region_synth_lib::{
    config::SynthesisConfig,
    properties::PropertySet,
    synthesis::{SynthesisEngine, SynthesisError},
    ts::TransitionSystem,
    utils::{is_cancellation_requested, request_cancellation, reset_cancellation},
};

// The cancellation flag is shared by the whole process, so everything touching
// it lives in this one test.
#[test]
fn test_cancellation() {
    let mut ts = TransitionSystem::named("cycle");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s1, "b", s0);
    ts.set_initial(s0);

    request_cancellation();
    assert!(is_cancellation_requested());

    let result = SynthesisEngine::isomorphic(&ts, PropertySet::new(), SynthesisConfig::default(), None);
    assert!(matches!(result, Err(SynthesisError::Cancelled)));

    reset_cancellation();
    assert!(!is_cancellation_requested());

    let engine =
        SynthesisEngine::isomorphic(&ts, PropertySet::new(), SynthesisConfig::default(), None)
            .unwrap();
    assert!(engine.was_successfully_separated());
}
