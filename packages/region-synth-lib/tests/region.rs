use std::sync::Arc;

use num::BigInt;
use region_synth_lib::{
    properties::PropertySet,
    region::{Region, RegionError, RegionSpace},
    ts::TransitionSystem,
};

fn ints(values: &[i64]) -> Vec<BigInt> {
    values.iter().map(|x| BigInt::from(*x)).collect()
}

/// `s0 --a--> s1 --b--> s0`
fn two_cycle() -> TransitionSystem {
    let mut ts = TransitionSystem::named("cycle");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s1, "b", s0);
    ts.set_initial(s0);
    ts
}

/// `a` and `b` in either order, meeting in `s3`.
fn diamond() -> TransitionSystem {
    let mut ts = TransitionSystem::named("diamond");
    let s0 = ts.add_state("s0");
    let s1 = ts.add_state("s1");
    let s2 = ts.add_state("s2");
    let s3 = ts.add_state("s3");
    ts.add_arc_labeled(s0, "a", s1);
    ts.add_arc_labeled(s0, "b", s2);
    ts.add_arc_labeled(s1, "b", s3);
    ts.add_arc_labeled(s2, "a", s3);
    ts.set_initial(s0);
    ts
}

fn space_of(ts: &TransitionSystem) -> Arc<RegionSpace> {
    Arc::new(RegionSpace::new(ts).unwrap())
}

#[test]
fn test_space_of_cycle() {
    let ts = two_cycle();
    let space = space_of(&ts);
    let s0 = ts.require_state("s0").unwrap();
    let s1 = ts.require_state("s1").unwrap();

    assert_eq!(space.event_count(), 2);
    assert_eq!(space.reachable_states(), &[s0, s1]);
    assert_eq!(space.parikh_vector(s0), Some(&[0, 0][..]));
    assert_eq!(space.parikh_vector(s1), Some(&[1, 0][..]));
    assert_eq!(space.event_index("b"), Some(1));

    // closing the cycle forces effect(a) = -effect(b)
    assert_eq!(space.basis(), &[ints(&[-1, 1])]);
}

#[test]
fn test_space_of_diamond() {
    let ts = diamond();
    let space = space_of(&ts);
    let s3 = ts.require_state("s3").unwrap();

    assert_eq!(space.reachable_states().len(), 4);
    assert_eq!(space.parikh_vector(s3), Some(&[1, 1][..]));
    // both diamond paths agree for every effect vector
    assert_eq!(space.basis().len(), 2);
}

#[test]
fn test_space_requires_initial_state() {
    let mut ts = TransitionSystem::new();
    ts.add_state("s0");

    assert_eq!(
        RegionSpace::new(&ts).unwrap_err(),
        RegionError::MissingInitialState
    );
}

#[test]
fn test_unreachable_states() {
    let mut ts = two_cycle();
    let lost = ts.add_state("lost");
    let space = space_of(&ts);

    assert_eq!(space.state_count(), 3);
    assert!(!space.is_reachable(lost));
    assert_eq!(space.delta(lost, &ints(&[1, -1])), Err(RegionError::UnreachableState(2)));

    let region = Region::pure(space.clone(), ints(&[-1, 1]), None).unwrap();
    assert_eq!(
        region.marking_for_state(lost),
        Err(RegionError::UnreachableState(2))
    );
}

#[test]
fn test_basis_combination() {
    let ts = two_cycle();
    let space = space_of(&ts);
    let s0 = ts.require_state("s0").unwrap();
    let s1 = ts.require_state("s1").unwrap();
    let a = ts.event_id("a").unwrap();
    let b = ts.event_id("b").unwrap();

    let region = Region::from_basis_combination(space.clone(), &ints(&[1])).unwrap();

    assert_eq!(region.backward_weights(), &ints(&[1, 0])[..]);
    assert_eq!(region.forward_weights(), &ints(&[0, 1])[..]);
    assert_eq!(region.initial_marking(), &BigInt::from(1));
    assert_eq!(region.marking_for_state(s0).unwrap(), BigInt::from(1));
    assert_eq!(region.marking_for_state(s1).unwrap(), BigInt::from(0));
    assert_eq!(region.max_marking(), BigInt::from(1));

    assert!(region.solves_event(s1, a).unwrap());
    assert!(!region.solves_event(s0, b).unwrap());
    assert!(region.solves_states(s0, s1).unwrap());
    assert!(region.check_consistency().is_ok());

    assert_eq!(
        Region::from_basis_combination(space, &ints(&[1, 0])).unwrap_err(),
        RegionError::WrongLength {
            expected: 1,
            found: 2
        }
    );
}

#[test]
fn test_pure_with_explicit_marking() {
    let ts = two_cycle();
    let space = space_of(&ts);
    let s1 = ts.require_state("s1").unwrap();

    let region = Region::pure(space, ints(&[1, -1]), Some(BigInt::from(3))).unwrap();

    assert_eq!(region.initial_marking(), &BigInt::from(3));
    assert_eq!(region.marking_for_state(s1).unwrap(), BigInt::from(4));
    assert_eq!(region.effects(), ints(&[1, -1]));
    assert_eq!(region.preset().into_iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(region.postset().into_iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_new_validates_input() {
    let space = space_of(&two_cycle());

    assert_eq!(
        Region::new(space.clone(), ints(&[1]), ints(&[0, 0]), BigInt::from(0)).unwrap_err(),
        RegionError::WrongLength {
            expected: 2,
            found: 1
        }
    );
    assert_eq!(
        Region::new(space.clone(), ints(&[0, 0]), ints(&[0, -2]), BigInt::from(0)).unwrap_err(),
        RegionError::NegativeWeight(1)
    );
    assert_eq!(
        Region::new(space.clone(), ints(&[0, 0]), ints(&[0, 0]), BigInt::from(-1)).unwrap_err(),
        RegionError::NegativeMarking
    );

    // the minimal marking needs a weight for every event
    assert_eq!(
        Region::pure(space.clone(), ints(&[1]), None).unwrap_err(),
        RegionError::WrongLength {
            expected: 2,
            found: 1
        }
    );
    assert_eq!(
        Region::pure(space, ints(&[1, -1, 0]), Some(BigInt::from(1))).unwrap_err(),
        RegionError::WrongLength {
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn test_inconsistent_regions() {
    let space = space_of(&two_cycle());

    // a needs two tokens but only one is there
    let disabled = Region::new(space.clone(), ints(&[2, 0]), ints(&[0, 2]), BigInt::from(1)).unwrap();
    assert!(matches!(
        disabled.check_consistency(),
        Err(RegionError::Inconsistent(_))
    ));

    // a produces a token that never leaves again, the cycle does not close
    let open = Region::new(space.clone(), ints(&[0, 0]), ints(&[1, 0]), BigInt::from(0)).unwrap();
    assert!(matches!(
        open.check_consistency(),
        Err(RegionError::Inconsistent(_))
    ));

    let side_condition =
        Region::new(space, ints(&[1, 0]), ints(&[1, 0]), BigInt::from(1)).unwrap();
    assert!(side_condition.check_consistency().is_ok());
}

#[test]
fn test_satisfies() {
    let space = space_of(&two_cycle());

    let pure = Region::pure(space.clone(), ints(&[-1, 1]), None).unwrap();
    let side_condition =
        Region::new(space.clone(), ints(&[1, 0]), ints(&[1, 0]), BigInt::from(1)).unwrap();
    let heavy = Region::pure(space.clone(), ints(&[-2, 2]), None).unwrap();
    let shared = Region::new(space, ints(&[1, 1]), ints(&[0, 0]), BigInt::from(2)).unwrap();

    let none = PropertySet::new();
    assert!(side_condition.satisfies(&none));

    assert!(pure.satisfies(&none.set_pure(true)));
    assert!(!side_condition.satisfies(&none.set_pure(true)));

    assert!(pure.satisfies(&none.set_plain(true)));
    assert!(!heavy.satisfies(&none.set_plain(true)));

    assert!(pure.satisfies(&none.require_safe()));
    assert!(!heavy.satisfies(&none.require_safe()));
    assert!(heavy.satisfies(&none.require_kbounded(2)));

    assert!(pure.satisfies(&none.set_marked_graph(true)));
    assert!(!side_condition.satisfies(&none.set_marked_graph(true)));

    assert!(!shared.satisfies(&none.set_output_nonbranching(true)));
    assert!(!shared.satisfies(&none.set_conflict_free(true)));
    assert!(shared.satisfies(&none.set_homogeneous(true)));
}

#[test]
fn test_equality_and_rebase() {
    let ts = two_cycle();
    let space = space_of(&ts);
    let other_space = space_of(&ts);

    let region = Region::pure(space, ints(&[-1, 1]), None).unwrap();
    let rebased = region.rebase(other_space.clone()).unwrap();

    assert_eq!(region, rebased);
    assert!(Arc::ptr_eq(rebased.space(), &other_space));
    assert_eq!(region.to_string(), "Region(m0=1, [a:1/0, b:0/1])");
}
