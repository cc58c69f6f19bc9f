use region_synth_lib::equivalence::{
    DomainEquivalenceRelation, EquivalenceError, EquivalenceRelation,
};

#[test]
fn test_reflexive_without_tracking() {
    let relation = EquivalenceRelation::<u32>::new();

    assert!(relation.is_equivalent(&1, &1));
    assert!(!relation.is_equivalent(&1, &2));
    assert_eq!(relation.leader(&5), 5);
    assert!(relation.is_empty());
}

#[test]
fn test_join_classes() {
    let mut relation = EquivalenceRelation::new();

    assert!(relation.join_classes(&1, &2));
    assert!(!relation.join_classes(&2, &1));
    assert!(relation.join_classes(&3, &4));

    assert!(relation.is_equivalent(&1, &2));
    assert!(!relation.is_equivalent(&1, &3));
    assert_eq!(relation.class_count(), 2);

    assert!(relation.join_classes(&2, &4));
    assert!(relation.is_equivalent(&1, &3));
    assert_eq!(relation.class_count(), 1);
    assert_eq!(relation.len(), 4);
}

#[test]
fn test_leader_follows_larger_class() {
    let mut relation = EquivalenceRelation::new();
    relation.join_classes(&"a", &"b");
    relation.join_classes(&"c", &"a");

    assert_eq!(relation.leader(&"a"), "a");
    assert_eq!(relation.leader(&"b"), "a");
    assert_eq!(relation.leader(&"c"), "a");
}

#[test]
fn test_classes() {
    let mut relation = EquivalenceRelation::new();
    relation.join_classes(&10, &20);
    relation.join_classes(&30, &40);
    relation.join_classes(&40, &50);

    assert_eq!(relation.classes(), vec![vec![10, 20], vec![30, 40, 50]]);
    assert_eq!(relation.class_of(&50).len(), 3);
    assert!(relation.class_of(&30).contains(&40));
    assert_eq!(relation.class_of(&99).len(), 1);
}

#[test]
fn test_long_chain() {
    let mut relation = EquivalenceRelation::new();
    for i in 0..1000u32 {
        relation.join_classes(&i, &(i + 1));
    }

    assert!(relation.is_equivalent(&0, &1000));
    assert_eq!(relation.class_count(), 1);
    assert_eq!(relation.leader(&0), relation.leader(&1000));
}

#[test]
fn test_domain_has_singletons() {
    let relation = DomainEquivalenceRelation::new(0..4usize);

    assert_eq!(relation.domain_size(), 4);
    assert_eq!(relation.class_count(), 4);
    assert_eq!(relation.classes(), vec![vec![0], vec![1], vec![2], vec![3]]);
    assert_eq!(relation.leader(&2), Ok(2));
}

#[test]
fn test_domain_join() {
    let mut relation = DomainEquivalenceRelation::new(["x", "y", "z"]);

    assert_eq!(relation.join_classes(&"x", &"z"), Ok(true));
    assert_eq!(relation.is_equivalent(&"z", &"x"), Ok(true));
    assert_eq!(relation.is_equivalent(&"y", &"x"), Ok(false));
    assert_eq!(relation.classes(), vec![vec!["x", "z"], vec!["y"]]);
}

#[test]
fn test_domain_rejects_unknown_elements() {
    let mut relation = DomainEquivalenceRelation::new(0..3u8);

    assert!(matches!(
        relation.join_classes(&0, &7),
        Err(EquivalenceError::NotInDomain(_))
    ));
    assert!(relation.leader(&9).is_err());
    assert!(relation.class_of(&3).is_err());
    // a rejected join does not extend the domain
    assert_eq!(relation.domain_size(), 3);
}
