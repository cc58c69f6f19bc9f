use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    net::{PetriNet, reachability::ReachabilityGraph},
    properties::PropertySet,
    region::Region,
    ts::TransitionSystem,
};

pub mod behavior;

pub use behavior::{assert_isomorphic, assert_same_language, isomorphic, same_language};

/// Lists every requested property the net violates. Locations are looked up by
/// transition label in `ts`, bounds are checked on the reachability graph.
pub fn property_violations(
    net: &PetriNet,
    graph: &ReachabilityGraph,
    properties: &PropertySet,
    ts: &TransitionSystem,
) -> Vec<String> {
    let mut violations = vec![];
    let locations: HashMap<&str, Option<&str>> = ts
        .events()
        .iter()
        .map(|e| (e.label.as_str(), e.location.as_deref()))
        .collect();

    for (place, data) in net.places().iter().enumerate() {
        let postset = net.postset(place);
        let preset = net.preset(place);
        let mut fail = |property: &str| violations.push(format!("{} is not {}", data.name, property));

        if properties.is_pure() && postset.iter().any(|t| preset.contains(t)) {
            fail("pure");
        }
        if properties.is_plain()
            && net.transitions().iter().any(|t| {
                t.input_weight(place) > 1 || t.output_weight(place) > 1
            })
        {
            fail("plain");
        }
        if properties.is_marked_graph() && (postset.len() != 1 || preset.len() != 1) {
            fail("a marked graph place");
        }
        if properties.is_tnet() && (postset.len() > 1 || preset.len() > 1) {
            fail("a T-net place");
        }
        if properties.is_output_nonbranching() && postset.len() > 1 {
            fail("output nonbranching");
        }
        if properties.is_conflict_free()
            && postset.len() > 1
            && !postset.iter().all(|t| preset.contains(t))
        {
            fail("conflict free");
        }
        if properties.is_homogeneous()
            && !postset
                .iter()
                .map(|t| net.transition(*t).input_weight(place))
                .all_equal()
        {
            fail("homogeneous");
        }
        if properties.is_distributed()
            && !postset
                .iter()
                .map(|t| locations.get(net.transition(*t).label()).copied().flatten())
                .all_equal()
        {
            fail("distributed");
        }
        if let Some(k) = properties.bound()
            && graph.max_tokens(place) > k
        {
            fail(&format!("{}-bounded", k));
        }
    }

    violations
}

/// Panics if a region is inconsistent or misses a per-place property.
pub fn assert_region_valid(region: &Region, properties: &PropertySet) {
    if let Err(e) = region.check_consistency() {
        panic!("{} is not a region: {}", region, e);
    }
    assert!(
        region.satisfies(properties),
        "{} does not satisfy {}",
        region,
        properties
    );
}
