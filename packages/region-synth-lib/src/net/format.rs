//! Renders nets in a textual format close to APT:
//!
//! ```text
//! .name "cycle"
//! .type PN
//!
//! .places
//! p0
//!
//! .transitions
//! a
//!
//! .flows
//! a: {p0} -> {p0}
//!
//! .initial_marking {p0}
//! ```
//!
//! Weights other than one are written as `2*p0`.
use itertools::Itertools;

use crate::net::{PetriNet, PlaceId};

fn weighted_places(net: &PetriNet, flows: &[(u64, PlaceId)]) -> String {
    let inner = flows
        .iter()
        .sorted_by_key(|(_, place)| *place)
        .map(|(weight, place)| weighted(*weight, &net.place(*place).name))
        .join(", ");

    format!("{{{}}}", inner)
}

fn weighted(weight: u64, name: &str) -> String {
    if weight == 1 {
        name.to_string()
    } else {
        format!("{}*{}", weight, name)
    }
}

pub fn to_pn_format(net: &PetriNet) -> String {
    let mut out = String::new();

    out.push_str(&format!(".name \"{}\"\n.type PN\n\n.places\n", net.name()));
    for place in net.places() {
        out.push_str(&place.name);
        out.push('\n');
    }

    out.push_str("\n.transitions\n");
    for transition in net.transitions() {
        out.push_str(transition.label());
        out.push('\n');
    }

    out.push_str("\n.flows\n");
    for transition in net.transitions() {
        out.push_str(&format!(
            "{}: {} -> {}\n",
            transition.label(),
            weighted_places(net, transition.input()),
            weighted_places(net, transition.output())
        ));
    }

    let marking = net
        .places()
        .iter()
        .filter(|p| p.initial_marking > 0)
        .map(|p| weighted(p.initial_marking, &p.name))
        .join(", ");
    out.push_str(&format!("\n.initial_marking {{{}}}\n", marking));

    out
}

#[test]
fn test_pn_format() {
    let mut net = PetriNet::new("cycle");
    let a = net.create_transition("a");
    let b = net.create_transition("b");
    let p0 = net.create_place("p0");
    let p1 = net.create_place("p1");
    net.create_flow_to_transition(p0, a, 1);
    net.create_flow_to_place(a, p1, 2);
    net.create_flow_to_transition(p1, b, 2);
    net.create_flow_to_place(b, p0, 1);
    net.set_initial_marking(p0, 1);

    let text = to_pn_format(&net);
    assert!(text.contains(".type PN"));
    assert!(text.contains("a: {p0} -> {2*p1}\n"));
    assert!(text.contains("b: {2*p1} -> {p0}\n"));
    assert!(text.ends_with(".initial_marking {p0}\n"));
}
