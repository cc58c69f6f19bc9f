use rand::{RngExt, SeedableRng, rngs::StdRng};
use region_synth_lib::{
    config::SynthesisConfig,
    net::{NetError, PetriNet},
    properties::PropertySet,
    synthesis::SynthesisEngine,
    validation::{isomorphic, same_language},
};

pub struct RandomOptions {
    pub seed: u64,
    pub count: usize,
    /// Nets with a larger reachability graph are skipped.
    pub max_states: usize,
}

impl Default for RandomOptions {
    fn default() -> Self {
        RandomOptions {
            seed: 1,
            count: 10,
            max_states: 12,
        }
    }
}

impl RandomOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Every transition consumes from at least one place, so most nets are
/// bounded.
fn random_net(r: &mut StdRng, name: String, place_count: usize, transition_count: usize) -> PetriNet {
    let mut net = PetriNet::new(name);
    let places: Vec<_> = (0..place_count)
        .map(|p| net.create_place(format!("p{}", p)))
        .collect();

    for t in 0..transition_count {
        let transition = net.create_transition(format!("t{}", t));

        let consumed = places[r.random_range(0..place_count)];
        net.create_flow_to_transition(consumed, transition, r.random_range(1..=2));

        for &place in &places {
            if place != consumed && r.random_range(0..4) == 0 {
                net.create_flow_to_transition(place, transition, 1);
            }
            if r.random_range(0..3) == 0 {
                net.create_flow_to_place(transition, place, r.random_range(1..=2));
            }
        }
    }

    for &place in &places {
        net.set_initial_marking(place, r.random_range(0..=2));
    }

    net
}

/// Reachability graphs of nets are always synthesizable without extra
/// properties. The synthesized net has to reproduce the graph.
fn random_synthesis_test(options: RandomOptions, place_count: usize, transition_count: usize) {
    let mut r = StdRng::seed_from_u64(options.seed);
    let mut synthesized = 0;

    println!();
    println!("Synthesizing {} random reachability graphs", options.count);
    println!("places: {}", place_count);
    println!("transitions: {}", transition_count);
    println!();

    for i in 0..options.count {
        let net = random_net(&mut r, format!("random_{}", i), place_count, transition_count);

        let graph = match net.reachability_graph(options.max_states) {
            Ok(graph) => graph,
            Err(NetError::StateLimitExceeded(_)) => {
                println!("{}: skipped, too many states", i);
                continue;
            }
            Err(e) => panic!("{}", e),
        };

        let config = SynthesisConfig::default().with_verify(true);
        let engine = SynthesisEngine::isomorphic(&graph.ts, PropertySet::new(), config, None)
            .unwrap();

        assert!(
            engine.was_successfully_separated(),
            "{}: failed to synthesize a net for a reachability graph",
            i
        );

        let result = engine.synthesize_petri_net().unwrap().unwrap();
        let result_graph = result.reachability_graph(options.max_states + 1).unwrap();
        assert!(isomorphic(&result_graph.ts, &graph.ts));

        println!(
            "{}: {} states, {} places before, {} places after",
            i,
            graph.ts.state_count(),
            net.place_count(),
            result.place_count()
        );
        synthesized += 1;
    }

    println!();
    println!("Synthesized {synthesized} of {}", options.count);
}

#[test]
fn random_synthesis_small() {
    random_synthesis_test(RandomOptions::default(), 2, 2);
}

#[test]
fn random_synthesis_medium() {
    random_synthesis_test(RandomOptions::default().with_seed(7).with_count(6), 3, 3);
}

#[test]
fn random_language_synthesis() {
    let options = RandomOptions::default().with_seed(3).with_count(5);
    let mut r = StdRng::seed_from_u64(options.seed);

    for i in 0..options.count {
        let net = random_net(&mut r, format!("random_{}", i), 2, 3);
        let Ok(graph) = net.reachability_graph(options.max_states) else {
            continue;
        };

        let config = SynthesisConfig::default().with_verify(true);
        let engine =
            SynthesisEngine::language(&graph.ts, PropertySet::new(), config, None).unwrap();
        assert!(engine.was_successfully_separated());

        let result = engine.synthesize_petri_net().unwrap().unwrap();
        let result_graph = result.reachability_graph(options.max_states + 1).unwrap();
        assert!(same_language(&result_graph.ts, &graph.ts, 1000));
    }
}
