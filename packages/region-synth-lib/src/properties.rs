use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural requirements a synthesized net has to meet.
///
/// A property set is a plain value, every mutator returns a modified copy.
/// Some properties imply others: a marked graph is a T-net, a T-net is output
/// nonbranching and an output nonbranching net is conflict free. The getters
/// report implied properties as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PropertySet {
    pure: bool,
    plain: bool,
    tnet: bool,
    marked_graph: bool,
    output_nonbranching: bool,
    conflict_free: bool,
    homogeneous: bool,
    distributed: bool,
    bound: Option<u64>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pure(&self) -> bool {
        self.pure
    }

    pub fn is_plain(&self) -> bool {
        self.plain
    }

    pub fn is_tnet(&self) -> bool {
        self.tnet || self.marked_graph
    }

    pub fn is_marked_graph(&self) -> bool {
        self.marked_graph
    }

    pub fn is_output_nonbranching(&self) -> bool {
        self.output_nonbranching || self.is_tnet()
    }

    pub fn is_conflict_free(&self) -> bool {
        self.conflict_free || self.is_output_nonbranching()
    }

    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    pub fn is_distributed(&self) -> bool {
        self.distributed
    }

    /// Whether every place is guaranteed to hold at most `k` tokens.
    pub fn is_kbounded(&self, k: u64) -> bool {
        self.bound.is_some_and(|bound| bound <= k)
    }

    pub fn is_safe(&self) -> bool {
        self.is_kbounded(1)
    }

    pub fn bound(&self) -> Option<u64> {
        self.bound
    }

    pub fn set_pure(self, pure: bool) -> Self {
        PropertySet { pure, ..self }
    }

    pub fn set_plain(self, plain: bool) -> Self {
        PropertySet { plain, ..self }
    }

    pub fn set_tnet(self, tnet: bool) -> Self {
        PropertySet { tnet, ..self }
    }

    pub fn set_marked_graph(self, marked_graph: bool) -> Self {
        PropertySet {
            marked_graph,
            ..self
        }
    }

    pub fn set_output_nonbranching(self, output_nonbranching: bool) -> Self {
        PropertySet {
            output_nonbranching,
            ..self
        }
    }

    pub fn set_conflict_free(self, conflict_free: bool) -> Self {
        PropertySet {
            conflict_free,
            ..self
        }
    }

    pub fn set_homogeneous(self, homogeneous: bool) -> Self {
        PropertySet {
            homogeneous,
            ..self
        }
    }

    pub fn set_distributed(self, distributed: bool) -> Self {
        PropertySet {
            distributed,
            ..self
        }
    }

    /// Requires `k`-boundedness. Does nothing if the set already asks for a
    /// bound of at most `k`.
    pub fn require_kbounded(self, k: u64) -> Self {
        if self.is_kbounded(k) {
            return self;
        }

        PropertySet {
            bound: Some(k),
            ..self
        }
    }

    pub fn require_safe(self) -> Self {
        self.require_kbounded(1)
    }

    /// Whether every requirement of `other` is implied by `self`.
    pub fn contains_all(&self, other: &PropertySet) -> bool {
        let implies = |mine: bool, theirs: bool| mine || !theirs;

        let bound = match other.bound {
            Some(k) => self.is_kbounded(k),
            None => true,
        };

        bound
            && implies(self.is_pure(), other.is_pure())
            && implies(self.is_plain(), other.is_plain())
            && implies(self.is_tnet(), other.is_tnet())
            && implies(self.is_marked_graph(), other.is_marked_graph())
            && implies(self.is_output_nonbranching(), other.is_output_nonbranching())
            && implies(self.is_conflict_free(), other.is_conflict_free())
            && implies(self.is_homogeneous(), other.is_homogeneous())
            && implies(self.is_distributed(), other.is_distributed())
    }

    /// Names of the properties that are set explicitly, the bound last.
    pub fn names(&self) -> Vec<String> {
        let flags = [
            (self.pure, "pure"),
            (self.plain, "plain"),
            (self.tnet, "tnet"),
            (self.marked_graph, "marked-graph"),
            (self.output_nonbranching, "output-nonbranching"),
            (self.conflict_free, "conflict-free"),
            (self.homogeneous, "homogeneous"),
            (self.distributed, "distributed"),
        ];

        let mut names: Vec<String> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| name.to_string())
            .collect();

        match self.bound {
            Some(1) => names.push("safe".to_string()),
            Some(k) => names.push(format!("{}-bounded", k)),
            None => {}
        }

        names
    }
}

impl Display for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("unknown synthesis option '{0}'")]
    UnknownOption(String),
    #[error("invalid bound in '{0}', expected '<k>-bounded'")]
    InvalidBound(String),
}

/// The result of parsing an option string such as `"safe,pure,minimize"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SynthesisOptions {
    pub properties: PropertySet,
    /// Synthesize up to language equivalence instead of isomorphism.
    pub language: bool,
    pub minimize: bool,
    pub verbose: bool,
    pub quick_fail: bool,
}

impl SynthesisOptions {
    /// Parses a comma separated option list. Tokens are case insensitive and
    /// surrounding whitespace as well as empty tokens are ignored.
    pub fn parse(input: &str) -> Result<Self, OptionsError> {
        let mut options = SynthesisOptions::default();

        for token in input.split(',') {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }

            let properties = options.properties;
            match token.as_str() {
                "none" => {}
                "safe" => options.properties = properties.require_safe(),
                "pure" => options.properties = properties.set_pure(true),
                "plain" => options.properties = properties.set_plain(true),
                "tnet" => options.properties = properties.set_tnet(true),
                "marked-graph" => options.properties = properties.set_marked_graph(true),
                "output-nonbranching" | "on" => {
                    options.properties = properties.set_output_nonbranching(true)
                }
                "conflict-free" | "cf" => options.properties = properties.set_conflict_free(true),
                "homogeneous" => options.properties = properties.set_homogeneous(true),
                "distributed" => options.properties = properties.set_distributed(true),
                "upto-language-equivalence" | "language" | "le" => options.language = true,
                "minimize" | "minimise" | "minimal" => options.minimize = true,
                "verbose" => options.verbose = true,
                "quick-fail" => options.quick_fail = true,
                _ => {
                    let Some(k) = token.strip_suffix("-bounded") else {
                        return Err(OptionsError::UnknownOption(token));
                    };
                    let k = k
                        .parse::<u64>()
                        .map_err(|_| OptionsError::InvalidBound(token.clone()))?;
                    options.properties = properties.require_kbounded(k);
                }
            }
        }

        Ok(options)
    }
}
