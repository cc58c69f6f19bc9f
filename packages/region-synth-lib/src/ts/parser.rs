//! Parser for the textual transition system format.
//!
//! An example:
//! ```text
//! .name "choice"
//! .type LTS
//!
//! .states
//! s0[initial]
//! s1
//!
//! .labels
//! a
//! b[location="right"]
//!
//! .arcs
//! s0 a s1
//! s0 b s1
//! ```
//!
//! Everything after `//` on a line is a comment. Exactly one state carries the
//! `initial` attribute. The only attribute understood on labels is `location`,
//! other attributes are accepted and ignored.
use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::opt,
    error::ParseError,
    multi::{many0, separated_list0},
    sequence::{delimited, preceded},
};

use crate::ts::TransitionSystem;

fn opt_whitespace<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    multispace0(input)
}

fn whitespace<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    multispace1(input)
}

fn identifier<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '\'').parse(input)
}

fn quoted<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"')).parse(input)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
}

fn attribute<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Attribute<'a>, E> {
    let (input, key) = identifier(input)?;
    let (input, value) = opt(preceded(
        (opt_whitespace, char('='), opt_whitespace),
        quoted,
    ))
    .parse(input)?;

    Ok((input, Attribute { key, value }))
}

fn attributes<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Vec<Attribute<'a>>, E> {
    delimited(
        (char('['), opt_whitespace),
        separated_list0((opt_whitespace, char(','), opt_whitespace), attribute),
        (opt_whitespace, char(']')),
    )
    .parse(input)
}

#[test]
fn test_attributes_1() {
    let (_, attrs) = attributes::<nom::error::Error<&str>>("[initial]").unwrap();
    assert_eq!(attrs, vec![Attribute { key: "initial", value: None }]);
}

#[test]
fn test_attributes_2() {
    let (_, attrs) =
        attributes::<nom::error::Error<&str>>("[ location = \"left\", x ]").unwrap();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs[0].key, "location");
    assert_eq!(attrs[0].value, Some("left"));
    assert_eq!(attrs[1].key, "x");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration<'a> {
    pub id: &'a str,
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> Declaration<'a> {
    pub fn has_flag(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a.key == key)
    }

    pub fn value(&self, key: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value)
    }
}

fn declaration<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Declaration<'a>, E> {
    let (input, id) = identifier(input)?;
    let (input, attributes) = opt(attributes).parse(input)?;

    Ok((
        input,
        Declaration {
            id,
            attributes: attributes.unwrap_or_default(),
        },
    ))
}

#[test]
fn test_declaration_1() {
    let (rest, decl) = declaration::<nom::error::Error<&str>>("s0[initial]\ns1").unwrap();
    assert_eq!(decl.id, "s0");
    assert!(decl.has_flag("initial"));
    assert_eq!(rest, "\ns1");
}

fn declarations<'a, E: ParseError<&'a str>>(
    section: &'static str,
) -> impl Parser<&'a str, Output = Vec<Declaration<'a>>, Error = E> {
    preceded(
        (opt_whitespace::<E>, tag(section)),
        many0(preceded(whitespace::<E>, declaration::<E>)),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcSpec<'a> {
    pub source: &'a str,
    pub label: &'a str,
    pub target: &'a str,
}

fn arc<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, ArcSpec<'a>, E> {
    let (input, source) = identifier(input)?;
    let (input, _) = whitespace(input)?;
    let (input, label) = identifier(input)?;
    let (input, _) = whitespace(input)?;
    let (input, target) = identifier(input)?;

    Ok((
        input,
        ArcSpec {
            source,
            label,
            target,
        },
    ))
}

fn arcs<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Vec<ArcSpec<'a>>, E> {
    preceded(
        (opt_whitespace, tag(".arcs")),
        many0(preceded(whitespace, arc)),
    )
    .parse(input)
}

#[test]
fn test_arcs_1() {
    let input = r#"
    .arcs
        s0 a s1
        s1 b s0
    "#;

    let (_, arcs) = arcs::<nom::error::Error<&str>>(input).unwrap();
    assert_eq!(arcs.len(), 2);
    assert_eq!(arcs[1].label, "b");
    assert_eq!(arcs[1].target, "s0");
}

fn header<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, (Option<&'a str>, Option<&'a str>), E> {
    let (input, name) = opt(preceded(
        (opt_whitespace, tag(".name"), whitespace),
        quoted,
    ))
    .parse(input)?;
    let (input, ty) = opt(preceded(
        (opt_whitespace, tag(".type"), whitespace),
        identifier,
    ))
    .parse(input)?;

    Ok((input, (name, ty)))
}

#[derive(Debug, Clone)]
pub struct LtsSpec<'a> {
    pub name: Option<&'a str>,
    pub ty: Option<&'a str>,
    pub states: Vec<Declaration<'a>>,
    pub labels: Vec<Declaration<'a>>,
    pub arcs: Vec<ArcSpec<'a>>,
}

impl<'a> LtsSpec<'a> {
    fn p(input: &'a str) -> IResult<&'a str, LtsSpec<'a>, nom::error::Error<&'a str>> {
        let (input, (name, ty)) = header(input)?;
        let (input, states) = declarations(".states").parse(input)?;
        let (input, labels) = declarations(".labels").parse(input)?;
        let (input, arcs) = arcs(input)?;
        let (input, _) = opt_whitespace(input)?;

        Ok((
            input,
            LtsSpec {
                name,
                ty,
                states,
                labels,
                arcs,
            },
        ))
    }

    pub fn parse(input: &'a str) -> anyhow::Result<LtsSpec<'a>> {
        match Self::p(input) {
            Ok(("", spec)) => Ok(spec),
            Ok((rest, _)) => Err(anyhow::anyhow!(
                "Failed to parse transition system: unexpected input near '{}'",
                rest.lines().next().unwrap_or_default()
            )),
            Err(e) => Err(anyhow::anyhow!("Failed to parse transition system: {}", e)),
        }
    }
}

impl TryFrom<LtsSpec<'_>> for TransitionSystem {
    type Error = anyhow::Error;

    fn try_from(spec: LtsSpec) -> Result<Self, Self::Error> {
        if let Some(ty) = spec.ty
            && ty != "LTS"
        {
            anyhow::bail!("Expected a file of type LTS, found '{}'.", ty);
        }

        let mut ts = TransitionSystem::named(spec.name.unwrap_or_default());

        for decl in &spec.states {
            if ts.state_by_name(decl.id).is_some() {
                anyhow::bail!("State '{}' is declared twice.", decl.id);
            }
            let state = ts.add_state(decl.id);
            if decl.has_flag("initial") {
                if ts.initial().is_some() {
                    anyhow::bail!("More than one state is marked as initial.");
                }
                ts.set_initial(state);
            }
        }

        if ts.initial().is_none() {
            anyhow::bail!("No state is marked as initial.");
        }

        for decl in &spec.labels {
            match decl.value("location") {
                Some(location) => ts.add_event_with_location(decl.id, location),
                None => ts.add_event(decl.id),
            };
        }

        for arc in &spec.arcs {
            let source = ts.require_state(arc.source)?;
            let target = ts.require_state(arc.target)?;
            let Some(event) = ts.event_id(arc.label) else {
                anyhow::bail!("Label '{}' of arc is not declared.", arc.label);
            };
            ts.add_arc(source, event, target);
        }

        Ok(ts)
    }
}

/// Position of the first `//` outside of a quoted string.
fn comment_start(line: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut previous_slash = false;

    for (pos, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '/' if !in_quotes && previous_slash => return Some(pos - 1),
            _ => {}
        }
        previous_slash = c == '/' && !in_quotes;
    }

    None
}

fn strip_comments(input: &str) -> String {
    input
        .lines()
        .map(|line| match comment_start(line) {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a transition system in the textual format described above.
pub fn parse_lts(input: &str) -> anyhow::Result<TransitionSystem> {
    let stripped = strip_comments(input);
    let spec = LtsSpec::parse(&stripped)?;
    TransitionSystem::try_from(spec)
}

/// Renders a transition system in the textual format understood by
/// [parse_lts].
pub fn to_lts_format(ts: &TransitionSystem) -> String {
    let mut out = String::new();

    out.push_str(&format!(".name \"{}\"\n.type LTS\n\n.states\n", ts.name()));
    for state in ts.states() {
        out.push_str(ts.state_name(state));
        if ts.initial() == Some(state) {
            out.push_str("[initial]");
        }
        out.push('\n');
    }

    out.push_str("\n.labels\n");
    for event in ts.events() {
        out.push_str(&event.label);
        if let Some(location) = &event.location {
            out.push_str(&format!("[location=\"{}\"]", location));
        }
        out.push('\n');
    }

    out.push_str("\n.arcs\n");
    for (source, event, target) in ts.arcs() {
        out.push_str(&format!(
            "{} {} {}\n",
            ts.state_name(source),
            ts.event_label(event),
            ts.state_name(target)
        ));
    }

    out
}

#[test]
fn test_lts_1() {
    let input = r#"
    // two events into the same state
    .name "choice"
    .type LTS

    .states
    s0[initial]
    s1

    .labels
    a
    b[location="right"]

    .arcs
    s0 a s1 // first
    s0 b s1
    "#;

    let ts = parse_lts(input).unwrap();
    assert_eq!(ts.name(), "choice");
    assert_eq!(ts.state_count(), 2);
    assert_eq!(ts.event_count(), 2);
    assert_eq!(ts.arc_count(), 2);
    assert_eq!(ts.initial(), ts.state_by_name("s0"));
    assert_eq!(ts.event(1).location.as_deref(), Some("right"));
}

#[test]
fn test_lts_missing_initial() {
    let input = ".states\ns0\n.labels\na\n.arcs\ns0 a s0";
    assert!(parse_lts(input).is_err());
}

#[test]
fn test_lts_unknown_label() {
    let input = ".states\ns0[initial]\n.labels\na\n.arcs\ns0 b s0";
    assert!(parse_lts(input).is_err());
}

#[test]
fn test_lts_format_is_parsed_back() {
    let input = ".name \"loop\"\n.states\ns0[initial]\ns1\n.labels\na\nb\n.arcs\ns0 a s1\ns1 b s0";
    let ts = parse_lts(input).unwrap();
    let again = parse_lts(&to_lts_format(&ts)).unwrap();

    assert_eq!(again.state_count(), 2);
    assert_eq!(again.arc_count(), 2);
    assert_eq!(again.name(), "loop");
}

#[test]
fn test_lts_slashes_in_quotes() {
    let input = r#"
    .name "http://example.org" // the name
    .states
    s0[initial]
    .labels
    a[location="left//right"]
    .arcs
    s0 a s0 // loop
    "#;

    let ts = parse_lts(input).unwrap();
    assert_eq!(ts.name(), "http://example.org");
    assert_eq!(ts.event(0).location.as_deref(), Some("left//right"));
    assert_eq!(comment_start("s0 a s0 // loop"), Some(8));
    assert_eq!(comment_start("a[location=\"x//y\"]"), None);
}
