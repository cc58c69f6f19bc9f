use std::{fmt::Display, str::FromStr};

use clap::Parser;
use region_synth_lib::{
    config::{GeneralConfig, SeparationStrategyKind, SynthesisConfig},
    logger::{LogLevel, Logger},
    net::format::to_pn_format,
    properties::SynthesisOptions,
    synthesis::SynthesisEngine,
    ts::TransitionSystem,
};

/// What to print once synthesis is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    /// The full report as JSON, including the net if synthesis succeeded.
    Report,
    /// Only the net, as JSON.
    Json,
    /// Only the net, in the textual `.type PN` format.
    Pn,
}

impl FromStr for Output {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" => Ok(Output::Report),
            "json" => Ok(Output::Json),
            "pn" | "apt" => Ok(Output::Pn),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Report => write!(f, "report"),
            Output::Json => write!(f, "json"),
            Output::Pn => write!(f, "pn"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "Region Synthesis Tool")]
#[command(version = "0.1")]
#[command(about = "Synthesize Petri nets from labeled transition systems", long_about = None)]
struct Args {
    /// A transition system as `.lts`/`.apt` text or `.json`.
    file: String,

    /// Comma separated properties and options, e.g. `safe,pure,minimize`.
    #[arg(short, long, default_value = "none")]
    properties: String,

    /// TOML files with synthesis settings. Later files override earlier ones.
    #[arg(short, long)]
    config: Vec<String>,

    /// Overrides the separation strategy of the configuration.
    #[arg(short, long)]
    strategy: Option<SeparationStrategyKind>,

    #[arg(short, long, default_value_t = Output::Report)]
    output: Output,

    /// Writes the output to this file instead of stdout.
    #[arg(long)]
    out: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let options = SynthesisOptions::parse(&args.properties)?;
    let mut config = SynthesisConfig::default();
    for file in &args.config {
        config.merge_file(file)?;
    }

    if let Some(strategy) = args.strategy {
        config.set_strategy(strategy);
    }
    if options.quick_fail {
        config.set_quick_fail(true);
    }
    if options.minimize {
        config.set_minimize(true);
    }
    if options.verbose {
        config.set_logger(
            config
                .logger()
                .clone()
                .with_enabled(true)
                .with_log_level(LogLevel::Debug),
        );
    }

    let _ = tracing_subscriber::fmt()
        .with_max_level(if options.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .try_init();

    let ts = TransitionSystem::from_file(&args.file)?;
    let logger = Logger::from_config(config.logger(), "Synthesis".into())?;

    let engine = if options.language {
        SynthesisEngine::language(&ts, options.properties, config, logger.as_ref())?
    } else {
        SynthesisEngine::isomorphic(&ts, options.properties, config, logger.as_ref())?
    };

    if args.output == Output::Report {
        let report = engine.report()?.to_json()?;
        match &args.out {
            Some(path) => std::fs::write(path, report)?,
            None => println!("{}", report),
        }
        return Ok(());
    }

    let Some(net) = engine.synthesize_petri_net()? else {
        anyhow::bail!("No Petri net with the requested properties exists.");
    };

    match (args.output, &args.out) {
        (Output::Json, Some(path)) => net.to_json_file(path)?,
        (Output::Json, None) => println!("{}", net.to_json()?),
        (_, Some(path)) => net.to_pn_file(path)?,
        (_, None) => print!("{}", to_pn_format(&net)),
    }

    Ok(())
}
