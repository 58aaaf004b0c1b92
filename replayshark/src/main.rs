use anyhow::Context;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use wot_replays::ReplayFile;
use wot_replays::analyzer::{
    Analyzer, ObjectClassifier, ReplayDump, ReplayStats, Signature, StatsAggregator, correlate,
};
use wot_replays::types::StatsMode;

mod batch;

use batch::BatchSummary;

#[derive(Serialize)]
struct AggregateReport<'a> {
    mode: StatsMode,
    summary: BatchSummary,
    #[serde(flatten)]
    stats: &'a StatsAggregator,
}

#[derive(Serialize)]
struct ObjectInfo<'a> {
    offset: usize,
    len: usize,
    roles: Vec<Signature>,
    keys: Vec<&'a str>,
}

#[derive(Serialize)]
struct InspectReport<'a> {
    path: &'a str,
    compressed: bool,
    bytes: usize,
    objects: Vec<ObjectInfo<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<ReplayStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Keys listed per object in `inspect` output.
const INSPECT_KEYS: usize = 8;

fn output_args<'a, 'b>() -> [Arg<'a, 'b>; 3] {
    [
        Arg::with_name("OUTPUT")
            .help("Write JSON here instead of stdout")
            .short("o")
            .long("output")
            .takes_value(true),
        Arg::with_name("PRETTY")
            .help("Pretty-print the JSON output")
            .long("pretty"),
        Arg::with_name("VERBOSE")
            .help("Log more (repeat for debug output)")
            .short("v")
            .long("verbose")
            .multiple(true),
    ]
}

fn mode_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("MODE")
        .help("Which results layout to read")
        .long("mode")
        .takes_value(true)
        .possible_values(&["team", "personal"])
        .default_value("team")
}

fn directory_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("DIRECTORY")
        .help("Directory holding .wotreplay files")
        .required(true)
        .index(1)
}

fn init_logging(verbosity: u64) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_mode(matches: &ArgMatches<'_>) -> anyhow::Result<StatsMode> {
    let mode = matches.value_of("MODE").unwrap_or("team");
    StatsMode::from_str(mode).with_context(|| format!("unknown mode {mode:?}"))
}

fn output(matches: &ArgMatches<'_>) -> anyhow::Result<Box<dyn Write>> {
    let out: Box<dyn Write> = match matches.value_of("OUTPUT") {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {path}"))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    Ok(out)
}

fn write_json<T: Serialize>(matches: &ArgMatches<'_>, value: &T) -> anyhow::Result<()> {
    let mut out = output(matches)?;
    if matches.is_present("PRETTY") {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    out.flush().context("failed to write output")
}

fn aggregate(matches: &ArgMatches<'_>, mode: StatsMode) -> anyhow::Result<()> {
    let dir = matches
        .value_of("DIRECTORY")
        .context("no replay directory given")?;
    let paths = batch::replay_paths(Path::new(dir))?;

    let mut aggregator = StatsAggregator::new();
    let mut analyzers: [&mut dyn Analyzer; 1] = [&mut aggregator];
    let summary = batch::run(&paths, mode, &mut analyzers);

    write_json(
        matches,
        &AggregateReport {
            mode,
            summary,
            stats: &aggregator,
        },
    )
}

fn replays(matches: &ArgMatches<'_>) -> anyhow::Result<()> {
    let dir = matches
        .value_of("DIRECTORY")
        .context("no replay directory given")?;
    let mode = parse_mode(matches)?;
    let paths = batch::replay_paths(Path::new(dir))?;

    let mut dump = ReplayDump::new(output(matches)?);
    let mut analyzers: [&mut dyn Analyzer; 1] = [&mut dump];
    batch::run(&paths, mode, &mut analyzers);
    Ok(())
}

fn inspect(matches: &ArgMatches<'_>) -> anyhow::Result<()> {
    let path = matches.value_of("REPLAY").context("no replay given")?;
    let mode = parse_mode(matches)?;
    let replay = ReplayFile::from_file(Path::new(path))
        .with_context(|| format!("failed to load {path}"))?;

    let objects: Vec<_> = replay.objects().collect();
    let infos: Vec<ObjectInfo<'_>> = objects
        .iter()
        .map(|object| ObjectInfo {
            offset: object.offset,
            len: object.len,
            roles: Signature::matching(&object.fields),
            keys: object
                .fields
                .keys()
                .take(INSPECT_KEYS)
                .map(String::as_str)
                .collect(),
        })
        .collect();

    let mut classifier = ObjectClassifier::new();
    for object in objects.iter().cloned() {
        classifier.observe(object);
    }
    let result = classifier
        .finish(mode)
        .and_then(|classified| correlate(&classified));

    let (stats, error) = match result {
        Ok(stats) => (Some(stats), None),
        Err(e) => (None, Some(e.to_string())),
    };
    write_json(
        matches,
        &InspectReport {
            path,
            compressed: replay.compressed,
            bytes: replay.data.len(),
            objects: infos,
            stats,
            error,
        },
    )
}

fn main() -> anyhow::Result<()> {
    let matches = App::new("replayshark")
        .about("Aggregates battle statistics from World of Tanks replays")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("team")
                .about("Per-player totals for the recording player's allies")
                .arg(directory_arg())
                .args(&output_args()),
        )
        .subcommand(
            SubCommand::with_name("tanks")
                .about("Per-vehicle totals for the recording player")
                .arg(directory_arg())
                .args(&output_args()),
        )
        .subcommand(
            SubCommand::with_name("replays")
                .about("One JSON line per replay that could be read")
                .arg(directory_arg())
                .arg(mode_arg())
                .args(&output_args()),
        )
        .subcommand(
            SubCommand::with_name("inspect")
                .about("Show the embedded objects of a single replay and how they classify")
                .arg(
                    Arg::with_name("REPLAY")
                        .help("The replay file to inspect")
                        .required(true)
                        .index(1),
                )
                .arg(mode_arg())
                .args(&output_args()),
        )
        .get_matches();

    let (name, sub) = matches.subcommand();
    let sub = sub.context("no command given")?;
    init_logging(sub.occurrences_of("VERBOSE"));

    match name {
        "team" => aggregate(sub, StatsMode::Team),
        "tanks" => aggregate(sub, StatsMode::Personal),
        "replays" => replays(sub),
        "inspect" => inspect(sub),
        other => anyhow::bail!("unknown command {other}"),
    }
}
