//! Anchor layout demo over a simulated anchor field
//!
//! Runs a full distance sweep against a simulated installation, applies the
//! display parameters and prints the resulting layout (or the raw matrix
//! when no layout can be produced).

use anchor_layout::api::{CsvFormatter, JsonFormatter, LayoutReport, TextFormatter};
use anchor_layout::core::{Anchor, AnchorId, Position2, ReferencePosition};
use anchor_layout::hardware::{SimulatedField, SimulationConfig};
use anchor_layout::measurement::{Pause, RecordingPause, SweepControl, ThreadPause};
use anchor_layout::session::LocalizationSession;
use anchor_layout::utils::{init_logging, LayoutConfig, LogLevel};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};

/// Offset between anchor ids and their low-level radio ids in the presets
const PRESET_LOW_LEVEL_BASE: u64 = 0x1000;

/// Surveyed anchor height used for the preset overlay (reference units)
const PRESET_REFERENCE_HEIGHT: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Four anchors on a 5 m square
    Square,
    /// Rectangular 8 x 4 m room with a fifth anchor inside
    Room,
    /// Irregular hexagonal hall
    Hall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "anchor-layout")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Simulated installation, used unless the configuration lists anchors
    /// with reference positions
    #[arg(long, value_enum, default_value_t = Preset::Room)]
    preset: Preset,

    /// Half-width of the ranging noise (mm)
    #[arg(long, default_value_t = 30.0)]
    noise_mm: f64,

    /// Probability that a ranging command is rejected
    #[arg(long, default_value_t = 0.05)]
    reject_probability: f64,

    /// Probability that a result read is not ready
    #[arg(long, default_value_t = 0.05)]
    stale_probability: f64,

    /// Seed of the simulated field
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Obstruct a directional link, as FROM:TO
    #[arg(long, value_name = "FROM:TO", value_parser = parse_link)]
    block: Vec<(u64, u64)>,

    /// Mirror the layout
    #[arg(long)]
    mirror: bool,

    /// Extra rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    rotate: f64,

    /// Anchor moved to the origin
    #[arg(long, value_name = "ID")]
    zero_anchor: Option<u64>,

    /// Translation along x (mm)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    offset_x: f64,

    /// Translation along y (mm)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    offset_y: f64,

    /// Stop after this many directional measurements
    #[arg(long, value_name = "N")]
    max_directions: Option<usize>,

    /// Print the intermediate layout after every direction
    #[arg(long)]
    progress: bool,

    /// Actually wait for settle and backoff pauses
    #[arg(long)]
    realtime: bool,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Also print the distance matrix as CSV
    #[arg(long)]
    matrix_csv: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_link(value: &str) -> Result<(u64, u64), String> {
    let (from, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{}'", value))?;
    let from = from.trim().parse::<u64>().map_err(|e| format!("bad anchor id '{}': {}", from, e))?;
    let to = to.trim().parse::<u64>().map_err(|e| format!("bad anchor id '{}': {}", to, e))?;
    Ok((from, to))
}

/// Anchor placements in millimetres
fn preset_placements(preset: Preset) -> Vec<(Anchor, Position2)> {
    let coordinates: &[(f64, f64)] = match preset {
        Preset::Square => &[(0.0, 0.0), (5000.0, 0.0), (5000.0, 5000.0), (0.0, 5000.0)],
        Preset::Room => &[
            (0.0, 0.0),
            (8000.0, 0.0),
            (8000.0, 4000.0),
            (0.0, 4000.0),
            (2500.0, 1500.0),
        ],
        Preset::Hall => &[
            (0.0, 0.0),
            (9000.0, 0.0),
            (12000.0, 4000.0),
            (9000.0, 9000.0),
            (1000.0, 8000.0),
            (-2000.0, 4000.0),
        ],
    };

    coordinates
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let id = i as u64 + 1;
            (Anchor::new(id, PRESET_LOW_LEVEL_BASE + id), Position2::new(x, y))
        })
        .collect()
}

/// Use the configured registry when every anchor has a reference position,
/// otherwise install the preset into the registry settings
fn prepare_installation(config: &mut LayoutConfig, preset: Preset) -> Vec<(Anchor, Position2)> {
    let registry = &config.registry;
    let scale = registry.reference_position_scale;
    let configured: Option<Vec<(Anchor, Position2)>> = registry
        .anchors
        .iter()
        .map(|anchor| {
            registry
                .reference_positions
                .get(&anchor.id)
                .map(|r| (anchor.clone(), Position2::new(r.x * scale, r.y * scale)))
        })
        .collect();

    match configured {
        Some(placements) if placements.len() >= 3 => {
            info!(anchors = placements.len(), "using configured installation");
            placements
        }
        _ => {
            let placements = preset_placements(preset);
            config.registry.anchors = placements.iter().map(|(a, _)| a.clone()).collect();
            config.registry.reference_positions = placements
                .iter()
                .map(|(a, p)| {
                    (
                        a.id,
                        ReferencePosition::new(p.x / scale, p.y / scale, PRESET_REFERENCE_HEIGHT),
                    )
                })
                .collect::<BTreeMap<_, _>>();
            info!(preset = ?preset, anchors = placements.len(), "using preset installation");
            placements
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LayoutConfig::from_file(path)?,
        None => LayoutConfig::default(),
    };
    if args.verbose > 0 || args.config.is_none() {
        config.logging.level = LogLevel::from_verbosity(args.verbose);
    }
    init_logging(&config.logging);

    let placements = prepare_installation(&mut config, args.preset);
    let registry = config.registry.static_registry();

    let mut field = SimulatedField::new(
        &placements,
        SimulationConfig {
            noise_mm: args.noise_mm,
            reject_probability: args.reject_probability,
            stale_probability: args.stale_probability,
            seed: args.seed,
        },
    );
    for &(from, to) in &args.block {
        field.block_link(AnchorId(from), AnchorId(to));
    }

    let mut pause: Box<dyn Pause> = if args.realtime {
        Box::new(ThreadPause)
    } else {
        Box::new(RecordingPause::new())
    };

    let mut session = LocalizationSession::start(&registry, &config);
    let limit = args.max_directions.unwrap_or(usize::MAX);
    let overlay = session.reference_positions().clone();
    let text = TextFormatter {
        compact: true,
        ..Default::default()
    };

    let summary = session.sweep(&mut field, pause.as_mut(), |progress| {
        let event = progress.event;
        if args.progress {
            let report = LayoutReport::new(
                progress.matrix,
                &progress.display_state(),
                &overlay,
                progress.params(),
            );
            eprintln!(
                "[{}/{}] {} -> {}: {:?}\n{}",
                event.completed,
                event.total,
                event.from,
                event.to,
                event.report.outcome,
                text.format_text(&report)
            );
        }
        if event.completed >= limit {
            SweepControl::Stop
        } else {
            SweepControl::Continue
        }
    });

    if !summary.unmeasurable.is_empty() {
        warn!(pairs = ?summary.unmeasurable, "some directions could not be measured");
    }

    session.set_mirror(args.mirror);
    session.set_extra_rotation(args.rotate)?;
    session.set_zero_anchor(args.zero_anchor.map(AnchorId))?;
    session.set_offset(args.offset_x, args.offset_y)?;

    let report = LayoutReport::new(
        session.distance_matrix(),
        &session.display_state(),
        session.reference_positions(),
        session.params(),
    )
    .with_sweep(summary);

    match args.format {
        Format::Text => print!("{}", TextFormatter::new().format_text(&report)),
        Format::Json => println!("{}", JsonFormatter::pretty().format_json(&report)?),
        Format::Csv => print!("{}", CsvFormatter::new().format_csv(&report)),
    }
    if args.matrix_csv {
        print!("{}", CsvFormatter::new().format_matrix_csv(&report));
    }

    Ok(())
}
