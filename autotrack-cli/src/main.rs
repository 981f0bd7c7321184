use autotrack::io::load_frames;
use autotrack::{
    AutoTrackOptions, AutoTracker, AxisLine, FrameSequence, Point, PointTrack, SsdMatcher,
    Template, TickOutcome, Track, TrackKind, VideoSource,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Autotrack CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
    /// Match on the rayon backend when the library is built with it.
    #[arg(long)]
    parallel: bool,
}

/// What to do when the run pauses on a frame it could not mark.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum PauseAction {
    /// End the run and report what was tracked so far.
    #[default]
    Stop,
    /// Leave the frame unmarked and continue.
    Skip,
    /// Mark the possible match when there is one, otherwise skip.
    Accept,
}

#[derive(Debug, Deserialize)]
struct KeyFrameJson {
    frame: usize,
    target: [f64; 2],
    /// Defaults to the target.
    mask_center: Option<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct AxesJson {
    origin: [f64; 2],
    angle: f64,
}

impl From<AxesJson> for AxisLine {
    fn from(value: AxesJson) -> Self {
        Self {
            origin: point(value.origin),
            angle: value.angle,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OptionsJson {
    good_match: f64,
    possible_match: f64,
    evolve_alpha: u8,
    /// Overrides `evolve_alpha` with a 0-100 rate when set.
    evolve_rate: Option<i32>,
    tether_alpha: u8,
    look_ahead: bool,
    auto_skip_count: u32,
    never_pause: bool,
    line_spread: Option<usize>,
    mask_size: [f64; 2],
    search_size: [f64; 2],
    min_mask_radius: f64,
}

impl Default for OptionsJson {
    fn default() -> Self {
        let opts = AutoTrackOptions::default();
        Self {
            good_match: opts.good_match,
            possible_match: opts.possible_match,
            evolve_alpha: opts.evolve_alpha,
            evolve_rate: None,
            tether_alpha: opts.tether_alpha,
            look_ahead: opts.look_ahead,
            auto_skip_count: opts.auto_skip_count,
            never_pause: opts.never_pause,
            line_spread: opts.line_spread,
            mask_size: [opts.mask_size.0, opts.mask_size.1],
            search_size: [opts.search_size.0, opts.search_size.1],
            min_mask_radius: opts.min_mask_radius,
        }
    }
}

impl From<OptionsJson> for AutoTrackOptions {
    fn from(value: OptionsJson) -> Self {
        let opts = AutoTrackOptions {
            good_match: value.good_match,
            possible_match: value.possible_match,
            evolve_alpha: value.evolve_alpha,
            tether_alpha: value.tether_alpha,
            look_ahead: value.look_ahead,
            auto_skip_count: value.auto_skip_count,
            never_pause: value.never_pause,
            line_spread: value.line_spread,
            mask_size: (value.mask_size[0], value.mask_size[1]),
            search_size: (value.search_size[0], value.search_size[1]),
            min_mask_radius: value.min_mask_radius,
        };
        match value.evolve_rate {
            Some(rate) => opts.with_evolve_rate(rate),
            None => opts,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    frames: Vec<String>,
    key_frame: Option<KeyFrameJson>,
    axes: Option<AxesJson>,
    on_pause: PauseAction,
    max_ticks: usize,
    output_path: Option<String>,
    options: OptionsJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            key_frame: None,
            axes: None,
            on_pause: PauseAction::default(),
            max_ticks: 10_000,
            output_path: None,
            options: OptionsJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameReport {
    frame: usize,
    status: u8,
    description: &'static str,
    x: Option<f64>,
    y: Option<f64>,
    /// Null for perfect or impossible matches.
    quality: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Output {
    key_frames: Vec<usize>,
    paused_on: Option<usize>,
    frames: Vec<FrameReport>,
}

fn point([x, y]: [f64; 2]) -> Point {
    Point::new(x, y)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("autotrack=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.frames.is_empty() {
        return Err("frames must list at least one image".into());
    }
    let Some(key) = config.key_frame else {
        return Err("key_frame must be set in the config".into());
    };
    if key.frame >= config.frames.len() {
        return Err(format!(
            "key_frame.frame {} is past the last frame {}",
            key.frame,
            config.frames.len() - 1
        )
        .into());
    }

    let mut video = FrameSequence::new(load_frames(&config.frames)?)?;
    if let Some(axes) = config.axes {
        video = video.with_axes(axes.into());
    }
    let parallel = cli.parallel;
    let factory = move |patch: Template| SsdMatcher::new(patch).with_parallel(parallel);
    let mut tracker = AutoTracker::new(video, factory, config.options.into())?;
    tracker
        .set_track(PointTrack::new(1, TrackKind::PointMass))
        .map_err(|_| "track cannot be auto-tracked")?;

    tracker.set_frame(key.frame);
    let target = point(key.target);
    let mask_center = key.mask_center.map(point).unwrap_or(target);
    if !tracker.add_key_frame(target, mask_center) {
        return Err("could not create the key frame".into());
    }
    tracing::info!(frame = key.frame, "key frame added");

    tracker.search(true, true);
    let mut paused_on = None;
    for _ in 0..config.max_ticks {
        match tracker.tick() {
            TickOutcome::Advanced => {}
            TickOutcome::Paused => {
                let frame = tracker.video().frame_number();
                tracing::info!(frame, action = ?config.on_pause, "run paused");
                match config.on_pause {
                    PauseAction::Stop => {
                        paused_on = Some(frame);
                        tracker.stop(true, true);
                        break;
                    }
                    PauseAction::Skip => tracker.skip(),
                    PauseAction::Accept => {
                        if !tracker.accept() {
                            tracker.skip();
                        }
                    }
                }
            }
            TickOutcome::Stopped | TickOutcome::NoWork => break,
        }
    }

    let frames = (0..tracker.video().frame_count())
        .map(|frame| {
            let status = tracker.status_code(frame);
            let marked = tracker
                .track()
                .and_then(|t| t.marked_point(frame, t.target_index()));
            let quality = tracker
                .frame_data(frame)
                .and_then(|d| d.quality())
                .filter(|q| q.is_finite());
            FrameReport {
                frame,
                status: status.code(),
                description: status.describe(),
                x: marked.map(|p| p.x),
                y: marked.map(|p| p.y),
                quality,
            }
        })
        .collect();
    let output = Output {
        key_frames: tracker.key_frames(),
        paused_on,
        frames,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
