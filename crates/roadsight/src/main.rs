//! roadsight: driver-visibility monitor.
//!
//! Each cycle captures a frame, polls the environmental sensor, degrades
//! the frame according to the light level, restores it, scores the
//! damage and raises a visibility alert. Results are printed, optionally
//! written as PNG previews, and appended to a JSON-lines session log.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin roadsight -- [OPTIONS]
//! ```
//!
//! Without `--frame` a synthetic 640x480 frame is used; without
//! `--sensor-file` readings are simulated.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use roadsight_io::{
    FrameSource, ImageFileSource, LineSensor, PreviewWriter, SensorSource, SessionLog,
    SimulatedSensor, SyntheticSource,
};
use roadsight_pipeline::{
    Clock, CycleOutput, CycleProcessor, GaussianSource, NlMeansParams, PipelineConfig,
    RandGaussian, RestorerKind, SystemClock,
};
use serde::Serialize;

/// Degrade, restore and score camera frames against live sensor readings.
#[derive(Parser)]
#[command(name = "roadsight", version)]
struct Cli {
    /// Image file to use as the camera frame. Repeat to cycle through
    /// several files.
    #[arg(long = "frame", value_name = "PATH")]
    frames: Vec<PathBuf>,

    /// Read sensor lines from this file (`-` for stdin).
    #[arg(long, value_name = "PATH", conflicts_with = "simulate_sensor")]
    sensor_file: Option<PathBuf>,

    /// Simulate sensor readings (the default without `--sensor-file`).
    #[arg(long)]
    simulate_sensor: bool,

    /// Number of cycles to run.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    cycles: usize,

    /// Seed for the noise generator and the sensor simulator.
    #[arg(long)]
    seed: Option<u64>,

    /// Standard deviation of the injected noise.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_NOISE_SIGMA)]
    noise_sigma: f64,

    /// PSNR (dB) below which visibility is reported as poor.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ALERT_THRESHOLD)]
    alert_threshold: f64,

    /// Restoration strategy.
    #[arg(long, value_enum, default_value_t = Restorer::NlMeans)]
    restorer: Restorer,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Root directory for session logs.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Do not write a session log.
    #[arg(long)]
    no_log: bool,

    /// Write PNG previews of each cycle into this directory.
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,

    /// Print a JSON summary per cycle instead of text.
    #[arg(long)]
    json: bool,

    /// Print per-stage timing diagnostics.
    #[arg(long)]
    diagnostics: bool,
}

/// Restoration strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Restorer {
    /// Colored non-local means.
    NlMeans,
    /// Per-channel Gaussian blur, sigma 1.5.
    Gaussian,
    /// Per-channel 3x3 median.
    Median,
    /// No restoration.
    Identity,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        noise_sigma: cli.noise_sigma,
        alert_threshold: cli.alert_threshold,
        restorer: match cli.restorer {
            Restorer::NlMeans => RestorerKind::NlMeans(NlMeansParams::default()),
            Restorer::Gaussian => RestorerKind::Gaussian { sigma: 1.5 },
            Restorer::Median => RestorerKind::Median { radius: 1 },
            Restorer::Identity => RestorerKind::Identity,
        },
        ..PipelineConfig::default()
    })
}

/// Open the configured sensor feed.
fn sensor_from_cli(cli: &Cli) -> Result<Box<dyn SensorSource>, String> {
    match cli.sensor_file {
        Some(ref path) if path.as_os_str() == "-" => Ok(Box::new(LineSensor::new(
            BufReader::new(io::stdin()),
        ))),
        Some(ref path) => {
            let file = File::open(path)
                .map_err(|e| format!("Error opening sensor feed {}: {e}", path.display()))?;
            Ok(Box::new(LineSensor::new(BufReader::new(file))))
        }
        None => Ok(Box::new(SimulatedSensor::new(rng_from_seed(
            cli.seed.map(|s| s.wrapping_add(1)),
        )))),
    }
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

/// Machine-readable summary of one cycle.
#[derive(Serialize)]
struct CycleSummary {
    cycle: usize,
    light_level: f64,
    temperature_celsius: f64,
    humidity_percent: f64,
    brightness_factor: f32,
    contrast_factor: f32,
    noise_sigma: f64,
    degradation_psnr: f64,
    restoration_psnr: f64,
    alert: &'static str,
    timestamp: f64,
}

impl CycleSummary {
    fn new(cycle: usize, out: &CycleOutput) -> Self {
        let [light_level, temperature_celsius, humidity_percent] = out.log_record.sensor_values;
        Self {
            cycle,
            light_level,
            temperature_celsius,
            humidity_percent,
            brightness_factor: out.parameters.brightness_factor,
            contrast_factor: out.parameters.contrast_factor,
            noise_sigma: out.parameters.noise_sigma,
            degradation_psnr: out.degradation_psnr,
            restoration_psnr: out.restoration_psnr,
            alert: out.display.alert_text(),
            timestamp: out.log_record.timestamp,
        }
    }
}

fn print_cycle(cli: &Cli, cycle: usize, out: &CycleOutput) -> Result<(), String> {
    if cli.json {
        let json = serde_json::to_string(&CycleSummary::new(cycle, out))
            .map_err(|e| format!("Error serializing cycle summary: {e}"))?;
        println!("{json}");
    } else {
        let readouts = &out.display.readouts;
        println!("--- Cycle {} ---", cycle + 1);
        println!("{}", readouts.temperature);
        println!("{}", readouts.humidity);
        println!("{}", readouts.light);
        println!("{}", out.display.psnr_text);
        println!("PSNR (Original vs Restored): {:.2} dB", out.restoration_psnr);
        println!("{}", out.display.alert_text());
    }
    if cli.diagnostics {
        eprintln!("{}", out.diagnostics.report());
    }
    Ok(())
}

/// Cycle counts of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunSummary {
    /// Cycles that produced an output.
    processed: usize,
    /// Cycles skipped for a capture failure, a missing reading or a
    /// pipeline error.
    skipped: usize,
    /// Preview or log writes that failed. The cycle still counts as
    /// processed.
    write_failures: usize,
}

/// Run up to `cycles` capture/process cycles.
///
/// A failed capture, a missing reading or a pipeline error skips the
/// cycle. A failed preview or log write is logged and the run goes on.
/// Stops early once the sensor is exhausted.
fn run_cycles<N: GaussianSource, C: Clock>(
    processor: &mut CycleProcessor<N, C>,
    camera: &mut dyn FrameSource,
    sensor: &mut dyn SensorSource,
    mut session: Option<&mut SessionLog>,
    previews: Option<&PreviewWriter>,
    cycles: usize,
    report: &mut dyn FnMut(usize, &CycleOutput),
) -> RunSummary {
    let mut summary = RunSummary::default();
    for cycle in 0..cycles {
        if sensor.is_exhausted() {
            log::info!("sensor feed exhausted after {cycle} cycles");
            break;
        }

        let frame = match camera.capture() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("cycle {}: {e}", cycle + 1);
                summary.skipped += 1;
                continue;
            }
        };

        let Some(reading) = sensor.poll() else {
            log::info!("cycle {}: no sensor reading", cycle + 1);
            summary.skipped += 1;
            continue;
        };

        let out = match processor.process_one_cycle(&reading, &frame) {
            Ok(out) => out,
            Err(e) => {
                log::error!("cycle {}: pipeline error: {e}", cycle + 1);
                summary.skipped += 1;
                continue;
            }
        };

        report(cycle, &out);

        if let Some(writer) = previews
            && let Err(e) = writer.write(cycle, &out.display)
        {
            log::warn!("cycle {}: {e}", cycle + 1);
            summary.write_failures += 1;
        }

        if let Some(session_log) = session.as_deref_mut()
            && let Err(e) = session_log.append(&out.log_record)
        {
            log::warn!("cycle {}: {e}", cycle + 1);
            summary.write_failures += 1;
        }

        summary.processed += 1;
    }
    summary
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let mut processor = match CycleProcessor::new(
        config,
        RandGaussian::new(rng_from_seed(cli.seed)),
        SystemClock,
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    log::debug!("config: {:?}", processor.config());

    let mut sensor = match sensor_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let mut camera: Box<dyn FrameSource> = if cli.frames.is_empty() {
        Box::new(SyntheticSource::default())
    } else {
        Box::new(ImageFileSource::new(cli.frames.clone()))
    };

    let mut session = if cli.no_log {
        None
    } else {
        match SessionLog::create(&cli.log_dir) {
            Ok(session_log) => Some(session_log),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let previews = cli
        .preview_dir
        .clone()
        .map(|dir| PreviewWriter::new(dir).per_cycle(cli.cycles > 1));

    let summary = run_cycles(
        &mut processor,
        camera.as_mut(),
        sensor.as_mut(),
        session.as_mut(),
        previews.as_ref(),
        cli.cycles,
        &mut |cycle, out| {
            if let Err(msg) = print_cycle(&cli, cycle, out) {
                eprintln!("{msg}");
            }
        },
    );

    log::info!(
        "processed {} of {} cycles ({} skipped, {} failed writes)",
        summary.processed,
        cli.cycles,
        summary.skipped,
        summary.write_failures
    );
    if let Some(ref session_log) = session {
        log::info!(
            "{} records in {}",
            session_log.records(),
            session_log.path().display()
        );
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::io::Cursor;

    use roadsight_io::IoError;
    use roadsight_pipeline::{Frame, ZeroGaussian};

    use super::*;

    /// Plays back a fixed sequence of captures; `None` is a capture
    /// failure. Returns `fallback` once the sequence runs out.
    struct ScriptedCamera {
        script: VecDeque<Option<Frame>>,
        fallback: Frame,
    }

    impl FrameSource for ScriptedCamera {
        fn capture(&mut self) -> Result<Frame, IoError> {
            match self.script.pop_front() {
                Some(Some(frame)) => Ok(frame),
                Some(None) => Err(IoError::Capture("camera unplugged".to_string())),
                None => Ok(self.fallback.clone()),
            }
        }
    }

    fn quiet_processor() -> CycleProcessor<ZeroGaussian, SystemClock> {
        let config = PipelineConfig {
            noise_sigma: 0.0,
            restorer: RestorerKind::Identity,
            ..PipelineConfig::default()
        };
        CycleProcessor::new(config, ZeroGaussian, SystemClock).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_build_the_default_config() {
        let cli = Cli::parse_from(["roadsight"]);
        assert_eq!(cli.cycles, 1);
        assert_eq!(cli.log_dir, PathBuf::from("logs"));
        assert_eq!(config_from_cli(&cli).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "roadsight",
            "--noise-sigma",
            "10",
            "--alert-threshold",
            "25",
            "--restorer",
            "median",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.noise_sigma - 10.0).abs() < f64::EPSILON);
        assert!((config.alert_threshold - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.restorer, RestorerKind::Median { radius: 1 });
    }

    #[test]
    fn config_json_wins_over_flags() {
        let cli = Cli::parse_from([
            "roadsight",
            "--noise-sigma",
            "10",
            "--config-json",
            r#"{"noise_sigma": 5.0, "restorer": {"kind": "identity"}}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.noise_sigma - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.restorer, RestorerKind::Identity);
        assert_eq!(config.preview_scale, PipelineConfig::DEFAULT_PREVIEW_SCALE);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = Cli::parse_from(["roadsight", "--config-json", "{"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn sensor_file_conflicts_with_simulation() {
        let result =
            Cli::try_parse_from(["roadsight", "--sensor-file", "feed.txt", "--simulate-sensor"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_cycles_is_rejected() {
        assert!(Cli::try_parse_from(["roadsight", "--cycles", "0"]).is_err());
    }

    #[test]
    fn seeded_simulator_is_reproducible() {
        let cli = Cli::parse_from(["roadsight", "--seed", "3"]);
        let mut a = sensor_from_cli(&cli).unwrap();
        let mut b = sensor_from_cli(&cli).unwrap();
        assert_eq!(a.poll(), b.poll());
    }

    #[test]
    fn failing_cycles_are_skipped_and_the_run_goes_on() {
        let frame = Frame::new(4, 4);
        let mut camera = ScriptedCamera {
            script: VecDeque::from([
                None,
                Some(frame.clone()),
                Some(Frame::new(0, 0)),
                Some(frame.clone()),
                Some(frame.clone()),
            ]),
            fallback: frame,
        };
        let mut sensor = LineSensor::new(Cursor::new(
            "Light:100,Temperature:20,Humidity:50\n\
             Light:30,Temperature:20,Humidity:50\n\
             ready\n\
             Light:500,Temperature:25,Humidity:40\n",
        ));
        let root = tempfile::tempdir().unwrap();
        let mut session_log = SessionLog::create(root.path()).unwrap();
        let mut reported = Vec::new();

        let summary = run_cycles(
            &mut quiet_processor(),
            &mut camera,
            &mut sensor,
            Some(&mut session_log),
            None,
            10,
            &mut |cycle, out| reported.push((cycle, out.log_record.sensor_values[0])),
        );

        // capture failure, empty frame, banner line, end of feed
        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                skipped: 4,
                write_failures: 0,
            }
        );
        assert_eq!(reported, [(1, 100.0), (4, 500.0)]);
        assert_eq!(session_log.records(), 2);
        assert_eq!(SessionLog::read_records(session_log.path()).unwrap().len(), 2);
    }

    #[test]
    fn write_failures_do_not_stop_the_run() {
        let mut camera = SyntheticSource::new(8, 6);
        let mut sensor = SimulatedSensor::new(rng_from_seed(Some(5)));
        let root = tempfile::tempdir().unwrap();
        let mut session_log = SessionLog::create(root.path()).unwrap();
        fs::create_dir(session_log.path()).unwrap();
        let blocked = root.path().join("previews");
        fs::write(&blocked, b"not a directory").unwrap();
        let previews = PreviewWriter::new(blocked);

        let mut reports = 0;
        let summary = run_cycles(
            &mut quiet_processor(),
            &mut camera,
            &mut sensor,
            Some(&mut session_log),
            Some(&previews),
            3,
            &mut |_, _| reports += 1,
        );

        assert_eq!(
            summary,
            RunSummary {
                processed: 3,
                skipped: 0,
                write_failures: 6,
            }
        );
        assert_eq!(reports, 3);
        assert_eq!(session_log.records(), 0);
    }
}
