use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use ambient_scene_core::{
    ControlAffordance, FiredCue, OfflineRenderer, PlaybackState, SceneConfig, SceneController,
    SceneInstance, TransportState,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() -> ambient_scene_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            seconds,
            fps,
            toggle_at,
            mute_at,
            text,
            report,
        } => {
            let config = load_config(config.as_deref())?;
            let plan = Plan::new(toggle_at, mute_at, text);
            run_simulation(&config, seconds, fps, plan, report.as_deref())
        }
        Commands::DumpConfig { output } => run_dump_config(&output),
    }
}

fn load_config(path: Option<&Path>) -> ambient_scene_core::Result<SceneConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading scene config");
            SceneConfig::load(path)
        }
        None => Ok(SceneConfig::landscape()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    TogglePlayback,
    ToggleMute,
}

/// User input replayed against the virtual clock.
#[derive(Debug)]
struct Plan {
    commands: Vec<(f64, Command)>,
    text: Option<String>,
}

impl Plan {
    fn new(toggle_at: Vec<f64>, mute_at: Vec<f64>, text: Option<String>) -> Self {
        // Without explicit toggles the scene starts right away.
        let toggle_at = if toggle_at.is_empty() {
            vec![0.0]
        } else {
            toggle_at
        };

        let mut commands: Vec<(f64, Command)> = toggle_at
            .into_iter()
            .map(|time| (time, Command::TogglePlayback))
            .chain(mute_at.into_iter().map(|time| (time, Command::ToggleMute)))
            .collect();
        commands.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self { commands, text }
    }
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    seconds: f64,
    frames: usize,
    transport: TransportState,
    playback: PlaybackState,
    play_control: ControlAffordance,
    mute_control: ControlAffordance,
    timeline_elapsed: f64,
    tones_emitted: usize,
    peak_level: f32,
    cues_fired: usize,
    cues: &'a VecDeque<FiredCue>,
    scene: &'a SceneInstance,
}

fn run_simulation(
    config: &SceneConfig,
    seconds: f64,
    fps: u32,
    plan: Plan,
    report_path: Option<&Path>,
) -> ambient_scene_core::Result<()> {
    if fps == 0 {
        return Err("fps must be positive".into());
    }
    tracing::info!(seconds, fps, commands = plan.commands.len(), "starting simulation");

    let backend = OfflineRenderer::new(config.audio.sample_rate);
    let mut controller = SceneController::new(config, backend);
    let frame = 1.0 / f64::from(fps);
    let frames = (seconds.max(0.0) * f64::from(fps)).round() as usize;

    let typed: Vec<char> = plan.text.as_deref().unwrap_or_default().chars().collect();
    if !typed.is_empty() {
        controller.focus_text();
    }

    let mut pending = plan.commands.iter().peekable();
    for index in 0..frames {
        let now = index as f64 * frame;
        while let Some((_, command)) = pending.next_if(|(time, _)| *time <= now) {
            match command {
                Command::TogglePlayback => {
                    controller.toggle_playback();
                }
                Command::ToggleMute => {
                    controller.toggle_mute();
                }
            }
        }

        if index < typed.len() {
            let text: String = typed[..=index].iter().collect();
            controller.input_text(&text);
        }

        controller.tick(frame);
    }

    let backend = controller.synthesizer().backend();
    let report = Report {
        seconds,
        frames,
        transport: controller.transport(),
        playback: controller.playback_state(),
        play_control: controller.play_control(),
        mute_control: controller.mute_control(),
        timeline_elapsed: controller.timeline().elapsed(),
        tones_emitted: backend.emitted_total(),
        peak_level: backend.peak(),
        cues_fired: controller.fired_total(),
        cues: controller.cue_log(),
        scene: controller.scene(),
    };

    tracing::info!(
        cues = report.cues_fired,
        tones = report.tones_emitted,
        elapsed = report.timeline_elapsed,
        play = report.play_control.label.as_str(),
        mute = report.mute_control.label.as_str(),
        "simulation finished"
    );
    for fired in report.cues {
        println!("{:>8.3}s  {:<8} tones={}", fired.audio_time, fired.cue, fired.tones);
    }

    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_vec_pretty(&report)?)?;
        tracing::info!(?path, "report written");
    }
    Ok(())
}

fn run_dump_config(output: &PathBuf) -> ambient_scene_core::Result<()> {
    tracing::info!(?output, "writing default scene config");
    std::fs::write(output, SceneConfig::landscape().to_json_pretty()?)?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Ambient landscape scene driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scene headless against a virtual clock.
    Simulate {
        /// Scene configuration file. Defaults to the built-in landscape.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seconds of virtual time to simulate.
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,
        /// Display refresh rate driving the clock.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Times at which the playback button is pressed.
        #[arg(long = "toggle-at", value_name = "SECONDS")]
        toggle_at: Vec<f64>,
        /// Times at which the mute button is pressed.
        #[arg(long = "mute-at", value_name = "SECONDS")]
        mute_at: Vec<f64>,
        /// Text typed into the panel, one character per frame.
        #[arg(long = "type")]
        text: Option<String>,
        /// Where to write a JSON report of the run.
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Write the built-in landscape configuration as JSON.
    DumpConfig {
        /// Output path for the configuration file.
        output: PathBuf,
    },
}
