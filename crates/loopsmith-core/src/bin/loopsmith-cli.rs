use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use loopsmith_core::{
    Engine, EngineConfig, Grid, ShuffleStrategy,
    fixtures::{DEMO_BPM, demo_engine_with_markers},
    init_tracing, read_wav_file, write_wav_file,
};

#[derive(Debug, Parser)]
#[command(name = "loopsmith-cli")]
#[command(about = "Headless tools for loopsmith waveform, grid and edit workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Overrides `paths.logs_dir` from the config file.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Writes the deterministic demo loop and its render state.
    Demo {
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Prints the waveform summary of a WAV file as JSON.
    Summary { input: PathBuf },
    /// Prints grid lines for a tempo and duration as JSON.
    Grid {
        #[arg(long, default_value_t = DEMO_BPM)]
        bpm: f64,

        #[arg(long, default_value_t = 16)]
        division: u32,

        #[arg(long)]
        duration: f64,
    },
    /// Applies one edit to a WAV file and writes the result.
    Edit {
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long)]
        seed: Option<u64>,

        #[command(subcommand)]
        operation: EditOperation,
    },
}

#[derive(Debug, Subcommand)]
enum EditOperation {
    Delete {
        #[arg(long)]
        start: f64,

        #[arg(long)]
        end: f64,
    },
    Reverse {
        #[arg(long, requires = "end")]
        start: Option<f64>,

        #[arg(long, requires = "start")]
        end: Option<f64>,
    },
    Shuffle {
        #[arg(long, value_enum, default_value = "grid")]
        strategy: StrategyArg,

        #[arg(long)]
        start: Option<f64>,

        #[arg(long)]
        end: Option<f64>,

        #[arg(long)]
        chunks: Option<usize>,

        #[arg(long)]
        magic: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
enum StrategyArg {
    Grid,
    SubChunk,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load_or_default()?,
    };
    let log_dir = cli.log_dir.clone().unwrap_or_else(|| config.paths.logs_dir.clone());
    let _telemetry = init_tracing(&log_dir, &config.diagnostics)?;

    match cli.command {
        Commands::Demo { output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| config.paths.output_dir.clone());
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;

            let engine = demo_engine_with_markers()?;

            let wav_path = output_dir.join("demo.wav");
            write_wav_file(&wav_path, engine.buffer())?;
            let state_path = output_dir.join("demo.render.json");
            let state = serde_json::to_string_pretty(&engine.render_state())
                .context("failed to serialize render state")?;
            std::fs::write(&state_path, state)
                .with_context(|| format!("failed to write {}", state_path.display()))?;
            tracing::info!(wav = %wav_path.display(), state = %state_path.display(), "demo written");
        }
        Commands::Summary { input } => {
            let buffer = read_wav_file(&input)?;
            let engine = Engine::new(buffer, config)?;
            println!("{}", serde_json::to_string_pretty(engine.summary().as_ref())?);
        }
        Commands::Grid {
            bpm,
            division,
            duration,
        } => {
            let grid = Grid::new(bpm, division)?;
            println!("{}", serde_json::to_string_pretty(&grid.grid_lines(duration))?);
        }
        Commands::Edit {
            input,
            output,
            seed,
            operation,
        } => {
            let buffer = read_wav_file(&input)?;
            let sub_chunks = config.shuffle.sub_chunks;
            let mut engine = match seed {
                Some(seed) => Engine::with_seed(buffer, config, seed)?,
                None => Engine::new(buffer, config)?,
            };

            match operation {
                EditOperation::Delete { start, end } => {
                    engine.delete(start, end)?;
                }
                EditOperation::Reverse { start, end } => match start.zip(end) {
                    Some((start, end)) => {
                        engine.reverse_range(start, end)?;
                    }
                    None => {
                        engine.reverse()?;
                    }
                },
                EditOperation::Shuffle {
                    strategy,
                    start,
                    end,
                    chunks,
                    magic,
                } => {
                    let strategy = match strategy {
                        StrategyArg::Grid => ShuffleStrategy::GridBounded,
                        StrategyArg::SubChunk => ShuffleStrategy::SubChunk {
                            start: start.unwrap_or(0.0),
                            end: end.unwrap_or_else(|| engine.duration()),
                            chunks: chunks.unwrap_or(sub_chunks),
                        },
                    };
                    let report = if magic {
                        engine.magic_shuffle(strategy)?
                    } else {
                        engine.shuffle(strategy)?
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }

            write_wav_file(&output, engine.buffer())?;
            tracing::info!(path = %output.display(), "edited wav written");
        }
    }

    Ok(())
}
