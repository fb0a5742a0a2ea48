use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paperio_autopilot::benchmark::{resolve_bots, run_benchmark, BenchmarkConfig, Objective};
use paperio_autopilot::config::{BotConfig, GameConstants, PRESET_IDS};
use paperio_autopilot::runner::{run_match, MatchConfig, SeatConfig};
use paperio_autopilot::supervisor::RetryPolicy;
use paperio_autopilot::util::{parse_seed, seed_to_hex, SeedSource, DEFAULT_SEED};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(name = "paperio-autopilot")]
#[command(about = "Self-tuning territory bots for a paper.io-style grid game")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List bot presets
    ListBots,
    /// Print a preset (or JSON config file) as resolved JSON
    ShowConfig {
        #[arg(long)]
        bot: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Play one local match and print every life
    Run {
        /// Comma-separated presets or JSON config paths, one seat each
        #[arg(long, default_value = "territorial,feature,hunter")]
        bots: String,
        #[arg(long, default_value = "0x5EED0001")]
        seed: String,
        #[arg(long, default_value_t = 9_000)]
        max_frames: u64,
        /// Frames per cell of movement; defaults to the acting cadence
        #[arg(long)]
        frames_per_cell: Option<u64>,
        /// Use the longer dual-agent reconnect delay for every seat
        #[arg(long, default_value_t = false)]
        two_player: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run multi-seed benchmark across one or more bots
    Bench {
        #[arg(long)]
        bots: Option<String>,
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long)]
        seed_file: Option<PathBuf>,
        #[arg(long)]
        seed_start: Option<String>,
        #[arg(long, default_value_t = 8)]
        seed_count: u32,
        #[arg(long, default_value_t = 9_000)]
        max_frames: u64,
        #[arg(long, default_value_t = 3)]
        sparring: usize,
        #[arg(long, value_enum, default_value_t = CliObjective::Fitness)]
        objective: CliObjective,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliObjective {
    Fitness,
    Territory,
    Survival,
}

impl From<CliObjective> for Objective {
    fn from(value: CliObjective) -> Self {
        match value {
            CliObjective::Fitness => Objective::Fitness,
            CliObjective::Territory => Objective::Territory,
            CliObjective::Survival => Objective::Survival,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let Cli { command } = Cli::parse();
    let constants = GameConstants::from_env();

    match command {
        Commands::ListBots => {
            for id in PRESET_IDS {
                let cfg = BotConfig::resolve(id)?;
                println!("{id:12} {}", cfg.description);
            }
        }
        Commands::ShowConfig { bot, output } => {
            let mut resolved = resolve_bots(Some(&bot))?;
            let cfg = resolved
                .pop()
                .ok_or_else(|| anyhow!("no bot resolved from '{bot}'"))?;
            let encoded = serde_json::to_vec_pretty(&cfg)?;
            if let Some(path) = output {
                write_with_parents(&path, &encoded)?;
                println!("wrote={}", path.display());
                println!("fingerprint={}", cfg.fingerprint());
            } else {
                println!("{}", String::from_utf8_lossy(&encoded));
            }
        }
        Commands::Run {
            bots,
            seed,
            max_frames,
            frames_per_cell,
            two_player,
            output,
        } => {
            let seed = parse_seed(&seed)?;
            let seats = resolve_bots(Some(&bots))?
                .into_iter()
                .map(|bot| SeatConfig {
                    bot,
                    dual_agent: two_player,
                })
                .collect();
            let report = run_match(&MatchConfig {
                constants,
                seats,
                max_frames,
                frames_per_cell: frames_per_cell.unwrap_or(constants.tick_divisor),
                seed,
                retry: RetryPolicy::default(),
            })?;

            println!("seed={}", seed_to_hex(report.seed));
            println!("frames={}", report.frames);
            println!("grid={}", constants.grid_count);
            for (idx, seat) in report.seats.iter().enumerate() {
                println!(
                    "seat {idx}: {} lives={} kills={} best_fitness={:.2} aggression={:.3} failed_joins={}",
                    seat.bot_id,
                    seat.lives.len(),
                    seat.total_kills(),
                    seat.best_fitness(),
                    seat.aggression,
                    seat.failed_joins,
                );
                for (life, (name, summary)) in seat.names.iter().zip(&seat.lives).enumerate() {
                    println!(
                        "  #{:02} {name}  portion={} kills={} survived={} fitness={:.2}",
                        life + 1,
                        summary.portion,
                        summary.kills,
                        summary.survival_frames,
                        summary.fitness(),
                    );
                }
            }

            if let Some(path) = output {
                write_with_parents(&path, &serde_json::to_vec_pretty(&report)?)?;
                println!("output={}", path.display());
            }
        }
        Commands::Bench {
            bots,
            seeds,
            seed_file,
            seed_start,
            seed_count,
            max_frames,
            sparring,
            objective,
            out_dir,
            jobs,
        } => {
            let bots = resolve_bots(bots.as_deref())?;
            let seeds = seed_source(seeds, seed_file, seed_start.as_deref(), seed_count)?.resolve()?;
            let objective: Objective = objective.into();

            let out_dir = out_dir.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "benchmarks/{}-{}",
                    objective.as_str(),
                    timestamp_suffix()
                ))
            });

            let report = run_benchmark(BenchmarkConfig {
                bots,
                seeds,
                constants,
                max_frames,
                sparring,
                objective,
                out_dir: out_dir.clone(),
                jobs,
            })?;

            println!("objective={}", objective.as_str());
            println!("runs={}", report.run_count);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            println!("out_dir={}", out_dir.display());
            println!("top bots:");
            for (idx, bot) in report.bot_rankings.iter().take(5).enumerate() {
                println!(
                    "  {}. {}  objective={:.2} avg_fitness={:.2} avg_portion={:.1} max_portion={} avg_kills={:.2} avg_lives={:.1}",
                    idx + 1,
                    bot.bot_id,
                    bot.objective_value,
                    bot.avg_fitness,
                    bot.avg_portion,
                    bot.max_portion,
                    bot.avg_kills,
                    bot.avg_lives,
                );
            }
        }
    }

    Ok(())
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

fn seed_source(
    seeds: Option<String>,
    seed_file: Option<PathBuf>,
    seed_start: Option<&str>,
    seed_count: u32,
) -> Result<SeedSource> {
    if let Some(path) = seed_file {
        return Ok(SeedSource::File(path));
    }
    if let Some(csv) = seeds {
        return Ok(SeedSource::List(csv));
    }
    let start = seed_start.map(parse_seed).transpose()?.unwrap_or(DEFAULT_SEED);
    Ok(SeedSource::Stream {
        start,
        count: seed_count,
    })
}

fn timestamp_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{now}")
}
