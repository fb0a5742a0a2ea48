use crate::config::{BotConfig, GameConstants, PRESET_IDS};
use crate::runner::{run_match, MatchConfig, SeatReport};
use crate::util::seed_to_hex;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Fitness,
    Territory,
    Survival,
}

impl Objective {
    pub fn run_value(self, metrics: &RunMetrics) -> f64 {
        match self {
            Self::Fitness => metrics.avg_fitness,
            Self::Territory => metrics.best_portion as f64 + metrics.avg_portion * 0.5,
            Self::Survival => {
                metrics.avg_survival_frames + (metrics.kills as f64) * 200.0
                    - (metrics.lives as f64) * 50.0
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fitness => "fitness",
            Self::Territory => "territory",
            Self::Survival => "survival",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub bots: Vec<BotConfig>,
    pub seeds: Vec<u64>,
    pub constants: GameConstants,
    pub max_frames: u64,
    /// Territorial opponents seated next to the bot under test.
    pub sparring: usize,
    pub objective: Objective,
    pub out_dir: PathBuf,
    pub jobs: Option<usize>,
}

/// Per-run figures for the seat under test.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMetrics {
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub seed: u64,
    pub lives: usize,
    pub kills: u32,
    pub best_portion: i64,
    pub avg_portion: f64,
    pub avg_survival_frames: f64,
    pub avg_fitness: f64,
    pub best_fitness: f64,
    pub failed_joins: u32,
}

impl RunMetrics {
    fn from_seat(seed: u64, seat: &SeatReport) -> Self {
        let lives = seat.lives.len();
        let per_life = |sum: f64| if lives == 0 { 0.0 } else { sum / lives as f64 };
        Self {
            bot_id: seat.bot_id.clone(),
            bot_fingerprint: seat.bot_fingerprint.clone(),
            seed,
            lives,
            kills: seat.total_kills(),
            best_portion: seat.lives.iter().map(|l| l.portion).max().unwrap_or_default(),
            avg_portion: per_life(seat.lives.iter().map(|l| l.portion as f64).sum()),
            avg_survival_frames: per_life(seat.lives.iter().map(|l| l.survival_frames as f64).sum()),
            avg_fitness: per_life(seat.lives.iter().map(|l| l.fitness()).sum()),
            best_fitness: if lives == 0 { 0.0 } else { seat.best_fitness() },
            failed_joins: seat.failed_joins,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(flatten)]
    pub metrics: RunMetrics,
    pub seed_hex: String,
    pub objective_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotAggregate {
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub runs: usize,
    pub avg_lives: f64,
    pub avg_kills: f64,
    pub avg_portion: f64,
    pub max_portion: i64,
    pub avg_survival_frames: f64,
    pub avg_fitness: f64,
    pub objective_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub objective: Objective,
    pub max_frames: u64,
    pub grid_count: i32,
    pub sparring: usize,
    pub jobs: Option<usize>,
    pub bots: Vec<String>,
    pub seeds: Vec<u64>,
    pub run_count: usize,
    pub bot_rankings: Vec<BotAggregate>,
    pub runs: Vec<RunRecord>,
}

/// Comma-separated preset ids or JSON config paths; every preset when `None`.
pub fn resolve_bots(input: Option<&str>) -> Result<Vec<BotConfig>> {
    let tokens: Vec<&str> = match input {
        None => PRESET_IDS.to_vec(),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect(),
    };
    if tokens.is_empty() {
        return Err(anyhow!("--bots resolved to empty list"));
    }
    tokens
        .into_iter()
        .map(|token| {
            if token.ends_with(".json") {
                BotConfig::from_file(Path::new(token))
            } else {
                Ok(BotConfig::resolve(token)?)
            }
        })
        .collect()
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if config.bots.is_empty() {
        return Err(anyhow!("benchmark requires at least one bot"));
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }

    let run_jobs: Vec<(&BotConfig, u64)> = config
        .bots
        .iter()
        .flat_map(|bot| config.seeds.iter().map(move |seed| (bot, *seed)))
        .collect();

    let run_one = |(bot, seed): &(&BotConfig, u64)| -> Result<RunRecord> {
        let match_config = MatchConfig::versus(
            (*bot).clone(),
            config.sparring,
            config.constants,
            *seed,
            config.max_frames,
        );
        let report = run_match(&match_config)
            .with_context(|| format!("benchmark run failed for bot={} seed={seed:#x}", bot.id))?;
        let seat = report
            .seats
            .first()
            .ok_or_else(|| anyhow!("match for bot={} returned no seats", bot.id))?;
        let metrics = RunMetrics::from_seat(*seed, seat);
        let objective_value = config.objective.run_value(&metrics);
        tracing::debug!(bot = %bot.id, seed, objective_value, "benchmark run finished");
        Ok(RunRecord {
            metrics,
            seed_hex: seed_to_hex(*seed),
            objective_value,
        })
    };

    let run_results: Vec<Result<RunRecord>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| run_jobs.par_iter().map(run_one).collect())
    } else {
        run_jobs.par_iter().map(run_one).collect()
    };

    let mut runs = Vec::with_capacity(run_results.len());
    for result in run_results {
        runs.push(result?);
    }

    let mut grouped: HashMap<String, Vec<&RunRecord>> = HashMap::new();
    for run in &runs {
        grouped
            .entry(run.metrics.bot_id.clone())
            .or_default()
            .push(run);
    }

    let mut rankings = Vec::new();
    for (bot_id, bot_runs) in grouped {
        let runs_count = bot_runs.len();
        rankings.push(BotAggregate {
            bot_fingerprint: bot_runs
                .first()
                .map(|r| r.metrics.bot_fingerprint.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            runs: runs_count,
            avg_lives: mean(&bot_runs, |r| r.metrics.lives as f64),
            avg_kills: mean(&bot_runs, |r| r.metrics.kills as f64),
            avg_portion: mean(&bot_runs, |r| r.metrics.avg_portion),
            max_portion: bot_runs
                .iter()
                .map(|r| r.metrics.best_portion)
                .max()
                .unwrap_or_default(),
            avg_survival_frames: mean(&bot_runs, |r| r.metrics.avg_survival_frames),
            avg_fitness: mean(&bot_runs, |r| r.metrics.avg_fitness),
            objective_value: mean(&bot_runs, |r| r.objective_value),
            bot_id,
        });
    }

    rankings.sort_by(|a, b| {
        b.objective_value
            .total_cmp(&a.objective_value)
            .then_with(|| b.avg_fitness.total_cmp(&a.avg_fitness))
            .then_with(|| a.bot_id.cmp(&b.bot_id))
    });

    runs.sort_by(|a, b| {
        b.objective_value
            .total_cmp(&a.objective_value)
            .then_with(|| b.metrics.best_portion.cmp(&a.metrics.best_portion))
            .then_with(|| a.metrics.seed.cmp(&b.metrics.seed))
    });

    write_runs_csv(&config.out_dir.join("runs.csv"), &runs)?;
    write_rankings_csv(&config.out_dir.join("rankings.csv"), &rankings)?;

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        objective: config.objective,
        max_frames: config.max_frames,
        grid_count: config.constants.grid_count,
        sparring: config.sparring,
        jobs: config.jobs,
        bots: config.bots.iter().map(|b| b.id.clone()).collect(),
        seeds: config.seeds,
        run_count: runs.len(),
        bot_rankings: rankings,
        runs,
    };

    let report_path = config.out_dir.join("summary.json");
    fs::write(
        &report_path,
        serde_json::to_vec_pretty(&report).context("failed to serialize summary json")?,
    )
    .with_context(|| format!("failed writing {}", report_path.display()))?;

    tracing::info!(
        runs = report.run_count,
        objective = report.objective.as_str(),
        out_dir = %config.out_dir.display(),
        "benchmark complete"
    );
    Ok(report)
}

fn mean(runs: &[&RunRecord], value: impl Fn(&RunRecord) -> f64) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    runs.iter().map(|r| value(r)).sum::<f64>() / runs.len() as f64
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "bot_id,bot_fingerprint,seed_hex,seed,lives,kills,best_portion,avg_portion,avg_survival_frames,avg_fitness,best_fitness,failed_joins,objective_value\n",
    );
    for row in rows {
        let m = &row.metrics;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{:.2},{:.2},{:.4},{:.4},{},{:.4}\n",
            m.bot_id,
            m.bot_fingerprint,
            row.seed_hex,
            m.seed,
            m.lives,
            m.kills,
            m.best_portion,
            m.avg_portion,
            m.avg_survival_frames,
            m.avg_fitness,
            m.best_fitness,
            m.failed_joins,
            row.objective_value
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}

fn write_rankings_csv(path: &Path, rows: &[BotAggregate]) -> Result<()> {
    let mut csv = String::from(
        "rank,bot_id,bot_fingerprint,runs,avg_lives,avg_kills,avg_portion,max_portion,avg_survival_frames,avg_fitness,objective_value\n",
    );
    for (idx, row) in rows.iter().enumerate() {
        csv.push_str(&format!(
            "{},{},{},{},{:.2},{:.2},{:.2},{},{:.2},{:.4},{:.4}\n",
            idx + 1,
            row.bot_id,
            row.bot_fingerprint,
            row.runs,
            row.avg_lives,
            row.avg_kills,
            row.avg_portion,
            row.max_portion,
            row.avg_survival_frames,
            row.avg_fitness,
            row.objective_value
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}
