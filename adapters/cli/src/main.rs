#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for Lane Defence sessions.
//!
//! The runner loads a balance table, starts a session, replays an optional
//! scripted command timeline at a fixed frame rate and appends the outcome of
//! finished games to a JSON results store.

mod results;
mod script;

use std::{cell::RefCell, fs, path::PathBuf, rc::Rc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use lane_defence_core::{ConfigTable, Event, GameOutcome};
use lane_defence_session::Session;
use lane_defence_world::query;
use results::{GameRecord, ResultsStore};
use script::Script;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Replays a Lane Defence session without a presentation layer.
#[derive(Debug, Parser)]
#[command(name = "lane-defence", version, about, long_about = None)]
struct Cli {
    /// Balance table to load instead of the built-in one.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// TOML timeline of player commands to replay.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Wall-clock seconds to simulate before giving up.
    #[arg(long, default_value_t = 900)]
    seconds: u64,

    /// Length of a simulated frame in milliseconds.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    frame_ms: u64,

    /// Game-mode id the outcome is recorded under.
    #[arg(long, default_value = "classic")]
    mode: String,

    /// JSON file that collects finished games.
    #[arg(long, value_name = "FILE")]
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let script = load_script(cli.script.as_ref())?;

    let mut session = Session::new(config);
    let outcome = replay(
        &mut session,
        &script,
        Duration::from_millis(cli.frame_ms),
        Duration::from_secs(cli.seconds),
    );

    report(&session, outcome);

    if let (Some(path), Some(record)) = (cli.results.as_ref(), outcome) {
        let mut store = ResultsStore::open(path)?;
        store.record(&cli.mode, record);
        store.save()?;
        let played = store.records(&cli.mode).len();
        match store.best_victory(&cli.mode) {
            Some(best) => println!(
                "mode {}: {played} games recorded, fastest victory {:.1}s",
                cli.mode,
                best.elapsed_ms as f64 / 1000.0
            ),
            None => println!("mode {}: {played} games recorded, no victories yet", cli.mode),
        }
    }

    Ok(())
}

/// Honours `RUST_LOG` when set and falls back to `info` otherwise.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigTable> {
    let Some(path) = path else {
        return ConfigTable::standard().context("built-in balance table is invalid");
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ConfigTable::from_toml_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn load_script(path: Option<&PathBuf>) -> Result<Script> {
    let Some(path) = path else {
        return Ok(Script::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let script = Script::from_toml_str(&contents)
        .with_context(|| format!("invalid script {}", path.display()))?;
    tracing::info!(commands = script.len(), path = %path.display(), "loaded script");
    Ok(script)
}

/// Runs the session frame by frame until a base falls or `limit` wall time passes.
///
/// Script offsets are measured in wall time, so pausing does not delay them.
fn replay(
    session: &mut Session,
    script: &Script,
    frame: Duration,
    limit: Duration,
) -> Option<GameRecord> {
    let finished: Rc<RefCell<Option<GameRecord>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&finished);
    let _ = session.subscribe(Box::new(move |event: &Event| {
        log_event(event);
        match event {
            Event::GameEnded { outcome, elapsed } => {
                *sink.borrow_mut() = Some(GameRecord::new(*outcome, *elapsed));
            }
            Event::GameRestarted => *sink.borrow_mut() = None,
            _ => {}
        }
    }));

    session.start();

    let mut cursor = script.cursor();
    let mut clock = Duration::ZERO;
    while clock < limit {
        for scripted in cursor.due(clock) {
            tracing::debug!(at_ms = scripted.at_ms, input = ?scripted.input, "scripted input");
            scripted.input.submit(session);
        }
        if cursor.is_finished() && finished.borrow().is_some() {
            break;
        }
        session.update(frame);
        clock += frame;
    }

    let outcome = *finished.borrow();
    if outcome.is_none() {
        tracing::warn!(seconds = limit.as_secs(), "session still running at the time limit");
    }
    outcome
}

fn log_event(event: &Event) {
    match event {
        Event::GameEnded { outcome, elapsed } => {
            tracing::info!(?outcome, elapsed_s = elapsed.as_secs_f32(), "game ended");
        }
        Event::WaveStarted { wave } => tracing::info!(wave, "wave started"),
        Event::UnitUnlocked { kind } => tracing::info!(unit = kind.name(), "unit unlocked"),
        Event::BuildingBuilt { kind } => tracing::info!(building = kind.name(), "building built"),
        Event::BuildingDestroyed { kind } => {
            tracing::info!(building = kind.name(), "building destroyed");
        }
        Event::BaseDamaged { remaining } => tracing::debug!(remaining, "base damaged"),
        Event::EnemyBaseDamaged { remaining } => tracing::debug!(remaining, "enemy base damaged"),
        Event::TimeAdvanced { .. } | Event::WaveCountdownUpdated { .. } => {}
        other => tracing::trace!(event = ?other, "event"),
    }
}

fn report(session: &Session, outcome: Option<GameRecord>) {
    let world = session.world();
    match outcome {
        Some(record) => {
            let verdict = match record.outcome {
                GameOutcome::Victory => "victory",
                GameOutcome::Defeat => "defeat",
            };
            println!(
                "{verdict} after {:.1}s of play",
                record.elapsed_ms as f64 / 1000.0
            );
        }
        None => println!(
            "unfinished after {:.1}s of play",
            query::elapsed(world).as_secs_f64()
        ),
    }
    let resources = query::resources(world);
    println!(
        "base {} / enemy base {} | gold {} food {} wood {} | waves {}",
        query::base_health(world),
        query::enemy_base_health(world),
        resources.gold,
        resources.food,
        resources.wood,
        query::waves_started(world),
    );
}
