#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Delve levels headlessly.

mod map;

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use delve_core::{Command, Event};
use delve_world::{
    apply,
    headless::{HeadlessFactory, HeadlessTiles},
    query, SessionConfig, World,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TICK: Duration = Duration::from_millis(20);
const MAX_SETTLE_TICKS: usize = 10_000;

/// Generates dungeon levels and runs their agents without a game engine.
#[derive(Debug, Parser)]
#[command(name = "delve", version, about, long_about = None)]
struct Cli {
    /// TOML session configuration. Defaults are used when the file is absent.
    #[arg(long, default_value = "delve.toml")]
    config: PathBuf,

    /// Seed for the session's random source.
    #[arg(long)]
    seed: Option<u64>,

    /// Simulation ticks to run on each level, at 50 Hz.
    #[arg(long, default_value_t = 250)]
    ticks: usize,

    /// Generate levels one stage per tick.
    #[arg(long)]
    step_by_step: bool,

    /// Number of levels to play, advancing the difficulty between them.
    #[arg(long, default_value_t = 1)]
    levels: u32,
}

/// Entry point for the Delve command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.step_by_step {
        config.generation.step_by_step = true;
    }

    let mut world = World::new(
        config,
        Box::new(HeadlessFactory::new()),
        Box::new(HeadlessTiles::new()),
    );
    println!("delve {}", env!("CARGO_PKG_VERSION"));

    for index in 0..cli.levels {
        if index > 0 {
            let _ = step(&mut world, Command::AdvanceDifficulty)?;
        }
        play_level(&mut world, cli.ticks)?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: &Path) -> Result<SessionConfig> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no configuration file; using defaults");
            return Ok(SessionConfig::default());
        }
        Err(error) => {
            return Err(anyhow::Error::new(error)
                .context(format!("failed to read configuration {}", path.display())));
        }
    };
    toml::from_str(&text).with_context(|| format!("failed to parse configuration {}", path.display()))
}

fn step(world: &mut World, command: Command) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    apply(world, command, &mut events)?;
    Ok(events)
}

fn tick(world: &mut World) -> Result<Vec<Event>> {
    let player = query::level(world).and_then(|level| level.player_spawn());
    step(
        world,
        Command::Tick {
            dt: TICK,
            player,
            projectiles: Vec::new(),
        },
    )
}

fn play_level(world: &mut World, ticks: usize) -> Result<()> {
    let _ = step(world, Command::GenerateLevel).context("failed to generate level")?;
    while query::is_generating(world) {
        let _ = tick(world)?;
    }
    let _ = step(world, Command::SpawnAgents).context("failed to spawn agents")?;

    let mut transitions = 0_usize;
    for _ in 0..ticks {
        transitions += tick(world)?
            .iter()
            .filter(|event| matches!(event, Event::AgentStateChanged { .. }))
            .count();
    }

    let Some(level) = query::level(world) else {
        bail!("level disappeared while ticking");
    };
    let agents = query::agents(world);
    let positions: Vec<_> = agents.iter().map(|agent| agent.position).collect();
    print!("{}", map::render(level, &positions, level.player_spawn()));

    let mut states: BTreeMap<&'static str, usize> = BTreeMap::new();
    for agent in &agents {
        *states.entry(agent.state.as_str()).or_default() += 1;
    }
    println!(
        "level {}: {} rooms, {} floor cells, {} walls, {} agents, {} transitions",
        query::difficulty(world).level(),
        level.rooms().len(),
        level.floor().len(),
        level.walls().len(),
        agents.len(),
        transitions,
    );
    for (state, count) in &states {
        println!("  {state}: {count}");
    }

    let _ = step(world, Command::ClearLevel)?;
    for _ in 0..MAX_SETTLE_TICKS {
        if tick(world)?.contains(&Event::LevelCleared) {
            return Ok(());
        }
    }
    bail!("level teardown did not finish within {MAX_SETTLE_TICKS} ticks")
}
