//! Tank Arena entry point
//!
//! Runs the built-in level headless with a scripted player and logs what
//! happens. `RUST_LOG=debug` shows every spawn and pickup.
//!
//! Usage: `tank-arena [--seed N] [--ticks N] [--settings PATH] [--save PATH]`

use std::error::Error;
use std::path::PathBuf;

use tank_arena::consts::FRAME_MS;
use tank_arena::persistence;
use tank_arena::sim::{GameEvent, GamePhase, GameState, Level, PlayerInput, TickInput, tick};
use tank_arena::Settings;

struct Options {
    seed: u64,
    ticks: u64,
    settings: PathBuf,
    save: Option<PathBuf>,
}

impl Options {
    fn parse() -> Result<Self, Box<dyn Error>> {
        let mut options = Self {
            seed: 42,
            ticks: 60 * 120,
            settings: PathBuf::from("settings.json"),
            save: None,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| format!("{arg} needs a value"));
            match arg.as_str() {
                "--seed" => options.seed = value()?.parse()?,
                "--ticks" => options.ticks = value()?.parse()?,
                "--settings" => options.settings = PathBuf::from(value()?),
                "--save" => options.save = Some(PathBuf::from(value()?)),
                other => return Err(format!("unknown argument {other}").into()),
            }
        }
        Ok(options)
    }
}

/// Sweeps left and right along the bottom row, firing whenever possible
fn scripted_input(tick_no: u64) -> TickInput {
    let leg = (tick_no / 90) % 4;
    TickInput::single(PlayerInput {
        up: leg == 1,
        left: leg == 2,
        right: leg == 0,
        fire: true,
        ..Default::default()
    })
}

fn run() -> Result<(), Box<dyn Error>> {
    let options = Options::parse()?;
    let settings = Settings::load_or_default(&options.settings);
    let level = Level::demo()?;
    let mut state = GameState::new(level, settings, options.seed, 1);

    log::info!("Tank Arena (headless) starting, seed {}", options.seed);

    for n in 0..options.ticks {
        for event in tick(&mut state, &scripted_input(n), FRAME_MS) {
            match event {
                GameEvent::UnitDestroyed { .. }
                | GameEvent::BombDetonated { .. }
                | GameEvent::PhaseChanged { .. } => log::info!("[{} ms] {:?}", state.now_ms, event),
                _ => log::debug!("[{} ms] {:?}", state.now_ms, event),
            }
        }
        if state.phase != GamePhase::Playing {
            break;
        }
    }

    if let Some(path) = &options.save {
        let json = persistence::save(&state).to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved snapshot to {}", path.display());
    }

    let view = state.render_view();
    println!(
        "phase {:?} after {} ms: score {}, {} hostiles destroyed, lives {:?}",
        view.phase, view.now_ms, view.score, state.enemies_destroyed, view.lives
    );
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
