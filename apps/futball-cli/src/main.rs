use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use futball_common::{Color, GameConfig};
use futball_game::{FrameInfo, FrameSink, Game, GameError};
use futball_input::{InputEvent, Key};
use futball_render::{FrameBuffer, SoftwareBackend};
use futball_scene::DeviceSelector;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "futball-cli", about = "Headless futball driver")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML file with game tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Horizontal field of view in degrees
    #[arg(long)]
    fov: Option<i32>,

    /// Tick rate used to derive the simulated tick length
    #[arg(long)]
    fps: Option<u32>,

    /// Reflection bounces per primary ray
    #[arg(long)]
    bounce_limit: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as YAML
    Info,
    /// Run the game loop against the software ray tracer with scripted input
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Hold the forward key for the whole run
        #[arg(long)]
        forward: bool,
        /// Hold a strafe key for the whole run
        #[arg(long, value_enum)]
        strafe: Option<Strafe>,
        /// Press jump on this tick
        #[arg(long)]
        jump_at: Option<u64>,
        /// Hold a turn key for the whole run
        #[arg(long, value_enum)]
        turn: Option<Turn>,
        /// Initial yaw in radians
        #[arg(long, default_value = "0")]
        yaw: f32,
        /// Print the avatar position every N ticks
        #[arg(long, default_value = "10")]
        report_every: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strafe {
    Left,
    Right,
}

#[derive(Clone, Copy, ValueEnum)]
enum Turn {
    Left,
    Right,
}

/// Resolution used for simulation when none is given.
const HEADLESS_SIZE: (u32, u32) = (160, 120);

fn effective_config(cli: &Cli, headless: bool) -> anyhow::Result<GameConfig> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GameConfig::default(),
    };
    if headless {
        config.window.width = HEADLESS_SIZE.0;
        config.window.height = HEADLESS_SIZE.1;
    }
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }
    if let Some(fps) = cli.fps {
        config.window.target_fps = fps;
    }
    if let Some(fov) = cli.fov {
        config.render.fov = fov;
    }
    if let Some(limit) = cli.bounce_limit {
        config.render.bounce_limit = limit;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Remembers the brightness of the last presented frame.
#[derive(Default)]
struct IntensityMeter {
    last_mean: f64,
    frames: u64,
}

impl FrameSink for IntensityMeter {
    fn present(&mut self, frame: &FrameBuffer, _info: &FrameInfo) -> Result<(), GameError> {
        let total: u64 = frame
            .pixels()
            .iter()
            .map(|&p| {
                let c = Color(p);
                c.r() as u64 + c.g() as u64 + c.b() as u64
            })
            .sum();
        self.last_mean = total as f64 / (frame.len() as f64 * 3.0 * 255.0);
        self.frames += 1;
        Ok(())
    }
}

fn simulate(
    config: GameConfig,
    ticks: u64,
    held: Vec<Key>,
    jump_at: Option<u64>,
    yaw: f32,
    report_every: u64,
) -> anyhow::Result<()> {
    let dt = 1.0 / config.window.target_fps as f32;
    let width = config.window.width as f32;
    let mut game = Game::<SoftwareBackend>::new(config, &DeviceSelector::any())
        .context("starting software backend")?;
    let mut meter = IntensityMeter::default();

    // one screen width of pointer travel is one radian of yaw
    let mut pending: Vec<InputEvent> = held
        .iter()
        .map(|&key| InputEvent::Key { key, pressed: true })
        .collect();
    if yaw != 0.0 {
        pending.push(InputEvent::PointerMotion {
            dx: yaw * width,
            dy: 0.0,
        });
    }
    for &event in &pending {
        game.handle_event(event);
    }
    pending.clear();

    let report_every = report_every.max(1);
    for tick in 0..ticks {
        if !game.is_running() {
            break;
        }
        if jump_at == Some(tick) {
            pending.push(InputEvent::Key {
                key: Key::Jump,
                pressed: true,
            });
        } else if jump_at.map(|t| t + 1) == Some(tick) {
            pending.push(InputEvent::Key {
                key: Key::Jump,
                pressed: false,
            });
        }
        game.tick(dt, &mut meter, pending.drain(..))
            .with_context(|| format!("tick {tick}"))?;

        if (tick + 1) % report_every == 0 || tick + 1 == ticks {
            let state = game.player().state();
            println!(
                "tick {:>5}: pos=({:.2}, {:.2}, {:.2}) vel=({:.2}, {:.2}, {:.2}) yaw={:.3} {:?}",
                tick + 1,
                state.position.x,
                state.position.y,
                state.position.z,
                state.velocity.x,
                state.velocity.y,
                state.velocity.z,
                state.look.yaw,
                state.motion,
            );
        }
    }

    let stats = game.engine().backend().stats();
    println!("frames presented: {}", meter.frames);
    println!("mean intensity of last frame: {:.4}", meter.last_mean);
    println!(
        "scenes: created={} released={} live={}",
        stats.scenes_created,
        stats.scenes_released,
        stats.live_scenes()
    );
    game.shutdown();
    Ok(())
}

/// `RUST_LOG` when set, otherwise `debug` or `info` depending on `--verbose`.
fn log_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .init();

    match &cli.command {
        Commands::Info => {
            let config = effective_config(&cli, false)?;
            println!("# futball v{}", env!("CARGO_PKG_VERSION"));
            print!("{}", config.to_yaml_string()?);
        }
        Commands::Simulate {
            ticks,
            forward,
            strafe,
            turn,
            jump_at,
            yaw,
            report_every,
        } => {
            let config = effective_config(&cli, true)?;
            let mut held = Vec::new();
            if *forward {
                held.push(Key::Forward);
            }
            match strafe {
                Some(Strafe::Left) => held.push(Key::StrafeLeft),
                Some(Strafe::Right) => held.push(Key::StrafeRight),
                None => {}
            }
            match turn {
                Some(Turn::Left) => held.push(Key::TurnLeft),
                Some(Turn::Right) => held.push(Key::TurnRight),
                None => {}
            }
            tracing::info!(
                ticks,
                width = config.window.width,
                height = config.window.height,
                "simulating"
            );
            simulate(config, *ticks, held, *jump_at, *yaw, *report_every)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_verbose_flag() {
        // SAFETY: no other test in this binary reads or writes the environment
        unsafe { std::env::set_var("RUST_LOG", "warn") };
        assert_eq!(log_filter(true).to_string(), "warn");

        unsafe { std::env::remove_var("RUST_LOG") };
        assert_eq!(log_filter(true).to_string(), "debug");
        assert_eq!(log_filter(false).to_string(), "info");
    }
}
