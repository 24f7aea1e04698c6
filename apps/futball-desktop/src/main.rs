mod app;
mod present;

use anyhow::{Context, Result};
use app::DesktopApp;
use clap::{Parser, ValueEnum};
use futball_common::GameConfig;
use futball_render::SoftwareBackend;
use futball_render_wgpu::WgpuBackend;
use futball_scene::{ComputeBackend, DeviceSelector};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "futball-desktop", about = "Ray-traced sphere in an arena")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML file with game tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Horizontal field of view in degrees
    #[arg(long)]
    fov: Option<i32>,

    /// Tick rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Reflection bounces per primary ray
    #[arg(long)]
    bounce_limit: Option<i32>,

    /// Substring of the compute adapter name to prefer
    #[arg(long, env = "FUTBALL_DEVICE")]
    device: Option<String>,

    /// Where rays are traced
    #[arg(long, value_enum, default_value = "gpu")]
    backend: BackendKind,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    /// wgpu compute shader
    Gpu,
    /// Software tracer on the calling thread
    Cpu,
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => GameConfig::default(),
        };
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if let Some(fps) = self.fps {
            config.window.target_fps = fps;
        }
        if let Some(fov) = self.fov {
            config.render.fov = fov;
        }
        if let Some(limit) = self.bounce_limit {
            config.render.bounce_limit = limit;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn run<B: ComputeBackend>(config: GameConfig, selector: DeviceSelector) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DesktopApp::<B>::new(config, selector);
    event_loop.run_app(&mut app)?;
    app.into_result()
}

/// `RUST_LOG` when set, otherwise `debug` or `info` depending on `--verbose`.
fn log_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .init();

    tracing::info!("futball-desktop starting");

    let config = cli.game_config()?;
    let selector = DeviceSelector::from(cli.device.clone());
    match cli.backend {
        BackendKind::Gpu => run::<WgpuBackend>(config, selector),
        BackendKind::Cpu => run::<SoftwareBackend>(config, selector),
    }
}
