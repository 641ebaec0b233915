use anyhow::Context;
use clap::Parser;
use fftvu::app::App;
use fftvu::capture::{self, Capture, CpalCapture};
use fftvu::config::VisualizerConfig;
use fftvu::settings::Settings;
use fftvu::terminal::Terminal;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fftvu")]
#[command(author = "Terminal Art Generator")]
#[command(version = "0.1.0")]
#[command(about = "Live spectrum analyzer and VU meter for the terminal", long_about = None)]
struct Cli {
    /// Seconds between frames
    #[arg(short = 't', long)]
    interval: Option<f32>,

    /// Number of color bands (1-15)
    #[arg(short = 'B', long)]
    bands: Option<u8>,

    /// Samples per analysis block (power of two)
    #[arg(short = 'n', long)]
    block_size: Option<usize>,

    /// Requested capture sample rate in Hz
    #[arg(short, long)]
    rate: Option<u32>,

    /// Input device name (see --list-devices)
    #[arg(short, long)]
    device: Option<String>,

    /// Settings file (default: ~/.config/fftvu/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print input devices and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Write a debug log to the data directory
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn apply(&self, config: &mut VisualizerConfig) {
        if let Some(interval) = self.interval {
            config.frame_interval = interval;
        }
        if let Some(bands) = self.bands {
            config.color_bands = bands;
        }
        if let Some(size) = self.block_size {
            config.block_size = size;
        }
        if let Some(rate) = self.rate {
            config.sample_rate = rate;
        }
        if let Some(ref device) = self.device {
            config.device = Some(device.clone());
        }
    }
}

/// Log to a file; the terminal belongs to the visualizer while it runs.
fn init_logging() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("fftvu");
    fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let path = dir.join("fftvu.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .init();

    Ok(path)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        let path = init_logging()?;
        tracing::info!("fftvu {} starting, logging to {}", env!("CARGO_PKG_VERSION"), path.display());
    }

    if cli.list_devices {
        for (i, name) in capture::list_devices()?.iter().enumerate() {
            if i == 0 {
                println!("{} (default)", name);
            } else {
                println!("{}", name);
            }
        }
        return Ok(());
    }

    let settings = match cli.config {
        Some(ref path) => Settings::load_from(path)?,
        None => Settings::load(),
    };

    let mut config = VisualizerConfig::default();
    config.apply_settings(&settings);
    cli.apply(&mut config);
    config.validate()?;
    tracing::debug!("{:?}", config);

    let mut capture = CpalCapture::open(&config).context("cannot open audio input")?;
    let mut app = App::new(config, capture.sample_rate());

    let mut terminal = Terminal::new()?;
    let result = app.run(&mut capture, &mut terminal);
    drop(terminal);

    if let Err(ref e) = result {
        tracing::error!("visualizer stopped: {}", e);
    }
    Ok(result?)
}
