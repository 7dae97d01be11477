// src/main.rs
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use snapsolve::ai::{AiConnector, AnalysisResult, GeminiClient};
#[cfg(feature = "camera")]
use snapsolve::capture::CameraSource;
use snapsolve::capture::{FileSource, FrameSource, ScreenSource};
use snapsolve::config::AppConfig;
use snapsolve::controller::{CaptureController, UiHandle};
use snapsolve::gui;

/// Extra time on top of the request timeout for capture and encoding
const CYCLE_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "snapsolve")]
#[command(about = "Capture a question and let a vision model answer it", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gemini API key (default: $GEMINI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model name (e.g., "gemini-1.5-flash")
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the question shown in an image file
    Solve {
        /// Image to analyze
        image: PathBuf,

        /// Replace the default instruction
        #[arg(long)]
        instruction: Option<String>,
    },
    /// Capture a screen and solve the question on it
    Capture {
        /// Screen index to capture
        #[arg(long, default_value_t = 0)]
        screen: usize,
    },
    /// Take a webcam photo and solve the question on it
    #[cfg(feature = "camera")]
    Camera {
        /// Camera index
        #[arg(long, default_value_t = 0)]
        index: u32,
    },
    /// Check that the API key and model are accepted
    Check,
    /// Run graphical user interface
    Gui,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.overrides.config.as_deref())?;
    apply_overrides(&mut config, cli.overrides);
    config.validate()?;

    match cli.command {
        Commands::Solve { image, instruction } => {
            if let Some(instruction) = instruction {
                config.instruction = instruction;
                config.validate()?;
            }
            run_console_cycle(&config, Box::new(FileSource::new(image)))
        }
        Commands::Capture { screen } => {
            run_console_cycle(&config, Box::new(ScreenSource::with_screen(screen)))
        }
        #[cfg(feature = "camera")]
        Commands::Camera { index } => {
            run_console_cycle(&config, Box::new(CameraSource::with_index(index)))
        }
        Commands::Check => check_endpoint(&config),
        Commands::Gui => gui::run_gui(&config),
    }
}

fn apply_overrides(config: &mut AppConfig, args: ConfigArgs) {
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout_secs = secs;
    }
}

/// Status label on one stream, error popup on the other
struct ConsoleUi<O: Write, E: Write> {
    out: O,
    err: E,
}

impl ConsoleUi<io::Stdout, io::Stderr> {
    fn stdio() -> Self {
        Self {
            out: io::stdout(),
            err: io::stderr(),
        }
    }
}

impl<O: Write, E: Write> UiHandle for ConsoleUi<O, E> {
    fn set_status_text(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }

    fn show_error(&mut self, text: &str) {
        let _ = writeln!(self.err, "{}", text);
    }
}

fn run_console_cycle(config: &AppConfig, source: Box<dyn FrameSource>) -> Result<()> {
    info!("Starting headless cycle");

    let client = GeminiClient::new(&config.gemini_settings()?)?;
    info!("Using model {}", client.model_name());

    let mut controller =
        CaptureController::new(source, Arc::new(client), config.encoder(), &config.instruction);
    let mut ui = ConsoleUi::stdio();

    controller.trigger(&mut ui);
    let limit = config.timeout() + CYCLE_GRACE;
    match controller.wait(&mut ui, limit) {
        Some(AnalysisResult::Answer(_)) => Ok(()),
        Some(AnalysisResult::Failure(reason)) => Err(anyhow!(reason.clone())),
        None => Err(anyhow!("No result within {:?}", limit)),
    }
}

fn check_endpoint(config: &AppConfig) -> Result<()> {
    let settings = config.gemini_settings()?;
    info!("Checking {} at {}...", settings.model, settings.base_url);

    let client = GeminiClient::new(&settings)?;
    match client.check_model() {
        Ok(()) => {
            println!("✓ Model {} is available at {}", settings.model, settings.base_url);
            Ok(())
        }
        Err(e) => {
            println!("✗ {}", e);
            println!("\nTroubleshooting:");
            println!("  1. Check the API key ({} or --api-key)", snapsolve::config::ENV_API_KEY);
            println!("  2. Check the model name (--model)");
            Err(e)
        }
    }
}
