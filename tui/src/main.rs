//! DataSense TUI Entry Point
//!
//! Launches the terminal chat widget.
//!
//! Usage:
//!   datasense-tui [OPTIONS]
//!
//! Options:
//!   --base-url <URL>   Chat endpoint base URL (default: http://localhost:8000)
//!   --ws-url <URL>     Status channel base URL (default: ws://localhost:8000)
//!   --client-id <ID>   Fixed client identity
//!   --demo             Scripted backend, no network
//!   --config <PATH>    Config file (default: $XDG_CONFIG_HOME/datasense/widget.toml)

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datasense_core::{default_config_path, load_config_from_path, ConfigOverrides, WidgetMode};
use datasense_tui::App;

/// Terminal chat with premium partner-data answers
#[derive(Debug, Parser)]
#[command(name = "datasense-tui", version, about)]
struct Cli {
    /// Chat endpoint base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Status channel base URL
    #[arg(long)]
    ws_url: Option<String>,

    /// Fixed client identity (default: generated per session)
    #[arg(long)]
    client_id: Option<String>,

    /// Use the scripted backend instead of the network
    #[arg(long)]
    demo: bool,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write logs (the terminal is owned by the UI)
    #[arg(long, env = "DATASENSE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(url) = &self.base_url {
            overrides = overrides.with_base_url(url);
        }
        if let Some(url) = &self.ws_url {
            overrides = overrides.with_ws_url(url);
        }
        if let Some(id) = &self.client_id {
            overrides = overrides.with_client_id(id);
        }
        if self.demo {
            overrides = overrides.with_mode(WidgetMode::Scripted);
        }
        overrides
    }
}

fn init_logging(path: PathBuf) -> anyhow::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("datasense-tui.log"));
    init_logging(log_path)?;

    let mut config = load_config_from_path(cli.config.clone().or_else(default_config_path))?;
    cli.overrides().apply(&mut config);
    config.validate()?;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: datasense-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  - Running in a non-interactive environment (CI, container)");
        eprintln!("  - SSH without -t flag");
        eprintln!("  - Piped stdin/stdout");
        std::process::exit(1);
    }

    // Restore the terminal before printing a panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = match App::new(config) {
        Ok(mut app) => app.run(&mut terminal).await,
        Err(e) => Err(e),
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
