use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mcttable::domain::{TVConfig, TVError};
use mcttable::events::EventHandler;
use mcttable::model::{Model, Status};
use mcttable::ui::TableUI;

/// Browse a telemetry table, filter it per column and sort it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV, Parquet or Arrow file to show
    path: String,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Upper bound for the width of a column
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Start with the header row hidden
    #[arg(long)]
    no_headers: bool,

    /// Disable sorting
    #[arg(long)]
    no_sort: bool,

    /// Where to write logs, defaults to mcttable.log in the temp dir
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), TVError> {
    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("mcttable.log"));
    init_tracing(log_file)?;

    let config = TVConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_max_column_width(args.max_column_width)
        .with_display_headers(!args.no_headers)
        .with_enable_sort(!args.no_sort);
    info!("Starting mcttable with {config:?}");

    let path = shellexpand::full(&args.path)
        .map_err(|e| TVError::LoadingFailed(e.to_string()))?
        .to_string();

    let (width, height) = ratatui::crossterm::terminal::size()?;
    let mut model = Model::init(&config, width as usize, height as usize);
    model.load_data_file(PathBuf::from(path))?;

    let mut terminal = ratatui::init();
    let result = event_loop(&config, &mut model, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(
    config: &TVConfig,
    model: &mut Model,
    terminal: &mut DefaultTerminal,
) -> Result<(), TVError> {
    let mut ui = TableUI::new();
    let events = EventHandler::new(config);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model, f))?;
        let message = events.handle_event(model)?;
        model.update(message)?;
    }
    Ok(())
}

fn init_tracing(log_file: PathBuf) -> Result<(), TVError> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
