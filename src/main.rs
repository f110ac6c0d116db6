use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_error::{ErrorLayer, InstrumentResult};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod engine;
mod inputter;
mod loader;
mod login;
mod matching;
mod model;
mod table;
mod ui;

use controller::Controller;
use domain::{DashConfig, DashError, UNIVERSITIES_URL};
use loader::Loader;
use model::{Model, Status};
use ui::TableUI;

/// Browse the list of universities in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Endpoint returning the university list as JSON
    #[arg(long, default_value = UNIVERSITIES_URL)]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Rows per page
    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Upper bound for a column's width in characters
    #[arg(long, default_value_t = 60)]
    max_column_width: usize,

    /// Milliseconds to wait for terminal events between redraws
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    /// Log file, `~` and environment variables are expanded
    #[arg(long, default_value = "unidash.log")]
    log_file: String,

    /// Log filter, e.g. `info` or `unidash=trace`
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Go straight to the dashboard
    #[arg(long)]
    skip_login: bool,
}

impl Cli {
    fn config(&self) -> Result<DashConfig, DashError> {
        let log_file = shellexpand::full(&self.log_file)
            .map_err(|e| DashError::Logging(e.to_string()))?;
        Ok(DashConfig::default()
            .with_url(self.url.clone())
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_page_size(self.page_size)
            .with_max_column_width(self.max_column_width)
            .with_event_poll_time(self.event_poll_time)
            .with_log_file(PathBuf::from(log_file.as_ref()))
            .with_skip_login(self.skip_login))
    }
}

fn init_logging(config: &DashConfig, level: &str) -> Result<(), DashError> {
    let file = File::create(&config.log_file)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| DashError::Logging(e.to_string()))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DashError::Logging(e.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config, &cli.log_level) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let mut terminal = ratatui::init();
    let result = run(&config, &mut terminal);
    ratatui::restore();

    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(config: &DashConfig, terminal: &mut ratatui::DefaultTerminal) -> Result<(), DashError> {
    info!("Starting unidash, source {}", config.url);
    let loader = Arc::new(Loader::new(config)?);
    let size = terminal.size().in_current_span()?;
    let mut model = Model::init(config, loader, size.width as usize, size.height as usize);
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::Quitting {
        terminal
            .draw(|f| ui.draw(model.get_uidata(), f))
            .in_current_span()?;
        let message = controller.handle_event(&model)?;
        model.update(message);
    }
    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_maps_into_config() {
        let cli = Cli::parse_from([
            "unidash",
            "--url",
            "http://localhost:8080/search",
            "--timeout",
            "5",
            "--page-size",
            "20",
            "--skip-login",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.url, "http://localhost:8080/search");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.page_size, 20);
        assert!(config.skip_login);
        assert_eq!(config.log_file, PathBuf::from("unidash.log"));
    }

    #[test]
    fn defaults_match_config_defaults() {
        let config = Cli::parse_from(["unidash"]).config().unwrap();
        let defaults = DashConfig::default();
        assert_eq!(config.url, defaults.url);
        assert_eq!(config.request_timeout, defaults.request_timeout);
        assert_eq!(config.max_column_width, defaults.max_column_width);
        assert!(!config.skip_login);
    }
}
