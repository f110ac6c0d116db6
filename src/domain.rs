use std::path::PathBuf;
use std::time::Duration;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;
use tracing_error::TracedError;

pub const UNIVERSITIES_URL: &str = "http://universities.hipolabs.com/search";
pub const USER_AGENT: &str = concat!("unidash/", env!("CARGO_PKG_VERSION"));

pub const HELP_TEXT: &str = "\
unidash - List Of Universities

  j/k, Up/Down     move selection
  h/l, Left/Right  select column (scrolls hidden columns into view)
  [ ]              previous / next page
  g / G            first / last row
  Enter or /       search (Name) or filter (Country) the selected column
  s                sort selected column: ascending, descending, unsorted
  y                copy link of the selected university
  r                reload the list
  L                log out
  ?                this help
  q                quit

Search box:  Enter search, Ctrl-F filter and keep open, Ctrl-R reset, Esc close
Filter menu: type to narrow, Tab toggle, Ctrl-A select all, Enter OK,
             Ctrl-R reset, Esc close";

#[derive(Debug, Error)]
pub enum DashError {
    #[error("terminal error: {0}")]
    Terminal(#[from] TracedError<std::io::Error>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("could not set up logging: {0}")]
    Logging(String),
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    NextPage,
    PrevPage,
    OpenColumnMenu,
    Sort,
    CopyLink,
    Reload,
    Logout,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

/// Which text input currently receives raw key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Login,
    Search,
    FilterMenu,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct DashConfig {
    pub url: String,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub max_column_width: usize,
    pub event_poll_time: u64,
    pub log_file: PathBuf,
    pub skip_login: bool,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            url: UNIVERSITIES_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            page_size: 10,
            max_column_width: 60,
            event_poll_time: 100,
            log_file: PathBuf::from("unidash.log"),
            skip_login: false,
        }
    }
}
