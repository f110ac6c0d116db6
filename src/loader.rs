use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::{DashConfig, DashError, USER_AGENT};
use crate::table::{Row, UniversityRecord};

/// Failures of a single fetch. All of them end up as an empty table.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("endpoint answered with status {0}")]
    Status(u16),
    #[error("response is not a list of universities: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    HasData(Arc<[Row]>),
    NoData,
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn rows(&self) -> Arc<[Row]> {
        match self {
            LoadState::HasData(rows) => Arc::clone(rows),
            LoadState::Loading | LoadState::NoData => Arc::from(Vec::new()),
        }
    }
}

/// Receives load failures after they have been absorbed by the loader.
pub trait FailureSink: Send + Sync {
    fn report(&self, url: &str, failure: &LoadFailure);
}

/// Writes failures to the diagnostic log.
#[derive(Debug, Default)]
pub struct LogSink;

impl FailureSink for LogSink {
    fn report(&self, url: &str, failure: &LoadFailure) {
        error!("Loading {url} failed: {failure}");
    }
}

pub struct Loader {
    client: Client,
    url: String,
    sink: Arc<dyn FailureSink>,
}

impl Loader {
    pub fn new(config: &DashConfig) -> Result<Self, DashError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            sink: Arc::new(LogSink),
        })
    }

    #[cfg(test)]
    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<Row>, LoadFailure> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadFailure::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        debug!("Received {} bytes from {}", body.len(), self.url);
        let records: Vec<UniversityRecord> = serde_json::from_slice(&body)?;
        Ok(normalize(records))
    }

    /// Fetch once and fold the outcome into a [`LoadState`].
    /// Returns `None` if `cancel` fires before the response is in.
    pub async fn load(&self, cancel: &CancellationToken) -> Option<LoadState> {
        let start_time = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Load of {} cancelled", self.url);
                return None;
            }
            result = self.fetch() => result,
        };
        let took = start_time.elapsed().as_millis();

        let state = match result {
            Ok(rows) if rows.is_empty() => {
                info!("Endpoint returned no universities ({took}ms)");
                LoadState::NoData
            }
            Ok(rows) => {
                info!("Loaded {} universities in {took}ms", rows.len());
                LoadState::HasData(rows.into())
            }
            Err(failure) => {
                self.sink.report(&self.url, &failure);
                LoadState::NoData
            }
        };
        Some(state)
    }

    pub fn spawn(self: Arc<Self>) -> LoadHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let token = cancel.clone();
        tokio::spawn(async move {
            if let Some(state) = self.load(&token).await
                && !token.is_cancelled()
                && tx.send(state).is_err()
            {
                debug!("Load finished after the dashboard was closed, dropping it");
            }
        });
        LoadHandle {
            rx: Some(rx),
            cancel,
        }
    }
}

/// Assigns every record its position as id.
pub fn normalize(records: Vec<UniversityRecord>) -> Vec<Row> {
    records
        .into_iter()
        .enumerate()
        .map(|(id, record)| Row::from_record(id, record))
        .collect()
}

/// The pending result of [`Loader::spawn`]. Dropping it cancels the request.
pub struct LoadHandle {
    rx: Option<oneshot::Receiver<LoadState>>,
    cancel: CancellationToken,
}

impl LoadHandle {
    /// Non-blocking. Yields the final state once, `None` while still loading.
    pub fn poll(&mut self) -> Option<LoadState> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(state) => {
                self.rx = None;
                Some(state)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                // The task went away without an answer, treat like any failure.
                self.rx = None;
                Some(LoadState::NoData)
            }
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
