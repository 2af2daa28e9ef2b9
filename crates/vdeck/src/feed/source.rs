//! Where the newline-delimited list comes from.

use std::path::PathBuf;

use futures::future::LocalBoxFuture;
use log::debug;

use super::error::FetchError;

/// Fetches the raw list text.
pub trait ListSource {
    /// Human-readable origin, for logs and messages.
    fn describe(&self) -> String;
    fn fetch(&self) -> LocalBoxFuture<'_, Result<String, FetchError>>;
}

/// A list file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ListSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> LocalBoxFuture<'_, Result<String, FetchError>> {
        let path = self.path.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                std::fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })
            })
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?
        })
    }
}

/// A list served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ListSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> LocalBoxFuture<'_, Result<String, FetchError>> {
        let url = self.url.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || fetch_blocking(&url))
                .await
                .map_err(|err| FetchError::Transport(err.to_string()))?
        })
    }
}

fn fetch_blocking(url: &str) -> Result<String, FetchError> {
    debug!("GET {url}");
    let mut response = ureq::get(url).call().map_err(|err| match err {
        ureq::Error::StatusCode(status) => FetchError::Status(status),
        other => FetchError::Transport(other.to_string()),
    })?;
    response
        .body_mut()
        .read_to_string()
        .map_err(|err| FetchError::Transport(err.to_string()))
}

/// List text already in memory.
#[derive(Debug, Clone)]
pub struct InlineSource {
    text: String,
}

impl InlineSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ListSource for InlineSource {
    fn describe(&self) -> String {
        "inline list".to_string()
    }

    fn fetch(&self) -> LocalBoxFuture<'_, Result<String, FetchError>> {
        let text = self.text.clone();
        Box::pin(async move { Ok(text) })
    }
}

/// Pick a source for a command-line argument: http(s) URLs go over the
/// network, anything else is a file path.
pub fn source_for(location: &str) -> Box<dyn ListSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(FileSource::new(location))
    }
}
