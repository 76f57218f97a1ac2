//! Import of a user-picked file.
//!
//! The file text is forwarded to the tab under the `json` type whatever its
//! media type; the alert only tells the user whether it looked like JSON.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use sitegate_proto::Envelope;

use crate::transport::Transport;

pub const JSON_FOUND: &str = "JSON found!";
pub const FILE_FOUND: &str = "File found";
pub const READ_FAILED: &str = "Error. Cannot load file.";

/// A file handed over by the picker.
pub trait PickedFile: Send + Sync {
    fn name(&self) -> &str;

    /// Media type reported by the picker, if any.
    fn media_type(&self) -> Option<&str>;

    fn read_text(&self) -> impl Future<Output = io::Result<String>> + Send;

    fn looks_like_json(&self) -> bool {
        self.media_type()
            .is_some_and(|t| t.contains("application/json") || t.contains("text/json"))
    }
}

/// A file on the local disk. The media type is guessed from the extension.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

impl PickedFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn media_type(&self) -> Option<&str> {
        self.path
            .extension()
            .filter(|ext| ext.eq_ignore_ascii_case("json"))
            .map(|_| "application/json")
    }

    async fn read_text(&self) -> io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTone {
    /// The file looked like JSON.
    Normal,
    /// Forwarded, but the picker did not report a JSON media type.
    Caution,
    /// The file could not be read.
    Error,
}

/// Alert shown under the file input after an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportAlert {
    /// One of [`JSON_FOUND`], [`FILE_FOUND`] or [`READ_FAILED`].
    pub text: String,
    pub tone: AlertTone,
    /// Shown as soon as an import produced the alert.
    pub visible: bool,
}

impl ImportAlert {
    fn new(text: &str, tone: AlertTone) -> Self {
        Self {
            text: text.to_string(),
            tone,
            visible: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Cannot read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("File input is not available")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub alert: ImportAlert,
    pub bytes: usize,
    /// Whatever the tab answered to the `json` message.
    pub reply: Option<Value>,
}

pub struct FileImporter<T> {
    transport: Arc<T>,
    alert: RwLock<Option<ImportAlert>>,
}

impl<T: Transport> FileImporter<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            alert: RwLock::new(None),
        }
    }

    pub async fn alert(&self) -> Option<ImportAlert> {
        self.alert.read().await.clone()
    }

    /// Read `file` and forward its text to the tab.
    pub async fn import(&self, file: &impl PickedFile) -> Result<ImportOutcome, ImportError> {
        let found = if file.looks_like_json() {
            ImportAlert::new(JSON_FOUND, AlertTone::Normal)
        } else {
            ImportAlert::new(FILE_FOUND, AlertTone::Caution)
        };
        *self.alert.write().await = Some(found.clone());

        let text = match file.read_text().await {
            Ok(text) => text,
            Err(source) => {
                warn!(name = file.name(), error = %source, "File read failed");
                *self.alert.write().await = Some(ImportAlert::new(READ_FAILED, AlertTone::Error));
                return Err(ImportError::Read {
                    name: file.name().to_string(),
                    source,
                });
            }
        };

        let bytes = text.len();
        let Envelope { data, kind } = Envelope::import(text);
        let reply = self.transport.send(data, kind).await;
        info!(name = file.name(), bytes, json = file.looks_like_json(), "File imported");
        Ok(ImportOutcome {
            alert: found,
            bytes,
            reply,
        })
    }
}
