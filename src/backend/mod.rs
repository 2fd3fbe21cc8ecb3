//! External collaborators of the capture workflow: the student directory and
//! the attendance service. Both sit behind async traits so the workflow never
//! knows whether it talks HTTP or an in-process store.

pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use derive_more::Display;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::attendance::AttendanceBatch;
use crate::model::student::{RosterKey, Student};

#[derive(Debug, Clone, Display)]
pub enum BackendError {
    #[display(fmt = "transport error: {}", _0)]
    Transport(String),
    #[display(fmt = "backend responded {}: {}", status, body)]
    Status { status: u16, body: String },
    #[display(fmt = "malformed response: {}", _0)]
    Decode(String),
}

impl std::error::Error for BackendError {}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// Students of one class key and division, in whatever order the directory keeps.
    async fn list_students(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError>;

    /// Durably creates a batch of synthetic students for an empty roster.
    async fn seed_class(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError>;
}

#[async_trait]
pub trait AttendanceService: Send + Sync {
    /// One request for the whole session; any success is an acknowledgement.
    async fn submit_batch(&self, batch: &AttendanceBatch) -> Result<(), BackendError>;
}

/// Both collaborators behind one authenticated handle.
pub trait Backend: StudentDirectory + AttendanceService {}

impl<T: StudentDirectory + AttendanceService> Backend for T {}

/// Hands out a backend bound to the caller's credentials.
pub trait BackendProvider: Send + Sync {
    fn connect(&self, bearer_token: &str) -> Arc<dyn Backend>;
}

pub fn init_backend(config: &Config) -> Result<Arc<dyn BackendProvider>> {
    match &config.backend_url {
        Some(url) => {
            info!(backend_url = %url, "Using upstream attendance backend");
            let provider = http::HttpBackendProvider::new(
                url,
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        None => {
            warn!("BACKEND_URL not set, using in-memory student directory");
            Ok(Arc::new(Arc::new(memory::MemoryBackend::new())))
        }
    }
}
