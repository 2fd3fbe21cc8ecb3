use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, warn};

use super::{AttendanceService, Backend, BackendError, BackendProvider, StudentDirectory};
use crate::model::attendance::AttendanceBatch;
use crate::model::student::{RosterKey, Student};

/// Largest roster page the directory is asked for.
const ROSTER_LIMIT: usize = 100;

#[derive(Serialize)]
struct ClassSeedRequest<'a> {
    class_name: &'a str,
    division: &'a str,
}

/// Shares one connection pool across all callers.
pub struct HttpBackendProvider {
    client: Client,
    base_url: String,
}

impl HttpBackendProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl BackendProvider for HttpBackendProvider {
    fn connect(&self, bearer_token: &str) -> Arc<dyn Backend> {
        Arc::new(HttpBackend {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: bearer_token.to_string(),
        })
    }
}

/// REST client for one authenticated caller.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode_students(response: Response) -> Result<Vec<Student>, BackendError> {
        Self::ensure_success(response)
            .await?
            .json::<Vec<Student>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

#[async_trait]
impl StudentDirectory for HttpBackend {
    async fn list_students(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        debug!(roster = %key, "GET /students/");
        let limit = ROSTER_LIMIT.to_string();
        let response = self
            .client
            .get(self.url("/students/"))
            .bearer_auth(&self.token)
            .query(&[
                ("class_name", key.class_key.as_str()),
                ("division", key.division.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let students = Self::decode_students(response).await?;
        if students.len() >= ROSTER_LIMIT {
            warn!(
                roster = %key,
                limit = ROSTER_LIMIT,
                "Student listing hit the page limit, roster may be truncated"
            );
        }
        Ok(students)
    }

    async fn seed_class(&self, key: &RosterKey) -> Result<Vec<Student>, BackendError> {
        debug!(roster = %key, "POST /students/seed-class");
        let response = self
            .client
            .post(self.url("/students/seed-class"))
            .bearer_auth(&self.token)
            .json(&ClassSeedRequest {
                class_name: &key.class_key,
                division: &key.division,
            })
            .send()
            .await
            .map_err(transport)?;

        Self::decode_students(response).await
    }
}

#[async_trait]
impl AttendanceService for HttpBackend {
    async fn submit_batch(&self, batch: &AttendanceBatch) -> Result<(), BackendError> {
        debug!(items = batch.items.len(), "POST /attendance/bulk");
        let response = self
            .client
            .post(self.url("/attendance/bulk"))
            .bearer_auth(&self.token)
            .json(batch)
            .send()
            .await
            .map_err(transport)?;

        Self::ensure_success(response).await.map(|_| ())
    }
}
