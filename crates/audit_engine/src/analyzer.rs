use std::time::Duration;

use serde_json::Value;

use crate::{AnalysisError, AnalysisReport, FailureKind, TaskKind};

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Base URL of the backend analysis API.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One analysis collaborator per task kind. All analyzers are treated
/// uniformly: a success payload or a failure, nothing in between.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> TaskKind;

    async fn analyze(&self, url: &str) -> Result<AnalysisReport, AnalysisError>;
}

/// Analyzer backed by the remote analysis service:
/// `GET {base}/analyze/{kind}?url={target}`.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    kind: TaskKind,
    settings: AnalyzerSettings,
}

impl HttpAnalyzer {
    pub fn new(kind: TaskKind, settings: AnalyzerSettings) -> Self {
        Self { kind, settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, AnalysisError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| AnalysisError::new(FailureKind::Network, err.to_string()))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/analyze/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.kind.as_str()
        )
    }
}

#[async_trait::async_trait]
impl Analyzer for HttpAnalyzer {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    async fn analyze(&self, url: &str) -> Result<AnalysisReport, AnalysisError> {
        if url.trim().is_empty() {
            return Err(AnalysisError::new(FailureKind::InvalidUrl, "empty target"));
        }
        let client = self.build_client()?;

        let response = client
            .get(self.endpoint())
            .query(&[("url", url)])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let payload: Value = response.json().await.map_err(map_reqwest_error)?;
        Ok(AnalysisReport { payload })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        return AnalysisError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return AnalysisError::new(FailureKind::Decode, err.to_string());
    }
    AnalysisError::new(FailureKind::Network, err.to_string())
}
