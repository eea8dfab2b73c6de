//! Batch transcription client
//!
//! One-shot path: upload a complete audio file, get one cleaned transcript
//! back. Stateless across calls; shares the fragment cleaning rule with the
//! live assembler.

use crate::error::DictationError;
use crate::transcript::clean_fragment;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    transcription: String,
}

pub struct BatchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl BatchClient {
    pub fn new(endpoint: &str) -> Result<Self, DictationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DictationError::UploadFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Upload an audio file and return its cleaned transcript.
    pub async fn transcribe_file(&self, path: &Path) -> Result<String, DictationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DictationError::UploadFailed(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        self.transcribe_bytes(bytes, &file_name).await
    }

    /// Upload raw audio bytes as a single multipart `file` field and return
    /// the cleaned transcript. Non-success responses fail with
    /// `ServerError`; transport problems with `UploadFailed`.
    pub async fn transcribe_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<String, DictationError> {
        info!(
            "Uploading {} ({} bytes) to {}",
            file_name,
            bytes.len(),
            self.endpoint
        );

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("audio/webm")
            .map_err(|e| DictationError::UploadFailed(e.to_string()))?;

        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DictationError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DictationError::ServerError(status.as_u16()));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| DictationError::UploadFailed(format!("invalid response body: {}", e)))?;

        let cleaned = clean_fragment(&body.transcription);
        debug!("Batch transcription complete ({} chars)", cleaned.len());

        Ok(cleaned)
    }
}
