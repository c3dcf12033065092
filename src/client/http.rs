use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::info;

use super::{Backend, FragmentStream, HealthFuture, StreamFuture};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{HealthReport, QueryRequest};

const UPLOAD_PATH: &str = "/upload-stream";
const ASK_PATH: &str = "/ask-stream";
const HEALTH_PATH: &str = "/health";
const DOCUMENT_FIELD: &str = "file";
const DOCUMENT_MIME: &str = "application/pdf";

/// [`Backend`] speaking HTTP to the document service
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        // Streams may run for minutes, so only connecting and the silence
        // between two reads are bounded.
        let timeout = Duration::from_secs(config.server.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Backend for HttpBackend {
    fn upload(&self, file_name: &str, document: Bytes) -> StreamFuture {
        let url = self.config.endpoint(UPLOAD_PATH);
        let client = self.client.clone();
        let file_name = file_name.to_string();

        Box::pin(async move { Self::upload_impl(url, client, file_name, document).await })
    }

    fn ask(&self, request: &QueryRequest) -> StreamFuture {
        let url = self.config.endpoint(ASK_PATH);
        let client = self.client.clone();
        let request = request.clone();

        Box::pin(async move { Self::ask_impl(url, client, request).await })
    }

    fn health(&self) -> HealthFuture {
        let url = self.config.endpoint(HEALTH_PATH);
        let client = self.client.clone();
        let timeout = Duration::from_secs(self.config.server.timeout_secs);

        Box::pin(async move {
            let response = client
                .get(&url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| ClientError::Transport(format!("Health request failed: {}", e)))?;

            let response = ensure_success(response).await?;
            Ok(response.json::<HealthReport>().await?)
        })
    }

    fn name(&self) -> &str {
        "HTTP"
    }
}

impl HttpBackend {
    async fn upload_impl(
        url: String,
        client: Client,
        file_name: String,
        document: Bytes,
    ) -> Result<FragmentStream> {
        info!("Uploading {} ({} bytes) to: {}", file_name, document.len(), url);

        let part = Part::bytes(document.to_vec())
            .file_name(file_name)
            .mime_str(DOCUMENT_MIME)?;
        let form = Form::new().part(DOCUMENT_FIELD, part);

        let response = client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Upload request failed: {}", e)))?;

        into_fragments(ensure_success(response).await?)
    }

    async fn ask_impl(url: String, client: Client, request: QueryRequest) -> Result<FragmentStream> {
        info!(
            "Asking question ({} history turns) at: {}",
            request.history.len(),
            url
        );

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Question request failed: {}", e)))?;

        into_fragments(ensure_success(response).await?)
    }
}

/// Non-2xx responses become transport errors carrying the body
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    info!("Service responded with status: {}", status);

    if status.is_success() {
        return Ok(response);
    }

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ClientError::Transport(format!(
        "Service error {}: {}",
        status, error_body
    )))
}

fn into_fragments(response: Response) -> Result<FragmentStream> {
    Ok(Box::pin(response.bytes_stream().map_err(ClientError::from)))
}
