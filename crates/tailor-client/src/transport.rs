use std::pin::Pin;

use futures::StreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::request::AnalyzeRequest;

/// Response body as an ordered stream of raw chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ClientError>> + Send + 'static>>;

/// Initial response of an analyze POST, before the body is consumed.
pub struct OpenedResponse {
    pub status: u16,
    /// Canonical reason phrase, used when an error body has no detail.
    pub status_text: String,
    pub body: ByteStream,
}

impl OpenedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Reads the whole remaining body; used only for error responses.
    pub async fn read_body(mut self) -> Result<Vec<u8>, ClientError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

/// Sends an analyze request and hands back the streaming response.
#[async_trait::async_trait]
pub trait AnalyzeTransport: Send + Sync {
    async fn open(&self, request: &AnalyzeRequest) -> Result<OpenedResponse, ClientError>;
}

/// [`AnalyzeTransport`] over `reqwest` multipart uploads.
pub struct HttpTransport {
    client: reqwest::Client,
    analyze_url: String,
}

impl HttpTransport {
    /// Creates a transport from client configuration.
    ///
    /// No overall request timeout is set on the HTTP client; the response is
    /// a long-lived stream and deadlines are applied per call by the client.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            analyze_url: config.analyze_url(),
        })
    }
}

fn multipart_form(request: &AnalyzeRequest) -> Result<reqwest::multipart::Form, ClientError> {
    let file = reqwest::multipart::Part::bytes(request.cv.bytes.clone())
        .file_name(request.cv.filename.clone())
        .mime_str("application/octet-stream")
        .map_err(|e| ClientError::Validation(format!("invalid résumé upload: {e}")))?;
    let mut form = reqwest::multipart::Form::new().part("cv_file", file);
    for (name, value) in request.text_fields() {
        form = form.text(name, value.to_string());
    }
    Ok(form)
}

#[async_trait::async_trait]
impl AnalyzeTransport for HttpTransport {
    async fn open(&self, request: &AnalyzeRequest) -> Result<OpenedResponse, ClientError> {
        debug!(url = %self.analyze_url, cv = %request.cv.filename, "posting analyze request");
        let response = self
            .client
            .post(&self.analyze_url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .multipart(multipart_form(request)?)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("analyze request failed: {e}")))?;

        let status = response.status();
        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ClientError::Transport(format!("streaming read failed: {e}")))
        });
        Ok(OpenedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: Box::pin(body),
        })
    }
}
