use std::sync::Arc;

use tracing::debug;

use crate::config::ClientConfig;
use crate::content::AnalysisResult;
use crate::errors::{ClientError, classify_http_failure};
use crate::request::AnalyzeRequest;
use crate::session::StreamSession;
use crate::transport::{AnalyzeTransport, HttpTransport};

/// Entry point for submitting analyze requests.
#[derive(Clone)]
pub struct AnalyzeClient {
    transport: Arc<dyn AnalyzeTransport>,
    config: ClientConfig,
}

impl AnalyzeClient {
    /// Creates a client that talks HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            transport: Arc::new(transport),
            config,
        })
    }

    /// Creates a client from `TAILOR_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn AnalyzeTransport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Retrieval URL for an artifact named in a result.
    pub fn download_url(&self, filename: &str) -> String {
        self.config.download_url(filename)
    }

    /// Creates an idle session using the configured trailing fragment policy.
    ///
    /// Take its [`abort_handle`](StreamSession::abort_handle) before passing it
    /// to [`AnalyzeClient::analyze_with`] to cancel from another task.
    pub fn new_session(&self) -> StreamSession {
        StreamSession::new(self.config.trailing_fragment)
    }

    /// Submits `request` and streams the response to its single outcome.
    pub async fn analyze<F>(
        &self,
        request: &AnalyzeRequest,
        on_stage: F,
    ) -> Result<AnalysisResult, ClientError>
    where
        F: FnMut(&str),
    {
        self.analyze_with(self.new_session(), request, on_stage).await
    }

    /// Like [`AnalyzeClient::analyze`] but drives a caller-supplied session.
    pub async fn analyze_with<F>(
        &self,
        mut session: StreamSession,
        request: &AnalyzeRequest,
        on_stage: F,
    ) -> Result<AnalysisResult, ClientError>
    where
        F: FnMut(&str),
    {
        session.ensure_idle()?;
        let call = async {
            let response = self.transport.open(request).await?;
            if !response.is_success() {
                let status = response.status;
                let status_text = response.status_text.clone();
                // An unreadable error body still yields the status text.
                let body = response.read_body().await.unwrap_or_default();
                return Err(classify_http_failure(status, &status_text, &body));
            }
            debug!(
                session_id = %session.id(),
                status = response.status,
                "analyze response accepted"
            );
            session.run(response.body, on_stage).await
        };

        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ClientError::Timeout { limit })?,
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::CvDocument;
    use crate::transport::{ByteStream, OpenedResponse};
    use futures::{StreamExt as _, stream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const RESULT: &str = "data: {\"type\":\"result\",\"cover_letter\":{\"markdown\":\"Hello\",\"filename\":\"cover_letter_1.md\"},\"cv_suggestions\":[],\"revised_cv\":{\"content\":\"# Me\\n\",\"format\":\"markdown\",\"filename\":\"cv_revised_1.md\"}}\n";

    struct FakeTransport {
        calls: Arc<AtomicUsize>,
        status: u16,
        status_text: &'static str,
        chunks: Vec<&'static str>,
        hang_after_chunks: bool,
    }

    impl FakeTransport {
        fn ok(chunks: Vec<&'static str>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                status: 200,
                status_text: "OK",
                chunks,
                hang_after_chunks: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl AnalyzeTransport for FakeTransport {
        async fn open(&self, _request: &AnalyzeRequest) -> Result<OpenedResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let items = self
                .chunks
                .iter()
                .map(|c| Ok::<_, ClientError>(bytes::Bytes::from_static(c.as_bytes())))
                .collect::<Vec<_>>();
            let body: ByteStream = if self.hang_after_chunks {
                Box::pin(stream::iter(items).chain(stream::pending()))
            } else {
                Box::pin(stream::iter(items))
            };
            Ok(OpenedResponse {
                status: self.status,
                status_text: self.status_text.to_string(),
                body,
            })
        }
    }

    fn request() -> AnalyzeRequest {
        AnalyzeRequest::builder(CvDocument::new("cv.md", "# Me\n"))
            .job_listing("Rust engineer")
            .api_key("key")
            .build()
            .expect("request")
    }

    fn client(transport: FakeTransport, config: ClientConfig) -> AnalyzeClient {
        AnalyzeClient::with_transport(config, Arc::new(transport)).expect("client")
    }

    #[tokio::test]
    async fn streams_stages_then_result() {
        let transport = FakeTransport::ok(vec![
            "data: {\"type\":\"stage\",\"message\":\"Parsing\"}\n",
            RESULT,
        ]);
        let calls = transport.calls.clone();
        let client = client(transport, ClientConfig::default());
        let mut stages = Vec::new();
        let result = client
            .analyze(&request(), |m| stages.push(m.to_string()))
            .await
            .expect("result");
        assert_eq!(stages, vec!["Parsing".to_string()]);
        assert_eq!(result.cover_letter.markdown, "Hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            client.download_url(&result.cover_letter.filename),
            "http://localhost:8000/api/download/cover_letter_1.md"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_http_error_with_body_detail() {
        let transport = FakeTransport {
            status: 422,
            status_text: "Unprocessable Entity",
            chunks: vec!["{\"detail\":\"job_listing or job_url is required\"}"],
            ..FakeTransport::ok(Vec::new())
        };
        let client = client(transport, ClientConfig::default());
        let mut stages = 0;
        let err = client
            .analyze(&request(), |_| stages += 1)
            .await
            .expect_err("http failure");
        assert_eq!(
            err,
            ClientError::Http {
                status: 422,
                detail: "job_listing or job_url is required".into()
            }
        );
        assert_eq!(stages, 0);
    }

    #[tokio::test]
    async fn non_json_error_body_uses_status_text() {
        let transport = FakeTransport {
            status: 503,
            status_text: "Service Unavailable",
            chunks: vec!["upstream down"],
            ..FakeTransport::ok(Vec::new())
        };
        let err = client(transport, ClientConfig::default())
            .analyze(&request(), |_| {})
            .await
            .expect_err("http failure");
        assert_eq!(err.detail(), "Service Unavailable");
    }

    #[tokio::test]
    async fn deadline_elapses_while_waiting_for_events() {
        let transport = FakeTransport {
            hang_after_chunks: true,
            ..FakeTransport::ok(vec!["data: {\"type\":\"stage\",\"message\":\"Parsing\"}\n"])
        };
        let config = ClientConfig::default().timeout(Duration::from_millis(50));
        let err = client(transport, config)
            .analyze(&request(), |_| {})
            .await
            .expect_err("timeout");
        assert_eq!(
            err,
            ClientError::Timeout {
                limit: Duration::from_millis(50)
            }
        );
        assert_eq!(err.detail(), "timed out after 50ms");
    }

    #[tokio::test]
    async fn abort_handle_cancels_supplied_session() {
        let transport = FakeTransport {
            hang_after_chunks: true,
            ..FakeTransport::ok(Vec::new())
        };
        let client = client(transport, ClientConfig::default());
        let session = client.new_session();
        let handle = session.abort_handle();
        let request = request();
        let (result, ()) = tokio::join!(client.analyze_with(session, &request, |_| {}), async {
            tokio::task::yield_now().await;
            handle.abort();
        });
        assert_eq!(result, Err(ClientError::Cancelled));
    }

    #[tokio::test]
    async fn used_session_is_rejected_before_sending() {
        let transport = FakeTransport::ok(Vec::new());
        let calls = transport.calls.clone();
        let client = client(transport, ClientConfig::default());
        let mut session = client.new_session();
        let _ = session
            .run(stream::iter(vec![Ok::<_, ClientError>(RESULT)]), |_| {})
            .await;

        let err = client
            .analyze_with(session, &request(), |_| {})
            .await
            .expect_err("reused session");
        assert!(matches!(err, ClientError::Protocol(msg) if msg.contains("already ran")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_sessions_do_not_share_buffers() {
        let a = client(
            FakeTransport::ok(vec![
                "data: {\"type\":\"stage\",\"message\":\"A\"}\ndata: {\"ty",
                "pe\":\"error\",\"detail\":\"a failed\"}\n",
            ]),
            ClientConfig::default(),
        );
        let b = client(
            FakeTransport::ok(vec!["data: {\"type\":\"stage\",\"mess", "age\":\"B\"}\n", RESULT]),
            ClientConfig::default(),
        );
        let request = request();
        let (ra, rb) = tokio::join!(a.analyze(&request, |_| {}), b.analyze(&request, |_| {}));
        assert_eq!(ra, Err(ClientError::Protocol("a failed".into())));
        assert!(rb.is_ok());
    }

    #[test]
    fn with_transport_validates_config() {
        let result = AnalyzeClient::with_transport(
            ClientConfig::new(""),
            Arc::new(FakeTransport::ok(Vec::new())),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
