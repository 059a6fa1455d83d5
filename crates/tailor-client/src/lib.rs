//! Client for the résumé tailoring service.
//!
//! An analyze call uploads a résumé and a job listing and receives a
//! newline-delimited event stream (`data: {"type": ...}` lines) of progress
//! stages followed by one terminal `result` or `error` event. The pieces are
//! usable on their own: [`LineFramer`] reassembles lines from raw chunks,
//! [`decode_line`] turns a line into an [`Event`], and [`StreamSession`]
//! applies the protocol rules over any byte stream. [`diff_lines`] renders
//! the revised résumé against the original.
//!
//! ```no_run
//! use tailor_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = AnalyzeClient::from_env()?;
//! let cv = CvDocument::new("cv.md", std::fs::read("cv.md").unwrap_or_default());
//! let original = cv.text();
//! let request = AnalyzeRequest::builder(cv)
//!     .job_url("https://jobs.example.com/rust-engineer")
//!     .api_key(std::env::var("GEMINI_API_KEY").unwrap_or_default())
//!     .build()?;
//!
//! let result = client
//!     .analyze(&request, |stage| eprintln!("… {stage}"))
//!     .await?;
//! for run in result.revised_diff(&original) {
//!     print!("{}", run.text);
//! }
//! # Ok(())
//! # }
//! ```

/// Analyze client tying transport, validation and streaming together.
pub mod client;
/// Client configuration and service URLs.
pub mod config;
/// Typed result payload.
pub mod content;
/// Line diff engine.
pub mod diff;
/// Error types.
pub mod errors;
/// Event line decoding.
pub mod event;
/// Incremental line framing.
pub mod framer;
/// Common imports for typical usage.
pub mod prelude;
/// Analyze request builder.
pub mod request;
/// Protocol state machine over a byte stream.
pub mod session;
/// Transport seam and the `reqwest` implementation.
pub mod transport;

pub use client::AnalyzeClient;
pub use config::{ClientConfig, TrailingFragment};
pub use content::{AnalysisResult, CoverLetter, CvFormat, CvSuggestion, RevisedCv};
pub use diff::{DiffKind, DiffRun, DiffStats, diff_lines};
pub use errors::{ClientError, DecodeError, classify_http_failure};
pub use event::{Event, decode_line};
pub use framer::LineFramer;
pub use request::{AnalyzeRequest, AnalyzeRequestBuilder, CvDocument};
pub use session::{AbortHandle, SessionState, StreamSession};
pub use transport::{AnalyzeTransport, ByteStream, HttpTransport, OpenedResponse};
