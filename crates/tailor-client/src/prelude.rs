//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, AnalysisResult, AnalyzeClient, AnalyzeRequest, ClientConfig, ClientError,
    CvDocument, DiffKind, DiffRun, StreamSession, diff_lines,
};
