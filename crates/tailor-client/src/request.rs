use crate::content::CvFormat;
use crate::errors::ClientError;

/// Uploaded résumé document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CvDocument {
    /// File name sent with the upload; the service derives the format from it.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl CvDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Format the service is expected to detect.
    pub fn format(&self) -> CvFormat {
        CvFormat::from_filename(&self.filename)
    }

    /// Document text, lossily decoded, for diffing against the revision.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Inputs of one analyze call.
///
/// Built with [`AnalyzeRequest::builder`]; validation happens in
/// [`AnalyzeRequestBuilder::build`] before any network I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub cv: CvDocument,
    pub job_listing: String,
    pub job_url: String,
    pub profile_context: String,
    pub extra_context: String,
    pub api_key: String,
}

impl AnalyzeRequest {
    /// Starts a builder for the given résumé.
    pub fn builder(cv: CvDocument) -> AnalyzeRequestBuilder {
        AnalyzeRequestBuilder {
            cv,
            job_listing: String::new(),
            job_url: String::new(),
            profile_context: String::new(),
            extra_context: String::new(),
            api_key: String::new(),
        }
    }

    /// Form fields in the order the service declares them, without the file part.
    pub fn text_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("profile_context", self.profile_context.as_str()),
            ("job_listing", self.job_listing.as_str()),
            ("job_url", self.job_url.as_str()),
            ("extra_context", self.extra_context.as_str()),
            ("gemini_api_key", self.api_key.trim()),
        ]
    }
}

/// Builder for [`AnalyzeRequest`].
#[derive(Clone, Debug)]
pub struct AnalyzeRequestBuilder {
    cv: CvDocument,
    job_listing: String,
    job_url: String,
    profile_context: String,
    extra_context: String,
    api_key: String,
}

impl AnalyzeRequestBuilder {
    /// Sets the pasted job listing text.
    pub fn job_listing(mut self, text: impl Into<String>) -> Self {
        self.job_listing = text.into();
        self
    }

    /// Sets a job listing URL for the service to fetch.
    pub fn job_url(mut self, url: impl Into<String>) -> Self {
        self.job_url = url.into();
        self
    }

    /// Adds background about the candidate not present in the résumé.
    pub fn profile_context(mut self, text: impl Into<String>) -> Self {
        self.profile_context = text.into();
        self
    }

    /// Adds free-form instructions for the generated documents.
    pub fn extra_context(mut self, text: impl Into<String>) -> Self {
        self.extra_context = text.into();
        self
    }

    /// Sets the model API key forwarded to the service.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Validates and returns the request.
    pub fn build(self) -> Result<AnalyzeRequest, ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::Validation("API key is required".into()));
        }
        if self.cv.filename.trim().is_empty() {
            return Err(ClientError::Validation("résumé file name must not be empty".into()));
        }
        if self.cv.bytes.is_empty() {
            return Err(ClientError::Validation("résumé file is empty".into()));
        }
        let job_listing = self.job_listing.trim().to_string();
        let job_url = self.job_url.trim().to_string();
        if job_listing.is_empty() && job_url.is_empty() {
            return Err(ClientError::Validation(
                "a job listing or a job URL is required".into(),
            ));
        }
        let is_http = job_url.starts_with("http://") || job_url.starts_with("https://");
        if !job_url.is_empty() && !is_http {
            return Err(ClientError::Validation(format!(
                "job URL must start with http:// or https://, got `{job_url}`"
            )));
        }
        Ok(AnalyzeRequest {
            cv: self.cv,
            job_listing,
            job_url,
            profile_context: self.profile_context,
            extra_context: self.extra_context,
            api_key: self.api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv() -> CvDocument {
        CvDocument::new("cv.tex", "\\section{Skills}\nRust\n")
    }

    #[test]
    fn builds_with_listing_and_exposes_form_fields() {
        let request = AnalyzeRequest::builder(cv())
            .job_listing("  Rust engineer  ")
            .api_key(" key-123 ")
            .profile_context("10 years backend")
            .build()
            .expect("valid request");
        assert_eq!(request.job_listing, "Rust engineer");
        assert_eq!(request.cv.format(), CvFormat::Latex);
        let fields = request.text_fields();
        assert!(fields.contains(&("gemini_api_key", "key-123")));
        assert!(fields.contains(&("profile_context", "10 years backend")));
        assert!(fields.contains(&("job_url", "")));
    }

    #[test]
    fn requires_api_key() {
        let err = AnalyzeRequest::builder(cv())
            .job_listing("listing")
            .api_key("   ")
            .build();
        assert!(matches!(err, Err(ClientError::Validation(msg)) if msg.contains("API key")));
    }

    #[test]
    fn requires_listing_or_url() {
        let err = AnalyzeRequest::builder(cv()).api_key("k").build();
        assert!(matches!(err, Err(ClientError::Validation(msg)) if msg.contains("job listing")));

        let ok = AnalyzeRequest::builder(cv())
            .api_key("k")
            .job_url("https://jobs.example.com/42")
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_empty_cv_and_bad_url() {
        let err = AnalyzeRequest::builder(CvDocument::new("cv.md", Vec::<u8>::new()))
            .api_key("k")
            .job_listing("x")
            .build();
        assert!(matches!(err, Err(ClientError::Validation(msg)) if msg.contains("empty")));

        let err = AnalyzeRequest::builder(cv())
            .api_key("k")
            .job_url("jobs.example.com")
            .build();
        assert!(matches!(err, Err(ClientError::Validation(msg)) if msg.contains("job URL")));
    }

    #[test]
    fn cv_text_is_lossy() {
        let doc = CvDocument::new("cv.md", vec![b'o', b'k', 0xff]);
        assert_eq!(doc.text(), "ok\u{fffd}");
        assert_eq!(doc.format(), CvFormat::Markdown);
    }
}
