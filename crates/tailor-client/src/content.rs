//! Typed payload of the terminal `result` event.

use crate::diff::{DiffRun, diff_lines};

/// Markup flavour of the résumé the service rewrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CvFormat {
    /// LaTeX source (structured markup).
    Latex,
    /// Markdown or plain text.
    Markdown,
}

impl CvFormat {
    /// File extension used for downloads of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Latex => "tex",
            Self::Markdown => "md",
        }
    }

    /// Guesses the format the service will detect for an uploaded file name.
    pub fn from_filename(filename: &str) -> Self {
        let is_tex = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tex"));
        if is_tex { Self::Latex } else { Self::Markdown }
    }
}

/// Generated cover letter.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CoverLetter {
    /// Markdown body.
    pub markdown: String,
    /// Name under which the service stored the letter for download.
    pub filename: String,
}

/// A single edit suggestion for one résumé section.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CvSuggestion {
    pub section: String,
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Rewritten résumé.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RevisedCv {
    pub content: String,
    pub format: CvFormat,
    pub filename: String,
}

impl RevisedCv {
    /// Download extension matching [`RevisedCv::format`].
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Final outcome of a successful analyze call.
///
/// This is the `result` event body with its `type` discriminator removed.
/// Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub cover_letter: CoverLetter,
    /// Suggestions in the order the service produced them.
    #[serde(default)]
    pub cv_suggestions: Vec<CvSuggestion>,
    pub revised_cv: RevisedCv,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_analysis: Option<String>,
}

impl AnalysisResult {
    /// Diffs the submitted résumé text against the revised one.
    pub fn revised_diff(&self, original: &str) -> Vec<DiffRun> {
        diff_lines(original, &self.revised_cv.content)
    }

    /// Summary text, if the service sent a non-blank one.
    pub fn summary(&self) -> Option<&str> {
        self.cv_summary.as_deref().filter(|s| !s.trim().is_empty())
    }
}
