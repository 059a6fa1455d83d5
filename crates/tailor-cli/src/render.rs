//! Plain-text rendering of results and diffs for the terminal.

use std::fmt::Write as _;

use tailor_client::{AnalysisResult, DiffKind, DiffRun, DiffStats};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Renders diff runs one line at a time with `+`/`-`/space markers.
///
/// A final line without a terminator is still ended with `\n` so the next
/// run starts on its own line.
pub fn render_diff(runs: &[DiffRun], color: bool) -> String {
    let mut out = String::new();
    for run in runs {
        let (marker, paint) = match run.kind {
            DiffKind::Unchanged => (' ', None),
            DiffKind::Added => ('+', Some(GREEN)),
            DiffKind::Removed => ('-', Some(RED)),
        };
        for line in run.text.split_inclusive('\n') {
            let body = line.strip_suffix('\n').unwrap_or(line);
            match paint.filter(|_| color) {
                Some(code) => {
                    let _ = writeln!(out, "{code}{marker} {body}{RESET}");
                }
                None => {
                    let _ = writeln!(out, "{marker} {body}");
                }
            }
        }
    }
    out
}

/// One-line summary such as `3 unchanged, 2 added, 1 removed`.
pub fn render_stats(stats: &DiffStats) -> String {
    format!(
        "{} unchanged, {} added, {} removed",
        stats.unchanged, stats.added, stats.removed
    )
}

/// Renders the cover letter, suggestions and summary sections of a result.
pub fn render_result(result: &AnalysisResult, download_url: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Cover letter\n");
    let _ = writeln!(out, "{}", result.cover_letter.markdown.trim_end());
    let _ = writeln!(
        out,
        "\nDownload: {}\n",
        download_url(&result.cover_letter.filename)
    );

    let _ = writeln!(out, "## CV suggestions\n");
    if let Some(summary) = result.summary() {
        let _ = writeln!(out, "{}\n", summary.trim());
    }
    if result.cv_suggestions.is_empty() {
        let _ = writeln!(out, "(no suggestions)");
    }
    for (idx, suggestion) in result.cv_suggestions.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", idx + 1, suggestion.section, suggestion.suggestion);
        if let Some(reasoning) = suggestion
            .reasoning
            .as_deref()
            .filter(|r| !r.trim().is_empty())
        {
            let _ = writeln!(out, "   Why: {reasoning}");
        }
    }

    if let Some(fit) = result.fit_analysis.as_deref().filter(|f| !f.trim().is_empty()) {
        let _ = writeln!(out, "\n## Fit analysis\n\n{}", fit.trim_end());
    }

    let _ = writeln!(
        out,
        "\n## Revised CV (.{})\n\nDownload: {}",
        result.revised_cv.extension(),
        download_url(&result.revised_cv.filename)
    );
    out
}
