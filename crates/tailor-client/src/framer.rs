//! Reassembles newline-delimited lines from arbitrarily split byte chunks.

use tracing::warn;

use crate::config::TrailingFragment;

/// Incremental line splitter over raw response bytes.
///
/// Lines are split on `\n` at the byte level and only complete lines are
/// decoded as UTF-8, so a multi-byte character cut across two chunks is
/// reassembled before decoding. A trailing `\r` is removed from every line.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
    policy: TrailingFragment,
}

impl LineFramer {
    /// Creates a framer with the given end-of-stream policy.
    pub fn new(policy: TrailingFragment) -> Self {
        Self {
            buf: Vec::new(),
            policy,
        }
    }

    /// Appends a chunk and returns every line completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        // Only the new bytes can contain a terminator not seen before.
        let scan_from = self.buf.len();
        self.buf.extend_from_slice(chunk);
        let Some(last_newline) = self.buf[scan_from..]
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|idx| scan_from + idx)
        else {
            return Vec::new();
        };

        let rest = self.buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buf, rest);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(decode_line)
            .collect()
    }

    /// Number of buffered bytes not yet terminated.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Ends the stream, returning the remainder as a line only under
    /// [`TrailingFragment::Flush`].
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buf);
        if rest.is_empty() {
            return Vec::new();
        }
        match self.policy {
            TrailingFragment::Flush => vec![decode_line(&rest)],
            TrailingFragment::Discard => {
                warn!(
                    bytes = rest.len(),
                    "discarding unterminated trailing fragment at end of stream"
                );
                Vec::new()
            }
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_partial_lines_across_chunks() {
        let mut framer = LineFramer::default();
        assert!(framer.feed(b"data: {\"type\":\"st").is_empty());
        assert_eq!(framer.pending_len(), 17);
        let lines = framer.feed(b"age\"}\n\ndata: x");
        assert_eq!(lines, vec!["data: {\"type\":\"stage\"}".to_string(), String::new()]);
        assert_eq!(framer.feed(b"yz\n"), vec!["data: xyz".to_string()]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn strips_carriage_returns() {
        let mut framer = LineFramer::default();
        assert_eq!(framer.feed(b"a\r\nb\r"), vec!["a".to_string()]);
        assert_eq!(framer.feed(b"\n"), vec!["b".to_string()]);
    }

    #[test]
    fn terminator_split_from_crlf_is_handled() {
        let mut framer = LineFramer::default();
        assert!(framer.feed(b"line\r").is_empty());
        assert_eq!(framer.feed(b"\nnext"), vec!["line".to_string()]);
    }

    #[test]
    fn multibyte_character_split_across_chunks_is_preserved() {
        let text = "data: résumé ✓\n".as_bytes();
        for split in 0..=text.len() {
            let mut framer = LineFramer::default();
            let mut lines = framer.feed(&text[..split]);
            lines.extend(framer.feed(&text[split..]));
            assert_eq!(lines, vec!["data: résumé ✓".to_string()], "split at {split}");
        }
    }

    #[test]
    fn finish_discards_remainder_by_default() {
        let mut framer = LineFramer::default();
        framer.feed(b"done\ntrailing");
        assert!(framer.finish().is_empty());
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn finish_flushes_remainder_when_configured() {
        let mut framer = LineFramer::new(TrailingFragment::Flush);
        framer.feed(b"done\ntrailing");
        assert_eq!(framer.finish(), vec!["trailing".to_string()]);
        assert!(framer.finish().is_empty());
    }

    #[test]
    fn empty_chunks_emit_nothing() {
        let mut framer = LineFramer::default();
        assert!(framer.feed(b"").is_empty());
        assert!(framer.finish().is_empty());
    }
}
