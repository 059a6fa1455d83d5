//! Single-use consumer that turns an analyze response body into one outcome.

use std::fmt::Display;

use futures::{Stream, StreamExt as _};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::TrailingFragment;
use crate::content::AnalysisResult;
use crate::errors::{ClientError, STREAM_ENDED_WITHOUT_RESULT};
use crate::event::{Event, decode_line};
use crate::framer::LineFramer;

const EMPTY_ERROR_DETAIL: &str = "generation service reported an error without detail";

/// Handle used to abandon a running [`StreamSession`] from another task.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The session stops pulling chunks, never calls the stage callback again
    /// and fails with [`ClientError::Cancelled`].
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    /// True once [`AbortHandle::abort`] was called.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Lifecycle of a [`StreamSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Succeeded,
    Failed,
}

impl SessionState {
    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Consumes one analyze response body and produces its single outcome.
///
/// Every session owns its own line buffer; sessions share no state, so any
/// number of them can run concurrently.
pub struct StreamSession {
    id: uuid::Uuid,
    framer: LineFramer,
    state: SessionState,
    abort_tx: watch::Sender<bool>,
    abort_rx: watch::Receiver<bool>,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new(TrailingFragment::default())
    }
}

impl StreamSession {
    /// Creates an idle session with the given end-of-stream policy.
    pub fn new(trailing: TrailingFragment) -> Self {
        let (abort_tx, abort_rx) = watch::channel(false);
        Self {
            id: uuid::Uuid::new_v4(),
            framer: LineFramer::new(trailing),
            state: SessionState::Idle,
            abort_tx,
            abort_rx,
        }
    }

    /// Identifier attached to this session's log records.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns a handle that can cancel the session.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Fails unless the session has not run yet.
    pub(crate) fn ensure_idle(&self) -> Result<(), ClientError> {
        if self.state != SessionState::Idle {
            return Err(ClientError::protocol_msg(format!(
                "session {} already ran (state {:?})",
                self.id, self.state
            )));
        }
        Ok(())
    }

    /// Drives `source` to the first terminal event.
    ///
    /// `on_stage` is called synchronously, in order, once per stage event and
    /// never after the session terminated. A `result` event returns at once
    /// without reading further chunks. A session runs at most once.
    pub async fn run<S, B, E, F>(
        &mut self,
        source: S,
        mut on_stage: F,
    ) -> Result<AnalysisResult, ClientError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        F: FnMut(&str),
    {
        self.ensure_idle()?;
        self.state = SessionState::Streaming;
        debug!(session_id = %self.id, "streaming analyze response");

        let outcome = self.drive(source, &mut on_stage).await;
        match &outcome {
            Ok(result) => {
                self.state = SessionState::Succeeded;
                info!(
                    session_id = %self.id,
                    suggestions = result.cv_suggestions.len(),
                    "analyze stream completed"
                );
            }
            Err(err) => {
                self.state = SessionState::Failed;
                warn!(session_id = %self.id, error = %err, "analyze stream failed");
            }
        }
        outcome
    }

    async fn drive<S, B, E, F>(
        &mut self,
        source: S,
        on_stage: &mut F,
    ) -> Result<AnalysisResult, ClientError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        F: FnMut(&str),
    {
        let mut source = std::pin::pin!(source);
        let mut abort_rx = self.abort_rx.clone();
        if *abort_rx.borrow_and_update() {
            return Err(ClientError::Cancelled);
        }

        loop {
            let next = tokio::select! {
                biased;
                changed = abort_rx.changed() => {
                    // The session keeps a sender alive, so `changed` cannot report closure.
                    if changed.is_ok() && *abort_rx.borrow() {
                        return Err(ClientError::Cancelled);
                    }
                    continue;
                }
                next = source.next() => next,
            };

            let lines = match next {
                Some(Ok(chunk)) => self.framer.feed(chunk.as_ref()),
                Some(Err(e)) => {
                    return Err(ClientError::Transport(format!(
                        "response body read failed: {e}"
                    )));
                }
                None => {
                    let lines = self.framer.finish();
                    if let Some(result) = self.dispatch(&lines, &abort_rx, on_stage)? {
                        return Ok(result);
                    }
                    return Err(ClientError::protocol_msg(STREAM_ENDED_WITHOUT_RESULT));
                }
            };
            if let Some(result) = self.dispatch(&lines, &abort_rx, on_stage)? {
                return Ok(result);
            }
        }
    }

    fn dispatch<F>(
        &self,
        lines: &[String],
        abort_rx: &watch::Receiver<bool>,
        on_stage: &mut F,
    ) -> Result<Option<AnalysisResult>, ClientError>
    where
        F: FnMut(&str),
    {
        for (idx, line) in lines.iter().enumerate() {
            // An abort raised mid-batch wins over any later event in the batch.
            if *abort_rx.borrow() {
                return Err(ClientError::Cancelled);
            }
            let event = decode_line(line).inspect_err(|err| {
                warn!(session_id = %self.id, error = %err, "undecodable event line");
            })?;
            match event {
                None => {}
                Some(Event::Stage { message }) => {
                    debug!(session_id = %self.id, stage = %message, "stage event");
                    on_stage(&message);
                }
                Some(Event::Result(result)) => {
                    let trailing = lines.len() - idx - 1;
                    if trailing > 0 {
                        debug!(session_id = %self.id, trailing, "ignoring lines after result");
                    }
                    return Ok(Some(*result));
                }
                Some(Event::Error { detail }) => {
                    let detail = if detail.trim().is_empty() {
                        EMPTY_ERROR_DETAIL.to_string()
                    } else {
                        detail
                    };
                    return Err(ClientError::Protocol(detail));
                }
            }
        }
        Ok(None)
    }
}
