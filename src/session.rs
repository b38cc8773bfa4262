use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::error;

use crate::error::AnalysisError;
use crate::types::analysis::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Analyzing,
    Success,
    Error,
}

pub type Settlement = Result<AnalysisResult, AnalysisError>;

/// One analysis lifecycle: Idle -> Analyzing -> (Success | Error), with a
/// new request from Success or Error re-entering Analyzing and discarding
/// the previous result at that instant.
///
/// The single `in_flight` receiver slot is the concurrency guard: `begin`
/// refuses while a request is outstanding, so the serialization holds even
/// when triggered programmatically rather than through a disabled button.
/// `begin` also creates a fresh channel each time, so a settlement from an
/// abandoned worker can never reach the session.
#[derive(Debug)]
pub struct AnalysisSession {
    state: SessionState,
    result: Option<AnalysisResult>,
    analyzed_input: Option<String>,
    in_flight: Option<Receiver<Settlement>>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            result: None,
            analyzed_input: None,
            in_flight: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_analyzing(&self) -> bool {
        self.state() == SessionState::Analyzing
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// The exact text the current (or most recent) analysis was issued
    /// for. Exports read this instead of the live input box, so editing
    /// the box after a Success cannot desync the report from its
    /// translation.
    pub fn analyzed_input(&self) -> Option<&str> {
        self.analyzed_input.as_deref()
    }

    /// The trigger is available only for non-blank input while nothing is
    /// in flight.
    pub fn can_begin(&self, input: &str) -> bool {
        !input.trim().is_empty() && !self.is_analyzing()
    }

    /// Enters Analyzing and hands back the sender the worker settles with.
    /// Returns None (a no-op) for blank input or while already Analyzing.
    pub fn begin(&mut self, input: &str) -> Option<Sender<Settlement>> {
        if !self.can_begin(input) {
            return None;
        }
        let (tx, rx) = mpsc::channel();
        self.result = None;
        self.analyzed_input = Some(input.to_string());
        self.in_flight = Some(rx);
        self.state = SessionState::Analyzing;
        Some(tx)
    }

    /// Polled from the UI loop; applies a settlement if one has arrived.
    pub fn poll(&mut self) {
        let Some(rx) = &self.in_flight else { return };
        match rx.try_recv() {
            Ok(settlement) => self.settle(settlement),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.settle(Err(AnalysisError::Service(
                    "analysis worker exited without settling".to_string(),
                )));
            }
        }
    }

    fn settle(&mut self, settlement: Settlement) {
        self.in_flight = None;
        match settlement {
            Ok(result) => {
                self.result = Some(result);
                self.state = SessionState::Success;
            }
            Err(err) => {
                // Diagnostic detail stays in the log; the UI only shows
                // the generic child-friendly banner.
                error!("analysis failed: {err}");
                self.result = None;
                self.state = SessionState::Error;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::analysis::{AnalysisResult, GrammarPoint};

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            translation: "她每天去上学。".to_string(),
            grammar_points: vec![GrammarPoint {
                rule: "Subject-Verb Agreement".to_string(),
                explanation: "第三人称单数要用 goes。".to_string(),
            }],
            phrases: Vec::new(),
            encouragement: "继续加油！".to_string(),
        }
    }

    #[test]
    fn starts_idle_with_no_result() {
        let session = AnalysisSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.result().is_none());
    }

    #[test]
    fn begin_transitions_to_analyzing_synchronously() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("She go to school everyday.");
        assert!(tx.is_some());
        // Before the worker settles anything:
        assert_eq!(session.state(), SessionState::Analyzing);
        assert!(session.result().is_none());
    }

    #[test]
    fn begin_refuses_blank_input() {
        let mut session = AnalysisSession::new();
        assert!(session.begin("   \n\t ").is_none());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn begin_is_a_no_op_while_analyzing() {
        let mut session = AnalysisSession::new();
        let first = session.begin("Hello world.").unwrap();
        assert!(session.begin("Another sentence.").is_none());
        assert_eq!(session.state(), SessionState::Analyzing);
        drop(first);
    }

    #[test]
    fn successful_settlement_stores_the_result_exactly() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("She go to school everyday.").unwrap();
        tx.send(Ok(sample_result())).unwrap();
        session.poll();
        assert_eq!(session.state(), SessionState::Success);
        assert_eq!(session.result(), Some(&sample_result()));
    }

    #[test]
    fn failed_settlement_enters_error_with_no_result() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("Hello.").unwrap();
        tx.send(Err(AnalysisError::Service("boom".to_string()))).unwrap();
        session.poll();
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.result().is_none());
    }

    #[test]
    fn retrigger_from_error_is_allowed() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("Hello.").unwrap();
        tx.send(Err(AnalysisError::Configuration)).unwrap();
        session.poll();
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.begin("Hello.").is_some());
        assert_eq!(session.state(), SessionState::Analyzing);
    }

    #[test]
    fn retrigger_from_success_discards_the_previous_result_immediately() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("Hello.").unwrap();
        tx.send(Ok(sample_result())).unwrap();
        session.poll();
        assert_eq!(session.state(), SessionState::Success);

        let _tx2 = session.begin("Goodbye.").unwrap();
        assert_eq!(session.state(), SessionState::Analyzing);
        assert!(session.result().is_none(), "result holder must be cleared, not merged");
    }

    #[test]
    fn exports_see_the_text_that_was_analyzed_not_later_edits() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("She go to school everyday.").unwrap();
        tx.send(Ok(sample_result())).unwrap();
        session.poll();
        // Whatever happens to the input box after Success, the snapshot
        // taken at begin() is what exports must read.
        assert_eq!(session.analyzed_input(), Some("She go to school everyday."));

        let _tx2 = session.begin("A different sentence.").unwrap();
        assert_eq!(session.analyzed_input(), Some("A different sentence."));
    }

    #[test]
    fn dropped_worker_settles_as_error() {
        let mut session = AnalysisSession::new();
        let tx = session.begin("Hello.").unwrap();
        drop(tx);
        session.poll();
        assert_eq!(session.state(), SessionState::Error);
    }

    #[test]
    fn poll_without_settlement_stays_analyzing() {
        let mut session = AnalysisSession::new();
        let _tx = session.begin("Hello.").unwrap();
        session.poll();
        assert_eq!(session.state(), SessionState::Analyzing);
    }

    #[test]
    fn stale_settlement_from_an_abandoned_channel_is_unreachable() {
        let mut session = AnalysisSession::new();
        let tx_old = session.begin("Hello.").unwrap();
        // The first worker errors out; the user re-triggers.
        tx_old.send(Err(AnalysisError::Service("timeout".to_string()))).unwrap();
        session.poll();
        let _tx_new = session.begin("Hello again.").unwrap();
        // A late send on the old channel fails outright: the receiver is gone.
        assert!(tx_old.send(Ok(sample_result())).is_err());
        session.poll();
        assert_eq!(session.state(), SessionState::Analyzing);
    }
}
