//! Explicit protocol states for one utterance.

use crate::error::PipelineError;
use crate::segment::types::{ClassificationResult, Continuation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No word accumulated. Initial state and the state after every flush.
    Idle,
    /// At least one word accumulated, more expected.
    Collecting,
}

/// What happened to the incoming request before the buffer is touched.
#[derive(Debug)]
pub enum Event {
    /// The segment decoded and classified.
    Classified(ClassificationResult, Continuation),
    /// No payload; the client asks to close the utterance.
    Close,
    /// Decoding or classification failed.
    Rejected(PipelineError),
}

/// What the router must do in response.
#[derive(Debug)]
pub enum Step {
    /// Append, reply with the segment's own label and confidence.
    AppendAndReply(ClassificationResult),
    /// Append, then flush and summarize.
    AppendAndFlush(ClassificationResult),
    /// Flush what is already buffered and summarize.
    Flush,
    /// Nothing to flush; report an empty utterance without summarizing.
    FailEmpty,
    /// Leave the buffer alone and report the failure.
    Reject(PipelineError),
}

/// Transition table. Returns the step to perform and the phase once it succeeds.
pub fn transition(phase: Phase, event: Event) -> (Step, Phase) {
    match (phase, event) {
        (_, Event::Rejected(err)) => (Step::Reject(err), phase),
        (_, Event::Classified(result, Continuation::More)) => {
            (Step::AppendAndReply(result), Phase::Collecting)
        }
        (_, Event::Classified(result, Continuation::Complete)) => {
            (Step::AppendAndFlush(result), Phase::Idle)
        }
        (Phase::Collecting, Event::Close) => (Step::Flush, Phase::Idle),
        (Phase::Idle, Event::Close) => (Step::FailEmpty, Phase::Idle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word() -> ClassificationResult {
        ClassificationResult::new("HELLO", 0.9)
    }

    #[test]
    fn partial_segments_keep_collecting() {
        for phase in [Phase::Idle, Phase::Collecting] {
            let (step, next) = transition(phase, Event::Classified(word(), Continuation::More));
            assert!(matches!(step, Step::AppendAndReply(r) if r.label == "HELLO"));
            assert_eq!(next, Phase::Collecting);
        }
    }

    #[test]
    fn final_segment_returns_to_idle() {
        for phase in [Phase::Idle, Phase::Collecting] {
            let (step, next) =
                transition(phase, Event::Classified(word(), Continuation::Complete));
            assert!(matches!(step, Step::AppendAndFlush(_)));
            assert_eq!(next, Phase::Idle);
        }
    }

    #[test]
    fn close_on_idle_is_empty() {
        let (step, next) = transition(Phase::Idle, Event::Close);
        assert!(matches!(step, Step::FailEmpty));
        assert_eq!(next, Phase::Idle);

        let (step, next) = transition(Phase::Collecting, Event::Close);
        assert!(matches!(step, Step::Flush));
        assert_eq!(next, Phase::Idle);
    }

    #[test]
    fn rejection_keeps_phase() {
        for phase in [Phase::Idle, Phase::Collecting] {
            let (step, next) =
                transition(phase, Event::Rejected(PipelineError::Decode("bad".into())));
            assert!(matches!(step, Step::Reject(PipelineError::Decode(_))));
            assert_eq!(next, phase);
        }
    }
}
