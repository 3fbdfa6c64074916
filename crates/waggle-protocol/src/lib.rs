//! `waggle-protocol` – text codec between the reasoning service and the
//! engine.
//!
//! # Modules
//!
//! - [`gesture`] – the `tag:args` gesture mini-language.
//! - [`decision`] – the `x,y,z[,speed],gestures[,path]` decision line.
//! - [`envelope`] – reason line + data line framing, producing a typed
//!   [`Decision`][waggle_types::Decision].
//!
//! Decoding is pure; nothing here touches engine state.

pub mod decision;
pub mod envelope;
pub mod gesture;

use thiserror::Error;
use waggle_types::WaggleError;

pub use decision::{DecisionLine, decode_decision_line};
pub use envelope::{Envelope, decode_response, fov_side_from_reason, split_envelope};
pub use gesture::{decode_sequence, decode_step, encode_sequence, encode_step};

/// Reasons a response cannot be turned into a decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("response contains no decision line")]
    EmptyResponse,

    #[error("expected three numeric coordinates in {0:?}")]
    BadCoordinates(String),

    #[error("decision line has no gesture tokens")]
    EmptyGestureSpan,

    #[error("gestures last {actual:.2}s, expected {expected:.1}s ± {tolerance:.1}s")]
    WindowMismatch {
        actual: f32,
        expected: f32,
        tolerance: f32,
    },
}

impl From<DecodeError> for WaggleError {
    fn from(e: DecodeError) -> Self {
        WaggleError::MalformedDecision(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_map_to_malformed_decision() {
        let err: WaggleError = DecodeError::EmptyGestureSpan.into();
        assert!(matches!(err, WaggleError::MalformedDecision(ref m) if m.contains("gesture")));
    }
}
