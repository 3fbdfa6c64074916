//! Response envelope: a reason line followed by a data line.
//!
//! Only non-blank lines count.  With a single line it is the data line; with
//! two or more the first is the reason and the last is the data, anything in
//! between is chatter and ignored.

use uuid::Uuid;
use waggle_types::{Decision, FovSide, MAX_REASON_CHARS};

use crate::DecodeError;
use crate::decision::decode_decision_line;

/// Borrowed view of the two meaningful envelope lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub reason: Option<&'a str>,
    pub data: &'a str,
}

/// Split a raw response into reason and data lines.
///
/// # Errors
///
/// Returns [`DecodeError::EmptyResponse`] when the text has no non-blank
/// line.
pub fn split_envelope(text: &str) -> Result<Envelope<'_>, DecodeError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    match lines.as_slice() {
        [] => Err(DecodeError::EmptyResponse),
        [data] => Ok(Envelope {
            reason: None,
            data: *data,
        }),
        [reason, .., data] => Ok(Envelope {
            reason: Some(*reason),
            data: *data,
        }),
    }
}

/// Decode a complete response into a [`Decision`].
///
/// The path defaults to straight when the data line names none, and the FOV
/// side is read from the reason line (see [`fov_side_from_reason`]).
///
/// # Errors
///
/// Propagates [`split_envelope`] and
/// [`decode_decision_line`][crate::decision::decode_decision_line] errors.
pub fn decode_response(text: &str) -> Result<Decision, DecodeError> {
    let envelope = split_envelope(text)?;
    let line = decode_decision_line(envelope.data)?;
    let reason = envelope
        .reason
        .map(|r| r.chars().take(MAX_REASON_CHARS).collect::<String>())
        .unwrap_or_default();

    Ok(Decision {
        id: Uuid::new_v4(),
        target: line.target,
        speed_scale: line.speed_scale,
        sequence: line.sequence,
        path: line.path.unwrap_or_default(),
        fov_side: fov_side_from_reason(&reason),
        reason,
    })
}

/// Which side of the reference actor's view the reason asks for.
///
/// An explicit `fov:outside` / `fov:inside` tag wins.  Older prompts marked
/// the side with `视场外`/`场外` (outside) and `视场内`/`场内` (inside); those
/// are still honoured.  Anything else means inside.
pub fn fov_side_from_reason(reason: &str) -> FovSide {
    let lower = reason.to_lowercase();
    if lower.contains("fov:outside") {
        return FovSide::Outside;
    }
    if lower.contains("fov:inside") {
        return FovSide::Inside;
    }
    if reason.contains("场外") {
        return FovSide::Outside;
    }
    FovSide::Inside
}
