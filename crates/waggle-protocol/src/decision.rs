//! Decision wire line: `x,y,z[,speed],action_sequence[,path_type]`.
//!
//! The gesture list itself contains commas, so the line is decoded by
//! position: three coordinates, an optional numeric speed, an optional
//! trailing path keyword, and everything in between is the gesture list.

use std::fmt;

use waggle_types::{
    DECISION_WINDOW_SECS, DECISION_WINDOW_TOLERANCE_SECS, GestureSequence, MAX_SPEED_SCALE,
    MIN_SPEED_SCALE, PathKind, Vec3,
};

use crate::DecodeError;
use crate::gesture::{decode_sequence, encode_sequence, number};

/// Typed form of one decision wire line.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionLine {
    pub target: Vec3,
    /// Clamped to `[MIN_SPEED_SCALE, MAX_SPEED_SCALE]`; `1.0` when absent.
    pub speed_scale: f32,
    pub sequence: GestureSequence,
    /// `None` when the line carries no path keyword.
    pub path: Option<PathKind>,
}

/// Decode a decision line.
///
/// # Errors
///
/// * [`DecodeError::BadCoordinates`] – fewer than three leading numbers.
/// * [`DecodeError::EmptyGestureSpan`] – nothing between the header and the
///   path keyword.
/// * [`DecodeError::WindowMismatch`] – the gesture durations do not fill the
///   decision window.
pub fn decode_decision_line(line: &str) -> Result<DecisionLine, DecodeError> {
    let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
    if tokens.len() < 3 {
        return Err(DecodeError::BadCoordinates(line.trim().to_string()));
    }
    let (Some(x), Some(y), Some(z)) = (number(tokens[0]), number(tokens[1]), number(tokens[2]))
    else {
        return Err(DecodeError::BadCoordinates(line.trim().to_string()));
    };

    let (speed_scale, action_start) = match tokens.get(3).and_then(|t| number(t)) {
        Some(speed) => (speed.clamp(MIN_SPEED_SCALE, MAX_SPEED_SCALE), 4),
        None => (1.0, 3),
    };

    let path = tokens.last().and_then(|t| path_keyword(t));
    let action_end = if path.is_some() {
        tokens.len() - 1
    } else {
        tokens.len()
    };
    if action_start >= action_end {
        return Err(DecodeError::EmptyGestureSpan);
    }

    let sequence = decode_sequence(&tokens[action_start..action_end].join(","));
    if !sequence.fills_window(DECISION_WINDOW_SECS, DECISION_WINDOW_TOLERANCE_SECS) {
        return Err(DecodeError::WindowMismatch {
            actual: sequence.total_duration(),
            expected: DECISION_WINDOW_SECS,
            tolerance: DECISION_WINDOW_TOLERANCE_SECS,
        });
    }

    Ok(DecisionLine {
        target: Vec3::new(x, y, z),
        speed_scale,
        sequence,
        path,
    })
}

fn path_keyword(token: &str) -> Option<PathKind> {
    match token.to_lowercase().as_str() {
        "straight" => Some(PathKind::Straight),
        "scurve" => Some(PathKind::SCurve),
        _ => None,
    }
}

impl fmt::Display for DecisionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2},{:.2},{:.2},{:.2},{}",
            self.target.x,
            self.target.y,
            self.target.z,
            self.speed_scale,
            encode_sequence(&self.sequence)
        )?;
        match self.path {
            Some(PathKind::Straight) => write!(f, ",straight"),
            Some(PathKind::SCurve) => write!(f, ",scurve"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waggle_types::GestureKind;

    #[test]
    fn full_line_with_speed_and_path() {
        let d = decode_decision_line("1.5,0,2.0,1.2,wait:1.0,wave:30:60:2.0,look:10:2.0,scurve").unwrap();
        assert_eq!(d.target, Vec3::new(1.5, 0.0, 2.0));
        assert!((d.speed_scale - 1.2).abs() < 1e-6);
        assert_eq!(d.path, Some(PathKind::SCurve));
        assert_eq!(d.sequence.len(), 3);
        assert_eq!(d.sequence.steps()[1].kind, GestureKind::Wave);
    }

    #[test]
    fn speed_and_path_are_optional() {
        let d = decode_decision_line("0,0,3,wait:5").unwrap();
        assert_eq!(d.speed_scale, 1.0);
        assert_eq!(d.path, None);
        assert_eq!(d.sequence.len(), 1);
    }

    #[test]
    fn path_keyword_is_case_insensitive() {
        let d = decode_decision_line("0,0,3,wait:5, Straight ").unwrap();
        assert_eq!(d.path, Some(PathKind::Straight));
    }

    #[test]
    fn speed_is_clamped() {
        let fast = decode_decision_line("0,0,3,9.0,wait:5").unwrap();
        assert_eq!(fast.speed_scale, MAX_SPEED_SCALE);
        let slow = decode_decision_line("0,0,3,0.01,wait:5").unwrap();
        assert_eq!(slow.speed_scale, MIN_SPEED_SCALE);
    }

    #[test]
    fn accepts_sequence_within_tolerance() {
        assert!(decode_decision_line("0,0,1,wait:2.0,wave:30:3.03").is_ok());
    }

    #[test]
    fn rejects_sequence_outside_tolerance() {
        let long = decode_decision_line("0,0,1,wait:2.0,wave:30:3.2");
        assert!(matches!(long, Err(DecodeError::WindowMismatch { .. })));
        let short = decode_decision_line("0,0,1,wait:2.0,wave:30:1.0");
        assert!(matches!(short, Err(DecodeError::WindowMismatch { .. })));
    }

    #[test]
    fn rejects_sequence_just_past_tolerance() {
        let short = decode_decision_line("0,0,1,wait:2.0,wave:30:2.8");
        assert!(matches!(short, Err(DecodeError::WindowMismatch { .. })));
        let long = decode_decision_line("0,0,1,wait:2.0,wave:30:3.2");
        assert!(matches!(long, Err(DecodeError::WindowMismatch { .. })));
        assert!(decode_decision_line("0,0,1,wait:2.0,wave:30:3.0").is_ok());
    }

    #[test]
    fn rejects_missing_coordinates() {
        assert!(matches!(
            decode_decision_line("1.0,abc,2.0,wait:5"),
            Err(DecodeError::BadCoordinates(_))
        ));
        assert!(matches!(
            decode_decision_line("1.0,2.0"),
            Err(DecodeError::BadCoordinates(_))
        ));
    }

    #[test]
    fn rejects_empty_gesture_span() {
        assert_eq!(
            decode_decision_line("1,0,2,1.0,straight"),
            Err(DecodeError::EmptyGestureSpan)
        );
        assert_eq!(decode_decision_line("1,0,2"), Err(DecodeError::EmptyGestureSpan));
    }

    #[test]
    fn display_writes_the_wire_form() {
        let d = decode_decision_line("1,0,2,1.0,wait:5.0,scurve").unwrap();
        assert_eq!(d.to_string(), "1.00,0.00,2.00,1.00,wait:5.00,scurve");
        let again = decode_decision_line(&d.to_string()).unwrap();
        assert_eq!(again, d);
    }
}
