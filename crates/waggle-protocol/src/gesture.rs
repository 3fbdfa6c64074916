//! Gesture mini-language.
//!
//! A sequence is a comma-separated list of `tag:arg[:arg[:arg]]` tokens:
//!
//! | Token | Step |
//! |---|---|
//! | `wait:d` | hold for `d` seconds |
//! | `wave:h:v:d` / `look:h:v:d` | two-axis pose (horizontal, vertical) |
//! | `wave:a:d` / `look:a:d` | single-axis pose, `a` drives the vertical channel |
//! | `continuous_wave:d` | repeated up/down wave |
//! | `head_look_at_human:d` | track the reference actor with the head |
//!
//! Tags are case-insensitive.  Tokens that cannot be understood are dropped
//! and decoding carries on with the rest.
//!
//! # Example
//!
//! ```rust
//! use waggle_protocol::gesture::{decode_sequence, encode_sequence};
//!
//! let seq = decode_sequence("wait:1.0, WAVE:30:60:2.5, bogus:1, look:10:1.5");
//! assert_eq!(seq.len(), 3);
//! assert_eq!(encode_sequence(&seq), "wait:1.00,wave:30.0:60.0:2.50,look:10.0:1.50");
//! ```

use tracing::debug;
use waggle_types::{GestureKind, GestureSequence, GestureStep, WaggleError};

/// Decode a comma-separated gesture list.  Never fails; unknown or malformed
/// tokens are skipped.
pub fn decode_sequence(text: &str) -> GestureSequence {
    let steps = text
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match decode_step(token) {
            Ok(step) => Some(step),
            Err(e) => {
                debug!(error = %e, "dropping gesture token");
                None
            }
        })
        .collect();
    GestureSequence::new(steps)
}

/// Decode a single `tag:args` token.
///
/// # Errors
///
/// Returns [`WaggleError::UnknownGestureToken`] when the tag is unknown, an
/// argument is missing or not a finite number, or the duration is not
/// positive.
pub fn decode_step(token: &str) -> Result<GestureStep, WaggleError> {
    let unknown = || WaggleError::UnknownGestureToken(token.to_string());
    let parts: Vec<&str> = token.split(':').map(str::trim).collect();
    if parts.len() < 2 {
        return Err(unknown());
    }

    let step = match parts[0].to_lowercase().as_str() {
        "wait" => duration(parts[1]).map(|d| GestureStep::new(GestureKind::Wait, d)),
        "wave" => posed(GestureKind::Wave, &parts),
        "look" => posed(GestureKind::Look, &parts),
        "continuous_wave" | "continuouswave" => {
            duration(parts[1]).map(|d| GestureStep::new(GestureKind::ContinuousWave, d))
        }
        "head_look_at_human" | "headlookathuman" => {
            duration(parts[1]).map(|d| GestureStep::new(GestureKind::HeadLookAtHuman, d))
        }
        _ => None,
    };
    step.ok_or_else(unknown)
}

/// Two-axis form first, then the legacy single-axis form.
fn posed(kind: GestureKind, parts: &[&str]) -> Option<GestureStep> {
    if parts.len() >= 4
        && let (Some(h), Some(v), Some(d)) = (number(parts[1]), number(parts[2]), duration(parts[3]))
    {
        return Some(GestureStep::with_angles(kind, h, v, d));
    }
    if parts.len() >= 3
        && let (Some(angle), Some(d)) = (number(parts[1]), duration(parts[2]))
    {
        return Some(GestureStep::with_angles(kind, angle, 0.0, d));
    }
    None
}

pub(crate) fn number(raw: &str) -> Option<f32> {
    raw.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

fn duration(raw: &str) -> Option<f32> {
    number(raw).filter(|d| *d > 0.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encode one step using fixed-point formatting (angles to 0.1°, durations
/// to 0.01 s).
pub fn encode_step(step: &GestureStep) -> String {
    let d = step.duration;
    match step.kind {
        GestureKind::Wait => format!("wait:{d:.2}"),
        GestureKind::Wave | GestureKind::Look => {
            let tag = if step.kind == GestureKind::Wave { "wave" } else { "look" };
            if step.secondary != 0.0 {
                format!("{tag}:{:.1}:{:.1}:{d:.2}", step.primary, step.secondary)
            } else {
                format!("{tag}:{:.1}:{d:.2}", step.primary)
            }
        }
        GestureKind::ContinuousWave => format!("continuous_wave:{d:.2}"),
        GestureKind::HeadLookAtHuman => format!("head_look_at_human:{d:.2}"),
    }
}

/// Encode a whole sequence as a comma-separated list.
pub fn encode_sequence(seq: &GestureSequence) -> String {
    seq.steps()
        .iter()
        .map(encode_step)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_every_tag() {
        let seq = decode_sequence(
            "wait:0.5,wave:20:40:1,look:15:0.5,continuous_wave:1.5,ContinuousWave:0.5,head_look_at_human:0.5,HeadLookAtHuman:0.5",
        );
        let kinds: Vec<GestureKind> = seq.steps().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                GestureKind::Wait,
                GestureKind::Wave,
                GestureKind::Look,
                GestureKind::ContinuousWave,
                GestureKind::ContinuousWave,
                GestureKind::HeadLookAtHuman,
                GestureKind::HeadLookAtHuman,
            ]
        );
        assert!((seq.total_duration() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn legacy_single_axis_wave() {
        let seq = decode_sequence("wave:75:2.0");
        let step = seq.steps()[0];
        assert_eq!(step.kind, GestureKind::Wave);
        assert_eq!(step.primary, 75.0);
        assert_eq!(step.secondary, 0.0);
        assert_eq!(step.duration, 2.0);
        assert!(step.is_single_axis());
    }

    #[test]
    fn two_axis_wave_keeps_both_angles() {
        let step = decode_step(" Wave : -30 : 90 : 1.25 ").unwrap();
        assert_eq!((step.primary, step.secondary, step.duration), (-30.0, 90.0, 1.25));
    }

    #[test]
    fn unparseable_tokens_are_dropped() {
        let seq = decode_sequence("dance:2,wait:abc,wait:-1,wave:1,wait:nan,,look:x:y:z,wait:5");
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.steps()[0].kind, GestureKind::Wait);
    }

    #[test]
    fn decode_step_reports_unknown_token() {
        let err = decode_step("jump:1.0").unwrap_err();
        assert_eq!(err, WaggleError::UnknownGestureToken("jump:1.0".into()));
        assert!(decode_step("wait").is_err());
    }

    #[test]
    fn encode_uses_three_part_form_for_single_axis() {
        let seq = GestureSequence::new(vec![
            GestureStep::with_angles(GestureKind::Look, 12.0, 0.0, 2.0),
            GestureStep::new(GestureKind::ContinuousWave, 1.5),
            GestureStep::new(GestureKind::HeadLookAtHuman, 1.5),
        ]);
        assert_eq!(
            encode_sequence(&seq),
            "look:12.0:2.00,continuous_wave:1.50,head_look_at_human:1.50"
        );
    }

    fn arb_step() -> impl Strategy<Value = GestureStep> {
        let duration = 0.05f32..5.0;
        prop_oneof![
            duration.clone().prop_map(|d| GestureStep::new(GestureKind::Wait, d)),
            duration.clone().prop_map(|d| GestureStep::new(GestureKind::ContinuousWave, d)),
            duration.clone().prop_map(|d| GestureStep::new(GestureKind::HeadLookAtHuman, d)),
            (
                prop_oneof![Just(GestureKind::Wave), Just(GestureKind::Look)],
                -180.0f32..180.0,
                prop_oneof![Just(0.0f32), -90.0f32..90.0],
                duration,
            )
                .prop_map(|(kind, p, s, d)| GestureStep::with_angles(kind, p, s, d)),
        ]
    }

    proptest! {
        #[test]
        fn encode_then_decode_preserves_steps(steps in prop::collection::vec(arb_step(), 0..8)) {
            let seq = GestureSequence::new(steps);
            let back = decode_sequence(&encode_sequence(&seq));
            prop_assert_eq!(back.len(), seq.len());
            for (a, b) in seq.steps().iter().zip(back.steps()) {
                prop_assert_eq!(a.kind, b.kind);
                prop_assert!((a.primary - b.primary).abs() <= 0.05 + 1e-3);
                prop_assert!((a.secondary - b.secondary).abs() <= 0.05 + 1e-3);
                prop_assert!((a.duration - b.duration).abs() <= 0.005 + 1e-4);
            }
        }
    }
}
