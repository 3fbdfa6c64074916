//! Shared domain types for the Waggle decision execution engine.
//!
//! Everything that crosses a crate boundary lives here: the gesture
//! vocabulary, the typed [`Decision`], the reference-actor snapshot fed by
//! perception, engine events and the global [`WaggleError`].

pub mod geometry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use geometry::{BodyPose, Quaternion, Vec3, lerp_angle};

/// Length of one decision window; a gesture sequence must fill it.
pub const DECISION_WINDOW_SECS: f32 = 5.0;

/// Allowed deviation between a sequence's summed durations and the window.
pub const DECISION_WINDOW_TOLERANCE_SECS: f32 = 0.1;

/// Bounds applied to the speed multiplier of every decision.
pub const MIN_SPEED_SCALE: f32 = 0.2;
pub const MAX_SPEED_SCALE: f32 = 5.0;

/// Reason strings longer than this are truncated when a decision is built.
pub const MAX_REASON_CHARS: usize = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Gestures
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of limb gestures the body can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Wait,
    Wave,
    Look,
    ContinuousWave,
    HeadLookAtHuman,
}

/// One timed gesture.
///
/// For [`GestureKind::Wave`] and [`GestureKind::Look`] the angle pair is
/// `(horizontal, vertical)`.  A `secondary` of exactly `0.0` marks the legacy
/// single-axis form, where `primary` drives the vertical channel alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureStep {
    pub kind: GestureKind,
    /// Seconds, always `> 0`.
    pub duration: f32,
    pub primary: f32,
    pub secondary: f32,
}

impl GestureStep {
    /// A step with no angle payload.
    pub fn new(kind: GestureKind, duration: f32) -> Self {
        Self {
            kind,
            duration,
            primary: 0.0,
            secondary: 0.0,
        }
    }

    /// A step carrying an angle pair.
    pub fn with_angles(kind: GestureKind, primary: f32, secondary: f32, duration: f32) -> Self {
        Self {
            kind,
            duration,
            primary,
            secondary,
        }
    }

    /// `true` for Wave/Look steps in the legacy single-axis form.
    pub fn is_single_axis(&self) -> bool {
        matches!(self.kind, GestureKind::Wave | GestureKind::Look) && self.secondary == 0.0
    }
}

/// Ordered list of gesture steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GestureSequence {
    steps: Vec<GestureStep>,
}

impl GestureSequence {
    pub fn new(steps: Vec<GestureStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[GestureStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of all step durations in seconds.
    pub fn total_duration(&self) -> f32 {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// `true` when the summed durations are within `tolerance` of `window`.
    pub fn fills_window(&self, window: f32, tolerance: f32) -> bool {
        (self.total_duration() - window).abs() <= tolerance
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decisions
// ─────────────────────────────────────────────────────────────────────────────

/// Trajectory shape used for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    #[default]
    Straight,
    SCurve,
}

/// Which side of the reference actor's field of view the decision wants to
/// end up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FovSide {
    #[default]
    Inside,
    Outside,
}

impl FovSide {
    pub fn is_inside(self) -> bool {
        self == FovSide::Inside
    }
}

/// A fully decoded movement + gesture decision.
///
/// Immutable once built; the controller owns it until a newer decision
/// supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    /// Requested destination.  The height is replaced by the body's height
    /// when the decision is executed.
    pub target: Vec3,
    /// Speed multiplier in `[MIN_SPEED_SCALE, MAX_SPEED_SCALE]`.
    pub speed_scale: f32,
    pub sequence: GestureSequence,
    pub path: PathKind,
    /// Short natural-language justification (may be empty).
    pub reason: String,
    pub fov_side: FovSide,
}

// ─────────────────────────────────────────────────────────────────────────────
// Perception
// ─────────────────────────────────────────────────────────────────────────────

/// Latest known state of the actor the body interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceActorSnapshot {
    pub position: Vec3,
    /// Planar unit vector.
    pub forward: Vec3,
    pub interactable: bool,
    pub valid: bool,
}

impl ReferenceActorSnapshot {
    /// Build a valid snapshot.  Returns `None` when `forward` has no planar
    /// component.
    pub fn new(position: Vec3, forward: Vec3, interactable: bool) -> Option<Self> {
        let forward = forward.flat().normalized()?;
        Some(Self {
            position,
            forward,
            interactable,
            valid: true,
        })
    }

    /// Snapshot used when no reference actor is perceived.
    pub fn absent() -> Self {
        Self::default()
    }

    /// `true` when the snapshot is usable for FOV constraints.
    pub fn is_interactable(&self) -> bool {
        self.valid && self.interactable
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Engine event published on the runtime event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "waggle-runtime::controller"
    pub source: String,
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn new(source: impl Into<String>, kind: EngineEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            kind,
        }
    }
}

/// Variants of engine activity worth observing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEventKind {
    DecisionStarted {
        decision_id: Uuid,
        target: Vec3,
        path: PathKind,
        steps: usize,
    },
    DecisionRejected {
        details: String,
    },
    /// A running decision was cancelled by a newer one.
    Preempted {
        previous: Uuid,
        next: Uuid,
    },
    FovCorrected {
        from: Vec3,
        to: Vec3,
        side: FovSide,
    },
    NavigationArrived {
        position: Vec3,
    },
    GestureDegraded {
        step_index: usize,
        kind: GestureKind,
        details: String,
    },
    RequestFailed {
        details: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type.  None of these are fatal to the engine.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaggleError {
    /// The decision was discarded as a whole.
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    #[error("Unknown gesture token: {0}")]
    UnknownGestureToken(String),

    #[error("Missing actuator target {joint}: {details}")]
    MissingActuatorTarget { joint: String, details: String },

    #[error("No reference actor available")]
    MissingReferenceActor,

    #[error("Request channel failure: {0}")]
    RequestChannelFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
