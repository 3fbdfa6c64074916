//! The limb interface driven by gesture playback.
//!
//! The body exposes two angle pairs, the waving arm and the look/head pair,
//! each as `(horizontal, vertical)` in degrees.  Every setter is idempotent
//! and reports [`WaggleError::MissingActuatorTarget`] when the joint behind
//! it does not exist.

use waggle_types::{BodyPose, Vec3, WaggleError};

/// Allowed vertical travel of the waving arm.
pub const WAVE_VERTICAL_RANGE: (f32, f32) = (0.0, 180.0);
/// Allowed vertical travel of the head.
pub const LOOK_VERTICAL_RANGE: (f32, f32) = (0.0, 30.0);

/// Targets closer than this (squared, planar) give the head nothing to track.
const HEAD_COINCIDENT_SQR: f32 = 1e-4;
/// Cosine beyond which a target counts as behind the body.
const BEHIND_DOT: f32 = -0.8;

/// A `(horizontal, vertical)` joint pose in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnglePair {
    pub horizontal: f32,
    pub vertical: f32,
}

impl AnglePair {
    pub fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Limits applied when turning the head towards a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadTurn {
    /// Largest yaw either side of the body's forward axis.
    pub max_angle_deg: f32,
    /// Points farther than this (planar metres) are ignored.
    pub range: f32,
}

impl Default for HeadTurn {
    fn default() -> Self {
        Self {
            max_angle_deg: 180.0,
            range: 3.0,
        }
    }
}

/// Head yaw that points the face at `point`, or `None` when the point is on
/// top of the body or out of range.
///
/// The yaw is the signed planar angle from the body's forward axis (positive
/// to the right), clamped to `±max_angle_deg`.  Targets well behind the body
/// snap to the limit on their side.
pub fn head_turn_yaw(pose: &BodyPose, point: Vec3, turn: &HeadTurn) -> Option<f32> {
    let to_target = (point - pose.position).flat();
    if to_target.length_squared() < HEAD_COINCIDENT_SQR || to_target.length() > turn.range {
        return None;
    }
    let forward = pose.forward_flat();
    let max = turn.max_angle_deg.clamp(0.0, 180.0);
    let angle = forward.signed_angle_deg(to_target, Vec3::UP);
    let direction = to_target.normalized()?;
    if forward.dot(direction) < BEHIND_DOT {
        return Some(angle.signum() * max);
    }
    Some(angle.clamp(-max, max))
}

/// Actuator surface of the body's limbs.
pub trait LimbActuator: Send {
    /// Pose the waving arm.
    ///
    /// # Errors
    ///
    /// Returns [`WaggleError::MissingActuatorTarget`] if the arm joints are
    /// missing.
    fn set_wave(&mut self, pose: AnglePair) -> Result<(), WaggleError>;

    /// Pose the head.
    ///
    /// # Errors
    ///
    /// Returns [`WaggleError::MissingActuatorTarget`] if the head joint is
    /// missing.
    fn set_look(&mut self, pose: AnglePair) -> Result<(), WaggleError>;

    /// Last commanded arm pose.
    fn wave(&self) -> AnglePair;

    /// Last commanded head pose.
    fn look(&self) -> AnglePair;

    /// Turn the head towards `point`, keeping its current pitch.  Does
    /// nothing when [`head_turn_yaw`] finds no usable direction.
    ///
    /// # Errors
    ///
    /// Propagates [`LimbActuator::set_look`] failures.
    fn look_head_at(&mut self, body: &BodyPose, point: Vec3, turn: &HeadTurn) -> Result<(), WaggleError> {
        match head_turn_yaw(body, point, turn) {
            Some(yaw) => {
                let current = self.look();
                self.set_look(AnglePair::new(yaw, current.vertical))
            }
            None => Ok(()),
        }
    }
}
