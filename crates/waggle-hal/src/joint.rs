//! Generic two-axis `Joint` trait for servos, skeletal bones and any other
//! pose-controlled limb segment.
//!
//! Drivers implement this trait and register themselves with a
//! [`JointRegistry`][crate::rig::JointRegistry].  Gesture playback only ever
//! talks to the resolved [`LimbRig`][crate::rig::LimbRig], so drivers can be
//! swapped without touching the timelines.

use waggle_types::WaggleError;

use crate::limbs::AnglePair;

/// A pose-controlled joint with a stable name.
pub trait Joint: Send + Sync {
    /// Stable identifier, e.g. `"wave_left"` or `"head"`.
    fn id(&self) -> &str;

    /// Command the joint to `angles` (degrees).
    ///
    /// # Errors
    ///
    /// Returns [`WaggleError::MissingActuatorTarget`] if the driver has lost
    /// the joint it controls.
    fn set_angles(&mut self, angles: AnglePair) -> Result<(), WaggleError>;

    /// Most recently commanded pose.
    fn angles(&self) -> AnglePair;
}
