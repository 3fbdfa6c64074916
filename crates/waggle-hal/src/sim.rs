//! In-process simulated joints for headless runs and tests.
//!
//! [`SimRig`] registers stub [`SimJoint`]s for the default [`RigLayout`] and
//! resolves them into a [`LimbRig`], so the full engine can run without a
//! renderer or servo hardware.  Leaving a joint out simulates a body whose
//! skeleton lacks it.
//!
//! # Example
//!
//! ```rust
//! use waggle_hal::limbs::{AnglePair, LimbActuator};
//! use waggle_hal::sim::SimRig;
//!
//! let mut rig = SimRig::new().with_wave_arm().with_head().build();
//! rig.set_wave(AnglePair::new(0.0, 90.0)).expect("sim wave must succeed");
//! assert_eq!(rig.wave().vertical, 90.0);
//! ```

use waggle_types::WaggleError;

use crate::joint::Joint;
use crate::limbs::AnglePair;
use crate::rig::{JointRegistry, LimbRig, RigLayout};

// ────────────────────────────────────────────────────────────────────────────
// Stub joint
// ────────────────────────────────────────────────────────────────────────────

/// A simulated joint that records the most recent commanded pose and how
/// many commands it has received.  Always succeeds.
pub struct SimJoint {
    id: String,
    angles: AnglePair,
    commands: usize,
}

impl SimJoint {
    /// Create a new simulated joint with the given identifier.
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            angles: AnglePair::default(),
            commands: 0,
        })
    }

    pub fn commands(&self) -> usize {
        self.commands
    }
}

impl Joint for SimJoint {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_angles(&mut self, angles: AnglePair) -> Result<(), WaggleError> {
        self.angles = angles;
        self.commands += 1;
        Ok(())
    }

    fn angles(&self) -> AnglePair {
        self.angles
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a simulated [`LimbRig`].
pub struct SimRig {
    layout: RigLayout,
    registry: JointRegistry,
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRig {
    /// Start with no joints registered.
    pub fn new() -> Self {
        Self {
            layout: RigLayout::default(),
            registry: JointRegistry::new(),
        }
    }

    /// Register every wave joint of the default layout.
    pub fn with_wave_arm(mut self) -> Self {
        for id in &self.layout.wave {
            self.registry.register(SimJoint::new(id.clone()));
        }
        self
    }

    /// Register the head joint of the default layout.
    pub fn with_head(mut self) -> Self {
        self.registry.register(SimJoint::new(self.layout.look.clone()));
        self
    }

    /// Convenience: a complete body.
    pub fn complete() -> LimbRig {
        Self::new().with_wave_arm().with_head().build()
    }

    /// Resolve the registered joints into a rig.
    pub fn build(mut self) -> LimbRig {
        LimbRig::resolve(&mut self.registry, self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limbs::LimbActuator;

    #[test]
    fn sim_joint_counts_commands() {
        let mut joint = SimJoint::new("head");
        joint.set_angles(AnglePair::new(1.0, 2.0)).unwrap();
        joint.set_angles(AnglePair::new(3.0, 4.0)).unwrap();
        assert_eq!(joint.commands(), 2);
        assert_eq!(joint.angles(), AnglePair::new(3.0, 4.0));
        assert_eq!(joint.id(), "head");
    }

    #[test]
    fn complete_rig_accepts_all_commands() {
        let mut rig = SimRig::complete();
        assert!(rig.is_complete());
        rig.set_wave(AnglePair::new(10.0, 45.0)).unwrap();
        rig.set_look(AnglePair::new(-30.0, 15.0)).unwrap();
        assert_eq!(rig.look(), AnglePair::new(-30.0, 15.0));
    }

    #[test]
    fn headless_rig_is_incomplete() {
        let rig = SimRig::new().with_wave_arm().build();
        assert!(!rig.is_complete());
    }
}
