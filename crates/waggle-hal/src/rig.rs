//! [`JointRegistry`] and [`LimbRig`] – joints are looked up by name exactly
//! once, when the rig is assembled.
//!
//! The registry stores every registered [`Joint`] driver.  [`LimbRig::resolve`]
//! takes the joints named by a [`RigLayout`] out of it; any that are absent
//! are remembered and every later command aimed at them fails with
//! [`WaggleError::MissingActuatorTarget`], which gesture playback treats as a
//! degraded (time-only) step.

use std::collections::HashMap;

use tracing::warn;
use waggle_types::WaggleError;

use crate::joint::Joint;
use crate::limbs::{AnglePair, LOOK_VERTICAL_RANGE, LimbActuator, WAVE_VERTICAL_RANGE};

/// Central joint driver registry.
#[derive(Default)]
pub struct JointRegistry {
    joints: HashMap<String, Box<dyn Joint>>,
}

impl JointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a joint driver.  Any previously registered driver with the
    /// same `id` is replaced.
    pub fn register(&mut self, joint: Box<dyn Joint>) {
        self.joints.insert(joint.id().to_string(), joint);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.joints.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    fn take(&mut self, id: &str) -> Option<Box<dyn Joint>> {
        self.joints.remove(id)
    }
}

/// Names of the joints that make up the limbs.
#[derive(Debug, Clone, PartialEq)]
pub struct RigLayout {
    /// Every joint driven by the wave pair (mirrored arm segments).
    pub wave: Vec<String>,
    pub look: String,
}

impl Default for RigLayout {
    fn default() -> Self {
        Self {
            wave: vec!["wave_upper".to_string(), "wave_lower".to_string()],
            look: "head".to_string(),
        }
    }
}

/// Limb actuator backed by resolved joint drivers.
pub struct LimbRig {
    layout: RigLayout,
    wave_joints: Vec<Box<dyn Joint>>,
    look_joint: Option<Box<dyn Joint>>,
    wave: AnglePair,
    look: AnglePair,
}

impl LimbRig {
    /// Pull the joints named by `layout` out of `registry`.
    ///
    /// Missing joints are logged here and reported on every command that
    /// needs them.
    pub fn resolve(registry: &mut JointRegistry, layout: RigLayout) -> Self {
        let mut wave_joints = Vec::with_capacity(layout.wave.len());
        for id in &layout.wave {
            match registry.take(id) {
                Some(joint) => wave_joints.push(joint),
                None => warn!(joint = %id, "wave joint not registered"),
            }
        }
        let look_joint = registry.take(&layout.look);
        if look_joint.is_none() {
            warn!(joint = %layout.look, "look joint not registered");
        }

        let wave = wave_joints.first().map(|j| j.angles()).unwrap_or_default();
        let look = look_joint.as_ref().map(|j| j.angles()).unwrap_or_default();
        Self {
            layout,
            wave_joints,
            look_joint,
            wave,
            look,
        }
    }

    pub fn layout(&self) -> &RigLayout {
        &self.layout
    }

    /// `true` when every joint named by the layout was found.
    pub fn is_complete(&self) -> bool {
        self.wave_joints.len() == self.layout.wave.len() && self.look_joint.is_some()
    }
}

impl LimbActuator for LimbRig {
    fn set_wave(&mut self, pose: AnglePair) -> Result<(), WaggleError> {
        if self.wave_joints.is_empty() {
            return Err(WaggleError::MissingActuatorTarget {
                joint: self.layout.wave.join("+"),
                details: "no wave joint registered".to_string(),
            });
        }
        let pose = AnglePair::new(
            pose.horizontal,
            pose.vertical.clamp(WAVE_VERTICAL_RANGE.0, WAVE_VERTICAL_RANGE.1),
        );
        for joint in &mut self.wave_joints {
            joint.set_angles(pose)?;
        }
        self.wave = pose;
        Ok(())
    }

    fn set_look(&mut self, pose: AnglePair) -> Result<(), WaggleError> {
        let Some(joint) = self.look_joint.as_mut() else {
            return Err(WaggleError::MissingActuatorTarget {
                joint: self.layout.look.clone(),
                details: "look joint not registered".to_string(),
            });
        };
        let pose = AnglePair::new(
            pose.horizontal,
            pose.vertical.clamp(LOOK_VERTICAL_RANGE.0, LOOK_VERTICAL_RANGE.1),
        );
        joint.set_angles(pose)?;
        self.look = pose;
        Ok(())
    }

    fn wave(&self) -> AnglePair {
        self.wave
    }

    fn look(&self) -> AnglePair {
        self.look
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimJoint;

    fn full_registry() -> JointRegistry {
        let mut registry = JointRegistry::new();
        registry.register(SimJoint::new("wave_upper"));
        registry.register(SimJoint::new("wave_lower"));
        registry.register(SimJoint::new("head"));
        registry
    }

    #[test]
    fn resolve_takes_joints_out_of_registry() {
        let mut registry = full_registry();
        let rig = LimbRig::resolve(&mut registry, RigLayout::default());
        assert!(rig.is_complete());
        assert!(registry.is_empty());
    }

    #[test]
    fn wave_vertical_is_clamped() {
        let mut rig = LimbRig::resolve(&mut full_registry(), RigLayout::default());
        rig.set_wave(AnglePair::new(-20.0, 250.0)).unwrap();
        assert_eq!(rig.wave(), AnglePair::new(-20.0, 180.0));
        rig.set_wave(AnglePair::new(0.0, -5.0)).unwrap();
        assert_eq!(rig.wave().vertical, 0.0);
    }

    #[test]
    fn look_vertical_is_clamped() {
        let mut rig = LimbRig::resolve(&mut full_registry(), RigLayout::default());
        rig.set_look(AnglePair::new(45.0, 60.0)).unwrap();
        assert_eq!(rig.look(), AnglePair::new(45.0, 30.0));
    }

    #[test]
    fn missing_head_fails_look_but_not_wave() {
        let mut registry = JointRegistry::new();
        registry.register(SimJoint::new("wave_upper"));
        let mut rig = LimbRig::resolve(&mut registry, RigLayout::default());
        assert!(!rig.is_complete());

        rig.set_wave(AnglePair::new(0.0, 90.0)).unwrap();
        let err = rig.set_look(AnglePair::new(10.0, 0.0)).unwrap_err();
        assert!(matches!(err, WaggleError::MissingActuatorTarget { ref joint, .. } if joint == "head"));
        assert_eq!(rig.look(), AnglePair::default());
    }

    #[test]
    fn no_wave_joints_fails_wave() {
        let mut registry = JointRegistry::new();
        registry.register(SimJoint::new("head"));
        let mut rig = LimbRig::resolve(&mut registry, RigLayout::default());
        assert!(rig.set_wave(AnglePair::new(0.0, 90.0)).is_err());
        assert!(rig.set_look(AnglePair::new(0.0, 10.0)).is_ok());
    }

    #[test]
    fn re_registering_joint_replaces_old_driver() {
        let mut registry = JointRegistry::new();
        registry.register(SimJoint::new("head"));
        registry.register(SimJoint::new("head"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("head"));
    }
}
