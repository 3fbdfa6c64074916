//! `waggle-hal` – limb actuation for the agent body.
//!
//! # Modules
//!
//! - [`limbs`] – [`LimbActuator`][limbs::LimbActuator]: the interface the
//!   action timeline drives (wave arm, look/head pair, head tracking).
//! - [`joint`] – [`Joint`][joint::Joint]: a single two-axis joint driver.
//! - [`rig`] – [`JointRegistry`][rig::JointRegistry] and
//!   [`LimbRig`][rig::LimbRig]: joints are registered by name once and
//!   resolved into a typed rig, so gesture playback never looks joints up by
//!   name.
//! - [`sim`] – in-process joints for headless runs and tests.

pub mod joint;
pub mod limbs;
pub mod rig;
pub mod sim;

pub use joint::Joint;
pub use limbs::{AnglePair, HeadTurn, LimbActuator, head_turn_yaw};
pub use rig::{JointRegistry, LimbRig, RigLayout};
pub use sim::{SimJoint, SimRig};
