//! `waggle-perception` – what the body knows about the scene around it.
//!
//! # Modules
//!
//! - [`fov`] – [`FovConstraint`][fov::FovConstraint]: validates a candidate
//!   position against the reference actor's viewing cone and resamples it
//!   onto the requested side when needed.
//! - [`snapshot`] – [`SnapshotReader`][snapshot::SnapshotReader]: extracts
//!   the reference actor and entity count from the textual perception
//!   report.

pub mod fov;
pub mod snapshot;

pub use fov::{FovCheck, FovConstraint, FovOutcome};
pub use snapshot::{DEFAULT_REFERENCE_TAG, PerceptionSnapshot, SnapshotReader};
