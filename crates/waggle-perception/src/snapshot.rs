//! Perception snapshot reader.
//!
//! The perception service reports what the body sees as plain text, one
//! entity per line:
//!
//! ```text
//! [perception|radius=5m|count=2]
//! 1) Alice(Human) at (2.0,0.0,1.0) dist 2.2m bearing +63° state=Interactable facing=(-1.00,0.00,0.00)
//! 2) Crate(Prop) at (0.5,0.0,3.0) dist 3.0m bearing +9°
//! ```
//!
//! The raw text is forwarded to the reasoning service untouched; this module
//! only extracts the structured bits the engine needs: the entity count and
//! the reference actor (the first valid line carrying the configured tag).

use regex::Regex;
use tracing::debug;
use waggle_types::{ReferenceActorSnapshot, Vec3};

/// Tag used for the reference actor unless configured otherwise.
pub const DEFAULT_REFERENCE_TAG: &str = "Human";

const VEC3_PATTERN: &str = r"\(\s*([-+\d.]+)\s*,\s*([-+\d.]+)\s*,\s*([-+\d.]+)\s*\)";

/// Structured view over one perception report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerceptionSnapshot {
    /// Text exactly as received.
    pub text: String,
    /// Value of the header's `count=` field, if present.
    pub entity_count: Option<usize>,
    pub reference: ReferenceActorSnapshot,
}

impl PerceptionSnapshot {
    /// Snapshot of an empty scene.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Parses perception text into a [`PerceptionSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    marker: String,
    position: Regex,
    facing: Regex,
    state: Regex,
    count: Regex,
}

impl SnapshotReader {
    /// Build a reader that treats entities tagged `(tag)` as the reference
    /// actor.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`regex::Error`] if a pattern fails to compile.
    pub fn new(tag: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            marker: format!("({tag})"),
            position: Regex::new(&format!(r"\bat\s*{VEC3_PATTERN}"))?,
            facing: Regex::new(&format!(r"(?:facing|朝向)\s*=\s*{VEC3_PATTERN}"))?,
            state: Regex::new(r"(?:state|状态)\s*=\s*(NonInteractable|Interactable)")?,
            count: Regex::new(r"(?:count|数量)\s*=\s*(\d+)")?,
        })
    }

    /// Parse `text`.  Lines that do not match are ignored.
    pub fn read(&self, text: &str) -> PerceptionSnapshot {
        let mut snapshot = PerceptionSnapshot {
            text: text.to_string(),
            ..PerceptionSnapshot::default()
        };

        for line in text.lines() {
            if snapshot.entity_count.is_none()
                && let Some(caps) = self.count.captures(line)
            {
                snapshot.entity_count = caps[1].parse().ok();
            }
            if !snapshot.reference.valid && line.contains(&self.marker) {
                match self.reference_from_line(line) {
                    Some(reference) => snapshot.reference = reference,
                    None => debug!(line, "reference actor line is incomplete"),
                }
            }
        }
        snapshot
    }

    fn reference_from_line(&self, line: &str) -> Option<ReferenceActorSnapshot> {
        let position = capture_vec3(&self.position, line)?;
        let forward = capture_vec3(&self.facing, line)?;
        let state = self.state.captures(line)?;
        let interactable = &state[1] == "Interactable";
        ReferenceActorSnapshot::new(position, forward, interactable)
    }
}

fn capture_vec3(re: &Regex, line: &str) -> Option<Vec3> {
    let caps = re.captures(line)?;
    let x = caps[1].parse().ok()?;
    let y = caps[2].parse().ok()?;
    let z = caps[3].parse().ok()?;
    Some(Vec3::new(x, y, z))
}
