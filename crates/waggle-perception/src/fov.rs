//! Field-of-view constraint solver.
//!
//! Decides whether a candidate position sits inside the reference actor's
//! viewing cone (half-angle θ, radius R, measured on the ground plane) and,
//! when the decision wants the other side, resamples a position that does.
//!
//! # Example
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use waggle_perception::fov::FovConstraint;
//! use waggle_types::{FovSide, ReferenceActorSnapshot, Vec3};
//!
//! let actor = ReferenceActorSnapshot::new(Vec3::zero(), Vec3::FORWARD, true).unwrap();
//! let fov = FovConstraint::default();
//!
//! // Directly behind the actor: valid, but outside the cone.
//! let behind = Vec3::new(0.0, 0.0, -1.0);
//! assert!(!fov.validate(behind, &actor).inside);
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let outcome = fov.enforce(behind, &actor, FovSide::Inside, &mut rng);
//! assert!(fov.validate(outcome.position(), &actor).inside);
//! ```

use rand::Rng;
use tracing::debug;
use waggle_types::{FovSide, ReferenceActorSnapshot, Vec3};

pub const DEFAULT_HALF_ANGLE_DEG: f32 = 45.0;
pub const DEFAULT_MAX_RADIUS: f32 = 2.0;

/// Slack on the radius check (metres).
pub const DISTANCE_EPSILON: f32 = 0.01;
/// Slack on the cone check (degrees).
pub const ANGLE_EPSILON_DEG: f32 = 0.5;
/// Squared planar distance under which the candidate counts as on top of
/// the actor.
const COINCIDENT_SQR: f32 = 1e-4;

const MIN_CORRECTED_DISTANCE: f32 = 0.5;
const PREFERRED_DISTANCE_RATIO: f32 = 0.8;
const INSIDE_SPREAD_RATIO: f32 = 0.4;
const BEHIND_RANGE_DEG: (f32, f32) = (150.0, 170.0);
const FLANK_MARGIN_DEG: f32 = 15.0;
const FLANK_MAX_DEG: f32 = 120.0;

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// Result of [`FovConstraint::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FovCheck {
    /// `false` when the candidate is beyond the radius.
    pub ok: bool,
    pub inside: bool,
}

impl FovCheck {
    /// `true` when the candidate is in range and on the requested side.
    pub fn satisfies(&self, side: FovSide) -> bool {
        self.ok && self.inside == side.is_inside()
    }
}

/// Result of [`FovConstraint::enforce`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FovOutcome {
    /// The candidate already satisfied the constraint.
    Accepted(Vec3),
    /// The candidate was replaced by a resampled position.
    Corrected { from: Vec3, to: Vec3 },
    /// Resampling could not satisfy the constraint; the candidate is kept.
    Fallback(Vec3),
}

impl FovOutcome {
    /// Position to navigate to.
    pub fn position(&self) -> Vec3 {
        match *self {
            FovOutcome::Accepted(p) | FovOutcome::Fallback(p) => p,
            FovOutcome::Corrected { to, .. } => to,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FovConstraint
// ─────────────────────────────────────────────────────────────────────────────

/// Viewing cone of the reference actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovConstraint {
    half_angle_deg: f32,
    max_radius: f32,
}

impl Default for FovConstraint {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_ANGLE_DEG, DEFAULT_MAX_RADIUS)
    }
}

impl FovConstraint {
    /// Half-angle is clamped to `[0, 180]` degrees and the radius to `>= 0`.
    /// A non-finite value falls back to its default (45°, 2 m).
    pub fn new(half_angle_deg: f32, max_radius: f32) -> Self {
        let half_angle_deg = if half_angle_deg.is_finite() {
            half_angle_deg.clamp(0.0, 180.0)
        } else {
            DEFAULT_HALF_ANGLE_DEG
        };
        let max_radius = if max_radius.is_finite() {
            max_radius.max(0.0)
        } else {
            DEFAULT_MAX_RADIUS
        };
        Self {
            half_angle_deg,
            max_radius,
        }
    }

    pub fn half_angle_deg(&self) -> f32 {
        self.half_angle_deg
    }

    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Classify `pos` relative to the actor's cone.  Height is ignored.
    pub fn validate(&self, pos: Vec3, actor: &ReferenceActorSnapshot) -> FovCheck {
        let delta = (pos - actor.position).flat();
        if delta.length() > self.max_radius + DISTANCE_EPSILON {
            return FovCheck {
                ok: false,
                inside: false,
            };
        }
        if delta.length_squared() < COINCIDENT_SQR {
            return FovCheck {
                ok: true,
                inside: true,
            };
        }
        let (forward, _) = basis(actor);
        let angle = forward.angle_deg(delta);
        FovCheck {
            ok: true,
            inside: angle <= self.half_angle_deg + ANGLE_EPSILON_DEG,
        }
    }

    /// Resample a position on the requested side of the cone.
    ///
    /// The new point keeps roughly the candidate's distance from the actor
    /// (pulled into `[0.5, 0.8·R]`) and the candidate's height.
    pub fn correct(
        &self,
        original: Vec3,
        actor: &ReferenceActorSnapshot,
        side: FovSide,
        rng: &mut impl Rng,
    ) -> Vec3 {
        let current = original.flat_distance(actor.position);
        let preferred = (PREFERRED_DISTANCE_RATIO * self.max_radius).min(current.max(MIN_CORRECTED_DISTANCE));
        let distance = preferred
            .max(MIN_CORRECTED_DISTANCE.min(self.max_radius))
            .min(self.max_radius);

        let offset_deg = match side {
            FovSide::Inside => {
                let spread = INSIDE_SPREAD_RATIO * self.half_angle_deg;
                rng.random_range(-spread..=spread)
            }
            FovSide::Outside => self.outside_offset(rng),
        };

        let (forward, right) = basis(actor);
        let theta = offset_deg.to_radians();
        let direction = forward * theta.cos() + right * theta.sin();
        (actor.position + direction * distance).with_y(original.y)
    }

    fn outside_offset(&self, rng: &mut impl Rng) -> f32 {
        let flank_min = self.half_angle_deg + FLANK_MARGIN_DEG;
        let magnitude = if rng.random_bool(0.5) || flank_min >= FLANK_MAX_DEG {
            rng.random_range(BEHIND_RANGE_DEG.0..=BEHIND_RANGE_DEG.1)
        } else {
            rng.random_range(flank_min..=FLANK_MAX_DEG)
        };
        if rng.random_bool(0.5) { magnitude } else { -magnitude }
    }

    /// Validate `candidate`, resample once if it is on the wrong side or out
    /// of range, and fall back to the candidate if the resample also fails.
    pub fn enforce(
        &self,
        candidate: Vec3,
        actor: &ReferenceActorSnapshot,
        side: FovSide,
        rng: &mut impl Rng,
    ) -> FovOutcome {
        if self.validate(candidate, actor).satisfies(side) {
            return FovOutcome::Accepted(candidate);
        }
        let corrected = self.correct(candidate, actor, side, rng);
        if self.validate(corrected, actor).satisfies(side) {
            FovOutcome::Corrected {
                from: candidate,
                to: corrected,
            }
        } else {
            debug!(?side, "fov correction did not converge; keeping candidate");
            FovOutcome::Fallback(candidate)
        }
    }
}

/// Planar forward and right axes of the actor, with fallbacks for
/// degenerate input.
fn basis(actor: &ReferenceActorSnapshot) -> (Vec3, Vec3) {
    let forward = actor
        .forward
        .flat()
        .normalized()
        .or_else(|| actor.forward.normalized())
        .unwrap_or(Vec3::FORWARD);
    let right = Vec3::UP.cross(forward).normalized().unwrap_or(Vec3::RIGHT);
    (forward, right)
}
