//! Translation trajectories.
//!
//! A straight path is a plain lerp.  An S-curve is a cubic Bézier whose inner
//! control points sit at one and two thirds of the way, pushed to opposite
//! sides of the travel direction, so the body swerves one way then the other
//! and arrives on the straight line.

use waggle_types::{PathKind, Vec3};

const FIRST_CONTROL: f32 = 0.33;
const SECOND_CONTROL: f32 = 0.67;
const MAX_AMPLITUDE_RATIO: f32 = 0.25;

/// A sampled trajectory from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCurve {
    start: Vec3,
    end: Vec3,
    controls: Option<(Vec3, Vec3)>,
}

impl PathCurve {
    /// Build the curve for `kind`.  Degenerate S-curves (start and end
    /// coincide) collapse to straight lines.
    pub fn new(kind: PathKind, start: Vec3, end: Vec3, curve_height: f32) -> Self {
        let controls = match kind {
            PathKind::Straight => None,
            PathKind::SCurve => s_curve_controls(start, end, curve_height),
        };
        Self {
            start,
            end,
            controls,
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn end(&self) -> Vec3 {
        self.end
    }

    /// Point at parameter `t`, clamped to `[0, 1]`.
    pub fn sample(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        match self.controls {
            None => self.start.lerp(self.end, t),
            Some((c1, c2)) => {
                let u = 1.0 - t;
                self.start * (u * u * u)
                    + c1 * (3.0 * u * u * t)
                    + c2 * (3.0 * u * t * t)
                    + self.end * (t * t * t)
            }
        }
    }
}

fn s_curve_controls(start: Vec3, end: Vec3, curve_height: f32) -> Option<(Vec3, Vec3)> {
    let travel = end - start;
    let distance = travel.length();
    let direction = travel.normalized()?;
    let side = direction
        .cross(Vec3::UP)
        .normalized()
        .or_else(|| direction.cross(Vec3::RIGHT).normalized())
        .unwrap_or(Vec3::RIGHT);
    let amplitude = curve_height.max(0.0).min(MAX_AMPLITUDE_RATIO * distance);

    let c1 = start + direction * (FIRST_CONTROL * distance) + side * amplitude;
    let c2 = start + direction * (SECOND_CONTROL * distance) - side * amplitude;
    Some((c1, c2))
}
