//! Navigation timeline: turn, travel, then optionally face a point.
//!
//! ```text
//! Idle ──start──▶ Rotating ──▶ Translating ──▶ FacingTarget ──▶ Idle
//!                                        └──────────────────────▶ Idle
//! ```
//!
//! The timeline is a plain state machine advanced by [`NavigationTimeline::tick`].
//! Time left over when a phase ends flows into the next one, so a single
//! large tick can run a whole plan.  The two motion phases share one budget:
//! they freeze while the [`PauseSignal`] is set and snap to their end once
//! the decision window is used up.

use tracing::{debug, info};
use waggle_types::{BodyPose, PathKind, Quaternion, Vec3};

use crate::config::NavigationConfig;
use crate::path::PathCurve;
use crate::signal::{CancelToken, PauseSignal};

/// Look-at points nearer than this (squared, planar) are not turned to.
const FACING_MIN_SQR: f32 = 0.1;
/// Facing corrections smaller than this are skipped.
const FACING_MIN_ANGLE_DEG: f32 = 1.0;
/// Shortest translation phase, whatever is left of the window.
const MIN_TRANSLATION_SECS: f32 = 0.1;
const MIN_SPEED: f32 = 0.01;
const TANGENT_MIN_SQR: f32 = 1e-8;

/// Observable phase of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    Rotating,
    Translating,
    FacingTarget,
}

/// What one navigation run should do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationPlan {
    pub target: Vec3,
    pub path: PathKind,
    pub speed_scale: f32,
    /// Point to face after arrival.
    pub look_at: Option<Vec3>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Rotating {
        from: Quaternion,
        to: Quaternion,
        elapsed: f32,
        duration: f32,
    },
    Translating {
        curve: PathCurve,
        height: f32,
        last_direction: Vec3,
        elapsed: f32,
        duration: f32,
    },
    FacingTarget {
        from: Quaternion,
        to: Quaternion,
        elapsed: f32,
        duration: f32,
    },
}

#[derive(Debug)]
struct Run {
    plan: NavigationPlan,
    token: CancelToken,
    phase: Phase,
    /// Motion time spent so far (rotation + translation).
    total: f32,
    window: f32,
}

/// Drives the body pose towards a target over time.
#[derive(Debug)]
pub struct NavigationTimeline {
    config: NavigationConfig,
    pause: PauseSignal,
    run: Option<Run>,
}

impl NavigationTimeline {
    pub fn new(config: NavigationConfig, pause: PauseSignal) -> Self {
        Self {
            config,
            pause,
            run: None,
        }
    }

    /// Begin a run from `pose`, replacing any previous one.
    ///
    /// Returns `false` (and leaves the timeline idle) when the target is
    /// closer than the configured minimum travel distance.
    pub fn start(&mut self, plan: NavigationPlan, pose: &BodyPose, token: CancelToken) -> bool {
        self.run = None;
        if pose.position.flat_distance(plan.target) < self.config.min_travel_distance {
            debug!(target = ?plan.target, "navigation target too close, not moving");
            return false;
        }

        let window = self.config.base_duration_secs / plan.speed_scale.max(MIN_SPEED);
        let heading = Quaternion::look_rotation(plan.target - pose.position).unwrap_or(pose.rotation);
        debug!(target = ?plan.target, path = ?plan.path, window, "navigation started");
        self.run = Some(Run {
            plan,
            token,
            phase: Phase::Rotating {
                from: pose.rotation,
                to: heading,
                elapsed: 0.0,
                duration: window * self.config.rotation_ratio,
            },
            total: 0.0,
            window,
        });
        true
    }

    /// Advance by `dt` seconds, writing the new pose into `pose`.
    ///
    /// Returns `true` on the tick the run finishes.  A cancelled run is
    /// dropped without touching `pose`.
    pub fn tick(&mut self, dt: f32, pose: &mut BodyPose) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        if run.token.is_cancelled() {
            self.run = None;
            return false;
        }

        let cap = self.config.decision_window_secs;
        let mut remaining = dt.max(0.0);
        loop {
            match &mut run.phase {
                Phase::Rotating {
                    from,
                    to,
                    elapsed,
                    duration,
                } => {
                    if self.pause.is_set() {
                        return false;
                    }
                    let (used, done) = consume(remaining, *duration - *elapsed, cap - run.total);
                    *elapsed += used;
                    run.total += used;
                    remaining -= used;
                    if !done {
                        pose.rotation = from.slerp(*to, *elapsed / *duration);
                        return false;
                    }
                    pose.rotation = *to;
                    run.phase = translation_phase(run, pose, self.config.curve_height);
                }
                Phase::Translating {
                    curve,
                    height,
                    last_direction,
                    elapsed,
                    duration,
                } => {
                    if self.pause.is_set() {
                        return false;
                    }
                    let (used, done) = consume(remaining, *duration - *elapsed, cap - run.total);
                    *elapsed += used;
                    run.total += used;
                    remaining -= used;
                    if done {
                        pose.position = curve.end().with_y(*height);
                    } else {
                        let next = curve.sample(*elapsed / *duration).with_y(*height);
                        let direction = heading_between(pose.position, next)
                            .or_else(|| heading_between(next, curve.end()))
                            .unwrap_or(*last_direction);
                        *last_direction = direction;
                        pose.position = next;
                        if let Some(rotation) = Quaternion::look_rotation(direction) {
                            pose.rotation = rotation;
                        }
                        return false;
                    }
                    match facing_phase(run.plan.look_at, pose, self.config.facing_duration_secs) {
                        Some(phase) => run.phase = phase,
                        None => return self.finish(pose),
                    }
                }
                Phase::FacingTarget {
                    from,
                    to,
                    elapsed,
                    duration,
                } => {
                    let (used, done) = consume(remaining, *duration - *elapsed, f32::INFINITY);
                    *elapsed += used;
                    remaining -= used;
                    if !done {
                        pose.rotation = from.slerp(*to, *elapsed / *duration);
                        return false;
                    }
                    pose.rotation = *to;
                    return self.finish(pose);
                }
            }
        }
    }

    /// Drop a cancelled run immediately.
    pub fn settle(&mut self) {
        if self.run.as_ref().is_some_and(|run| run.token.is_cancelled()) {
            self.run = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.token.is_cancelled())
    }

    pub fn state(&self) -> NavigationState {
        match self.run.as_ref().map(|run| &run.phase) {
            None => NavigationState::Idle,
            Some(Phase::Rotating { .. }) => NavigationState::Rotating,
            Some(Phase::Translating { .. }) => NavigationState::Translating,
            Some(Phase::FacingTarget { .. }) => NavigationState::FacingTarget,
        }
    }

    fn finish(&mut self, pose: &BodyPose) -> bool {
        info!(position = ?pose.position, "navigation arrived");
        self.run = None;
        true
    }
}

/// Split `remaining` against what is left of the phase and of the window.
/// Returns the time used and whether the phase is over.
fn consume(remaining: f32, phase_left: f32, cap_left: f32) -> (f32, bool) {
    let limit = phase_left.min(cap_left).max(0.0);
    if remaining >= limit {
        (limit, true)
    } else {
        (remaining, false)
    }
}

fn heading_between(from: Vec3, to: Vec3) -> Option<Vec3> {
    let delta = (to - from).flat();
    if delta.length_squared() < TANGENT_MIN_SQR {
        return None;
    }
    delta.normalized()
}

fn translation_phase(run: &Run, pose: &BodyPose, curve_height: f32) -> Phase {
    let target = run.plan.target.with_y(pose.position.y);
    let duration = (run.window - run.total).max(MIN_TRANSLATION_SECS);
    debug!(duration, "navigation translating");
    Phase::Translating {
        curve: PathCurve::new(run.plan.path, pose.position, target, curve_height),
        height: pose.position.y,
        last_direction: pose.forward_flat(),
        elapsed: 0.0,
        duration,
    }
}

fn facing_phase(look_at: Option<Vec3>, pose: &BodyPose, duration: f32) -> Option<Phase> {
    let offset = (look_at? - pose.position).flat();
    if offset.length_squared() <= FACING_MIN_SQR {
        return None;
    }
    let to = Quaternion::look_rotation(offset)?;
    if pose.rotation.angle_deg(to) < FACING_MIN_ANGLE_DEG {
        return None;
    }
    Some(Phase::FacingTarget {
        from: pose.rotation,
        to,
        elapsed: 0.0,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> (NavigationTimeline, PauseSignal) {
        let pause = PauseSignal::new();
        (NavigationTimeline::new(NavigationConfig::default(), pause.clone()), pause)
    }

    fn plan(target: Vec3, speed_scale: f32) -> NavigationPlan {
        NavigationPlan {
            target,
            path: PathKind::Straight,
            speed_scale,
            look_at: None,
        }
    }

    fn run_to_end(nav: &mut NavigationTimeline, pose: &mut BodyPose, dt: f32) -> usize {
        for i in 0..1000 {
            if nav.tick(dt, pose) {
                return i + 1;
            }
        }
        panic!("navigation never finished");
    }

    #[test]
    fn close_target_does_not_start() {
        let (mut nav, _) = timeline();
        let pose = BodyPose::default();
        assert!(!nav.start(plan(Vec3::new(0.05, 0.0, 0.0), 1.0), &pose, CancelToken::new()));
        assert_eq!(nav.state(), NavigationState::Idle);
    }

    #[test]
    fn straight_run_arrives_exactly() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::new(Vec3::new(0.0, 1.0, 0.0), Quaternion::identity());
        assert!(nav.start(plan(Vec3::new(0.0, 3.0, 5.0), 1.0), &pose, CancelToken::new()));
        assert_eq!(nav.state(), NavigationState::Rotating);
        run_to_end(&mut nav, &mut pose, 0.1);
        assert_eq!(pose.position, Vec3::new(0.0, 1.0, 5.0));
        assert!(!nav.is_active());
    }

    #[test]
    fn rotation_is_interpolated() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::default();
        nav.start(plan(Vec3::new(5.0, 0.0, 0.0), 1.0), &pose, CancelToken::new());
        // Rotation budget is 1.5 s; halfway the body faces 45° right.
        nav.tick(0.75, &mut pose);
        let fwd = pose.forward_flat();
        assert!((fwd.x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert_eq!(pose.position, Vec3::zero());
        assert_eq!(nav.state(), NavigationState::Rotating);
    }

    #[test]
    fn one_large_tick_runs_every_phase() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::default();
        nav.start(plan(Vec3::new(2.0, 0.0, 2.0), 1.0), &pose, CancelToken::new());
        assert!(nav.tick(10.0, &mut pose));
        assert_eq!(pose.position, Vec3::new(2.0, 0.0, 2.0));
    }

    #[test]
    fn pause_freezes_motion_phases() {
        let (mut nav, pause) = timeline();
        let mut pose = BodyPose::default();
        nav.start(plan(Vec3::new(0.0, 0.0, 4.0), 1.0), &pose, CancelToken::new());
        nav.tick(2.0, &mut pose);
        assert_eq!(nav.state(), NavigationState::Translating);
        let frozen = pose;

        pause.set();
        assert!(!nav.tick(3.0, &mut pose));
        assert_eq!(pose, frozen);

        pause.clear();
        nav.tick(0.5, &mut pose);
        assert!(pose.position.z > frozen.position.z);
    }

    #[test]
    fn slow_runs_are_capped_by_the_decision_window() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::default();
        // Speed 0.2 asks for a 25 s window; motion still ends at 5 s.
        nav.start(plan(Vec3::new(3.0, 0.0, 0.0), 0.2), &pose, CancelToken::new());
        let ticks = run_to_end(&mut nav, &mut pose, 0.5);
        assert_eq!(ticks, 10);
        assert_eq!(pose.position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn cancelled_run_leaves_pose_untouched() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::default();
        let token = CancelToken::new();
        nav.start(plan(Vec3::new(0.0, 0.0, 4.0), 1.0), &pose, token.clone());
        nav.tick(2.5, &mut pose);
        let snapshot = pose;

        token.cancel();
        assert!(!nav.is_active());
        assert!(!nav.tick(1.0, &mut pose));
        assert_eq!(pose, snapshot);
        assert_eq!(nav.state(), NavigationState::Idle);
    }

    #[test]
    fn settle_drops_cancelled_run() {
        let (mut nav, _) = timeline();
        let pose = BodyPose::default();
        let token = CancelToken::new();
        nav.start(plan(Vec3::new(0.0, 0.0, 4.0), 1.0), &pose, token.clone());
        token.cancel();
        nav.settle();
        assert_eq!(nav.state(), NavigationState::Idle);
    }

    #[test]
    fn faces_look_at_point_after_arrival() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::default();
        let mut p = plan(Vec3::new(0.0, 0.0, 2.0), 1.0);
        p.look_at = Some(Vec3::new(3.0, 0.0, 2.0));
        nav.start(p, &pose, CancelToken::new());

        nav.tick(5.0, &mut pose);
        assert_eq!(nav.state(), NavigationState::FacingTarget);
        run_to_end(&mut nav, &mut pose, 0.1);
        let fwd = pose.forward_flat();
        assert!((fwd.x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn s_curve_keeps_height_and_arrives() {
        let (mut nav, _) = timeline();
        let mut pose = BodyPose::new(Vec3::new(0.0, 0.7, 0.0), Quaternion::identity());
        let mut p = plan(Vec3::new(0.0, 0.7, 4.0), 1.0);
        p.path = PathKind::SCurve;
        nav.start(p, &pose, CancelToken::new());
        let mut swerved = false;
        for _ in 0..100 {
            let done = nav.tick(0.1, &mut pose);
            assert_eq!(pose.position.y, 0.7);
            swerved |= pose.position.x.abs() > 0.01;
            if done {
                break;
            }
        }
        assert!(swerved);
        assert_eq!(pose.position, Vec3::new(0.0, 0.7, 4.0));
    }
}
