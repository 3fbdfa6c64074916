//! [`DecisionController`] – owns the body and both timelines.
//!
//! A new decision always preempts the running one.  Both timelines are
//! cancelled (navigation first) and settled before anything else is read, so
//! the previous run can never touch the pose or the limbs again.  The new
//! target is then height-locked, pushed into the reference actor's field of
//! view when needed, nudged away from the body if it is too close, and
//! handed to the timelines.
//!
//! The controller is advanced by [`DecisionController::tick`]: gestures
//! first, then navigation, so a Wait that starts this tick already holds the
//! body still.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use uuid::Uuid;
use waggle_hal::LimbActuator;
use waggle_perception::{FovConstraint, FovOutcome};
use waggle_types::{BodyPose, Decision, EngineEventKind, ReferenceActorSnapshot, Vec3};

use crate::action_timeline::{ActionTimeline, ActionTimelineState};
use crate::config::EngineConfig;
use crate::events::EventBus;
use crate::memory::DecisionMemory;
use crate::navigation::{NavigationPlan, NavigationState, NavigationTimeline};
use crate::signal::{CancelToken, PauseSignal};

const SOURCE: &str = "waggle-runtime::controller";
const MIN_SEPARATION_FLOOR: f32 = 0.01;
const MIN_NUDGE: f32 = 0.1;

/// What [`DecisionController::execute_decision`] did with a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub decision_id: Uuid,
    /// Decision that was running and got cancelled.
    pub preempted: Option<Uuid>,
    /// Final navigation target after height lock, FOV and nudge.
    pub target: Vec3,
    /// `None` when the FOV solver did not run.
    pub fov: Option<FovOutcome>,
    pub navigating: bool,
    pub gestures: usize,
}

/// Executes decisions on a body with limbs `A`.
pub struct DecisionController<A: LimbActuator> {
    limbs: A,
    pose: BodyPose,
    pause: PauseSignal,
    actions: ActionTimeline,
    navigation: NavigationTimeline,
    action_token: CancelToken,
    navigation_token: CancelToken,
    memory: DecisionMemory,
    fov: Option<FovConstraint>,
    min_separation: f32,
    rng: StdRng,
    current: Option<Uuid>,
    bus: Option<EventBus>,
}

impl<A: LimbActuator> DecisionController<A> {
    pub fn new(config: &EngineConfig, limbs: A, pose: BodyPose) -> Self {
        let pause = PauseSignal::new();
        Self {
            limbs,
            pose,
            actions: ActionTimeline::new(config.actions.clone(), pause.clone()),
            navigation: NavigationTimeline::new(config.navigation.clone(), pause.clone()),
            pause,
            action_token: CancelToken::new(),
            navigation_token: CancelToken::new(),
            memory: DecisionMemory::new(config.controller.memory_capacity, config.controller.repeat_threshold),
            fov: config.fov.enabled.then(|| config.fov.constraint()),
            min_separation: config.controller.min_move_separation,
            rng: StdRng::from_rng(&mut rand::rng()),
            current: None,
            bus: None,
        }
    }

    /// Publish engine events on `bus`.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Make FOV resampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn pose(&self) -> &BodyPose {
        &self.pose
    }

    pub fn limbs(&self) -> &A {
        &self.limbs
    }

    pub fn memory(&self) -> &DecisionMemory {
        &self.memory
    }

    pub fn current_decision(&self) -> Option<Uuid> {
        self.current
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigation.state()
    }

    pub fn action_state(&self) -> ActionTimelineState {
        self.actions.state()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_set()
    }

    /// `true` while either timeline is still running.
    pub fn is_busy(&self) -> bool {
        self.actions.is_active() || self.navigation.is_active()
    }

    // ── Execution ────────────────────────────────────────────────────────────

    /// Preempt whatever is running and start `decision`.
    pub fn execute_decision(&mut self, decision: &Decision, reference: &ReferenceActorSnapshot) -> ExecutionReport {
        let preempted = if self.is_busy() { self.current } else { None };
        self.navigation_token.cancel();
        self.action_token.cancel();
        self.navigation.settle();
        self.actions.settle();
        if let Some(previous) = preempted {
            info!(%previous, next = %decision.id, "decision preempted");
            self.emit(EngineEventKind::Preempted {
                previous,
                next: decision.id,
            });
        }

        let mut target = decision.target.with_y(self.pose.position.y);
        let fov = match self.fov {
            Some(constraint) if reference.is_interactable() => {
                let outcome = constraint.enforce(target, reference, decision.fov_side, &mut self.rng);
                if let FovOutcome::Corrected { from, to } = outcome {
                    debug!(?from, ?to, side = ?decision.fov_side, "target moved into reference view");
                    self.emit(EngineEventKind::FovCorrected {
                        from,
                        to,
                        side: decision.fov_side,
                    });
                }
                target = outcome.position();
                Some(outcome)
            }
            _ => None,
        };

        let separation = self.min_separation.max(MIN_SEPARATION_FLOOR);
        if self.pose.position.flat_distance(target) < separation {
            target = self.pose.position + self.pose.forward_flat() * self.min_separation.max(MIN_NUDGE);
            debug!(?target, "target too close, nudged forward");
        }

        self.action_token = CancelToken::new();
        self.navigation_token = CancelToken::new();
        let head_target = reference.valid.then_some(reference.position);
        self.actions
            .start(&decision.sequence, head_target, self.action_token.clone());
        let navigating = self.navigation.start(
            NavigationPlan {
                target,
                path: decision.path,
                speed_scale: decision.speed_scale,
                look_at: reference.is_interactable().then_some(reference.position),
            },
            &self.pose,
            self.navigation_token.clone(),
        );

        self.memory.push(&decision.reason);
        self.current = Some(decision.id);
        info!(
            id = %decision.id,
            ?target,
            path = ?decision.path,
            steps = decision.sequence.len(),
            "decision started"
        );
        self.emit(EngineEventKind::DecisionStarted {
            decision_id: decision.id,
            target,
            path: decision.path,
            steps: decision.sequence.len(),
        });

        ExecutionReport {
            decision_id: decision.id,
            preempted,
            target,
            fov,
            navigating,
            gestures: decision.sequence.len(),
        }
    }

    /// Advance gestures, then navigation, by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let faults = self.actions.tick(dt, &self.pose, &mut self.limbs);
        for fault in faults {
            self.emit(EngineEventKind::GestureDegraded {
                step_index: fault.step_index,
                kind: fault.kind,
                details: fault.error.to_string(),
            });
        }
        if self.navigation.tick(dt, &mut self.pose) {
            self.emit(EngineEventKind::NavigationArrived {
                position: self.pose.position,
            });
        }
    }

    fn emit(&self, kind: EngineEventKind) {
        if let Some(bus) = &self.bus {
            bus.emit(SOURCE, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waggle_hal::{LimbRig, SimRig};
    use waggle_types::{FovSide, GestureKind, GestureSequence, GestureStep, PathKind, Quaternion};

    fn decision(target: Vec3, reason: &str) -> Decision {
        Decision {
            id: Uuid::new_v4(),
            target,
            speed_scale: 1.0,
            sequence: GestureSequence::new(vec![GestureStep::with_angles(GestureKind::Look, 0.0, 10.0, 5.0)]),
            path: PathKind::Straight,
            reason: reason.to_string(),
            fov_side: FovSide::Inside,
        }
    }

    fn controller() -> DecisionController<LimbRig> {
        DecisionController::new(&EngineConfig::default(), SimRig::complete(), BodyPose::default()).with_seed(7)
    }

    #[test]
    fn preemption_freezes_body_until_next_tick() {
        let mut ctl = controller();
        let a = decision(Vec3::new(0.0, 0.0, 4.0), "go ahead");
        ctl.execute_decision(&a, &ReferenceActorSnapshot::absent());
        // 1.5 s rotation, then 40 % of the 3.5 s translation.
        ctl.tick(1.5);
        ctl.tick(1.4);
        assert_eq!(ctl.navigation_state(), NavigationState::Translating);
        let snapshot = *ctl.pose();
        assert!((snapshot.position.z - 1.6).abs() < 1e-3);

        let b = decision(Vec3::new(4.0, 0.0, 1.6), "go right");
        let report = ctl.execute_decision(&b, &ReferenceActorSnapshot::absent());
        assert_eq!(report.preempted, Some(a.id));
        assert_eq!(*ctl.pose(), snapshot);
        assert_eq!(ctl.navigation_state(), NavigationState::Rotating);

        // B turns in place first; the position stays at A's snapshot.
        ctl.tick(0.5);
        assert_eq!(ctl.pose().position, snapshot.position);
        assert_ne!(ctl.pose().rotation, snapshot.rotation);
    }

    #[test]
    fn target_height_is_locked_to_body() {
        let mut ctl = DecisionController::new(
            &EngineConfig::default(),
            SimRig::complete(),
            BodyPose::new(Vec3::new(0.0, 0.5, 0.0), Quaternion::identity()),
        );
        let report = ctl.execute_decision(&decision(Vec3::new(1.0, 9.0, 1.0), ""), &ReferenceActorSnapshot::absent());
        assert_eq!(report.target, Vec3::new(1.0, 0.5, 1.0));
        assert!(report.fov.is_none());
    }

    #[test]
    fn target_on_top_of_body_is_nudged_forward() {
        let mut ctl = controller();
        let report = ctl.execute_decision(&decision(Vec3::zero(), ""), &ReferenceActorSnapshot::absent());
        assert!(report.navigating);
        assert!((report.target - Vec3::new(0.0, 0.0, 0.3)).length() < 1e-5);
        ctl.tick(10.0);
        assert!((ctl.pose().position - Vec3::new(0.0, 0.0, 0.3)).length() < 1e-5);
    }

    #[test]
    fn interactable_approach_lands_inside_the_cone() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let mut ctl = controller().with_bus(bus);
        // The body stands directly behind the reference actor.
        let reference = ReferenceActorSnapshot::new(Vec3::new(2.0, 0.0, 0.0), Vec3::RIGHT, true).unwrap();
        let fov = FovConstraint::default();
        assert!(!fov.validate(Vec3::zero(), &reference).inside);

        let mut d = decision(Vec3::zero(), "fov:inside greet");
        d.fov_side = FovSide::Inside;
        let report = ctl.execute_decision(&d, &reference);
        assert!(matches!(report.fov, Some(FovOutcome::Corrected { .. })));
        let check = fov.validate(report.target, &reference);
        assert!(check.ok && check.inside);
        assert!(report.target.flat_distance(reference.position) <= 2.0 + 1e-3);

        let mut saw_correction = false;
        while let Ok(event) = events.try_recv() {
            saw_correction |= matches!(event.kind, EngineEventKind::FovCorrected { .. });
        }
        assert!(saw_correction);
    }

    #[test]
    fn non_interactable_reference_skips_fov() {
        let mut ctl = controller();
        let reference = ReferenceActorSnapshot::new(Vec3::new(2.0, 0.0, 0.0), Vec3::RIGHT, false).unwrap();
        let report = ctl.execute_decision(&decision(Vec3::new(0.0, 0.0, 2.0), ""), &reference);
        assert!(report.fov.is_none());
        assert_eq!(report.target, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn disabled_fov_keeps_target() {
        let mut config = EngineConfig::default();
        config.fov.enabled = false;
        let mut ctl = DecisionController::new(&config, SimRig::complete(), BodyPose::default());
        let reference = ReferenceActorSnapshot::new(Vec3::new(2.0, 0.0, 0.0), Vec3::RIGHT, true).unwrap();
        let report = ctl.execute_decision(&decision(Vec3::new(0.0, 0.0, 2.0), ""), &reference);
        assert!(report.fov.is_none());
    }

    #[test]
    fn reasons_are_remembered() {
        let mut ctl = controller();
        ctl.execute_decision(&decision(Vec3::new(0.0, 0.0, 1.0), "first"), &ReferenceActorSnapshot::absent());
        ctl.execute_decision(&decision(Vec3::new(0.0, 0.0, 2.0), "second"), &ReferenceActorSnapshot::absent());
        assert_eq!(ctl.memory().reasons().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn finished_decision_is_not_reported_as_preempted() {
        let mut ctl = controller();
        ctl.execute_decision(&decision(Vec3::new(0.0, 0.0, 1.0), ""), &ReferenceActorSnapshot::absent());
        ctl.tick(6.0);
        assert!(!ctl.is_busy());
        let report = ctl.execute_decision(&decision(Vec3::new(0.0, 0.0, 2.0), ""), &ReferenceActorSnapshot::absent());
        assert_eq!(report.preempted, None);
    }
}
