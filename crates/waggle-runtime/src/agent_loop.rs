//! [`AgentLoop`] – perceive, ask, execute.
//!
//! The loop glues the pieces together around a simulated clock:
//!
//! 1. **Observe** – [`AgentLoop::observe`] parses the latest perception text.
//! 2. **Ask** – [`AgentLoop::request_decision`] builds the prompt and spawns
//!    the request on the tokio runtime.  Only one request is ever in flight.
//! 3. **Execute** – [`AgentLoop::tick`] picks up a finished request, decodes
//!    it and hands it to the [`DecisionController`], then advances both
//!    timelines.
//!
//! The timelines never wait on the network: a slow or failing request
//! leaves whatever is running untouched.  In auto mode the next request is
//! issued once the previous one completed and the minimum interval (in
//! simulated seconds) has passed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waggle_hal::SimRig;
//! use waggle_runtime::{AgentLoop, EngineConfig, LlmDriver};
//! use waggle_types::BodyPose;
//!
//! # async fn demo() -> Result<(), waggle_types::WaggleError> {
//! let driver = Arc::new(LlmDriver::new("http://localhost:11434", "llama3"));
//! let mut agent = AgentLoop::new(&EngineConfig::default(), SimRig::complete(), BodyPose::default(), driver)?;
//! agent.observe("[perception|count=0]");
//! agent.request_decision()?;
//! agent.run_for(5.0, 30.0).await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use waggle_hal::LimbActuator;
use waggle_perception::{FovConstraint, PerceptionSnapshot, SnapshotReader};
use waggle_protocol::decode_response;
use waggle_types::{BodyPose, EngineEvent, EngineEventKind, WaggleError};

use crate::config::{AgentConfig, EngineConfig};
use crate::controller::{DecisionController, ExecutionReport};
use crate::events::EventBus;
use crate::llm_driver::{ChatMessage, DecisionSource, LlmError};
use crate::prompt::{PromptContext, build_messages};

const SOURCE: &str = "waggle-runtime::agent_loop";
const MIN_TICK_HZ: f32 = 1.0;

type PendingReply = oneshot::Receiver<Result<String, LlmError>>;

/// Owns the controller and the request channel.
pub struct AgentLoop<A: LimbActuator> {
    controller: DecisionController<A>,
    source: Arc<dyn DecisionSource>,
    reader: SnapshotReader,
    snapshot: PerceptionSnapshot,
    pending: Option<PendingReply>,
    agent: AgentConfig,
    fov: Option<FovConstraint>,
    /// Simulated seconds since construction.
    clock: f32,
    last_completed: Option<f32>,
    bus: EventBus,
}

impl<A: LimbActuator> AgentLoop<A> {
    /// Build a loop around `limbs` starting at `pose`.
    ///
    /// # Errors
    ///
    /// Returns [`WaggleError::Config`] if the configured reference tag
    /// produces an invalid perception pattern.
    pub fn new(
        config: &EngineConfig,
        limbs: A,
        pose: BodyPose,
        source: Arc<dyn DecisionSource>,
    ) -> Result<Self, WaggleError> {
        let reader = SnapshotReader::new(&config.agent.reference_tag)
            .map_err(|e| WaggleError::Config(format!("reference tag: {e}")))?;
        let bus = EventBus::default();
        Ok(Self {
            controller: DecisionController::new(config, limbs, pose).with_bus(bus.clone()),
            source,
            reader,
            snapshot: PerceptionSnapshot::empty(),
            pending: None,
            agent: config.agent.clone(),
            fov: config.fov.enabled.then(|| config.fov.constraint()),
            clock: 0.0,
            last_completed: None,
            bus,
        })
    }

    /// Seed the FOV resampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.controller = self.controller.with_seed(seed);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn controller(&self) -> &DecisionController<A> {
        &self.controller
    }

    pub fn snapshot(&self) -> &PerceptionSnapshot {
        &self.snapshot
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn is_request_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_auto_request(&mut self, enabled: bool) {
        self.agent.auto_request = enabled;
    }

    pub fn auto_request(&self) -> bool {
        self.agent.auto_request
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    // ── Observe / ask ────────────────────────────────────────────────────────

    /// Replace the current perception with `text`.
    pub fn observe(&mut self, text: &str) {
        self.snapshot = self.reader.read(text);
        debug!(
            entities = ?self.snapshot.entity_count,
            reference = self.snapshot.reference.valid,
            "perception updated"
        );
    }

    /// Conversation that the next request would send.
    pub fn prompt(&self) -> Vec<ChatMessage> {
        build_messages(&PromptContext {
            memory: self.controller.memory(),
            position: self.controller.pose().position,
            snapshot: &self.snapshot,
            fov: self.fov,
            reference_tag: &self.agent.reference_tag,
        })
    }

    /// Spawn a decision request.
    ///
    /// Returns `Ok(false)` without doing anything while another request is
    /// still outstanding.
    ///
    /// # Errors
    ///
    /// Returns [`WaggleError::RequestChannelFailure`] when called outside a
    /// tokio runtime.
    pub fn request_decision(&mut self) -> Result<bool, WaggleError> {
        if self.pending.is_some() {
            debug!("decision request already in flight");
            return Ok(false);
        }
        let handle = Handle::try_current().map_err(|e| WaggleError::RequestChannelFailure(e.to_string()))?;
        let messages = self.prompt();
        let source = Arc::clone(&self.source);
        let (tx, rx) = oneshot::channel();
        handle.spawn(async move {
            let reply = source.submit(messages).await;
            // The loop may have been dropped meanwhile; nothing to do then.
            let _ = tx.send(reply);
        });
        self.pending = Some(rx);
        info!(clock = self.clock, "decision requested");
        Ok(true)
    }

    // ── Execute ──────────────────────────────────────────────────────────────

    /// Decode `text` and execute it.
    ///
    /// # Errors
    ///
    /// Returns [`WaggleError::MalformedDecision`] when the response does not
    /// decode; the running timelines are left untouched.
    pub fn apply_response(&mut self, text: &str) -> Result<ExecutionReport, WaggleError> {
        match decode_response(text) {
            Ok(decision) => Ok(self.controller.execute_decision(&decision, &self.snapshot.reference)),
            Err(e) => {
                let error = WaggleError::from(e);
                warn!(error = %error, "decision rejected");
                self.bus.emit(
                    SOURCE,
                    EngineEventKind::DecisionRejected {
                        details: error.to_string(),
                    },
                );
                Err(error)
            }
        }
    }

    /// Advance the simulated clock by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.clock += dt.max(0.0);
        self.poll_request();
        self.controller.tick(dt);

        if self.agent.auto_request && self.pending.is_none() && self.interval_elapsed() {
            if let Err(e) = self.request_decision() {
                warn!(error = %e, "automatic decision request failed");
            }
        }
    }

    /// Tick at `tick_hz` in real time for `secs` seconds.
    pub async fn run_for(&mut self, secs: f32, tick_hz: f32) {
        let hz = tick_hz.max(MIN_TICK_HZ);
        let dt = 1.0 / hz;
        let ticks = (secs.max(0.0) * hz).round() as u64;
        let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        for _ in 0..ticks {
            interval.tick().await;
            self.tick(dt);
        }
    }

    fn interval_elapsed(&self) -> bool {
        self.last_completed
            .is_none_or(|at| self.clock - at >= self.agent.effective_interval())
    }

    fn poll_request(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };
        let reply = match rx.try_recv() {
            Ok(reply) => reply,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(LlmError::BadResponse("request task ended without a reply".into()))
            }
        };
        self.pending = None;
        self.last_completed = Some(self.clock);

        match reply {
            Ok(text) => {
                // Rejections are already logged and published.
                let _ = self.apply_response(&text);
            }
            Err(e) => {
                let error = WaggleError::from(e);
                warn!(error = %error, "decision request failed");
                self.bus.emit(
                    SOURCE,
                    EngineEventKind::RequestFailed {
                        details: error.to_string(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use waggle_hal::{LimbRig, SimRig};
    use waggle_types::Vec3;

    use super::*;
    use crate::action_timeline::ActionTimelineState;
    use crate::navigation::NavigationState;

    const GOOD: &str = "fov:inside walk over and wave\n1.0,0.0,2.0,1.0,wait:1.0,wave:25:80:2.0,look:15:25:2.0,straight";

    struct Scripted {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(details: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(details.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DecisionSource for Scripted {
        async fn submit(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
            assert!(!messages.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(details) => Err(LlmError::BadResponse(details.clone())),
            }
        }
    }

    fn agent(source: Arc<Scripted>, config: &EngineConfig) -> AgentLoop<LimbRig> {
        AgentLoop::new(config, SimRig::complete(), BodyPose::default(), source)
            .unwrap()
            .with_seed(1)
    }

    async fn settle(agent: &mut AgentLoop<LimbRig>) {
        for _ in 0..100 {
            if !agent.is_request_pending() {
                return;
            }
            tokio::task::yield_now().await;
            agent.tick(0.0);
        }
        panic!("request never completed");
    }

    #[test]
    fn applies_a_valid_response() {
        let mut agent = agent(Scripted::ok(GOOD), &EngineConfig::default());
        let report = agent.apply_response(GOOD).unwrap();
        assert_eq!(report.gestures, 3);
        assert_eq!(report.target, Vec3::new(1.0, 0.0, 2.0));
        assert!(agent.controller().is_busy());
        assert_eq!(agent.controller().memory().len(), 1);
    }

    #[test]
    fn malformed_sequence_leaves_running_decision_alone() {
        let mut agent = agent(Scripted::ok(GOOD), &EngineConfig::default());
        let mut events = agent.subscribe();
        let first = agent.apply_response(GOOD).unwrap();
        agent.tick(2.0);
        let pose = *agent.controller().pose();
        let nav = agent.controller().navigation_state();
        let actions = agent.controller().action_state();

        let err = agent
            .apply_response("too short\n0,0,3,1.0,wait:2.0,wave:30:1.0,straight")
            .unwrap_err();
        assert!(matches!(err, WaggleError::MalformedDecision(_)));
        assert_eq!(*agent.controller().pose(), pose);
        assert_eq!(agent.controller().navigation_state(), nav);
        assert_eq!(agent.controller().action_state(), actions);
        assert_eq!(agent.controller().current_decision(), Some(first.decision_id));
        assert_eq!(agent.controller().memory().len(), 1);

        let mut rejected = false;
        while let Ok(event) = events.try_recv() {
            rejected |= matches!(event.kind, EngineEventKind::DecisionRejected { .. });
        }
        assert!(rejected);
    }

    #[test]
    fn request_outside_runtime_is_a_channel_failure() {
        let mut agent = agent(Scripted::ok(GOOD), &EngineConfig::default());
        let err = agent.request_decision().unwrap_err();
        assert!(matches!(err, WaggleError::RequestChannelFailure(_)));
        assert!(!agent.is_request_pending());
    }

    #[tokio::test]
    async fn request_is_single_flight_and_applied_on_tick() {
        let source = Scripted::ok(GOOD);
        let mut agent = agent(Arc::clone(&source), &EngineConfig::default());
        agent.observe("[perception|count=0]");

        assert!(agent.request_decision().unwrap());
        assert!(!agent.request_decision().unwrap());
        settle(&mut agent).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(agent.controller().current_decision().is_some());
        assert_eq!(agent.controller().navigation_state(), NavigationState::Rotating);
        assert_eq!(agent.controller().action_state(), ActionTimelineState::RunningStep(0));
    }

    #[tokio::test]
    async fn failed_request_keeps_timelines_and_reports() {
        let mut agent = agent(Scripted::failing("server down"), &EngineConfig::default());
        let mut events = agent.subscribe();
        agent.apply_response(GOOD).unwrap();
        agent.tick(1.0);
        let pose = *agent.controller().pose();

        agent.request_decision().unwrap();
        settle(&mut agent).await;

        assert_eq!(*agent.controller().pose(), pose);
        assert!(agent.controller().is_busy());
        let mut failed = false;
        while let Ok(event) = events.try_recv() {
            failed |= matches!(event.kind, EngineEventKind::RequestFailed { ref details } if details.contains("server down"));
        }
        assert!(failed);
    }

    #[tokio::test]
    async fn auto_mode_respects_request_interval() {
        let mut config = EngineConfig::default();
        config.agent.auto_request = true;
        config.agent.request_interval_secs = 1.0;
        let source = Scripted::ok(GOOD);
        let mut agent = agent(Arc::clone(&source), &config);

        agent.tick(0.1);
        assert!(agent.is_request_pending());
        settle(&mut agent).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Completed just now: no new request until a simulated second passes.
        agent.tick(0.5);
        assert!(!agent.is_request_pending());
        agent.tick(0.6);
        assert!(agent.is_request_pending());
    }

    #[tokio::test]
    async fn observe_picks_up_reference_actor() {
        let mut agent = agent(Scripted::ok(GOOD), &EngineConfig::default());
        agent.observe(
            "[perception|count=1]\n1) Alice(Human) at (2.0,0.0,1.0) dist 2.2m bearing +63° state=Interactable facing=(-1.00,0.00,0.00)",
        );
        assert!(agent.snapshot().reference.is_interactable());
        assert_eq!(agent.snapshot().entity_count, Some(1));
        assert!(agent.prompt()[1].content.contains("Alice(Human)"));
    }

    #[tokio::test]
    async fn run_for_advances_the_clock() {
        let mut agent = agent(Scripted::ok(GOOD), &EngineConfig::default());
        agent.apply_response(GOOD).unwrap();
        agent.run_for(0.2, 50.0).await;
        assert!((agent.clock() - 0.2).abs() < 1e-3);
        assert!(agent.controller().is_busy());
    }
}
