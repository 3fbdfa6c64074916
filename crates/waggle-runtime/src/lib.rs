//! `waggle-runtime` – the decision execution engine.
//!
//! Turns decisions from the reasoning service into body motion and limb
//! gestures, one simulated tick at a time.
//!
//! # Modules
//!
//! - [`controller`] – [`DecisionController`]: preempts the running decision,
//!   applies the FOV constraint and starts both timelines.
//! - [`action_timeline`] – gesture playback on a
//!   [`LimbActuator`][waggle_hal::LimbActuator].
//! - [`navigation`] – rotate / translate / face state machine over the body
//!   pose, with [`path`] providing straight and S-curve trajectories.
//! - [`memory`] – [`DecisionMemory`]: the last few decision reasons.
//! - [`prompt`] – builds the request conversation from memory and perception.
//! - [`llm_driver`] – [`DecisionSource`] and its OpenAI-compatible
//!   [`LlmDriver`].
//! - [`agent_loop`] – [`AgentLoop`]: single-flight requests, response
//!   decoding and the tick loop.
//! - [`events`] – [`EventBus`] for [`EngineEvent`][waggle_types::EngineEvent]s.
//! - [`config`] – [`EngineConfig`] and its tables.
//! - [`telemetry`] – [`init_tracing`].
//!
//! All engine state is advanced from a single thread; the only concurrent
//! piece is the request task spawned by the agent loop.

pub mod action_timeline;
pub mod agent_loop;
pub mod config;
pub mod controller;
pub mod events;
pub mod llm_driver;
pub mod memory;
pub mod navigation;
pub mod path;
pub mod prompt;
pub mod signal;
pub mod telemetry;

pub use action_timeline::{ActionTimeline, ActionTimelineState, GestureFault};
pub use agent_loop::AgentLoop;
pub use config::{
    ActionConfig, AgentConfig, ControllerConfig, EngineConfig, FovConfig, MIN_REQUEST_INTERVAL_SECS,
    NavigationConfig,
};
pub use controller::{DecisionController, ExecutionReport};
pub use events::EventBus;
pub use llm_driver::{ChatMessage, DecisionSource, LlmDriver, LlmError, RESPONSE_FORMAT_RULES, Role};
pub use memory::DecisionMemory;
pub use navigation::{NavigationPlan, NavigationState, NavigationTimeline};
pub use path::PathCurve;
pub use signal::{CancelToken, PauseSignal};
pub use telemetry::{TracerProviderGuard, init_tracing};
