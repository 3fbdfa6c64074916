//! Gesture playback.
//!
//! [`ActionTimeline`] walks a [`GestureSequence`] step by step as
//! [`ActionTimeline::tick`] advances time.  Each step interpolates from the
//! actuator values captured when it began and snaps to its target when its
//! duration runs out; time left over flows into the next step so the whole
//! sequence takes exactly its total duration.
//!
//! Actuator failures never shorten a step.  The first failure of each step is
//! logged and returned as a [`GestureFault`]; the step then simply holds for
//! the rest of its duration.

use tracing::{debug, warn};
use waggle_hal::{AnglePair, LimbActuator};
use waggle_types::{BodyPose, GestureKind, GestureSequence, GestureStep, Vec3, WaggleError, lerp_angle};

use crate::config::ActionConfig;
use crate::signal::{CancelToken, PauseSignal};

/// Observable state of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTimelineState {
    Idle,
    RunningStep(usize),
    /// The last sequence played to the end.
    Done,
}

/// A step that could not drive its actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureFault {
    pub step_index: usize,
    pub kind: GestureKind,
    pub error: WaggleError,
}

#[derive(Debug)]
struct Run {
    steps: Vec<GestureStep>,
    head_target: Option<Vec3>,
    token: CancelToken,
    index: usize,
    elapsed: f32,
    started: bool,
    start_wave: AnglePair,
    start_look: AnglePair,
    faulted: bool,
    pausing: bool,
}

/// Plays gesture sequences on a [`LimbActuator`].
#[derive(Debug)]
pub struct ActionTimeline {
    config: ActionConfig,
    pause: PauseSignal,
    run: Option<Run>,
    completed: bool,
}

impl ActionTimeline {
    pub fn new(config: ActionConfig, pause: PauseSignal) -> Self {
        Self {
            config,
            pause,
            run: None,
            completed: false,
        }
    }

    /// Begin playing `sequence`, replacing any previous run.
    ///
    /// `head_target` is the point HeadLookAtHuman steps track.  An empty
    /// sequence leaves the timeline idle.
    pub fn start(&mut self, sequence: &GestureSequence, head_target: Option<Vec3>, token: CancelToken) {
        self.release();
        self.completed = false;
        if sequence.is_empty() {
            return;
        }
        debug!(steps = sequence.len(), "gesture sequence started");
        self.run = Some(Run {
            steps: sequence.steps().to_vec(),
            head_target,
            token,
            index: 0,
            elapsed: 0.0,
            started: false,
            start_wave: AnglePair::default(),
            start_look: AnglePair::default(),
            faulted: false,
            pausing: false,
        });
    }

    /// Advance playback by `dt` seconds.
    ///
    /// Returns the faults raised during this tick (at most one per step).
    pub fn tick(&mut self, dt: f32, body: &BodyPose, limbs: &mut dyn LimbActuator) -> Vec<GestureFault> {
        let mut faults = Vec::new();
        let Some(run) = self.run.as_mut() else {
            return faults;
        };
        if run.token.is_cancelled() {
            self.release();
            return faults;
        }

        let turn = self.config.head_turn();
        let cycles = self.config.continuous_wave_cycles.max(1);
        let peak = self.config.continuous_wave_peak_deg;
        let mut remaining = dt.max(0.0);

        while let Some(step) = run.steps.get(run.index).copied() {
            if !run.started {
                run.started = true;
                run.faulted = false;
                run.start_wave = limbs.wave();
                run.start_look = limbs.look();
                match step.kind {
                    GestureKind::Wait => {
                        self.pause.set();
                        run.pausing = true;
                    }
                    GestureKind::HeadLookAtHuman if run.head_target.is_none() => {
                        warn!(step = run.index, "no reference actor to look at, holding instead");
                        run.faulted = true;
                        faults.push(GestureFault {
                            step_index: run.index,
                            kind: step.kind,
                            error: WaggleError::MissingReferenceActor,
                        });
                    }
                    _ => {}
                }
            }

            let left = (step.duration - run.elapsed).max(0.0);
            let done = remaining >= left;
            let used = if done { left } else { remaining };
            run.elapsed += used;
            remaining -= used;

            let t = if done { 1.0 } else { run.elapsed / step.duration };
            let result = match step.kind {
                GestureKind::Wait => Ok(()),
                GestureKind::Wave => limbs.set_wave(posed(&step, run.start_wave, t, done)),
                GestureKind::Look => limbs.set_look(posed(&step, run.start_look, t, done)),
                GestureKind::ContinuousWave => {
                    let vertical = if done {
                        0.0
                    } else {
                        continuous_wave(run.elapsed, step.duration, cycles, peak, run.start_wave.vertical)
                    };
                    limbs.set_wave(AnglePair::new(run.start_wave.horizontal, vertical))
                }
                GestureKind::HeadLookAtHuman => match run.head_target {
                    Some(point) => limbs.look_head_at(body, point, &turn),
                    None => Ok(()),
                },
            };
            if let Err(error) = result {
                if !run.faulted {
                    warn!(step = run.index, kind = ?step.kind, error = %error, "gesture degraded to a timed hold");
                    run.faulted = true;
                    faults.push(GestureFault {
                        step_index: run.index,
                        kind: step.kind,
                        error,
                    });
                }
            }

            if !done {
                break;
            }
            if run.pausing {
                self.pause.clear();
                run.pausing = false;
            }
            run.index += 1;
            run.elapsed = 0.0;
            run.started = false;
        }

        if run.index >= run.steps.len() {
            debug!("gesture sequence finished");
            self.run = None;
            self.completed = true;
        }
        faults
    }

    /// Drop a cancelled run immediately, releasing the pause signal it held.
    pub fn settle(&mut self) {
        if self.run.as_ref().is_some_and(|run| run.token.is_cancelled()) {
            self.release();
        }
    }

    /// `true` while a Wait step holds navigation.
    pub fn pauses_navigation(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.pausing && !run.token.is_cancelled())
    }

    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.token.is_cancelled())
    }

    pub fn state(&self) -> ActionTimelineState {
        match &self.run {
            Some(run) => ActionTimelineState::RunningStep(run.index),
            None if self.completed => ActionTimelineState::Done,
            None => ActionTimelineState::Idle,
        }
    }

    fn release(&mut self) {
        if let Some(run) = self.run.take() {
            if run.pausing {
                self.pause.clear();
            }
        }
    }
}

/// Pose of a Wave or Look step at progress `t`.
fn posed(step: &GestureStep, start: AnglePair, t: f32, done: bool) -> AnglePair {
    if step.is_single_axis() {
        let vertical = if done { step.primary } else { lerp(start.vertical, step.primary, t) };
        return AnglePair::new(start.horizontal, vertical);
    }
    if done {
        return AnglePair::new(step.primary, step.secondary);
    }
    AnglePair::new(
        lerp_angle(start.horizontal, step.primary, t),
        lerp(start.vertical, step.secondary, t),
    )
}

/// Vertical angle of a continuous wave `elapsed` seconds in.
///
/// Each cycle is an up half (to `peak`) and a down half (to 0); the very
/// first half rises from wherever the arm already was.
fn continuous_wave(elapsed: f32, duration: f32, cycles: u32, peak: f32, start: f32) -> f32 {
    let halves = cycles * 2;
    let half = duration / halves as f32;
    let position = elapsed / half;
    let index = (position.floor() as u32).min(halves - 1);
    let s = smoothstep((position - index as f32).clamp(0.0, 1.0));
    if index % 2 == 0 {
        let from = if index == 0 { start } else { 0.0 };
        lerp(from, peak, s)
    } else {
        lerp(peak, 0.0, s)
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
