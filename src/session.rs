//! # Frame-Paced Control Loop
//!
//! Drives a [`LearningEngine`] against an environment reached only through
//! the [`Perception`], [`Actuator`] and [`CommandSource`] traits. One cycle:
//!
//! 1. drain operator commands;
//! 2. pick an action (policy, or the operator's last action in manual mode);
//! 3. sense the next frame and shape the reward;
//! 4. record the transition and give the trainer a chance to run;
//! 5. sleep whatever is left of the frame budget.
//!
//! Errors from the engine or the actuator are logged and the loop keeps the
//! parameters it holds. Only a perception failure ends an attempt early.

use log::{debug, info, warn};
use ndarray::Array1;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::agent::{ControlSource, LearningEngine, OperatingContext, TrainOutcome};
use crate::error::Result;
use crate::perception::{RewardShaper, ScanArea};

/// Exploration rate written by [`OperatorCommand::ResetExploration`]
pub const RESET_EXPLORATION_RATE: f32 = 0.5;
/// Default value for [`OperatorCommand::SetExploration`] frontends
pub const OVERRIDE_EXPLORATION_RATE: f32 = 0.10;
/// Shortest wait before retrying an attempt that could not start
pub const START_RETRY_DELAY: Duration = Duration::from_millis(10);

/// One sensed frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub state: Array1<f32>,
    pub context: OperatingContext,
    pub crashed: bool,
    pub completed: bool,
}

impl Frame {
    pub fn is_terminal(&self) -> bool {
        self.crashed || self.completed
    }
}

pub trait Perception {
    fn sense(&mut self) -> Result<Frame>;

    /// Called before the first frame of every attempt.
    fn begin_attempt(&mut self) {}
}

pub trait Actuator {
    fn perform(&mut self, action: usize, context: OperatingContext) -> Result<()>;

    /// Bring the environment back to the start of a level.
    fn restart(&mut self) -> Result<()>;
}

pub trait CommandSource {
    fn poll(&mut self) -> Vec<OperatorCommand>;
}

/// Operator requests, applied at the start of a cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    ToggleDebug,
    EnterManual,
    ExitManual,
    ManualAction(usize),
    Save,
    Load,
    ResetExploration,
    SetExploration(f32),
    Quit,
}

/// A command source that never issues anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommands;

impl CommandSource for NoCommands {
    fn poll(&mut self) -> Vec<OperatorCommand> {
        Vec::new()
    }
}

/// Fixed per-frame time budget
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    budget: Duration,
}

impl FramePacer {
    pub fn new(budget: Duration) -> Self {
        FramePacer { budget }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left in the budget after `elapsed`; zero once it is overrun.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.budget.saturating_sub(elapsed)
    }

    /// Sleep out the rest of a frame that began at `started`.
    pub fn pace(&self, started: Instant) {
        let remaining = self.remaining(started.elapsed());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}

/// Cooperative cancellation shared with other threads
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEnd {
    Crashed,
    Completed,
    Stopped,
    PerceptionFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSummary {
    pub attempt: usize,
    pub frames: usize,
    pub duration: Duration,
    pub progress: f32,
    pub context: OperatingContext,
    pub exploration_rate: f32,
    pub end: AttemptEnd,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub attempts: usize,
    /// Attempts abandoned before their first frame
    pub failed_starts: usize,
    pub frames: usize,
    pub training_steps: usize,
    pub best_attempt_secs: f32,
    pub best_progress: f32,
    /// Exponential moving average of cycle time
    pub average_frame_ms: f32,
    pub last_loss: Option<f32>,
}

impl SessionStats {
    fn record_frame(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        self.average_frame_ms = self.average_frame_ms * 0.9 + ms * 0.1;
        self.frames += 1;
    }

    fn record_attempt(&mut self, summary: &AttemptSummary) {
        self.attempts += 1;
        self.best_attempt_secs = self.best_attempt_secs.max(summary.duration.as_secs_f32());
        self.best_progress = self.best_progress.max(summary.progress);
    }
}

pub struct ControlLoop<P, A, C> {
    engine: LearningEngine,
    perception: P,
    actuator: A,
    commands: C,
    shaper: RewardShaper,
    pacer: FramePacer,
    stop: StopHandle,
    restart_delay: Duration,
    manual: bool,
    manual_action: usize,
    debug: bool,
    stats: SessionStats,
}

impl<P: Perception, A: Actuator, C: CommandSource> ControlLoop<P, A, C> {
    pub fn new(engine: LearningEngine, perception: P, actuator: A, commands: C, scan: ScanArea) -> Self {
        let pacer = FramePacer::from_millis(engine.config().frame_budget_ms);
        ControlLoop {
            engine,
            perception,
            actuator,
            commands,
            shaper: RewardShaper::new(scan),
            pacer,
            stop: StopHandle::new(),
            restart_delay: Duration::ZERO,
            manual: false,
            manual_action: 0,
            debug: false,
            stats: SessionStats::default(),
        }
    }

    /// Pause between the end of an attempt and the restart.
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn with_pacer(mut self, pacer: FramePacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn engine(&self) -> &LearningEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LearningEngine {
        &mut self.engine
    }

    pub fn into_engine(self) -> LearningEngine {
        self.engine
    }

    pub fn perception(&self) -> &P {
        &self.perception
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Run attempts until stopped or `max_attempts` have been tried.
    ///
    /// An attempt that fails to start counts toward the bound and is retried
    /// no sooner than one frame budget later.
    pub fn run(&mut self, max_attempts: Option<usize>) -> SessionStats {
        while !self.stop.is_stopped() {
            let tried = self.stats.attempts + self.stats.failed_starts;
            if max_attempts.map_or(false, |max| tried >= max) {
                break;
            }
            match self.run_attempt() {
                Ok(summary) => {
                    if summary.end == AttemptEnd::Stopped {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Attempt could not start: {}", e);
                    self.stats.failed_starts += 1;
                    if self.stop.is_stopped() {
                        break;
                    }
                    thread::sleep(self.pacer.budget().max(START_RETRY_DELAY));
                    self.restart();
                }
            }
        }
        self.stats.clone()
    }

    /// Play one attempt from level start to crash, completion or stop.
    pub fn run_attempt(&mut self) -> Result<AttemptSummary> {
        self.perception.begin_attempt();
        self.shaper.reset();
        let mut frame = self.perception.sense()?;

        let attempt = self.engine.begin_attempt();
        let started = Instant::now();
        let mut frames = 0;
        let mut context = frame.context;

        let end = loop {
            let cycle_start = Instant::now();
            self.handle_commands(frame.context);
            if self.stop.is_stopped() {
                break AttemptEnd::Stopped;
            }

            context = frame.context;
            let next = match self.step(&frame) {
                Ok(next) => next,
                Err(e) => {
                    warn!("Perception failed during attempt {}: {}", attempt, e);
                    break AttemptEnd::PerceptionFailed;
                }
            };
            frames += 1;
            self.stats.record_frame(cycle_start.elapsed());
            self.pacer.pace(cycle_start);

            if next.crashed {
                break AttemptEnd::Crashed;
            }
            if next.completed {
                break AttemptEnd::Completed;
            }
            frame = next;
        };

        let exploration_rate = self.engine.finish_attempt(context);
        let summary = AttemptSummary {
            attempt,
            frames,
            duration: started.elapsed(),
            progress: self.shaper.progress(),
            context,
            exploration_rate,
            end,
        };
        self.stats.record_attempt(&summary);
        self.log_attempt(&summary);

        if end != AttemptEnd::Stopped {
            self.restart();
        }
        Ok(summary)
    }

    /// One decision cycle starting from `frame`; returns the next frame.
    pub fn step(&mut self, frame: &Frame) -> Result<Frame> {
        let (action, source) = if self.manual {
            (self.manual_action, ControlSource::Manual)
        } else {
            let action = self.choose_action(frame);
            if let Err(e) = self.actuator.perform(action, frame.context) {
                warn!("Actuator failed on action {}: {}", action, e);
            }
            (action, ControlSource::Agent)
        };

        let next = self.perception.sense()?;
        let reward = self.shaper.reward(frame.context, action, next.state.view(), next.crashed);

        if let Err(e) = self.engine.observe(
            frame.state.clone(),
            action,
            reward,
            next.state.clone(),
            next.is_terminal(),
            source,
        ) {
            warn!("Transition rejected: {}", e);
        }

        if self.engine.has_network() {
            match self.engine.maybe_train() {
                Ok(TrainOutcome::Trained(stats)) => {
                    self.stats.training_steps += 1;
                    self.stats.last_loss = Some(stats.loss);
                    if self.debug {
                        info!(
                            "Trained with batch of {}. Learning rate: {:.5}",
                            stats.batch_size, stats.learning_rate
                        );
                    }
                }
                Ok(TrainOutcome::Skipped(_)) => {}
                Err(e) => warn!("Training step failed: {}", e),
            }
        }

        Ok(next)
    }

    fn choose_action(&mut self, frame: &Frame) -> usize {
        match self.engine.select_action(frame.context, frame.state.view()) {
            Ok(action) => action,
            Err(e) => {
                debug!("Falling back to action 0: {}", e);
                0
            }
        }
    }

    /// Drain and apply pending operator commands.
    pub fn handle_commands(&mut self, context: OperatingContext) {
        for command in self.commands.poll() {
            self.apply(command, context);
        }
    }

    fn apply(&mut self, command: OperatorCommand, context: OperatingContext) {
        match command {
            OperatorCommand::ToggleDebug => {
                self.debug = !self.debug;
                info!("Debug output {}", if self.debug { "enabled" } else { "disabled" });
            }
            OperatorCommand::EnterManual => {
                self.manual = true;
                self.manual_action = 0;
                info!("Manual control enabled");
            }
            OperatorCommand::ExitManual => {
                self.manual = false;
                info!("Manual control disabled");
            }
            OperatorCommand::ManualAction(action) => {
                if !self.manual {
                    debug!("Ignoring manual action {} outside manual mode", action);
                    return;
                }
                let actions = self.engine.config().network.output_size;
                if action >= actions {
                    warn!("Ignoring manual action {}: only {} actions available", action, actions);
                    return;
                }
                if let Err(e) = self.actuator.perform(action, context) {
                    warn!("Actuator failed on manual action {}: {}", action, e);
                }
                self.manual_action = action;
            }
            OperatorCommand::Save => match self.engine.save_default() {
                Ok(()) => {}
                Err(e) => warn!("Saving network failed: {}", e),
            },
            OperatorCommand::Load => match self.engine.load_default() {
                Ok(()) => {}
                Err(e) => warn!("Loading network failed, keeping current weights: {}", e),
            },
            OperatorCommand::ResetExploration => {
                if let Err(e) = self.engine.reset_exploration(context, RESET_EXPLORATION_RATE) {
                    warn!("{}", e);
                }
            }
            OperatorCommand::SetExploration(value) => {
                if let Err(e) = self.engine.set_exploration(context, value) {
                    warn!("{}", e);
                }
            }
            OperatorCommand::Quit => {
                info!("Stopping session");
                self.stop.stop();
            }
        }
    }

    fn restart(&mut self) {
        if !self.restart_delay.is_zero() {
            thread::sleep(self.restart_delay);
        }
        if let Err(e) = self.actuator.restart() {
            warn!("Restart failed: {}", e);
        }
    }

    fn log_attempt(&self, summary: &AttemptSummary) {
        debug!(
            "Attempt {} ended ({:?}) after {} frames, progress {:.3}",
            summary.attempt, summary.end, summary.frames, summary.progress
        );
        if summary.attempt % 10 == 0 {
            info!(
                "Attempt {}: best time {:.1}s, {} exploration {:.3}, avg frame {:.1}ms, replay {}",
                summary.attempt,
                self.stats.best_attempt_secs,
                summary.context,
                summary.exploration_rate,
                self.stats.average_frame_ms,
                self.engine.trainer().replay().len()
            );
        }
    }
}
