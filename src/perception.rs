//! # Perception Session Context
//!
//! Turns per-frame raw measurements (player position, obstacles, regime) into
//! the fixed-length state vector the value network consumes, and shapes the
//! scalar reward. Everything that depends on earlier frames lives in explicit
//! fields of [`PerceptionSession`] and [`RewardShaper`], so a transition can
//! be rebuilt from the values passed in.
//!
//! State vector layout:
//!
//! | index | field |
//! |---|---|
//! | 0 | player x / scan width |
//! | 1 | player y / scan height |
//! | 2 | vertical velocity / 10 |
//! | 3 | operating context tag |
//! | 4..13 | three nearest obstacles as (dx / scan width, y / scan height, width / scan width) |
//! | 13 | player in the top third |
//! | 14 | player in the bottom third |
//!
//! Missing obstacles are padded with `(1.0, 0.5, 0.1)`.

use ndarray::{Array1, ArrayView1};

use crate::agent::OperatingContext;

pub const STATE_LEN: usize = 15;
pub const MAX_OBSTACLES: usize = 3;
pub const OBSTACLE_SENTINEL: [f32; 3] = [1.0, 0.5, 0.1];

const TOP_FLAG: usize = 13;
const BOTTOM_FLAG: usize = 14;
const VELOCITY_SCALE: f32 = 10.0;
const PROGRESS_SCALE: f32 = 5000.0;
/// Frames without a visible player after which the attempt counts as crashed
const LOST_PLAYER_FRAMES: usize = 5;

/// Size in pixels of the captured region the coordinates refer to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanArea {
    pub width: f32,
    pub height: f32,
}

impl Default for ScanArea {
    fn default() -> Self {
        ScanArea { width: 600.0, height: 400.0 }
    }
}

/// An obstacle ahead of the player, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Horizontal distance from the player
    pub dx: f32,
    pub y: f32,
    pub width: f32,
}

/// What the pixel pipeline measured in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub player_x: f32,
    pub player_y: f32,
    pub player_visible: bool,
    pub obstacles: Vec<Obstacle>,
    pub context: OperatingContext,
}

/// Packs measurements into the state vector layout
#[derive(Debug, Clone, Copy, Default)]
pub struct StateEncoder {
    pub scan: ScanArea,
}

impl StateEncoder {
    pub fn new(scan: ScanArea) -> Self {
        StateEncoder { scan }
    }

    pub fn encode(
        &self,
        player_x: f32,
        player_y: f32,
        velocity_y: f32,
        context: OperatingContext,
        obstacles: &[Obstacle],
    ) -> Array1<f32> {
        let mut state = Array1::zeros(STATE_LEN);
        state[0] = player_x / self.scan.width;
        state[1] = player_y / self.scan.height;
        state[2] = velocity_y / VELOCITY_SCALE;
        state[3] = context.tag();

        let mut nearest: Vec<&Obstacle> = obstacles.iter().collect();
        nearest.sort_by(|a, b| a.dx.total_cmp(&b.dx));

        for slot in 0..MAX_OBSTACLES {
            let base = 4 + slot * 3;
            let triple = match nearest.get(slot) {
                Some(o) => [o.dx / self.scan.width, o.y / self.scan.height, o.width / self.scan.width],
                None => OBSTACLE_SENTINEL,
            };
            for (offset, value) in triple.into_iter().enumerate() {
                state[base + offset] = value;
            }
        }

        state[TOP_FLAG] = if player_y < self.scan.height / 3.0 { 1.0 } else { 0.0 };
        state[BOTTOM_FLAG] = if player_y > 2.0 * self.scan.height / 3.0 { 1.0 } else { 0.0 };
        state
    }
}

/// A state vector plus the crash signal derived from tracking the player
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub state: Array1<f32>,
    pub player_lost: bool,
}

/// Frame-to-frame memory of the perception pipeline
#[derive(Debug, Clone)]
pub struct PerceptionSession {
    encoder: StateEncoder,
    frame_seconds: f32,
    last_player_y: Option<f32>,
    frames_without_player: usize,
}

impl PerceptionSession {
    pub fn new(scan: ScanArea, frame_seconds: f32) -> Self {
        PerceptionSession {
            encoder: StateEncoder::new(scan),
            frame_seconds,
            last_player_y: None,
            frames_without_player: 0,
        }
    }

    /// Forget per-attempt tracking.
    pub fn begin_attempt(&mut self) {
        self.last_player_y = None;
        self.frames_without_player = 0;
    }

    pub fn frames_without_player(&self) -> usize {
        self.frames_without_player
    }

    /// Encode one frame. While the player is not visible its last known
    /// height (or mid-screen) stands in for the measurement.
    pub fn observe(&mut self, raw: &RawObservation) -> EncodedFrame {
        let player_y = if raw.player_visible {
            self.frames_without_player = 0;
            raw.player_y
        } else {
            self.frames_without_player += 1;
            self.last_player_y.unwrap_or(self.encoder.scan.height / 2.0)
        };

        let velocity_y = match self.last_player_y {
            Some(last) if self.frame_seconds > 0.0 => (player_y - last) / self.frame_seconds,
            _ => 0.0,
        };
        self.last_player_y = Some(player_y);

        EncodedFrame {
            state: self.encoder.encode(raw.player_x, player_y, velocity_y, raw.context, &raw.obstacles),
            player_lost: self.frames_without_player > LOST_PLAYER_FRAMES,
        }
    }
}

/// Per-step reward from the next state, the action taken and the crash flag
#[derive(Debug, Clone)]
pub struct RewardShaper {
    scan_width: f32,
    last_player_x: Option<f32>,
    total_progress: f32,
    rewarded_progress: f32,
}

impl RewardShaper {
    pub fn new(scan: ScanArea) -> Self {
        RewardShaper {
            scan_width: scan.width,
            last_player_x: None,
            total_progress: 0.0,
            rewarded_progress: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.last_player_x = None;
        self.total_progress = 0.0;
        self.rewarded_progress = 0.0;
    }

    /// Cumulative rightward progress in the current attempt
    pub fn progress(&self) -> f32 {
        self.total_progress
    }

    fn track_progress(&mut self, next_state: ArrayView1<f32>) -> f32 {
        let player_x = feature(next_state, 0) * self.scan_width;
        if let Some(last) = self.last_player_x {
            if player_x > last {
                self.total_progress += (player_x - last) / PROGRESS_SCALE;
            }
        }
        self.last_player_x = Some(player_x);
        self.total_progress
    }

    pub fn reward(
        &mut self,
        context: OperatingContext,
        action: usize,
        next_state: ArrayView1<f32>,
        crashed: bool,
    ) -> f32 {
        let mut reward = 0.01;

        let progress = self.track_progress(next_state);
        if progress > self.rewarded_progress {
            reward += (progress - self.rewarded_progress) * 10.0;
            self.rewarded_progress = progress;
        }

        if crashed {
            reward -= 1.0;
        }

        match context {
            OperatingContext::Ship | OperatingContext::Wave => {
                let y = feature(next_state, 1);
                reward += 0.02 * (1.0 - (y - 0.5).abs() * 2.0);
            }
            OperatingContext::Ball | OperatingContext::Spider => {
                if feature(next_state, TOP_FLAG) > 0.5 || feature(next_state, BOTTOM_FLAG) > 0.5 {
                    reward += 0.02;
                }
            }
            _ => {}
        }

        if action != 0 && context == OperatingContext::Cube {
            reward -= 0.005;
        }

        reward
    }
}

/// Missing fields of a shorter state read as zero.
fn feature(state: ArrayView1<f32>, index: usize) -> f32 {
    state.get(index).copied().unwrap_or(0.0)
}
