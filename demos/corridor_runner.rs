//! Drives the learning engine against a small simulated side-scroller.
//!
//! The first half of every level is a Cube section with ground spikes, the
//! second half a Ship section with a ceiling and floor to avoid. Operator
//! commands are read from stdin, one letter per line:
//!
//! ```text
//! d  toggle debug output     m  manual control     x  leave manual control
//! 0-3 manual action          s  save weights       l  load weights
//! r  reset exploration       e  exploration 0.10   q  quit
//! ```
//!
//! ```bash
//! RUST_LOG=info cargo run --example corridor_runner -- --attempts 200 --frame-ms 0
//! ```

use clap::Parser;
use dashq::agent::{LearningEngine, OperatingContext};
use dashq::config::AgentConfig;
use dashq::error::Result;
use dashq::perception::{Obstacle, PerceptionSession, RawObservation, ScanArea};
use dashq::session::{
    Actuator, CommandSource, ControlLoop, Frame, FramePacer, OperatorCommand, Perception, OVERRIDE_EXPLORATION_RATE,
};
use log::{info, warn};
use std::cell::RefCell;
use std::io::BufRead;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

const GROUND: f32 = 300.0;
const CEILING: f32 = 60.0;
const LEVEL_LENGTH: f32 = 3000.0;
const SHIP_START: f32 = 1500.0;
const SPIKE_SPACING: f32 = 180.0;

/// Train the value network on a simulated corridor
#[derive(Parser, Debug)]
#[command(name = "corridor_runner")]
#[command(about = "Online Q-learning on a simulated side-scroller", long_about = None)]
struct Args {
    /// JSON file overriding the default hyperparameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many attempts
    #[arg(short, long)]
    attempts: Option<usize>,

    /// Stop after this many seconds of wall-clock time
    #[arg(long)]
    max_seconds: Option<u64>,

    /// Frame budget in milliseconds (0 runs as fast as possible)
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Pause between a crash and the restart, in milliseconds
    #[arg(long, default_value_t = 0)]
    restart_ms: u64,

    /// Weight snapshot path
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Load the snapshot before starting
    #[arg(short, long)]
    load: bool,

    /// Save the snapshot when the session ends
    #[arg(short, long)]
    save: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

struct Level {
    x: f32,
    y: f32,
    vy: f32,
    thrust: bool,
}

impl Level {
    fn new() -> Self {
        Level { x: 0.0, y: GROUND, vy: 0.0, thrust: false }
    }

    fn context(&self) -> OperatingContext {
        if self.x < SHIP_START {
            OperatingContext::Cube
        } else {
            OperatingContext::Ship
        }
    }

    fn advance(&mut self) {
        self.x += 5.0;
        match self.context() {
            OperatingContext::Ship => {
                self.vy += if self.thrust { -0.8 } else { 0.6 };
                self.vy = self.vy.clamp(-6.0, 6.0);
            }
            _ => self.vy += 1.0,
        }
        self.thrust = false;
        self.y = (self.y + self.vy).min(GROUND);
        if self.y >= GROUND {
            self.vy = 0.0;
        }
    }

    fn act(&mut self, action: usize) {
        match (self.context(), action) {
            (OperatingContext::Cube, 1) | (OperatingContext::Cube, 2) if self.y >= GROUND => self.vy = -13.0,
            (OperatingContext::Ship, 1) | (OperatingContext::Ship, 2) => self.thrust = true,
            _ => {}
        }
    }

    fn spikes_ahead(&self) -> Vec<Obstacle> {
        if self.x >= SHIP_START {
            return Vec::new();
        }
        let next = ((self.x / SPIKE_SPACING).floor() + 1.0) * SPIKE_SPACING;
        (0..3)
            .map(|i| next + i as f32 * SPIKE_SPACING)
            .filter(|&spike| spike < SHIP_START)
            .map(|spike| Obstacle { dx: spike - self.x, y: GROUND, width: 14.0 })
            .collect()
    }

    fn crashed(&self) -> bool {
        match self.context() {
            OperatingContext::Ship => self.y <= CEILING || self.y >= GROUND,
            _ => {
                let nearest = (self.x / SPIKE_SPACING).round() * SPIKE_SPACING;
                nearest > 0.0 && (self.x - nearest).abs() < 7.0 && self.y > GROUND - 20.0
            }
        }
    }

    fn completed(&self) -> bool {
        self.x >= LEVEL_LENGTH
    }
}

struct Screen {
    level: Rc<RefCell<Level>>,
    session: PerceptionSession,
}

impl Perception for Screen {
    fn sense(&mut self) -> Result<Frame> {
        let mut level = self.level.borrow_mut();
        level.advance();
        let raw = RawObservation {
            player_x: level.x % 600.0,
            player_y: level.y,
            player_visible: true,
            obstacles: level.spikes_ahead(),
            context: level.context(),
        };
        let encoded = self.session.observe(&raw);
        Ok(Frame {
            state: encoded.state,
            context: raw.context,
            crashed: level.crashed() || encoded.player_lost,
            completed: level.completed(),
        })
    }

    fn begin_attempt(&mut self) {
        self.session.begin_attempt();
    }
}

struct Controls {
    level: Rc<RefCell<Level>>,
}

impl Actuator for Controls {
    fn perform(&mut self, action: usize, _context: OperatingContext) -> Result<()> {
        self.level.borrow_mut().act(action);
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        *self.level.borrow_mut() = Level::new();
        Ok(())
    }
}

/// Operator commands typed on stdin, collected by a reader thread
struct Console {
    lines: Receiver<String>,
}

impl Console {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines().map_while(|line| line.ok()) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Console { lines: rx }
    }

    fn parse(line: &str) -> Option<OperatorCommand> {
        let command = match line.trim() {
            "d" => OperatorCommand::ToggleDebug,
            "m" => OperatorCommand::EnterManual,
            "x" => OperatorCommand::ExitManual,
            "s" => OperatorCommand::Save,
            "l" => OperatorCommand::Load,
            "r" => OperatorCommand::ResetExploration,
            "e" => OperatorCommand::SetExploration(OVERRIDE_EXPLORATION_RATE),
            "q" => OperatorCommand::Quit,
            other => OperatorCommand::ManualAction(other.parse().ok()?),
        };
        Some(command)
    }
}

impl CommandSource for Console {
    fn poll(&mut self) -> Vec<OperatorCommand> {
        self.lines.try_iter().filter_map(|line| Self::parse(&line)).collect()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AgentConfig::from_json_file(path)?,
        None => AgentConfig::default(),
    };
    if let Some(frame_ms) = args.frame_ms {
        config.frame_budget_ms = frame_ms;
    }
    if let Some(weights) = args.weights.clone() {
        config.weights_path = weights;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let mut engine = LearningEngine::new(config)?;
    if args.load {
        match engine.load_default() {
            Ok(()) => {}
            Err(e) => warn!("Starting from fresh weights: {}", e),
        }
    }

    let level = Rc::new(RefCell::new(Level::new()));
    let screen = Screen {
        level: Rc::clone(&level),
        session: PerceptionSession::new(ScanArea::default(), 1.0 / 60.0),
    };
    let pacer = FramePacer::from_millis(engine.config().frame_budget_ms);
    let mut session = ControlLoop::new(engine, screen, Controls { level }, Console::spawn(), ScanArea::default())
        .with_pacer(pacer)
        .with_restart_delay(Duration::from_millis(args.restart_ms));

    if let Some(seconds) = args.max_seconds {
        let stop = session.stop_handle();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            stop.stop();
        });
    }

    info!("Training loop started");
    let stats = session.run(args.attempts);
    info!(
        "Finished {} attempts ({} frames, {} training steps), best time {:.1}s, best progress {:.3}",
        stats.attempts, stats.frames, stats.training_steps, stats.best_attempt_secs, stats.best_progress
    );
    if let Some(loss) = stats.last_loss {
        info!("Last training loss {:.5}", loss);
    }

    if args.save {
        session.engine().save_default()?;
    }
    Ok(())
}
