/// Learning rate scheduling strategies
#[derive(Clone, Debug, PartialEq)]
pub enum LearningRateScheduler {
    /// Linear decay: lr = initial_lr * (1 - step / max_steps) + final_lr * (step / max_steps),
    /// holding `final_lr` from `max_steps` on.
    LinearDecay {
        initial_lr: f32,
        final_lr: f32,
        max_steps: usize,
    },
}

impl LearningRateScheduler {
    /// Get the learning rate for a given step. Never negative.
    pub fn get_lr(&self, step: usize) -> f32 {
        let lr = match self {
            LearningRateScheduler::LinearDecay { initial_lr, final_lr, max_steps } => {
                if *max_steps == 0 || step >= *max_steps {
                    *final_lr
                } else {
                    let progress = step as f32 / *max_steps as f32;
                    initial_lr * (1.0 - progress) + final_lr * progress
                }
            }
        };
        lr.max(0.0)
    }

    /// Linear decay from `initial_lr` to zero over `max_steps` attempts
    pub fn linear_to_zero(initial_lr: f32, max_steps: usize) -> Self {
        LearningRateScheduler::LinearDecay {
            initial_lr,
            final_lr: 0.0,
            max_steps,
        }
    }
}
