use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// Uniform samples in [-1, 1] scaled by `sqrt(2 / fan_in)` (for ReLU)
    HeScaled,

    /// Uniform distribution with custom range
    Uniform { min: f32, max: f32 },

    /// All zeros
    Zeros,
}

/// Range of the bias initialization used by the value network
pub const BIAS_INIT: WeightInit = WeightInit::Uniform { min: -0.1, max: 0.1 };

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix from the given random source
    pub fn initialize_weights<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Array2<f32> {
        let (fan_in, _) = shape;

        match self {
            WeightInit::HeScaled => {
                let scale = (2.0 / fan_in as f32).sqrt();
                let mut weights = Array2::random_using(shape, Uniform::new_inclusive(-1.0f32, 1.0), rng);
                weights.mapv_inplace(|w| w * scale);
                weights
            }

            WeightInit::Uniform { min, max } => {
                Array2::random_using(shape, Uniform::new_inclusive(*min, *max), rng)
            }

            WeightInit::Zeros => Array2::zeros(shape),
        }
    }

    /// Initialize a bias vector from the given random source
    pub fn initialize_biases<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Array1<f32> {
        match self {
            WeightInit::Uniform { min, max } => {
                Array1::random_using(size, Uniform::new_inclusive(*min, *max), rng)
            }

            WeightInit::HeScaled | WeightInit::Zeros => Array1::zeros(size),
        }
    }
}
