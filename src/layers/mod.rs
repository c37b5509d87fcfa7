pub mod dense;
pub mod initialization;

pub use dense::{affine, back_propagate, outer_sum, DenseLayer, LayerCache, LayerGradients};
pub use initialization::{WeightInit, BIAS_INIT};
