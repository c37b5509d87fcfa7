//! # Activation Functions Module
//!
//! The value network uses exactly two activations: ReLU on both hidden layers
//! and the identity on the output layer, whose units are unbounded Q-values.
//!
//! ```rust
//! use dashq::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5, 0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0, 0.0, 2.0]]);
//! ```

pub mod functions;

pub use functions::Activation;
