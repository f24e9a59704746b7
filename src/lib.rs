//! Speaker classification in pure Rust.
//!
//! A candle-based speaker classifier: a batch of mel-spectrogram frames goes
//! in, a distribution over speaker identities comes out. The network doubles
//! as a voice embedding: the GRU summary (or the logits) is a fixed-size
//! vector per utterance.
//!
//! ## Architecture
//!
//! ```text
//! mel [n, t, n_mels]
//!   → dense + ReLU ───────────────────────────┐
//!   → conv bank (k = 1..K) → max-pool(2)       │
//!   → conv(3) → norm → ReLU → conv(3) → + ─────┘
//!   → highway × N
//!   → GRU (last step)                          [n, h]
//!   → projection                               [n, num_classes]
//!   → softmax / arg-max
//! ```
//!
//! ## Modules
//!
//! - [`config`] — hyperparameters (signal, model, training), JSON loading
//! - [`inputs`] — declared model inputs and batch validation
//! - [`params`] — parameter registry shared between towers
//! - [`model`] — layers, embedding network, classification model
//! - [`train`] — loss, accuracy, Adam factory for an external training loop

pub mod config;
pub mod inputs;
pub mod model;
pub mod params;
pub mod train;

mod error;

pub use error::{Error, Result};
