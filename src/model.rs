//! Model components for the speaker classifier.
//!
//! ## Components
//!
//! - [`conv`] — "same"-padded Conv1d, convolution bank, stride-1 max-pool
//! - [`norm`] — batch / layer / instance normalization
//! - [`highway`] — gated highway layer
//! - [`recurrent`] — GRU summarizer (last timestep)
//! - [`embedding`] — the full frame encoder and classification head
//! - [`classifier`] — input contract, loss/accuracy wiring, optimizer factory

pub mod classifier;
pub mod conv;
pub mod embedding;
pub mod highway;
pub mod norm;
pub mod recurrent;

/// Whether a forward pass is a training step.
///
/// Only batch norm looks at this: training uses (and updates) batch
/// statistics, inference reads the running ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Infer,
}

impl Mode {
    pub fn is_training(self) -> bool {
        matches!(self, Mode::Train)
    }
}

impl From<bool> for Mode {
    fn from(is_training: bool) -> Self {
        if is_training {
            Mode::Train
        } else {
            Mode::Infer
        }
    }
}
