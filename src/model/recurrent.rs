//! Recurrent summarizer: a single-direction GRU whose last hidden state
//! becomes the per-utterance vector.

use candle_core::Tensor;
use candle_nn::{GRUConfig, VarBuilder, GRU, RNN};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct GruSummarizer {
    gru: GRU,
}

impl GruSummarizer {
    pub fn new(in_dim: usize, hidden_dim: usize, vb: VarBuilder) -> Result<Self> {
        let gru = candle_nn::gru(in_dim, hidden_dim, GRUConfig::default(), vb)?;
        Ok(Self { gru })
    }

    /// Hidden state for every timestep: `[B, T, in]` → `[B, T, hidden]`.
    pub fn sequence(&self, x: &Tensor) -> Result<Tensor> {
        let states = self.gru.seq(x)?;
        if states.is_empty() {
            return Err(Error::shape("gru", "at least one timestep", x.dims()));
        }
        let hs: Vec<Tensor> = states.iter().map(|s| s.h().clone()).collect();
        Ok(Tensor::stack(&hs, 1)?)
    }

    /// Last hidden state only: `[B, T, in]` → `[B, hidden]`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let states = self.gru.seq(x)?;
        match states.last() {
            Some(last) => Ok(last.h().clone()),
            None => Err(Error::shape("gru", "at least one timestep", x.dims())),
        }
    }
}
