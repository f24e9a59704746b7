//! Frame encoder and utterance embedding.
//!
//! ```text
//! x [n, t, mel_bins]
//!   → dense(mel_bins → h) + ReLU                     prenet  [n, t, h]
//!   → conv bank (k = 1..K) + norm + ReLU, concat             [n, t, K·h]
//!   → max-pool(2, stride 1, same)                            [n, t, K·h]
//!   → conv1d_1(k=3) + norm + ReLU                            [n, t, h]
//!   → conv1d_2(k=3)                                          [n, t, h]
//!   → + prenet                                               [n, t, h]
//!   → num_highway × highway                                  [n, t, h]
//!   → GRU, last timestep                                     [n, h]
//!   → projection (no activation)                             [n, num_classes]
//! ```
//!
//! Convolutions run channel-first (`[n, C, t]`); the dense, highway and GRU
//! stages run on `[n, t, C]`. Every stage boundary checks its output shape.

use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};

use crate::config::ModelConfig;
use crate::error::ensure_dims;
use crate::model::conv::{max_pool_same, ConvBank, SameConv1d};
use crate::model::highway::Highway;
use crate::model::norm::Normalize;
use crate::model::recurrent::GruSummarizer;
use crate::model::Mode;
use crate::{Error, Result};

const RESIDUAL_KERNEL: usize = 3;

#[derive(Debug, Clone)]
pub struct SpeakerEmbedding {
    dense: Linear,
    banks: ConvBank,
    conv1d_1: SameConv1d,
    norm: Normalize,
    conv1d_2: SameConv1d,
    highways: Vec<Highway>,
    gru: GruSummarizer,
    projection: Linear,
    mel_bins: usize,
    hidden_units: usize,
    num_classes: usize,
}

impl SpeakerEmbedding {
    pub fn new(cfg: &ModelConfig, mel_bins: usize, vb: VarBuilder) -> Result<Self> {
        let h = cfg.hidden_units;
        let dense = candle_nn::linear(mel_bins, h, vb.pp("dense"))?;
        let banks = ConvBank::new(h, cfg.num_banks, h, cfg.norm_type, vb.pp("conv1d_banks"))?;
        let conv1d_1 = SameConv1d::new(banks.out_channels(), h, RESIDUAL_KERNEL, vb.pp("conv1d_1"))?;
        let norm = Normalize::new(cfg.norm_type, h, vb.pp("normalize"))?;
        let conv1d_2 = SameConv1d::new(h, h, RESIDUAL_KERNEL, vb.pp("conv1d_2"))?;

        let mut highways = Vec::with_capacity(cfg.num_highway);
        for i in 0..cfg.num_highway {
            highways.push(Highway::new(h, vb.pp(format!("highwaynet_{i}")))?);
        }

        let gru = GruSummarizer::new(h, h, vb.pp("gru"))?;
        let projection = candle_nn::linear(h, cfg.num_classes, vb.pp("projection"))?;

        Ok(Self {
            dense,
            banks,
            conv1d_1,
            norm,
            conv1d_2,
            highways,
            gru,
            projection,
            mel_bins,
            hidden_units: h,
            num_classes: cfg.num_classes,
        })
    }

    /// Frame-level encoding up to and including the residual add:
    /// `[n, t, mel_bins]` → `[n, t, h]`.
    pub fn encode_frames(&self, x: &Tensor, mode: Mode) -> Result<Tensor> {
        let (n, t, mel_bins) = x.dims3()?;
        if mel_bins != self.mel_bins {
            return Err(Error::shape(
                "input",
                format!("[n, t, {}]", self.mel_bins),
                x.dims(),
            ));
        }
        let h = self.hidden_units;
        let train = mode.is_training();

        let prenet = self.dense.forward(x)?.relu()?;
        ensure_dims("dense", &prenet, &[n, t, h])?;

        let out = prenet.transpose(1, 2)?.contiguous()?;
        let out = self.banks.forward_t(&out, train)?;
        ensure_dims("conv1d_banks", &out, &[n, self.banks.out_channels(), t])?;

        let out = max_pool_same(&out)?;
        ensure_dims("max_pool", &out, &[n, self.banks.out_channels(), t])?;

        let out = self.conv1d_1.forward(&out)?;
        let out = self.norm.forward_relu(&out, train)?;
        let out = self.conv1d_2.forward(&out)?;
        let out = out.transpose(1, 2)?.contiguous()?;

        ensure_dims("residual", &out, prenet.dims())?;
        Ok((out + prenet)?)
    }

    /// Utterance vector from the last GRU state: `[n, t, mel_bins]` → `[n, h]`.
    pub fn summarize(&self, x: &Tensor, mode: Mode) -> Result<Tensor> {
        let mut out = self.encode_frames(x, mode)?;
        let dims = out.dims().to_vec();
        for highway in &self.highways {
            out = highway.forward(&out)?;
            ensure_dims("highwaynet", &out, &dims)?;
        }

        let out = self.gru.forward(&out)?;
        ensure_dims("gru", &out, &[dims[0], self.hidden_units])?;
        Ok(out)
    }

    /// Class logits: `[n, t, mel_bins]` → `[n, num_classes]`.
    pub fn forward(&self, x: &Tensor, mode: Mode) -> Result<Tensor> {
        let summary = self.summarize(x, mode)?;
        self.project(&summary)
    }

    /// Classification head on an existing summary vector.
    pub fn project(&self, summary: &Tensor) -> Result<Tensor> {
        let n = summary.dim(0)?;
        let logits = self.projection.forward(summary)?;
        ensure_dims("projection", &logits, &[n, self.num_classes])?;
        Ok(logits)
    }
}
