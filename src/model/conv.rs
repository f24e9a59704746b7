//! Length-preserving 1-D convolutions and the multi-scale convolution bank.
//!
//! ```text
//! x [B, H, T]
//!   ├→ conv(k=1) → norm → ReLU ─┐
//!   ├→ conv(k=2) → norm → ReLU ─┤
//!   ⋮                           ├→ concat → [B, K·H, T]
//!   └→ conv(k=K) → norm → ReLU ─┘
//! ```
//!
//! Padding follows the "same" convention: `k - 1` zeros in total, the smaller
//! half in front. Even kernels put the extra zero at the end, so every branch
//! of the bank keeps `T` frames.

use candle_core::{Module, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, VarBuilder};

use crate::config::NormType;
use crate::model::norm::Normalize;
use crate::Result;

/// Bias-free Conv1d with "same" padding. Input and output are `[B, C, T]`.
#[derive(Debug, Clone)]
pub struct SameConv1d {
    conv: Conv1d,
    pad_left: usize,
    pad_right: usize,
}

impl SameConv1d {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let conv = candle_nn::conv1d_no_bias(
            in_channels,
            out_channels,
            kernel_size,
            Conv1dConfig::default(),
            vb,
        )?;
        let (pad_left, pad_right) = same_padding(kernel_size);
        Ok(Self {
            conv,
            pad_left,
            pad_right,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = if self.pad_left + self.pad_right > 0 {
            x.pad_with_zeros(2, self.pad_left, self.pad_right)?
        } else {
            x.contiguous()?
        };
        Ok(self.conv.forward(&x)?)
    }
}

/// `(before, after)` zero padding that keeps the length for kernel `k`.
pub fn same_padding(kernel_size: usize) -> (usize, usize) {
    let total = kernel_size.saturating_sub(1);
    let left = total / 2;
    (left, total - left)
}

/// Max-pool over time with window 2, stride 1 and "same" padding.
///
/// `out[t] = max(x[t], x[t + 1])`; the last frame has no right neighbour and
/// passes through. `[B, C, T]` → `[B, C, T]`.
pub fn max_pool_same(x: &Tensor) -> Result<Tensor> {
    let t = x.dim(2)?;
    if t <= 1 {
        return Ok(x.clone());
    }
    let shifted = Tensor::cat(&[&x.narrow(2, 1, t - 1)?, &x.narrow(2, t - 1, 1)?], 2)?;
    Ok(x.maximum(&shifted)?)
}

/// One branch of the bank: conv(k) → norm → ReLU.
#[derive(Debug, Clone)]
struct BankBranch {
    conv: SameConv1d,
    norm: Normalize,
}

/// K parallel convolutions with kernel widths `1..=K`, concatenated on channels.
#[derive(Debug, Clone)]
pub struct ConvBank {
    branches: Vec<BankBranch>,
    num_units: usize,
}

impl ConvBank {
    /// Parameters live under `num_{k}.conv1d` and `num_{k}.normalize`.
    pub fn new(
        in_channels: usize,
        num_banks: usize,
        num_units: usize,
        norm_type: NormType,
        vb: VarBuilder,
    ) -> Result<Self> {
        let mut branches = Vec::with_capacity(num_banks);
        for k in 1..=num_banks {
            let vb_k = vb.pp(format!("num_{k}"));
            let conv = SameConv1d::new(in_channels, num_units, k, vb_k.pp("conv1d"))?;
            let norm = Normalize::new(norm_type, num_units, vb_k.pp("normalize"))?;
            branches.push(BankBranch { conv, norm });
        }
        Ok(Self {
            branches,
            num_units,
        })
    }

    pub fn out_channels(&self) -> usize {
        self.branches.len() * self.num_units
    }

    /// `[B, C_in, T]` → `[B, K·num_units, T]`.
    pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let mut outputs = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let out = branch.conv.forward(x)?;
            outputs.push(branch.norm.forward_relu(&out, train)?);
        }
        Ok(Tensor::cat(&outputs, 1)?)
    }
}
