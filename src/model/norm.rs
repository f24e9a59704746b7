//! Normalization layers selected by [`NormType`].
//!
//! All variants take channel-first `[B, C, T]` input and return the same shape.
//!
//! | variant | statistics                                   | eps  |
//! |---------|----------------------------------------------|------|
//! | `bn`    | over (B, T) per channel; running in inference | 1e-3 |
//! | `ln`    | over C per frame                             | 1e-5 |
//! | `ins`   | over T per example and channel               | 1e-8 |

use candle_core::{ModuleT, Tensor};
use candle_nn::{Module, VarBuilder};

use crate::config::NormType;
use crate::Result;

const BATCH_NORM_EPS: f64 = 1e-3;
/// Running-statistics update rate (a 0.999 moving-average decay).
const BATCH_NORM_MOMENTUM: f64 = 1e-3;
const LAYER_NORM_EPS: f64 = 1e-5;
const INSTANCE_NORM_EPS: f64 = 1e-8;

#[derive(Debug, Clone)]
pub enum Normalize {
    Batch(candle_nn::BatchNorm),
    Layer(candle_nn::LayerNorm),
    /// Group norm with one group per channel.
    Instance(candle_nn::GroupNorm),
    Identity,
}

impl Normalize {
    pub fn new(norm_type: NormType, channels: usize, vb: VarBuilder) -> Result<Self> {
        let norm = match norm_type {
            NormType::Batch => {
                let cfg = candle_nn::BatchNormConfig {
                    eps: BATCH_NORM_EPS,
                    remove_mean: true,
                    affine: true,
                    momentum: BATCH_NORM_MOMENTUM,
                };
                Self::Batch(candle_nn::batch_norm(channels, cfg, vb)?)
            }
            NormType::Layer => Self::Layer(candle_nn::layer_norm(channels, LAYER_NORM_EPS, vb)?),
            NormType::Instance => Self::Instance(candle_nn::group_norm(
                channels,
                channels,
                INSTANCE_NORM_EPS,
                vb,
            )?),
            NormType::None => Self::Identity,
        };
        Ok(norm)
    }

    /// Normalize `x: [B, C, T]`. `train` only matters for batch norm.
    pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let out = match self {
            Self::Batch(bn) => bn.forward_t(x, train)?,
            Self::Layer(ln) => {
                // channel-last for the per-frame statistics
                let x = x.transpose(1, 2)?.contiguous()?;
                ln.forward(&x)?.transpose(1, 2)?.contiguous()?
            }
            Self::Instance(gn) => gn.forward(x)?,
            Self::Identity => x.clone(),
        };
        Ok(out)
    }

    /// Normalize then ReLU.
    pub fn forward_relu(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        Ok(self.forward_t(x, train)?.relu()?)
    }
}
