//! Highway layer.
//!
//! ```text
//! H = ReLU(dense1(x))
//! T = sigmoid(dense2(x))          dense2 bias starts at -1 (gate mostly closed)
//! y = H · T + x · (1 - T)
//! ```
//!
//! Shape preserving on `[B, T, units]`.

use candle_core::{Module, Tensor};
use candle_nn::{init, Linear, VarBuilder};

use crate::Result;

const GATE_BIAS_INIT: f64 = -1.0;

#[derive(Debug, Clone)]
pub struct Highway {
    dense1: Linear,
    dense2: Linear,
}

impl Highway {
    pub fn new(num_units: usize, vb: VarBuilder) -> Result<Self> {
        let dense1 = candle_nn::linear(num_units, num_units, vb.pp("dense1"))?;

        let vb2 = vb.pp("dense2");
        let weight = vb2.get_with_hints((num_units, num_units), "weight", init::DEFAULT_KAIMING_NORMAL)?;
        let bias = vb2.get_with_hints(num_units, "bias", init::Init::Const(GATE_BIAS_INIT))?;
        let dense2 = Linear::new(weight, Some(bias));

        Ok(Self { dense1, dense2 })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.dense1.forward(x)?.relu()?;
        let t = candle_nn::ops::sigmoid(&self.dense2.forward(x)?)?;
        let carry = t.affine(-1.0, 1.0)?;
        Ok(((h * &t)? + (x * carry)?)?)
    }
}
