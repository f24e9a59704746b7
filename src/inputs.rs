//! Declared model inputs and the batch that carries them.
//!
//! | name         | dtype | shape                         |
//! |--------------|-------|-------------------------------|
//! | `wav`        | f32   | `[n, duration·sr]`            |
//! | `x`          | f32   | `[n, length/hop + 1, n_mels]` |
//! | `speaker_id` | u32   | `[n]`                         |
//!
//! `n` is free. Loading audio and computing spectrograms happens upstream.

use candle_core::{DType, Tensor};

use crate::config::SignalConfig;
use crate::{Error, Result};

pub const WAV: &str = "wav";
pub const SPECTROGRAM: &str = "x";
pub const SPEAKER_ID: &str = "speaker_id";

/// Name, dtype and shape of one input. `None` marks a free dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDesc {
    pub name: &'static str,
    pub dtype: DType,
    pub shape: Vec<Option<usize>>,
}

impl InputDesc {
    pub fn new(name: &'static str, dtype: DType, shape: Vec<Option<usize>>) -> Self {
        Self { name, dtype, shape }
    }

    /// Check dtype, rank and every fixed dimension of `tensor`.
    pub fn check(&self, tensor: &Tensor) -> Result<()> {
        if tensor.dtype() != self.dtype {
            let msg = format!("{} must be {:?}, got {:?}", self.name, self.dtype, tensor.dtype());
            return Err(if self.name == SPEAKER_ID {
                Error::Label(msg)
            } else {
                Error::Config(msg)
            });
        }
        let dims = tensor.dims();
        let matches = dims.len() == self.shape.len()
            && dims
                .iter()
                .zip(&self.shape)
                .all(|(d, s)| s.map_or(true, |s| s == *d));
        if !matches {
            return Err(Error::shape(self.name, self.shape_string(), dims));
        }
        Ok(())
    }

    /// `[?, 161, 80]`-style rendering.
    pub fn shape_string(&self) -> String {
        let parts: Vec<String> = self
            .shape
            .iter()
            .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

/// The three inputs for a signal configuration.
pub fn input_descs(signal: &SignalConfig) -> Vec<InputDesc> {
    vec![
        InputDesc::new(WAV, DType::F32, vec![None, Some(signal.length())]),
        InputDesc::new(
            SPECTROGRAM,
            DType::F32,
            vec![None, Some(signal.length_spec()), Some(signal.n_mels)],
        ),
        InputDesc::new(SPEAKER_ID, DType::U32, vec![None]),
    ]
}

/// One batch of aligned examples.
#[derive(Debug, Clone)]
pub struct Batch {
    pub wav: Tensor,
    pub x: Tensor,
    pub speaker_id: Tensor,
}

impl Batch {
    pub fn new(wav: Tensor, x: Tensor, speaker_id: Tensor) -> Self {
        Self { wav, x, speaker_id }
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        match name {
            WAV => Some(&self.wav),
            SPECTROGRAM => Some(&self.x),
            SPEAKER_ID => Some(&self.speaker_id),
            _ => None,
        }
    }

    pub fn batch_size(&self) -> Result<usize> {
        Ok(self.x.dim(0)?)
    }

    /// Check every declared input and that all three agree on `n`.
    pub fn validate(&self, descs: &[InputDesc]) -> Result<()> {
        for desc in descs {
            let tensor = self
                .get(desc.name)
                .ok_or_else(|| Error::Config(format!("no batch field for input {}", desc.name)))?;
            desc.check(tensor)?;
        }
        let n = self.batch_size()?;
        for (name, tensor) in [(WAV, &self.wav), (SPEAKER_ID, &self.speaker_id)] {
            if tensor.dim(0)? != n {
                return Err(Error::shape(name, format!("batch size {n}"), tensor.dims()));
            }
        }
        Ok(())
    }
}
