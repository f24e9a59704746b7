//! Hyperparameters for the speaker classifier.
//!
//! Loaded from JSON. Every field has a default, so a file only needs the
//! values it overrides:
//!
//! ```json
//! {"model": {"num_classes": 251, "norm_type": "bn"}, "train": {"lr": 0.001}}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Normalization applied after the bank convolutions and the first residual conv.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormType {
    /// Batch norm: batch statistics while training, running statistics otherwise.
    #[serde(rename = "bn")]
    Batch,
    /// Layer norm over the channels of each frame.
    #[serde(rename = "ln")]
    Layer,
    /// Instance norm over time, per example and channel.
    #[serde(rename = "ins")]
    Instance,
    #[serde(rename = "none")]
    None,
}

/// Signal parameters of the feature pipeline that feeds the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Clip duration in seconds.
    pub duration: f64,
    /// Sample rate in Hz.
    pub sr: usize,
    /// STFT hop in samples.
    pub hop_length: usize,
    /// Mel bins per frame.
    pub n_mels: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            duration: 2.0,
            sr: 16000,
            hop_length: 200,
            n_mels: 80,
        }
    }
}

impl SignalConfig {
    /// Waveform length in samples (`duration × sr`).
    pub fn length(&self) -> usize {
        (self.duration * self.sr as f64) as usize
    }

    /// Spectrogram frames for a centered STFT: `length / hop_length + 1`.
    pub fn length_spec(&self) -> usize {
        self.length() / self.hop_length + 1
    }
}

/// Architecture hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Convolution bank width K (kernel sizes 1..=K).
    pub num_banks: usize,
    pub hidden_units: usize,
    pub num_highway: usize,
    pub norm_type: NormType,
    /// Number of speaker identities.
    pub num_classes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_banks: 8,
            hidden_units: 128,
            num_highway: 4,
            norm_type: NormType::Instance,
            num_classes: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Initial Adam learning rate.
    pub lr: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { lr: 3e-4 }
    }
}

/// Top-level hyperparameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HParams {
    pub signal: SignalConfig,
    pub model: ModelConfig,
    pub train: TrainConfig,
}

impl HParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let hp: HParams = serde_json::from_str(json)?;
        hp.validate()?;
        Ok(hp)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values the model cannot be built from.
    pub fn validate(&self) -> Result<()> {
        let s = &self.signal;
        if s.duration.is_nan() || s.duration <= 0.0 {
            return Err(Error::Config(format!("duration must be > 0, got {}", s.duration)));
        }
        if s.sr == 0 || s.hop_length == 0 || s.n_mels == 0 {
            return Err(Error::Config(format!(
                "sr, hop_length and n_mels must be > 0 (sr={}, hop_length={}, n_mels={})",
                s.sr, s.hop_length, s.n_mels
            )));
        }
        if s.length() < s.hop_length {
            return Err(Error::Config(format!(
                "signal of {} samples is shorter than one hop ({})",
                s.length(),
                s.hop_length
            )));
        }

        let m = &self.model;
        if m.num_banks == 0 || m.hidden_units == 0 {
            return Err(Error::Config(format!(
                "num_banks and hidden_units must be > 0 (num_banks={}, hidden_units={})",
                m.num_banks, m.hidden_units
            )));
        }
        if m.num_classes < 2 {
            return Err(Error::Config(format!(
                "num_classes must be at least 2, got {}",
                m.num_classes
            )));
        }

        if self.train.lr.is_nan() || self.train.lr <= 0.0 {
            return Err(Error::Config(format!("lr must be > 0, got {}", self.train.lr)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hparams_are_valid() {
        let hp = HParams::default();
        hp.validate().unwrap();
        assert_eq!(hp.model.norm_type, NormType::Instance);
    }

    #[test]
    fn default_signal_lengths() {
        let s = SignalConfig::default();
        assert_eq!(s.length(), 32000); // 2 s × 16 kHz
        assert_eq!(s.length_spec(), 161); // 32000 / 200 + 1
    }

    #[test]
    fn fractional_duration_truncates() {
        let s = SignalConfig {
            duration: 0.5,
            sr: 22050,
            hop_length: 256,
            n_mels: 80,
        };
        assert_eq!(s.length(), 11025);
        assert_eq!(s.length_spec(), 44);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{"model": {"num_classes": 251, "norm_type": "bn"}, "train": {"lr": 0.001}}"#;
        let hp = HParams::from_json_str(json).unwrap();
        assert_eq!(hp.model.num_classes, 251);
        assert_eq!(hp.model.norm_type, NormType::Batch);
        assert_eq!(hp.model.hidden_units, 128);
        assert_eq!(hp.signal.sr, 16000);
        assert!((hp.train.lr - 0.001).abs() < 1e-12);
    }

    #[test]
    fn norm_type_names() {
        for (name, expected) in [
            ("\"bn\"", NormType::Batch),
            ("\"ln\"", NormType::Layer),
            ("\"ins\"", NormType::Instance),
            ("\"none\"", NormType::None),
        ] {
            let parsed: NormType = serde_json::from_str(name).unwrap();
            assert_eq!(parsed, expected);
        }
        assert!(serde_json::from_str::<NormType>("\"group\"").is_err());
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(HParams::from_json_str(r#"{"model": {"num_classes": 1}}"#).is_err());
        assert!(HParams::from_json_str(r#"{"model": {"hidden_units": 0}}"#).is_err());
        assert!(HParams::from_json_str(r#"{"train": {"lr": 0.0}}"#).is_err());
        assert!(HParams::from_json_str(r#"{"signal": {"hop_length": 0}}"#).is_err());
        assert!(
            HParams::from_json_str(r#"{"signal": {"duration": 0.001, "hop_length": 200}}"#)
                .is_err()
        );
    }

    #[test]
    fn nan_lr_and_duration_rejected() {
        let mut hp = HParams::default();
        hp.train.lr = f64::NAN;
        assert!(matches!(hp.validate(), Err(Error::Config(_))));

        let mut hp = HParams::default();
        hp.signal.duration = f64::NAN;
        assert!(matches!(hp.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = HParams::from_json_file("/nonexistent/hparams.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
