//! Loss, accuracy and optimizer hooks for an external training loop.
//!
//! The loop itself (step scheduling, checkpoints, data loading) lives with the
//! caller. A typical step:
//!
//! ```no_run
//! # use speaker_classifier::{model::{classifier::ClassificationModel, Mode}, inputs::Batch};
//! # use candle_nn::Optimizer;
//! # fn step(model: &ClassificationModel, opt: &mut candle_nn::AdamW, batch: &Batch)
//! #     -> speaker_classifier::Result<()> {
//! let out = model.build_graph(batch, Mode::Train)?;
//! opt.backward_step(&out.loss)?;
//! # Ok(())
//! # }
//! ```

use candle_core::{DType, Tensor, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};

use crate::params::ParameterRegistry;
use crate::{Error, Result};

pub const LOSS_SUMMARY: &str = "train/loss";
pub const ACCURACY_SUMMARY: &str = "train/accuracy";

/// Check that `labels` are rank-1 u32 with one entry per logits row.
pub fn check_labels(logits: &Tensor, labels: &Tensor) -> Result<()> {
    let (n, _) = logits.dims2().map_err(|_| Error::shape("logits", "[n, num_classes]", logits.dims()))?;
    if labels.dtype() != DType::U32 {
        return Err(Error::Label(format!("expected u32, got {:?}", labels.dtype())));
    }
    if labels.dims() != [n].as_slice() {
        return Err(Error::Label(format!(
            "expected shape [{n}], got {:?}",
            labels.dims()
        )));
    }
    Ok(())
}

/// Mean sparse softmax cross-entropy of `logits: [n, C]` against `labels: [n]`.
pub fn loss(logits: &Tensor, labels: &Tensor) -> Result<Tensor> {
    check_labels(logits, labels)?;
    Ok(candle_nn::loss::cross_entropy(logits, labels)?)
}

/// Row-wise softmax probabilities.
pub fn probability(logits: &Tensor) -> Result<Tensor> {
    Ok(candle_nn::ops::softmax(logits, D::Minus1)?)
}

/// Arg-max class per row, as u32.
pub fn prediction(probability: &Tensor) -> Result<Tensor> {
    Ok(probability.argmax(D::Minus1)?.to_dtype(DType::U32)?)
}

/// Fraction of rows where `prediction == labels`, as an f32 scalar.
pub fn accuracy(prediction: &Tensor, labels: &Tensor) -> Result<Tensor> {
    if prediction.dims() != labels.dims() {
        return Err(Error::Label(format!(
            "prediction {:?} and labels {:?} differ in shape",
            prediction.dims(),
            labels.dims()
        )));
    }
    let labels = labels.to_dtype(prediction.dtype())?;
    Ok(prediction.eq(&labels)?.to_dtype(DType::F32)?.mean_all()?)
}

/// Adam over every trainable parameter in `registry`.
///
/// The learning rate is optimizer state, not a parameter: read and change it
/// with [`Optimizer::learning_rate`] / [`Optimizer::set_learning_rate`].
pub fn adam(registry: &ParameterRegistry, lr: f64) -> Result<AdamW> {
    if lr.is_nan() || lr <= 0.0 {
        return Err(Error::Config(format!("lr must be > 0, got {lr}")));
    }
    let params = ParamsAdamW {
        lr,
        weight_decay: 0.0,
        ..Default::default()
    };
    Ok(AdamW::new(registry.trainable_vars(), params)?)
}

/// Scalars reported for one training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummary {
    pub loss: f32,
    pub accuracy: f32,
}

impl StepSummary {
    pub fn scalars(&self) -> [(&'static str, f32); 2] {
        [(LOSS_SUMMARY, self.loss), (ACCURACY_SUMMARY, self.accuracy)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn scalar(t: &Tensor) -> f32 {
        t.to_scalar::<f32>().unwrap()
    }

    #[test]
    fn accuracy_all_correct_and_all_wrong() {
        let device = Device::Cpu;
        let labels = Tensor::new(&[3u32, 0, 7, 7], &device).unwrap();
        let same = labels.clone();
        assert_eq!(scalar(&accuracy(&same, &labels).unwrap()), 1.0);

        let wrong = Tensor::new(&[2u32, 1, 6, 0], &device).unwrap();
        assert_eq!(scalar(&accuracy(&wrong, &labels).unwrap()), 0.0);

        let half = Tensor::new(&[3u32, 1, 7, 0], &device).unwrap();
        assert!((scalar(&accuracy(&half, &labels).unwrap()) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn accuracy_from_logits() {
        let device = Device::Cpu;
        let logits = Tensor::new(&[[0.1f32, 2.0, -1.0], [5.0, 0.0, 0.0]], &device).unwrap();
        let pred = prediction(&probability(&logits).unwrap()).unwrap();
        assert_eq!(pred.to_vec1::<u32>().unwrap(), vec![1, 0]);
        let labels = Tensor::new(&[1u32, 0], &device).unwrap();
        assert_eq!(scalar(&accuracy(&pred, &labels).unwrap()), 1.0);
    }

    #[test]
    fn loss_is_non_negative_scalar() {
        let device = Device::Cpu;
        let logits = Tensor::randn(0f32, 3.0, (6, 5), &device).unwrap();
        let labels = Tensor::new(&[0u32, 1, 2, 3, 4, 0], &device).unwrap();
        let l = loss(&logits, &labels).unwrap();
        assert_eq!(l.rank(), 0);
        assert!(scalar(&l) >= 0.0);
    }

    #[test]
    fn uniform_logits_give_log_num_classes() {
        let device = Device::Cpu;
        let logits = Tensor::zeros((3, 4), DType::F32, &device).unwrap();
        let labels = Tensor::new(&[0u32, 1, 3], &device).unwrap();
        let l = scalar(&loss(&logits, &labels).unwrap());
        assert!((l - 4f32.ln()).abs() < 1e-5, "loss {l}");
    }

    #[test]
    fn confident_correct_logits_approach_zero_loss() {
        let device = Device::Cpu;
        let labels = [2u32, 0, 1];
        let mut rows = vec![0f32; 9];
        for (i, &c) in labels.iter().enumerate() {
            rows[i * 3 + c as usize] = 50.0;
        }
        let logits = Tensor::from_vec(rows, (3, 3), &device).unwrap();
        let labels = Tensor::new(&labels, &device).unwrap();
        let l = scalar(&loss(&logits, &labels).unwrap());
        assert!((0.0..1e-6).contains(&l), "loss {l}");
    }

    #[test]
    fn probability_rows_sum_to_one() {
        let device = Device::Cpu;
        let logits = Tensor::randn(0f32, 4.0, (4, 7), &device).unwrap();
        let sums: Vec<f32> = probability(&logits).unwrap().sum(1).unwrap().to_vec1().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bad_labels_rejected() {
        let device = Device::Cpu;
        let logits = Tensor::zeros((2, 3), DType::F32, &device).unwrap();

        let f32_labels = Tensor::new(&[0f32, 1.0], &device).unwrap();
        assert!(matches!(loss(&logits, &f32_labels), Err(Error::Label(_))));

        let too_many = Tensor::new(&[0u32, 1, 2], &device).unwrap();
        assert!(matches!(loss(&logits, &too_many), Err(Error::Label(_))));

        let rank2 = Tensor::new(&[[0u32], [1]], &device).unwrap();
        assert!(matches!(loss(&logits, &rank2), Err(Error::Label(_))));

        let rank3_logits = Tensor::zeros((2, 3, 1), DType::F32, &device).unwrap();
        let labels = Tensor::new(&[0u32, 1], &device).unwrap();
        assert!(matches!(loss(&rank3_logits, &labels), Err(Error::Shape { .. })));
    }

    #[test]
    fn adam_learning_rate_is_settable() {
        let registry = ParameterRegistry::new(DType::F32, &Device::Cpu);
        candle_nn::linear(3, 2, registry.builder().pp("lin")).unwrap();
        let mut opt = adam(&registry, 1e-3).unwrap();
        assert!((opt.learning_rate() - 1e-3).abs() < 1e-12);
        opt.set_learning_rate(5e-4);
        assert!((opt.learning_rate() - 5e-4).abs() < 1e-12);
        assert!(adam(&registry, 0.0).is_err());
        assert!(adam(&registry, f64::NAN).is_err());
    }

    #[test]
    fn summary_scalar_names() {
        let s = StepSummary { loss: 1.5, accuracy: 0.25 };
        assert_eq!(s.scalars(), [("train/loss", 1.5), ("train/accuracy", 0.25)]);
    }
}
