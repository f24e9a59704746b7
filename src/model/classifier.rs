//! Speaker classification model: input contract, tower construction and
//! training-step wiring around [`SpeakerEmbedding`].
//!
//! ```text
//! batch { wav, x, speaker_id }
//!   → validate against the declared inputs
//!   → embedding(x, mode)          scope "embedding"    logits [n, C]
//!   → softmax                     "probability"        [n, C]
//!   → arg-max                     "prediction"         [n] u32
//!   → cross-entropy(logits, id)   "loss"               scalar
//!   → mean(prediction == id)      "accuracy"           scalar
//! ```
//!
//! Parameters live in a [`ParameterRegistry`]. Every model built against the
//! same registry is another tower over the same weights.

use candle_core::Tensor;
use candle_nn::AdamW;

use crate::config::HParams;
use crate::inputs::{input_descs, Batch, InputDesc};
use crate::model::embedding::SpeakerEmbedding;
use crate::model::Mode;
use crate::params::ParameterRegistry;
use crate::train::{self, StepSummary};
use crate::{Error, Result};

const EMBEDDING_SCOPE: &str = "embedding";

#[derive(Debug, Clone)]
pub struct ClassificationModel {
    embedding: SpeakerEmbedding,
    inputs: Vec<InputDesc>,
    hp: HParams,
}

/// Tensors produced by one tower invocation.
#[derive(Debug, Clone)]
pub struct TowerOutput {
    /// Class logits `[n, num_classes]`.
    pub embedding: Tensor,
    pub probability: Tensor,
    /// Arg-max class, u32 `[n]`.
    pub prediction: Tensor,
    /// Mean cross-entropy, scalar.
    pub loss: Tensor,
    /// Fraction of correct predictions, scalar.
    pub accuracy: Tensor,
}

impl TowerOutput {
    /// Look up an output by its graph name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        match name {
            "embedding" => Some(&self.embedding),
            "probability" => Some(&self.probability),
            "prediction" => Some(&self.prediction),
            "loss" => Some(&self.loss),
            "accuracy" => Some(&self.accuracy),
            _ => None,
        }
    }

    /// Loss and accuracy as host scalars.
    pub fn summary(&self) -> Result<StepSummary> {
        Ok(StepSummary {
            loss: self.loss.to_scalar::<f32>()?,
            accuracy: self.accuracy.to_scalar::<f32>()?,
        })
    }
}

impl ClassificationModel {
    /// Build (or reuse) the parameters under the `embedding` scope.
    pub fn new(hp: &HParams, registry: &ParameterRegistry) -> Result<Self> {
        hp.validate()?;
        let before = registry.len();
        let embedding = SpeakerEmbedding::new(
            &hp.model,
            hp.signal.n_mels,
            registry.builder().pp(EMBEDDING_SCOPE),
        )?;
        tracing::info!(
            num_banks = hp.model.num_banks,
            hidden_units = hp.model.hidden_units,
            num_highway = hp.model.num_highway,
            norm_type = ?hp.model.norm_type,
            num_classes = hp.model.num_classes,
            created = registry.len() - before,
            total = registry.len(),
            "built classification tower"
        );
        Ok(Self {
            embedding,
            inputs: input_descs(&hp.signal),
            hp: hp.clone(),
        })
    }

    /// Declared inputs: `wav`, `x`, `speaker_id`.
    pub fn inputs(&self) -> &[InputDesc] {
        &self.inputs
    }

    pub fn hparams(&self) -> &HParams {
        &self.hp
    }

    /// Class logits for `x: [n, t, n_mels]`.
    pub fn embedding(&self, x: &Tensor, mode: Mode) -> Result<Tensor> {
        self.embedding.forward(x, mode)
    }

    /// GRU summary vector `[n, hidden_units]`, before the classification head.
    pub fn summary_vector(&self, x: &Tensor, mode: Mode) -> Result<Tensor> {
        self.embedding.summarize(x, mode)
    }

    /// Run one tower over `batch`: forward pass, probability, prediction,
    /// loss and accuracy.
    pub fn build_graph(&self, batch: &Batch, mode: Mode) -> Result<TowerOutput> {
        batch.validate(&self.inputs)?;
        self.check_label_range(&batch.speaker_id)?;

        let logits = self.embedding(&batch.x, mode)?;
        let probability = train::probability(&logits)?;
        let prediction = train::prediction(&probability)?;
        let loss = train::loss(&logits, &batch.speaker_id)?;
        let accuracy = train::accuracy(&prediction, &batch.speaker_id)?;

        let out = TowerOutput {
            embedding: logits,
            probability,
            prediction,
            loss,
            accuracy,
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            let summary = out.summary()?;
            for (name, value) in summary.scalars() {
                tracing::debug!(summary = name, value, ?mode, "step summary");
            }
        }
        Ok(out)
    }

    /// Adam over the registry's trainable parameters at the configured rate.
    pub fn optimizer(&self, registry: &ParameterRegistry) -> Result<AdamW> {
        train::adam(registry, self.hp.train.lr)
    }

    fn check_label_range(&self, labels: &Tensor) -> Result<()> {
        if labels.elem_count() == 0 {
            return Ok(());
        }
        let max = labels.max(0)?.to_scalar::<u32>()? as usize;
        if max >= self.hp.model.num_classes {
            return Err(Error::Label(format!(
                "speaker id {max} out of range for {} classes",
                self.hp.model.num_classes
            )));
        }
        Ok(())
    }
}
