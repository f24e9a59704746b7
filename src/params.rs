//! Parameter registry shared by every tower of the model.
//!
//! Parameters live in a candle [`VarMap`] keyed by dotted name
//! (`embedding.highwaynet_0.dense1.weight`). Building a layer through
//! [`ParameterRegistry::builder`] either creates the named parameter or
//! returns the existing one, and fails if the existing one has a different
//! shape. Building the same model twice therefore shares one parameter set.

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};

/// Suffixes of non-trainable state stored next to the weights.
const RUNNING_STAT_SUFFIXES: [&str; 2] = ["running_mean", "running_var"];

#[derive(Clone)]
pub struct ParameterRegistry {
    varmap: VarMap,
    dtype: DType,
    device: Device,
}

impl ParameterRegistry {
    pub fn new(dtype: DType, device: &Device) -> Self {
        Self {
            varmap: VarMap::new(),
            dtype,
            device: device.clone(),
        }
    }

    /// A get-or-create builder rooted at the registry.
    pub fn builder(&self) -> VarBuilder<'static> {
        VarBuilder::from_varmap(&self.varmap, self.dtype, &self.device)
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Number of named parameters.
    pub fn len(&self) -> usize {
        self.varmap.all_vars().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted parameter names.
    pub fn names(&self) -> Vec<String> {
        let data = self.varmap.data().lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = data.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total scalar count across all parameters.
    pub fn num_elements(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    pub fn get(&self, name: &str) -> Option<Tensor> {
        let data = self.varmap.data().lock().unwrap_or_else(|e| e.into_inner());
        data.get(name).map(|v| v.as_tensor().clone())
    }

    /// Variables the optimizer should update; running batch-norm statistics
    /// are excluded.
    pub fn trainable_vars(&self) -> Vec<Var> {
        let data = self.varmap.data().lock().unwrap_or_else(|e| e.into_inner());
        let mut named: Vec<(&String, &Var)> = data
            .iter()
            .filter(|(name, _)| !is_running_stat(name))
            .collect();
        named.sort_by(|a, b| a.0.cmp(b.0));
        named.into_iter().map(|(_, v)| v.clone()).collect()
    }
}

impl std::fmt::Debug for ParameterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterRegistry")
            .field("dtype", &self.dtype)
            .field("device", &self.device)
            .field("len", &self.len())
            .finish()
    }
}

fn is_running_stat(name: &str) -> bool {
    RUNNING_STAT_SUFFIXES.iter().any(|s| name.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_by_name() {
        let registry = ParameterRegistry::new(DType::F32, &Device::Cpu);
        let vb = registry.builder();
        let a = vb.pp("layer").get_with_hints((4, 3), "weight", candle_nn::init::ZERO).unwrap();
        let b = registry
            .builder()
            .pp("layer")
            .get_with_hints((4, 3), "weight", candle_nn::init::ONE)
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["layer.weight".to_string()]);
        // The second lookup returns the first tensor, not a freshly initialised one.
        let diff: f32 = (&a - &b).unwrap().abs().unwrap().sum_all().unwrap().to_scalar().unwrap();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn reuse_with_other_shape_fails() {
        let registry = ParameterRegistry::new(DType::F32, &Device::Cpu);
        registry
            .builder()
            .get_with_hints((4, 3), "w", candle_nn::init::ZERO)
            .unwrap();
        assert!(registry
            .builder()
            .get_with_hints((3, 4), "w", candle_nn::init::ZERO)
            .is_err());
    }

    #[test]
    fn running_stats_are_not_trainable() {
        let registry = ParameterRegistry::new(DType::F32, &Device::Cpu);
        let cfg = candle_nn::BatchNormConfig::default();
        candle_nn::batch_norm(8, cfg, registry.builder().pp("bn")).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.num_elements(), 32);
        assert_eq!(registry.trainable_vars().len(), 2);
        assert!(registry.get("bn.running_mean").is_some());
        assert!(registry.get("bn.missing").is_none());
    }
}
