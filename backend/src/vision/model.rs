use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use tch::nn::{self, ModuleT};
use tch::{CModule, Device, Kind, TchError, Tensor};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model error: {0}")]
    Model(#[from] TchError),
    #[error("Model produced {actual} scores, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
    #[error("Model produced a non-finite score for class {index}")]
    NonFiniteScore { index: usize },
    #[error("Input tensor is not contiguous")]
    NonContiguousInput,
    #[error("Model lock poisoned")]
    Poisoned,
    #[error("Inference task failed: {0}")]
    Blocking(String),
}

/// A loaded classification network. Implementations own their weights for
/// the whole process and are shared read-only between requests.
pub trait Classifier: Send + Sync {
    /// Per-class scores for a single preprocessed image.
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

fn to_tensor(input: &Array4<f32>, device: Device) -> Result<Tensor, InferenceError> {
    let contiguous = input.as_standard_layout();
    let data = contiguous
        .as_slice()
        .ok_or(InferenceError::NonContiguousInput)?;
    let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
    Ok(Tensor::from_slice(data).view(shape.as_slice()).to_device(device))
}

/// One finite score per class.
pub fn check_scores(scores: &[f32], expected: usize) -> Result<(), InferenceError> {
    if scores.len() != expected {
        return Err(InferenceError::OutputShape {
            expected,
            actual: scores.len(),
        });
    }
    match scores.iter().position(|s| !s.is_finite()) {
        Some(index) => Err(InferenceError::NonFiniteScore { index }),
        None => Ok(()),
    }
}

fn flatten_scores(output: Tensor, expected: usize) -> Result<Vec<f32>, InferenceError> {
    let scores: Vec<f32> = output
        .to_kind(Kind::Float)
        .to_device(Device::Cpu)
        .view([-1])
        .try_into()?;
    check_scores(&scores, expected)?;
    Ok(scores)
}

#[derive(Debug, Default)]
pub struct WeightLoad {
    pub loaded: usize,
    /// Store variables left at their initial values, sorted by name.
    pub untouched: Vec<String>,
}

/// Copy every checkpoint tensor whose name and shape match a store variable.
/// Anything else keeps its initial value, so an ImageNet checkpoint with a
/// 1000-way `classifier.*` can seed a backbone with a different head.
pub fn load_matching_weights(vs: &nn::VarStore, path: &Path) -> Result<WeightLoad, TchError> {
    let checkpoint: HashMap<String, Tensor> = Tensor::load_multi(path)?.into_iter().collect();
    let mut variables = vs.variables();
    let mut report = WeightLoad::default();

    tch::no_grad(|| -> Result<(), TchError> {
        for (name, var) in variables.iter_mut() {
            match checkpoint.get(name) {
                Some(value) if value.size() == var.size() => {
                    var.f_copy_(value)?;
                    report.loaded += 1;
                }
                Some(value) => {
                    log::debug!(
                        "Skipping {}: checkpoint shape {:?}, model shape {:?}",
                        name,
                        value.size(),
                        var.size()
                    );
                    report.untouched.push(name.clone());
                }
                None => report.untouched.push(name.clone()),
            }
        }
        Ok(())
    })?;

    report.untouched.sort();
    Ok(report)
}

/// DenseNet-121 with a multi-label head; every output unit goes through its
/// own sigmoid.
///
/// Weights are seeded from a checkpoint by name and shape. An ImageNet
/// DenseNet checkpoint fills the backbone and leaves the 14-way head random,
/// so scores carry no diagnostic meaning until trained head weights are
/// supplied. Without a checkpoint the whole network is random.
pub struct XrayModel {
    net: Mutex<Box<dyn ModuleT>>,
    _vs: nn::VarStore,
    device: Device,
    num_classes: usize,
}

impl XrayModel {
    pub fn load(weights: Option<&Path>, num_classes: usize) -> Result<Self, TchError> {
        let device = Device::cuda_if_available();
        let mut vs = nn::VarStore::new(device);
        let net = tch::vision::densenet::densenet121(&vs.root(), num_classes as i64);

        let head_random = match weights {
            Some(path) => {
                let report = load_matching_weights(&vs, path)?;
                log::info!(
                    "Loaded {} X-ray weight tensors from {}",
                    report.loaded,
                    path.display()
                );
                if let Some(name) = report
                    .untouched
                    .iter()
                    .find(|name| !name.starts_with("classifier."))
                {
                    return Err(TchError::Shape(format!(
                        "checkpoint {} has no matching tensor for backbone variable {}",
                        path.display(),
                        name
                    )));
                }
                !report.untouched.is_empty()
            }
            None => {
                log::warn!("No X-ray weights configured; the whole network is randomly initialised");
                true
            }
        };
        if head_random {
            log::warn!(
                "X-ray classifier head is randomly initialised; predictions are not meaningful"
            );
        }
        vs.freeze();
        log::info!("X-ray model ready on {:?}", device);

        Ok(Self {
            net: Mutex::new(Box::new(net)),
            _vs: vs,
            device,
            num_classes,
        })
    }
}

impl Classifier for XrayModel {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let tensor = to_tensor(input, self.device)?;
        let net = self.net.lock().map_err(|_| InferenceError::Poisoned)?;
        let output = tch::no_grad(|| net.forward_t(&tensor, false));
        flatten_scores(output.sigmoid(), self.num_classes)
    }
}

/// TorchScript CT classifier whose output is already a probability vector.
pub struct CtScanModel {
    module: Mutex<CModule>,
    device: Device,
    num_classes: usize,
}

impl CtScanModel {
    pub fn load(path: &Path, num_classes: usize) -> Result<Self, TchError> {
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(path, device)?;
        module.set_eval();
        log::info!("CT model loaded from {} on {:?}", path.display(), device);

        Ok(Self {
            module: Mutex::new(module),
            device,
            num_classes,
        })
    }

    /// Startup helper: a missing or broken model file leaves the service
    /// running without a model.
    pub fn try_load(path: &Path, num_classes: usize) -> Option<Self> {
        if !path.exists() {
            log::error!("CT model file not found at {}", path.display());
            return None;
        }
        match Self::load(path, num_classes) {
            Ok(model) => Some(model),
            Err(e) => {
                log::error!("Error loading CT model: {}", e);
                None
            }
        }
    }
}

impl Classifier for CtScanModel {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let tensor = to_tensor(input, self.device)?;
        let module = self.module.lock().map_err(|_| InferenceError::Poisoned)?;
        let output = tch::no_grad(|| module.forward_ts(&[tensor]))?;
        flatten_scores(output, self.num_classes)
    }
}
