use ndarray::Array3;
use shared::FreshnessLabel;
use std::path::Path;
use std::sync::Mutex;
use strum::EnumCount;
use tch::nn::{self, FuncT, ModuleT};
use tch::{Device, Tensor};

use super::config::{Architecture, ClassifierConfig};
use super::preprocess::{self, INPUT_SIZE};
use super::{ClassifierError, ImageClassifier};

const NUM_CLASSES: i64 = FreshnessLabel::COUNT as i64;

/// ResNet-18 with a 20-way head, loaded once and shared across workers.
///
/// The network closure is not `Sync`, so only the forward pass is serialized;
/// decoding and preprocessing run outside the lock.
pub struct FreshnessModel {
    // Owns the parameters the network closure reads from.
    _vs: nn::VarStore,
    net: Mutex<FuncT<'static>>,
    device: Device,
}

impl FreshnessModel {
    pub fn load(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let device = config.model.device.resolve();
        log::info!(
            "Loading {:?} weights from {} on {:?}",
            config.model.architecture,
            config.model.weights_path.display(),
            device
        );
        if !config.model.weights_path.exists() {
            return Err(ClassifierError::Config(format!(
                "weights file not found: {}",
                config.model.weights_path.display()
            )));
        }

        let mut vs = nn::VarStore::new(device);
        let net = build_network(&vs, config.model.architecture);
        vs.load(&config.model.weights_path)?;
        vs.freeze();
        log::info!("Classifier ready with {} output classes", NUM_CLASSES);

        Ok(Self {
            _vs: vs,
            net: Mutex::new(net),
            device,
        })
    }

    /// Runs one forward pass on a preprocessed (3, 224, 224) array and maps the argmax to a label.
    pub fn predict(&self, input: &Array3<f32>) -> Result<FreshnessLabel, ClassifierError> {
        let data = input.as_slice().ok_or_else(|| {
            ClassifierError::Preprocessing("input array is not contiguous".to_string())
        })?;
        let size = INPUT_SIZE as i64;
        let tensor = Tensor::from_slice(data)
            .view([1, 3, size, size])
            .to_device(self.device);

        let logits = {
            let net = self.net.lock().map_err(|_| ClassifierError::LockPoisoned)?;
            tch::no_grad(|| net.forward_t(&tensor, false))
        };

        let index = logits.argmax(-1, false).f_int64_value(&[0])?;
        log::debug!("Predicted class index {}", index);
        usize::try_from(index)
            .ok()
            .and_then(FreshnessLabel::from_index)
            .ok_or(ClassifierError::LabelOutOfRange(index))
    }
}

impl ImageClassifier for FreshnessModel {
    fn classify(&self, image_path: &Path) -> Result<FreshnessLabel, ClassifierError> {
        let input = preprocess::load_image(image_path)?;
        self.predict(&input)
    }
}

fn build_network(vs: &nn::VarStore, architecture: Architecture) -> FuncT<'static> {
    match architecture {
        Architecture::Resnet18 => tch::vision::resnet::resnet18(&vs.root(), NUM_CLASSES),
    }
}

#[cfg(test)]
impl FreshnessModel {
    /// Randomly initialized network, for exercising the inference path without weights.
    fn untrained() -> Self {
        let vs = nn::VarStore::new(Device::Cpu);
        let net = build_network(&vs, Architecture::Resnet18);
        Self {
            _vs: vs,
            net: Mutex::new(net),
            device: Device::Cpu,
        }
    }
}
