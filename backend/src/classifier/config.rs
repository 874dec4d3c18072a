use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::Device;

use super::ClassifierError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub version: f32,
    pub model: ModelConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub architecture: Architecture,
    pub weights_path: PathBuf,
    #[serde(default)]
    pub device: DevicePreference,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    Resnet18,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl DevicePreference {
    pub fn resolve(&self) -> Device {
        match self {
            DevicePreference::Auto => Device::cuda_if_available(),
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Cuda => Device::Cuda(0),
        }
    }
}

impl ClassifierConfig {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ClassifierError> {
        let config: ClassifierConfig = serde_yaml::from_str(yaml)?;
        if config.model.weights_path.as_os_str().is_empty() {
            return Err(ClassifierError::Config("model.weights_path is empty".into()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_config_parses() {
        let yaml = include_str!("../../config/classifier.yaml");
        let config = ClassifierConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.model.architecture, Architecture::Resnet18);
        assert_eq!(config.model.device, DevicePreference::Auto);
        assert_eq!(
            config.model.weights_path,
            PathBuf::from("model/best_model.safetensors")
        );
    }

    #[test]
    fn device_and_architecture_default_when_omitted() {
        let config = ClassifierConfig::from_yaml(
            "version: 1.0\nmodel:\n  weights_path: weights.ot\n",
        )
        .unwrap();
        assert_eq!(config.model.device, DevicePreference::Auto);
        assert_eq!(DevicePreference::Cpu.resolve(), Device::Cpu);
    }

    #[test]
    fn unknown_device_is_rejected() {
        let err = ClassifierConfig::from_yaml(
            "version: 1.0\nmodel:\n  weights_path: weights.ot\n  device: tpu\n",
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::Yaml(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClassifierConfig::load(Path::new("/nonexistent/classifier.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/classifier.yaml"));
    }
}
