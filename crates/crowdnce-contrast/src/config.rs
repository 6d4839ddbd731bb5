//! Contrastive loss configuration.

use std::fmt;
use std::str::FromStr;

use crowdnce_sampler::{SamplerConfig, SamplingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ContrastError;

/// Which contrastive objective to optimise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastLossKind {
    /// InfoNCE with the positive as class 0.
    Nce,
}

impl fmt::Display for ContrastLossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nce => f.write_str("nce"),
        }
    }
}

impl FromStr for ContrastLossKind {
    type Err = ContrastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nce" => Ok(Self::Nce),
            other => Err(ContrastError::UnknownLoss {
                name: other.to_string(),
            }),
        }
    }
}

/// Parameters of the contrastive path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Sampling strategy. Default: event.
    pub sampling: SamplingStrategy,
    /// Objective. Default: nce.
    pub loss: ContrastLossKind,
    /// Weight of the contrastive term in the total loss; 0 disables the
    /// whole path. Default: 0.05.
    pub weight: f64,
    /// Number of future steps used as seeds. Default: 4.
    pub horizon: usize,
    /// Softmax temperature. Default: 0.2.
    pub temperature: f64,
    /// Sampler parameters.
    pub sampler: SamplerConfig,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingStrategy::Event,
            loss: ContrastLossKind::Nce,
            weight: 0.05,
            horizon: 4,
            temperature: 0.2,
            sampler: SamplerConfig::default(),
        }
    }
}

impl ContrastConfig {
    /// Whether the contrastive path runs at all.
    pub fn enabled(&self) -> bool {
        self.weight > 0.0
    }

    /// Check structural invariants, including the sampler's.
    pub fn validate(&self) -> Result<(), ContrastError> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ContrastError::InvalidConfig {
                reason: format!("weight must be finite and >= 0, got {}", self.weight),
            });
        }
        if self.horizon == 0 {
            return Err(ContrastError::InvalidConfig {
                reason: "horizon must be at least 1".into(),
            });
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(ContrastError::InvalidConfig {
                reason: format!("temperature must be positive, got {}", self.temperature),
            });
        }
        self.sampler.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_training_script() {
        let cfg = ContrastConfig::default();
        assert_eq!(cfg.sampling, SamplingStrategy::Event);
        assert_eq!(cfg.horizon, 4);
        assert!(cfg.enabled());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_loss_fails_fast() {
        assert!(matches!(
            "triplet".parse::<ContrastLossKind>(),
            Err(ContrastError::UnknownLoss { .. })
        ));
        assert_eq!("nce".parse::<ContrastLossKind>().unwrap(), ContrastLossKind::Nce);
    }

    #[test]
    fn zero_temperature_rejected() {
        let cfg = ContrastConfig {
            temperature: 0.0,
            ..ContrastConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_tags() {
        let cfg: ContrastConfig =
            serde_json::from_str(r#"{"sampling":"local","weight":0.0}"#).unwrap();
        assert_eq!(cfg.sampling, SamplingStrategy::Local);
        assert!(!cfg.enabled());
        assert_eq!(cfg.horizon, 4);
    }
}
