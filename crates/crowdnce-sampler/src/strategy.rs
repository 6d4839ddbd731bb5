//! Sampling strategy tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SamplerError;

/// Which negative-sampling scheme to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Random candidates around the first future position of the agent.
    Local,
    /// Neighbour territories and primary/neighbour boundaries over the
    /// whole contrast horizon.
    Event,
}

impl SamplingStrategy {
    /// The tag this strategy parses from.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingStrategy {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "event" => Ok(Self::Event),
            other => Err(SamplerError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags() {
        assert_eq!("local".parse::<SamplingStrategy>(), Ok(SamplingStrategy::Local));
        assert_eq!("event".parse::<SamplingStrategy>(), Ok(SamplingStrategy::Event));
        assert_eq!(SamplingStrategy::Event.to_string(), "event");
    }

    #[test]
    fn unknown_tag_fails_fast() {
        let err = "social".parse::<SamplingStrategy>().unwrap_err();
        assert_eq!(
            err,
            SamplerError::UnknownStrategy {
                name: "social".into()
            }
        );
    }
}
