//! Settings type definitions.
//!
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it wants to change.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleySettings {
    pub app_name: String,
    pub ollama: OllamaSettings,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

impl Default for ParleySettings {
    fn default() -> Self {
        Self {
            app_name: "parley".into(),
            ollama: OllamaSettings::default(),
            simulation: SimulationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ParleySettings {
    /// Reject values that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.ollama.base_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue("ollama.base_url is empty".into()));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(SettingsError::InvalidValue("ollama.model is empty".into()));
        }
        for (key, value) in [
            ("simulation.timeout_secs", self.simulation.timeout_secs),
            (
                "simulation.generation_timeout_secs",
                self.simulation.generation_timeout_secs,
            ),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(SettingsError::InvalidValue(format!(
                        "{key} must be a non-negative number, got {v}"
                    )));
                }
                if Duration::try_from_secs_f64(v).is_err() {
                    return Err(SettingsError::InvalidValue(format!(
                        "{key} is too large to be a duration, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Connection to the Ollama generation endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    /// HTTP client timeout for a single request.
    pub request_timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://host.containers.internal:11434".into(),
            model: "gpt-oss-20b".into(),
            request_timeout_secs: 60,
        }
    }
}

impl OllamaSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Budgets applied to simulation jobs. Zero or absent means unlimited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Wall-clock budget for a whole job.
    pub timeout_secs: Option<f64>,
    /// Wall-clock budget for each generation call.
    pub generation_timeout_secs: Option<f64>,
    /// Advisory cap on tokens per generated message.
    pub max_tokens_per_message: Option<u32>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: Some(600.0),
            generation_timeout_secs: None,
            max_tokens_per_message: None,
        }
    }
}

impl SimulationSettings {
    pub fn job_timeout(&self) -> Option<Duration> {
        positive_secs(self.timeout_secs)
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        positive_secs(self.generation_timeout_secs)
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens_per_message.filter(|n| *n > 0)
    }
}

fn positive_secs(secs: Option<f64>) -> Option<Duration> {
    secs.filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ParleySettings::default();
        assert_eq!(s.app_name, "parley");
        assert_eq!(s.ollama.model, "gpt-oss-20b");
        assert_eq!(s.ollama.request_timeout(), Duration::from_secs(60));
        assert_eq!(s.simulation.job_timeout(), Some(Duration::from_secs(600)));
        assert!(s.simulation.generation_timeout().is_none());
        assert!(s.simulation.max_tokens().is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_budget_means_unlimited() {
        let sim = SimulationSettings {
            timeout_secs: Some(0.0),
            generation_timeout_secs: Some(0.0),
            max_tokens_per_message: Some(0),
        };
        assert!(sim.job_timeout().is_none());
        assert!(sim.generation_timeout().is_none());
        assert!(sim.max_tokens().is_none());
    }

    #[test]
    fn fractional_seconds() {
        let sim = SimulationSettings {
            timeout_secs: Some(0.05),
            ..Default::default()
        };
        assert_eq!(sim.job_timeout(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: ParleySettings =
            serde_json::from_str(r#"{"ollama": {"model": "llama3"}}"#).unwrap();
        assert_eq!(s.ollama.model, "llama3");
        assert_eq!(s.ollama.base_url, "http://host.containers.internal:11434");
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn validate_rejects_negative_timeout() {
        let mut s = ParleySettings::default();
        s.simulation.generation_timeout_secs = Some(-1.0);
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn oversized_budget_is_rejected_not_panicking() {
        let mut s = ParleySettings::default();
        s.simulation.timeout_secs = Some(1e20);
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
        assert!(s.simulation.job_timeout().is_none());

        s.simulation.timeout_secs = None;
        s.simulation.generation_timeout_secs = Some(f64::MAX);
        assert!(s.validate().is_err());
        assert!(s.simulation.generation_timeout().is_none());
    }

    #[test]
    fn validate_rejects_empty_model() {
        let mut s = ParleySettings::default();
        s.ollama.model = " ".into();
        assert!(s.validate().is_err());
    }
}
