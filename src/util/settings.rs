// Copyright (c) 2024 Mike Tsao

//! Structs that hold configuration information about the engine. Intended to
//! be serialized.

use crate::{
    parameters::{ParameterBridge, ParameterId},
    prelude::*,
};
use derivative::Derivative;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors for loading and validating [SynthSettings].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The text wasn't valid settings JSON.
    #[error("couldn't parse settings: {0}")]
    Json(#[from] serde_json::Error),
    /// A value was out of range.
    #[error("invalid setting {name}: {reason}")]
    Invalid {
        /// The offending field.
        name: &'static str,
        /// What's wrong with it.
        reason: &'static str,
    },
}

/// Construction-time configuration for a
/// [SynthEngine](crate::orchestration::SynthEngine). Everything here is fixed
/// for the engine's lifetime; live control goes through the
/// [ParameterBridge].
#[derive(Debug, Clone, PartialEq, Builder, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(rename_all = "kebab-case", default)]
pub struct SynthSettings {
    /// Size of the fixed voice pool. Notes beyond this many are dropped.
    #[derivative(Default(value = "SynthSettings::DEFAULT_VOICE_COUNT"))]
    pub voice_count: usize,

    /// Length of the per-voice gain smoothing ramp.
    #[derivative(Default(value = "Seconds(SynthSettings::DEFAULT_GAIN_RAMP_SECONDS)"))]
    pub gain_ramp: Seconds,

    /// Seeds the arpeggiator's random choices. None asks the OS for a seed.
    pub seed: Option<u64>,

    /// How many on-screen keyboard messages can wait between blocks.
    #[derivative(Default(value = "SynthSettings::DEFAULT_KEYBOARD_QUEUE_CAPACITY"))]
    pub keyboard_queue_capacity: usize,

    /// Initial values for parameter slots, overriding the built-in defaults.
    pub parameters: BTreeMap<ParameterId, ParameterType>,
}
impl SynthSettingsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.voice_count == Some(0) {
            return Err("voice-count must be at least 1".to_string());
        }
        if self.keyboard_queue_capacity == Some(0) {
            return Err("keyboard-queue-capacity must be at least 1".to_string());
        }
        Ok(())
    }
}
impl SynthSettings {
    #[allow(missing_docs)]
    pub const DEFAULT_VOICE_COUNT: usize = 8;
    #[allow(missing_docs)]
    pub const DEFAULT_GAIN_RAMP_SECONDS: f64 = 0.01;
    #[allow(missing_docs)]
    pub const DEFAULT_KEYBOARD_QUEUE_CAPACITY: usize = 256;

    /// Parses and validates settings JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        log::info!(
            "Loaded settings: {} voices, {} parameter overrides",
            settings.voice_count,
            settings.parameters.len()
        );
        Ok(settings)
    }

    #[allow(missing_docs)]
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the invariants that serde can't express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.voice_count == 0 {
            return Err(SettingsError::Invalid {
                name: "voice-count",
                reason: "must be at least 1",
            });
        }
        if self.keyboard_queue_capacity == 0 {
            return Err(SettingsError::Invalid {
                name: "keyboard-queue-capacity",
                reason: "must be at least 1",
            });
        }
        if !self.gain_ramp.0.is_finite() || self.gain_ramp.0 < 0.0 {
            return Err(SettingsError::Invalid {
                name: "gain-ramp",
                reason: "must be a nonnegative number of seconds",
            });
        }
        Ok(())
    }

    /// A [ParameterBridge] initialized from built-in defaults plus this
    /// struct's overrides.
    pub fn create_parameter_bridge(&self) -> ParameterBridge {
        ParameterBridge::new_with(|id| {
            self.parameters
                .get(&id)
                .copied()
                .unwrap_or_else(|| id.default_value())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = SynthSettings::default();
        assert_eq!(s.voice_count, 8);
        assert_eq!(s.gain_ramp, Seconds(0.01));
        assert_eq!(s.keyboard_queue_capacity, 256);
        assert!(s.seed.is_none());
        assert!(s.parameters.is_empty());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn json_round_trip_with_overrides() {
        let s = SynthSettings::from_json(
            r#"{ "voice-count": 4, "seed": 7, "parameters": { "noteDur": 0.5, "osc": 2 } }"#,
        )
        .unwrap();
        assert_eq!(s.voice_count, 4);
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.keyboard_queue_capacity, 256);

        let bridge = s.create_parameter_bridge();
        assert_eq!(bridge.get(ParameterId::NoteDur), 0.5);
        assert_eq!(bridge.get(ParameterId::Osc), 2.0);
        assert_eq!(bridge.get(ParameterId::Gain), 0.5);

        let json = s.to_json().unwrap();
        assert!(json.contains("\"noteDur\""));
        assert_eq!(SynthSettings::from_json(&json).unwrap(), s);
    }

    #[test]
    fn bad_settings_are_rejected() {
        assert!(matches!(
            SynthSettings::from_json(r#"{ "voice-count": 0 }"#),
            Err(SettingsError::Invalid {
                name: "voice-count",
                ..
            })
        ));
        assert!(matches!(
            SynthSettings::from_json(r#"{ "parameters": { "cutoff": 1.0 } }"#),
            Err(SettingsError::Json(_))
        ));
        assert!(SynthSettingsBuilder::default()
            .voice_count(0)
            .build()
            .is_err());
        assert_eq!(
            SynthSettingsBuilder::default()
                .voice_count(2)
                .build()
                .unwrap()
                .voice_count,
            2
        );
    }
}
