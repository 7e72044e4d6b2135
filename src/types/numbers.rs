// Copyright (c) 2024 Mike Tsao

//! Numeric types used throughout the system.

use midly::num::u7;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// The primitive Rust type of a single audio sample. Hosts hand us f32
/// buffers, so that's what we render into.
pub type SampleType = f32;

/// The type of control-rate parameter values. Parameters live in f64 slots.
pub type ParameterType = f64;

/// [Sample] represents a single-channel audio sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Sample(pub SampleType);
impl Sample {
    /// The [SampleType] value of silence.
    pub const SILENCE_VALUE: SampleType = 0.0;
    /// A [Sample] that is silent.
    pub const SILENCE: Sample = Sample(Self::SILENCE_VALUE);
    /// The maximum positive [SampleType] value.
    pub const MAX_VALUE: SampleType = 1.0;
    /// A [Sample] having the maximum positive value.
    pub const MAX: Sample = Sample(Self::MAX_VALUE);
    /// The maximum negative [SampleType] value.
    pub const MIN_VALUE: SampleType = -1.0;
    /// A [Sample] having the maximum negative value.
    pub const MIN: Sample = Sample(Self::MIN_VALUE);
}
impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Sample(value as SampleType)
    }
}
impl From<f32> for Sample {
    fn from(value: f32) -> Self {
        Sample(value)
    }
}
impl From<Sample> for i16 {
    /// Full scale, clipping anything outside [-1.0, 1.0].
    fn from(value: Sample) -> Self {
        (value.0.clamp(Sample::MIN_VALUE, Sample::MAX_VALUE) * i16::MAX as SampleType) as i16
    }
}

/// Frequency in Hertz.
#[derive(Synonym, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct FrequencyHz(pub ParameterType);
impl FrequencyHz {
    /// Concert A.
    pub const A4: FrequencyHz = FrequencyHz(440.0);

    /// Equal-tempered A440 mapping of a MIDI note number to a frequency.
    pub fn from_midi_note(note: u8) -> Self {
        Self(Self::A4.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0))
    }
}
impl From<u7> for FrequencyHz {
    fn from(value: u7) -> Self {
        Self::from_midi_note(value.as_int())
    }
}
