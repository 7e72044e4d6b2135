// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        AudioBuffer, BeatValue, BipolarNormal, FrequencyHz, MidiBuffer, MidiChannel, MidiEvent,
        MidiMessage, Normal, ParameterType, Sample, SampleRate, SampleType, Seconds, Tempo,
        TransportInfo, u7,
    };
}

pub use {
    buffers::{AudioBuffer, MidiBuffer},
    midi::{u4, u7, MidiChannel, MidiEvent, MidiMessage},
    numbers::{FrequencyHz, ParameterType, Sample, SampleType},
    ranges::{BipolarNormal, Normal, RangedF64},
    time::{BeatValue, SampleRate, Seconds, Tempo, TransportInfo},
};

mod buffers;
mod midi;
mod numbers;
mod ranges;
mod time;
