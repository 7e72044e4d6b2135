// Copyright (c) 2024 Mike Tsao

//! Building blocks for other parts of the system, especially the synth voice
//! and the voice manager.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Envelope, EnvelopeBuilder, EnvelopeStage, Oscillator, OscillatorBuilder, PanStage,
        SmoothedGain, Synthesizer, VoiceCount, VoiceStore, Waveform,
    };
}

pub use generators::{
    Envelope, EnvelopeBuilder, EnvelopeStage, Oscillator, OscillatorBuilder, Waveform,
};
pub use modulators::{PanStage, SmoothedGain};
pub use synthesizers::Synthesizer;
pub use voices::{VoiceCount, VoiceStore};

mod generators;
mod modulators;
mod synthesizers;
mod voices;
