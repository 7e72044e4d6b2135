// Copyright (c) 2024 Mike Tsao

//! The musical devices: the synth voice that makes sound, and the
//! arpeggiator that decides which notes it makes.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        new_synth_voice_manager, Arpeggiator, ArpeggiatorRunState, SynthVoice, SynthVoiceManager,
    };
}

pub use controllers::*;
pub use instruments::*;

mod controllers;
mod instruments;
