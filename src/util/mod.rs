// Copyright (c) 2024 Mike Tsao

//! System utilities.

/// Commonly used imports.
pub mod prelude {
    pub use super::{
        midi::{HeldNotes, MidiUtils},
        rng::Rng,
        settings::{SettingsError, SynthSettings, SynthSettingsBuilder},
    };
}

pub use midi::{HeldNotes, MidiUtils};
pub use rng::Rng;
pub use settings::{SettingsError, SynthSettings, SynthSettingsBuilder};

mod midi;
mod rng;
mod settings;
