// Copyright (c) 2024 Mike Tsao

//! Puts the parts together into something a host's audio callback can drive.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{HostSimulator, KeyboardQueue, SynthEngine};
}

pub use {engine::SynthEngine, host::HostSimulator, keyboard::KeyboardQueue};

mod engine;
mod host;
mod keyboard;
