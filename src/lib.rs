// Copyright (c) 2024 Mike Tsao

#![deny(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Arpsynth is the real-time core of a small polyphonic synthesizer with a
//! built-in arpeggiator.
//!
//! There are a couple of ways to use it, depending on how much control you
//! need.
//!
//! * *Easiest*: Create a [SynthEngine] from [SynthSettings](util::SynthSettings),
//! call [SynthEngine::prepare()] when the host's audio configuration changes,
//! and call [SynthEngine::render_block()] from the audio callback. Turn knobs
//! through the [ParameterBridge](parameters::ParameterBridge) returned by
//! [SynthEngine::parameters()], from any thread.
//! * *More control*: Assemble the [cores] and [elements] yourself. An
//! [Arpeggiator](cores::Arpeggiator) rewrites MIDI; a
//! [Synthesizer](elements::Synthesizer) of [SynthVoice](cores::SynthVoice)s
//! turns MIDI into audio.
//!
//! Nothing in the render path allocates, locks, or blocks once buffers have
//! been sized.

/// A collection of imports that are useful to users of this crate. `use
/// arpsynth::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        cores::prelude::*, elements::prelude::*, orchestration::prelude::*,
        parameters::prelude::*, traits::prelude::*, types::prelude::*, util::prelude::*,
    };
}

// Fundamental structures that are important enough to re-export at top level.
pub use orchestration::SynthEngine;

pub mod cores;
pub mod elements;
pub mod orchestration;
pub mod parameters;
pub mod traits;
pub mod types;
pub mod util;
