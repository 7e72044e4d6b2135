// Copyright (c) 2024 Mike Tsao

//! The traits that define many characteristics and relationships among parts of
//! the system.

use crate::{parameters::VoiceParameters, prelude::*};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{
        Configurable, Configurables, Generates, HandlesMidi, IsVoice, PlaysNotes, TransformsAudio,
    };
}

/// A convenience struct for the fields implied by [Configurable]. Not
/// serde-compliant, because the sample rate belongs to the host, not to a
/// saved patch.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Configurables {
    sample_rate: SampleRate,
}
impl Configurable for Configurables {
    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate
    }
}

/// Something that is [Configurable] is interested in staying in sync with
/// the host's audio configuration.
pub trait Configurable {
    /// Returns this item's sample rate.
    fn sample_rate(&self) -> SampleRate;

    /// The sample rate changed. Implementers should recompute anything
    /// measured in samples.
    #[allow(unused_variables)]
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {}

    /// Sent to indicate that it's time to reset internal state. Oscillators
    /// should reset phase, envelopes should go idle, etc.
    fn reset(&mut self) {}
}

/// Indicates that something knows about MIDI.
pub trait HandlesMidi {
    /// Takes one standard MIDI message. Timing is the caller's job: by the
    /// time this is called, the recipient has rendered everything up to the
    /// message's offset.
    #[allow(unused_variables)]
    fn handle_midi_message(&mut self, channel: MidiChannel, message: MidiMessage) {}
}

/// Something that [Generates] creates the given type `<V>` as its work product
/// over time. Examples are envelopes, which produce a gain level for every
/// sample, and oscillators, which produce a bipolar waveform.
#[allow(unused_variables)]
pub trait Generates<V: Default + Clone>: Send + core::fmt::Debug + Configurable {
    /// Fills a batch of values with new signal. Returns true if the signal was
    /// non-default; for example, an idle envelope fills with zeroes and
    /// returns false.
    fn generate(&mut self, values: &mut [V]) -> bool {
        values.fill(V::default());
        false
    }
}

/// A [TransformsAudio] takes a block of audio that something else has
/// produced, does something to it, and leaves the result in place. It's what
/// effects do.
pub trait TransformsAudio: core::fmt::Debug {
    /// Transforms the current block of the buffer.
    fn transform(&mut self, buffer: &mut AudioBuffer);
}

/// A [PlaysNotes] turns note events into sound. It's what a voice does.
pub trait PlaysNotes {
    /// Whether the voice is making any sound, including any release tail.
    fn is_playing(&self) -> bool;

    /// Starts a note. The voice is expected to start from the beginning of
    /// its envelope with a fresh oscillator phase.
    fn note_on(&mut self, key: u7, velocity: u7);

    /// Begins the release of the current note.
    fn note_off(&mut self, velocity: u7);
}

/// A single voice of a polyphonic instrument.
pub trait IsVoice: PlaysNotes + Configurable + Send + core::fmt::Debug {
    /// Sizes whatever scratch space the voice needs for blocks of up to
    /// `max_block_size` frames of `channel_count` channels. Allocates, so
    /// it's never called while rendering.
    fn prepare(&mut self, sample_rate: SampleRate, max_block_size: usize, channel_count: usize);

    /// Takes this block's parameter snapshot.
    fn update_parameters(&mut self, parameters: &VoiceParameters);

    /// Adds `len` frames of this voice's output into `output`, starting at
    /// `start`. A voice that isn't playing must leave `output` untouched.
    fn render(&mut self, output: &mut AudioBuffer, start: usize, len: usize);

    /// Ends the current note. With `allow_tail_off`, the voice releases
    /// normally; without it, the voice goes silent immediately.
    fn stop_note(&mut self, allow_tail_off: bool);
}
