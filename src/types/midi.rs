// Copyright (c) 2024 Mike Tsao

use serde::{Deserialize, Serialize};
use synonym::Synonym;

pub use midly::{
    num::{u4, u7},
    MidiMessage,
};

/// Newtype for MIDI channel.
#[derive(Synonym, Serialize, Deserialize)]
pub struct MidiChannel(pub u8);
#[allow(missing_docs)]
impl MidiChannel {
    pub const MIN_VALUE: u8 = 0;
    pub const MAX_VALUE: u8 = 15; // inclusive

    pub const fn new(value: u8) -> Self {
        Self(value)
    }
}
impl From<u4> for MidiChannel {
    fn from(value: u4) -> Self {
        Self(value.as_int())
    }
}

/// A MIDI message stamped with the sample offset, relative to the start of
/// the current audio block, at which it takes effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MidiEvent {
    /// The channel the message arrived on (or should be sent on).
    pub channel: MidiChannel,
    /// The message itself.
    pub message: MidiMessage,
    /// Sample offset within the block.
    pub offset: usize,
}
impl MidiEvent {
    #[allow(missing_docs)]
    pub fn new_with(channel: MidiChannel, message: MidiMessage, offset: usize) -> Self {
        Self {
            channel,
            message,
            offset,
        }
    }
}
