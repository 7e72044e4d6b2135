// Copyright (c) 2024 Mike Tsao

use crate::{
    traits::HandlesMidi,
    types::{u7, MidiChannel, MidiMessage},
};
use bit_vec::BitVec;

/// Provides MIDI-related utility functionality.
pub struct MidiUtils {}
impl MidiUtils {
    /// The controller number of the All Notes Off channel-mode message.
    pub const ALL_NOTES_OFF: u8 = 123;

    /// Convenience function to make a note-on [MidiMessage].
    pub fn new_note_on(note: u8, vel: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            key: u7::from(note),
            vel: u7::from(vel),
        }
    }

    /// Convenience function to make a note-off [MidiMessage].
    pub fn new_note_off(note: u8, vel: u8) -> MidiMessage {
        MidiMessage::NoteOff {
            key: u7::from(note),
            vel: u7::from(vel),
        }
    }

    /// Convenience function to make an All Notes Off [MidiMessage].
    pub fn new_all_notes_off() -> MidiMessage {
        MidiMessage::Controller {
            controller: u7::from(Self::ALL_NOTES_OFF),
            value: u7::from(0),
        }
    }

    /// If the message starts or stops a note, returns the key and whether
    /// it's now down. A note-on with velocity zero is a note-off.
    pub fn note_change(message: &MidiMessage) -> Option<(u7, bool)> {
        match *message {
            MidiMessage::NoteOn { key, vel } => Some((key, vel.as_int() != 0)),
            MidiMessage::NoteOff { key, .. } => Some((key, false)),
            _ => None,
        }
    }
}

/// [HeldNotes] watches a MIDI message stream and remembers which keys are
/// currently down (we've gotten a note-on without a note-off). It answers
/// questions about them in ascending note order, which is the order an
/// arpeggiator walks them.
///
/// [HeldNotes] doesn't know about [MidiChannel]s. A key held on two channels
/// is one held key.
#[derive(Debug, Clone)]
pub struct HeldNotes {
    keys: BitVec,
    count: usize,
}
impl Default for HeldNotes {
    fn default() -> Self {
        Self {
            keys: BitVec::from_elem(128, false),
            count: 0,
        }
    }
}
impl HandlesMidi for HeldNotes {
    fn handle_midi_message(&mut self, _channel: MidiChannel, message: MidiMessage) {
        if let Some((key, is_down)) = MidiUtils::note_change(&message) {
            self.set(key.as_int(), is_down);
        }
    }
}
#[allow(missing_docs)]
impl HeldNotes {
    /// Marks a key as down or up. Duplicate presses and releases are harmless.
    pub fn set(&mut self, key: u8, is_down: bool) {
        let index = (key & 0x7f) as usize;
        if self.keys.get(index) == Some(is_down) {
            return;
        }
        self.keys.set(index, is_down);
        if is_down {
            self.count += 1;
        } else {
            self.count -= 1;
        }
    }

    pub fn contains(&self, key: u8) -> bool {
        self.keys.get(key as usize).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The held key at position `index` in ascending order.
    pub fn nth(&self, index: usize) -> Option<u8> {
        self.iter().nth(index)
    }

    /// The held keys, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(i, is_down)| is_down.then_some(i as u8))
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.count = 0;
    }
}
