// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// The number of voices in a [VoiceStore].
#[derive(Synonym, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[synonym(skip(Default))]
#[serde(rename_all = "kebab-case")]
pub struct VoiceCount(#[derivative(Default(value = "8"))] pub usize);

// What the store knows about a voice beyond the voice itself.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct VoiceSlot {
    key: Option<u7>,
    key_down: bool,
}

/// A fixed pool of voices. It never grows and never steals: a note that
/// arrives when every voice is busy is dropped and counted.
///
/// At most one key-down voice represents a given note. A second note-on for a
/// note that's still held releases the first voice (letting it tail off) and
/// starts the note on a fresh one.
#[derive(Debug)]
pub struct VoiceStore<V: IsVoice> {
    voices: Vec<V>,
    slots: Vec<VoiceSlot>,
    dropped_note_count: usize,
    c: Configurables,
}
impl<V: IsVoice> Configurable for VoiceStore<V> {
    fn sample_rate(&self) -> SampleRate {
        self.c.sample_rate()
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.voices
            .iter_mut()
            .for_each(|v| v.update_sample_rate(sample_rate));
        self.slots.fill(VoiceSlot::default());
    }

    fn reset(&mut self) {
        self.all_notes_off(false);
    }
}
impl<V: IsVoice> VoiceStore<V> {
    /// Creates a store of `voice_count` voices, each made by `new_voice_fn`.
    pub fn new_with_voice<F: Fn() -> V>(voice_count: VoiceCount, new_voice_fn: F) -> Self {
        Self {
            voices: (0..voice_count.0).map(|_| new_voice_fn()).collect(),
            slots: vec![VoiceSlot::default(); voice_count.0],
            dropped_note_count: 0,
            c: Default::default(),
        }
    }

    /// Readies every voice for blocks of up to `max_block_size` frames.
    pub fn prepare(&mut self, sample_rate: SampleRate, max_block_size: usize, channel_count: usize) {
        self.c.update_sample_rate(sample_rate);
        self.voices
            .iter_mut()
            .for_each(|v| v.prepare(sample_rate, max_block_size, channel_count));
        self.slots.fill(VoiceSlot::default());
    }

    #[allow(missing_docs)]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    #[allow(missing_docs)]
    pub fn voices(&self) -> impl Iterator<Item = &V> {
        self.voices.iter()
    }

    #[allow(missing_docs)]
    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.voices.iter_mut()
    }

    /// How many voices are sounding, including release tails.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_playing()).count()
    }

    /// How many note-ons were dropped because every voice was busy.
    pub fn dropped_note_count(&self) -> usize {
        self.dropped_note_count
    }

    /// The notes that are currently held down, in voice order.
    pub fn held_keys(&self) -> impl Iterator<Item = u7> + '_ {
        self.slots
            .iter()
            .zip(self.voices.iter())
            .filter(|(slot, voice)| slot.key_down && voice.is_playing())
            .filter_map(|(slot, _)| slot.key)
    }

    /// Starts a note on an idle voice. Returns false if the note was dropped.
    pub fn note_on(&mut self, key: u7, velocity: u7) -> bool {
        if let Some(index) = self.key_down_index(key) {
            self.voices[index].stop_note(true);
            self.slots[index].key_down = false;
        }
        match self.voices.iter().position(|v| !v.is_playing()) {
            Some(index) => {
                self.voices[index].note_on(key, velocity);
                self.slots[index] = VoiceSlot {
                    key: Some(key),
                    key_down: true,
                };
                true
            }
            None => {
                self.dropped_note_count += 1;
                false
            }
        }
    }

    /// Releases the key-down voice playing `key`, if there is one.
    pub fn note_off(&mut self, key: u7, velocity: u7) {
        if let Some(index) = self.key_down_index(key) {
            self.voices[index].note_off(velocity);
            self.slots[index].key_down = false;
        }
    }

    /// Ends every sounding voice, either letting each release or cutting it
    /// off.
    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        for (voice, slot) in self.voices.iter_mut().zip(self.slots.iter_mut()) {
            if voice.is_playing() {
                voice.stop_note(allow_tail_off);
            }
            slot.key_down = false;
        }
    }

    /// Takes this block's parameter snapshot.
    pub fn update_parameters(&mut self, parameters: &VoiceParameters) {
        self.voices
            .iter_mut()
            .for_each(|v| v.update_parameters(parameters));
    }

    /// Adds `len` frames of every active voice into `output` at `start`.
    pub fn render(&mut self, output: &mut AudioBuffer, start: usize, len: usize) {
        for (voice, slot) in self.voices.iter_mut().zip(self.slots.iter_mut()) {
            if voice.is_playing() {
                voice.render(output, start, len);
                if !voice.is_playing() {
                    *slot = VoiceSlot::default();
                }
            }
        }
    }

    fn key_down_index(&self, key: u7) -> Option<usize> {
        self.slots
            .iter()
            .zip(self.voices.iter())
            .position(|(slot, voice)| {
                slot.key_down && slot.key == Some(key) && voice.is_playing()
            })
    }
}
