// Copyright (c) 2024 Mike Tsao

use super::voices::VoiceStore;
use crate::{prelude::*, util::MidiUtils};
use delegate::delegate;

/// [Synthesizer] is the voice manager: it owns a fixed [VoiceStore], turns
/// MIDI into voice note-ons and note-offs, and renders the voices into the
/// host's buffer with sample-accurate event timing.
#[derive(Debug)]
pub struct Synthesizer<V: IsVoice> {
    voice_store: VoiceStore<V>,

    c: Configurables,
}
impl<V: IsVoice> Configurable for Synthesizer<V> {
    delegate! {
        to self.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.voice_store.update_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.voice_store.reset();
    }
}
#[allow(missing_docs)]
impl<V: IsVoice> Synthesizer<V> {
    pub fn new_with(voice_store: VoiceStore<V>) -> Self {
        Self {
            voice_store,
            c: Default::default(),
        }
    }

    /// Readies the voices for blocks of up to `max_block_size` frames.
    pub fn prepare(&mut self, sample_rate: SampleRate, max_block_size: usize, channel_count: usize) {
        self.c.update_sample_rate(sample_rate);
        self.voice_store
            .prepare(sample_rate, max_block_size, channel_count);
    }

    delegate! {
        to self.voice_store {
            pub fn voice_count(&self) -> usize;
            pub fn active_voice_count(&self) -> usize;
            pub fn dropped_note_count(&self) -> usize;
            pub fn all_notes_off(&mut self, allow_tail_off: bool);
            pub fn update_parameters(&mut self, parameters: &VoiceParameters);
        }
    }

    pub fn voices(&self) -> impl Iterator<Item = &V> {
        self.voice_store.voices()
    }

    /// Renders the current block of `output`, handling each MIDI event at
    /// its offset. The block is cut at every event offset; each piece renders
    /// with the voice state that was current up to that point. Voices add to
    /// `output` rather than replacing it.
    pub fn render(&mut self, output: &mut AudioBuffer, midi: &MidiBuffer) {
        let frame_count = output.frame_count();
        let mut position = 0;
        for event in midi.iter() {
            let offset = event.offset.min(frame_count);
            if offset > position {
                self.voice_store
                    .render(output, position, offset - position);
                position = offset;
            }
            self.handle_midi_message(event.channel, event.message);
        }
        if position < frame_count {
            self.voice_store
                .render(output, position, frame_count - position);
        }
    }
}
impl<V: IsVoice> HandlesMidi for Synthesizer<V> {
    fn handle_midi_message(&mut self, _: MidiChannel, message: MidiMessage) {
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => {
                self.voice_store.note_off(key, vel);
            }
            MidiMessage::NoteOn { key, vel } => {
                // A note with no free voice is dropped; the store counts it.
                self.voice_store.note_on(key, vel);
            }
            MidiMessage::NoteOff { key, vel } => {
                self.voice_store.note_off(key, vel);
            }
            MidiMessage::Controller {
                controller,
                value: _,
            } => {
                if controller.as_int() == MidiUtils::ALL_NOTES_OFF {
                    self.voice_store.all_notes_off(true);
                }
            }
            _ => {}
        }
    }
}
