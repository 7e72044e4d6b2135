// Copyright (c) 2024 Mike Tsao

use super::KeyboardQueue;
use crate::{
    cores::{new_synth_voice_manager, Arpeggiator, SynthVoiceManager},
    elements::{PanStage, VoiceCount},
    prelude::*,
    util::{HeldNotes, Rng, SynthSettings},
};

/// [SynthEngine] is everything the host's audio callback talks to. Each block
/// goes through the same chain:
///
/// 1. Messages from the [KeyboardQueue] join the block's MIDI at offset 0.
/// 2. The [Arpeggiator] rewrites the MIDI from the held notes.
/// 3. The voices render, adding into the host's buffer.
/// 4. The [PanStage] places the result in the stereo field.
///
/// Construction and [SynthEngine::prepare()] allocate; nothing in
/// [SynthEngine::render_block()] does.
#[derive(Debug)]
pub struct SynthEngine {
    parameters: ParameterBridge,
    keyboard: KeyboardQueue,
    arpeggiator: Arpeggiator,
    synthesizer: SynthVoiceManager,
    pan: PanStage,
    max_block_size: usize,
    channel_count: usize,

    c: Configurables,
}
impl Default for SynthEngine {
    fn default() -> Self {
        Self::new_with(&SynthSettings::default())
    }
}
impl Configurable for SynthEngine {
    fn sample_rate(&self) -> SampleRate {
        self.c.sample_rate()
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.prepare(sample_rate, self.max_block_size, self.channel_count);
    }

    fn reset(&mut self) {
        self.arpeggiator.reset();
        self.synthesizer.reset();
        self.pan.reset();
        self.parameters.set(ParameterId::Pan, 0.0);
    }
}
impl SynthEngine {
    /// Block size assumed until the host calls [SynthEngine::prepare()].
    pub const DEFAULT_MAX_BLOCK_SIZE: usize = 512;

    /// Builds an engine. The settings fix the voice count, gain ramp, RNG
    /// seed, keyboard queue size, and starting parameter values.
    pub fn new_with(settings: &SynthSettings) -> Self {
        let parameters = settings.create_parameter_bridge();
        let rng = Rng::new_with_optional_seed(settings.seed);
        let mut r = Self {
            arpeggiator: Arpeggiator::new_with(parameters.handle(), rng),
            synthesizer: new_synth_voice_manager(
                VoiceCount(settings.voice_count),
                settings.gain_ramp,
            ),
            keyboard: KeyboardQueue::new_with(settings.keyboard_queue_capacity),
            parameters,
            pan: Default::default(),
            max_block_size: Self::DEFAULT_MAX_BLOCK_SIZE,
            channel_count: 2,
            c: Default::default(),
        };
        log::info!(
            "Created engine with {} voices (seed {:?})",
            settings.voice_count,
            settings.seed
        );
        r.prepare(SampleRate::DEFAULT, r.max_block_size, r.channel_count);
        r
    }

    /// Sizes every buffer for blocks of up to `max_block_size` frames of
    /// `channel_count` channels at `sample_rate`, and resets everything that
    /// depends on the sample rate. Allocates.
    pub fn prepare(&mut self, sample_rate: SampleRate, max_block_size: usize, channel_count: usize) {
        log::info!(
            "Preparing engine: {} Hz, up to {} frames, {} channels",
            sample_rate.0,
            max_block_size,
            channel_count
        );
        self.c.update_sample_rate(sample_rate);
        self.max_block_size = max_block_size;
        self.arpeggiator.update_sample_rate(sample_rate);
        self.synthesizer
            .prepare(sample_rate, max_block_size, channel_count);
        self.synthesizer
            .update_parameters(&self.parameters.voice_parameters());
        self.pan.reset();
        self.channel_count = channel_count;
    }

    /// Processes one block. `midi` comes in holding the host's events and
    /// goes out holding the events the voices actually played. The rendered
    /// audio is added to whatever `audio` already holds.
    pub fn render_block(
        &mut self,
        audio: &mut AudioBuffer,
        midi: &mut MidiBuffer,
        transport: Option<&TransportInfo>,
    ) {
        let frame_count = audio.frame_count();
        self.keyboard.drain_into(midi);
        self.arpeggiator
            .process_block(midi, frame_count, transport);

        self.synthesizer
            .update_parameters(&self.parameters.voice_parameters());
        self.synthesizer.render(audio, midi);

        self.pan.set_pan(self.parameters.pan());
        self.pan.transform(audio);
    }

    /// A handle onto the parameter slots, for the control context.
    pub fn parameters(&self) -> ParameterBridge {
        self.parameters.handle()
    }

    /// A sender for on-screen keyboard notes, for the control context.
    pub fn keyboard(&self) -> KeyboardQueue {
        self.keyboard.clone()
    }

    #[allow(missing_docs)]
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// How many voices are sounding, release tails included.
    pub fn active_voice_count(&self) -> usize {
        self.synthesizer.active_voice_count()
    }

    /// How many notes found no idle voice.
    pub fn dropped_note_count(&self) -> usize {
        self.synthesizer.dropped_note_count()
    }

    /// The keys the arpeggiator considers held.
    pub fn held_notes(&self) -> &HeldNotes {
        self.arpeggiator.held_notes()
    }

    /// The arpeggiated note that's sounding now.
    pub fn sounding_note(&self) -> Option<u7> {
        self.arpeggiator.sounding_note()
    }

    /// Stops every voice, with or without release tails.
    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        self.synthesizer.all_notes_off(allow_tail_off);
    }
}
