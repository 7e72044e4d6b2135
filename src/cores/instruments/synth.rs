// Copyright (c) 2024 Mike Tsao

use crate::{
    elements::{Envelope, Oscillator, SmoothedGain, Synthesizer, VoiceCount, VoiceStore},
    prelude::*,
};
use delegate::delegate;

/// The default voice: one [Oscillator] through a click-free gain and an ADSR
/// [Envelope].
#[derive(Debug, Default)]
pub struct SynthVoice {
    oscillator: Oscillator,
    envelope: Envelope,
    gain: SmoothedGain,

    // Voices render here first, then mix into the caller's buffer.
    scratch: AudioBuffer,
    key: Option<u7>,

    c: Configurables,
}
impl PlaysNotes for SynthVoice {
    fn is_playing(&self) -> bool {
        self.envelope.is_active()
    }

    fn note_on(&mut self, key: u7, _velocity: u7) {
        self.key = Some(key);
        self.oscillator.set_frequency(key.into(), true);
        self.envelope.note_on();
    }

    fn note_off(&mut self, _velocity: u7) {
        self.envelope.note_off();
    }
}
impl Configurable for SynthVoice {
    delegate! {
        to self.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.oscillator.update_sample_rate(sample_rate);
        self.envelope.update_sample_rate(sample_rate);
        self.gain.prepare(sample_rate);
        self.key = None;
    }

    fn reset(&mut self) {
        self.oscillator.reset();
        self.envelope.reset();
        self.gain.snap_to_target();
        self.key = None;
    }
}
impl IsVoice for SynthVoice {
    fn prepare(&mut self, sample_rate: SampleRate, max_block_size: usize, channel_count: usize) {
        self.scratch.resize(channel_count, max_block_size);
        self.update_sample_rate(sample_rate);
    }

    fn update_parameters(&mut self, parameters: &VoiceParameters) {
        self.oscillator.set_waveform(parameters.waveform);
        self.gain.set_target(parameters.gain);
        if !self.is_playing() {
            // Nothing is sounding, so there's nothing to click.
            self.gain.snap_to_target();
        }
        self.envelope.set_parameters(parameters.envelope);
    }

    fn render(&mut self, output: &mut AudioBuffer, start: usize, len: usize) {
        let chunk_capacity = self.scratch.capacity();
        if !self.is_playing() || chunk_capacity == 0 {
            return;
        }
        let end = (start + len).min(output.frame_count());
        let mut position = start;
        while position < end {
            let chunk = (end - position).min(chunk_capacity);
            self.scratch.set_frame_count(chunk);
            self.oscillator.render(&mut self.scratch, 0, chunk);
            self.gain.apply_to_buffer(&mut self.scratch, 0, chunk);
            self.envelope.apply_to_buffer(&mut self.scratch, 0, chunk);
            output.add_from(position, &self.scratch, 0, chunk);
            position += chunk;
        }
        if !self.is_playing() {
            self.key = None;
        }
    }

    fn stop_note(&mut self, allow_tail_off: bool) {
        if allow_tail_off {
            self.envelope.note_off();
        } else {
            self.envelope.reset();
            self.key = None;
        }
    }
}
impl SynthVoice {
    /// `gain_ramp` is how long a gain change takes to glide to its new value.
    pub fn new_with(gain_ramp: Seconds) -> Self {
        Self {
            gain: SmoothedGain::new_with(gain_ramp),
            ..Default::default()
        }
    }

    /// The note this voice was last started with, until it goes idle.
    pub fn key(&self) -> Option<u7> {
        self.key
    }

    #[allow(missing_docs)]
    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    #[allow(missing_docs)]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

/// A polyphonic [Synthesizer] of [SynthVoice]s.
pub type SynthVoiceManager = Synthesizer<SynthVoice>;

/// Creates a [SynthVoiceManager] with `voice_count` voices.
pub fn new_synth_voice_manager(voice_count: VoiceCount, gain_ramp: Seconds) -> SynthVoiceManager {
    Synthesizer::new_with(VoiceStore::new_with_voice(voice_count, || {
        SynthVoice::new_with(gain_ramp)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{elements::EnvelopeStage, elements::Waveform, util::MidiUtils};
    use float_cmp::approx_eq;
    use more_asserts::assert_gt;

    fn prepared_voice(parameters: VoiceParameters) -> SynthVoice {
        let mut voice = SynthVoice::new_with(Seconds(0.0));
        voice.prepare(SampleRate::DEFAULT, 64, 2);
        voice.update_parameters(&parameters);
        voice
    }

    fn flat_parameters(waveform: Waveform) -> VoiceParameters {
        VoiceParameters {
            waveform,
            gain: Normal::maximum(),
            envelope: EnvelopeParameters::new_with(0.0, 0.0, 1.0, 0.0, 0.1),
        }
    }

    #[test]
    fn idle_voice_leaves_output_alone() {
        let mut voice = prepared_voice(Default::default());
        let mut output = AudioBuffer::new_with(2, 64);
        output.channel_mut(0).fill(0.125);
        voice.render(&mut output, 0, 64);
        assert_eq!(output.channel(0), [0.125; 64]);
        assert!(output.channel(1).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn renders_and_mixes_in_chunks() {
        let mut voice = prepared_voice(flat_parameters(Waveform::Square));
        voice.note_on(u7::from(69), u7::from(100));

        // Larger than the scratch buffer, so the voice has to work in pieces.
        let mut output = AudioBuffer::new_with(2, 200);
        output.channel_mut(1).fill(1.0);
        voice.render(&mut output, 0, 200);

        // A fresh square starts at x = -π, so the first half cycle is -1.
        assert_eq!(output.channel(0)[0], -1.0);
        assert_eq!(output.channel(1)[0], 0.0);
        let positives = output.channel(0).iter().filter(|s| **s > 0.0).count();
        assert_gt!(positives, 0);
        assert!(output.channel(0).iter().all(|s| s.abs() == 1.0));
    }

    #[test]
    fn note_on_restarts_phase() {
        let mut voice = prepared_voice(flat_parameters(Waveform::Sine));
        voice.note_on(u7::from(60), u7::from(100));
        let mut output = AudioBuffer::new_with(2, 37);
        voice.render(&mut output, 0, 37);
        assert_gt!(voice.oscillator().cycle_position(), 0.0);

        voice.note_on(u7::from(72), u7::from(100));
        assert_eq!(voice.oscillator().cycle_position(), 0.0);
        assert_eq!(voice.key(), Some(u7::from(72)));
        assert!(approx_eq!(
            f64,
            voice.oscillator().frequency().0,
            523.251_130_601_197_3,
            epsilon = 1e-6
        ));
    }

    #[test]
    fn stop_without_tail_is_immediate() {
        let mut parameters = flat_parameters(Waveform::Sine);
        parameters.envelope.release = Seconds(1.0);
        let mut voice = prepared_voice(parameters);
        voice.note_on(u7::from(60), u7::from(100));
        voice.stop_note(true);
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Release);
        assert!(voice.is_playing());

        voice.stop_note(false);
        assert!(!voice.is_playing());
        assert_eq!(voice.key(), None);
    }

    #[test]
    fn gain_is_applied() {
        let mut parameters = flat_parameters(Waveform::Square);
        parameters.gain = Normal::new(0.25);
        let mut voice = prepared_voice(parameters);
        voice.note_on(u7::from(60), u7::from(100));
        let mut output = AudioBuffer::new_with(1, 16);
        voice.render(&mut output, 0, 16);
        assert!(output.channel(0).iter().all(|s| s.abs() == 0.25));
    }

    #[test]
    fn manager_plays_a_chord() {
        let mut manager = new_synth_voice_manager(VoiceCount(8), Seconds(0.01));
        manager.prepare(SampleRate::DEFAULT, 128, 2);
        manager.update_parameters(&ParameterBridge::default().voice_parameters());
        let mut midi = MidiBuffer::default();
        for key in [60, 64, 67] {
            midi.add_event(MidiChannel::default(), MidiUtils::new_note_on(key, 100), 0);
        }
        let mut output = AudioBuffer::new_with(2, 128);
        manager.render(&mut output, &midi);
        assert_eq!(manager.active_voice_count(), 3);
        assert!(!output.is_silent());
    }
}
