// Copyright (c) 2024 Mike Tsao

use crate::{
    parameters::{ArpeggiatorParameters, ParameterBridge, ParameterId},
    prelude::*,
    util::{HeldNotes, MidiUtils, Rng},
};
use delegate::delegate;

/// Arpeggiated notes always go out at full velocity.
const ARPEGGIATED_VELOCITY: u8 = 127;

/// Beat positions this close to a boundary count as on it.
const BEAT_EPSILON: f64 = 1e-9;

/// The arpeggiator's memory between blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArpeggiatorRunState {
    /// Index into the held notes of the most recent step, or None before the
    /// first step.
    pub step: Option<usize>,
    /// Samples from the start of the next block to the next free-running
    /// step. None until the first block.
    pub countdown: Option<usize>,
    /// The arpeggiated note currently sounding, if any.
    pub sounding: Option<u7>,
    /// The host beat position of the last host-synced step.
    pub last_fired_beat: Option<f64>,
    /// The host position at the start of the previous synced block.
    pub last_ppq: Option<f64>,
    /// Whether the host transport was running during the previous synced
    /// block.
    pub was_playing: bool,
    /// Whether the previous block was arpeggiated rather than bypassed.
    pub was_arpeggiating: bool,
}

/// [Arpeggiator] creates [arpeggios](https://en.wikipedia.org/wiki/Arpeggio),
/// which "is a type of broken chord in which the notes that compose a chord
/// are individually and quickly sounded in a progressive rising or descending
/// order." You play it with MIDI, and instead of producing audio, it rewrites
/// the block's MIDI: held keys go in, one-at-a-time notes come out.
///
/// Steps happen either every `noteDur` seconds (free-running) or on the host's
/// beat grid (`sync`), and each sounded step may scatter the output pan.
#[derive(Debug)]
pub struct Arpeggiator {
    parameters: ParameterBridge,
    rng: Rng,
    held_notes: HeldNotes,
    state: ArpeggiatorRunState,

    c: Configurables,
}
impl Configurable for Arpeggiator {
    delegate! {
        to self.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.reset();
    }

    fn reset(&mut self) {
        self.held_notes.clear();
        self.state = ArpeggiatorRunState {
            was_arpeggiating: true,
            ..Default::default()
        };
    }
}
impl Arpeggiator {
    /// `parameters` is read once per block and receives the pan of each
    /// sounded step.
    pub fn new_with(parameters: ParameterBridge, rng: Rng) -> Self {
        let mut r = Self {
            parameters,
            rng,
            held_notes: Default::default(),
            state: Default::default(),
            c: Default::default(),
        };
        r.reset();
        r
    }

    #[allow(missing_docs)]
    pub fn held_notes(&self) -> &HeldNotes {
        &self.held_notes
    }

    #[allow(missing_docs)]
    pub fn run_state(&self) -> &ArpeggiatorRunState {
        &self.state
    }

    /// The arpeggiated note that's currently sounding.
    pub fn sounding_note(&self) -> Option<u7> {
        self.state.sounding
    }

    /// Rewrites one block's MIDI in place. Incoming note-ons and note-offs
    /// update the held-note set and are removed; everything else passes
    /// through. Arpeggiated note events are added at their sample offsets,
    /// always within `[0, frame_count)`.
    pub fn process_block(
        &mut self,
        midi: &mut MidiBuffer,
        frame_count: usize,
        transport: Option<&TransportInfo>,
    ) {
        let parameters = self.parameters.arpeggiator_parameters();

        for event in midi.iter() {
            if let Some((key, is_down)) = MidiUtils::note_change(&event.message) {
                self.held_notes.set(key.as_int(), is_down);
            } else if Self::is_all_notes_off(&event.message) {
                self.held_notes.clear();
            }
        }

        if !parameters.arpeggiate {
            self.release_sounding(midi, 0);
            self.state.was_arpeggiating = false;
            return;
        }

        midi.retain(|e| MidiUtils::note_change(&e.message).is_none());
        if !self.state.was_arpeggiating {
            // Keys that passed through while bypassed would otherwise never
            // see their note-offs.
            midi.add_event(MidiChannel::default(), MidiUtils::new_all_notes_off(), 0);
            self.state.was_arpeggiating = true;
        }
        if frame_count == 0 {
            return;
        }

        match transport.and_then(|t| t.complete()) {
            Some((tempo, ppq, is_playing)) if parameters.sync => {
                let samples_per_beat = tempo.samples_per_beat(self.sample_rate());
                if is_playing {
                    self.run_synced(midi, frame_count, &parameters, ppq, samples_per_beat);
                } else {
                    if self.state.was_playing {
                        self.release_sounding(midi, 0);
                        self.state.countdown = None;
                        self.state.was_playing = false;
                    }
                    let duration =
                        (parameters.sync_division.beats() * samples_per_beat).round() as usize;
                    self.run_free(midi, frame_count, &parameters, duration);
                }
            }
            _ => {
                let duration = self.sample_rate() * parameters.note_duration;
                self.run_free(midi, frame_count, &parameters, duration);
            }
        }
    }

    // Steps every `duration` samples, carrying the remainder across blocks.
    fn run_free(
        &mut self,
        midi: &mut MidiBuffer,
        frame_count: usize,
        parameters: &ArpeggiatorParameters,
        duration: usize,
    ) {
        let duration = duration.max(1);
        let mut offset = self.state.countdown.unwrap_or(duration).min(duration);
        while offset < frame_count {
            self.step(midi, offset, parameters);
            offset += duration;
        }
        self.state.countdown = Some(offset - frame_count);
    }

    // Steps on every division boundary in [ppq, ppq + block length in beats).
    fn run_synced(
        &mut self,
        midi: &mut MidiBuffer,
        frame_count: usize,
        parameters: &ArpeggiatorParameters,
        ppq: f64,
        samples_per_beat: f64,
    ) {
        if self.state.last_ppq.is_some_and(|last| ppq < last - BEAT_EPSILON) {
            self.state.last_fired_beat = None;
        }
        self.state.last_ppq = Some(ppq);
        self.state.was_playing = true;

        let division = parameters.sync_division.beats();
        let block_end = ppq + frame_count as f64 / samples_per_beat;
        let mut boundary = (ppq / division - BEAT_EPSILON).ceil() as i64;
        loop {
            let beat = boundary as f64 * division;
            if beat >= block_end - BEAT_EPSILON {
                break;
            }
            if self
                .state
                .last_fired_beat
                .map_or(true, |last| beat > last + BEAT_EPSILON)
            {
                let offset = ((beat - ppq) * samples_per_beat).round().max(0.0) as usize;
                self.step(midi, offset.min(frame_count - 1), parameters);
                self.state.last_fired_beat = Some(beat);
            }
            boundary += 1;
        }
    }

    // One arpeggiator step: end the previous note, then maybe start another
    // at the same offset.
    fn step(&mut self, midi: &mut MidiBuffer, offset: usize, parameters: &ArpeggiatorParameters) {
        // No room for the note-off means no step. The note keeps sounding and
        // the next step tries again.
        if !self.release_sounding(midi, offset) {
            return;
        }

        let held_count = self.held_notes.len();
        if held_count == 0 {
            return;
        }
        let index = match (self.state.step, parameters.ascending) {
            (None, true) => 0,
            (None, false) => held_count - 1,
            (Some(previous), true) => (previous + 1) % held_count,
            (Some(previous), false) => match previous.min(held_count) {
                0 => held_count - 1,
                i => i - 1,
            },
        };
        self.state.step = Some(index);

        if self.rng.rand_float() >= parameters.density.0 {
            return;
        }
        let index = if self.rng.rand_float() < parameters.randomize.0 {
            self.rng.rand_index(held_count)
        } else {
            index
        };
        let Some(key) = self.held_notes.nth(index) else {
            return;
        };

        let key = u7::from(key);
        if !midi.add_event(
            MidiChannel::default(),
            MidiMessage::NoteOn {
                key,
                vel: u7::from(ARPEGGIATED_VELOCITY),
            },
            offset,
        ) {
            return;
        }
        self.state.sounding = Some(key);

        let pan = if parameters.width.0 > 0.0 {
            self.rng.rand_bipolar() * parameters.width.0
        } else {
            0.0
        };
        self.parameters.set(ParameterId::Pan, pan);
    }

    // Sends the note-off for the sounding note, if any. Returns false, still
    // sounding, if the buffer had no room for it.
    fn release_sounding(&mut self, midi: &mut MidiBuffer, offset: usize) -> bool {
        let Some(key) = self.state.sounding else {
            return true;
        };
        let sent = midi.add_event(
            MidiChannel::default(),
            MidiMessage::NoteOff {
                key,
                vel: u7::from(0),
            },
            offset,
        );
        if sent {
            self.state.sounding = None;
        }
        sent
    }

    fn is_all_notes_off(message: &MidiMessage) -> bool {
        matches!(message, MidiMessage::Controller { controller, .. } if controller.as_int() == MidiUtils::ALL_NOTES_OFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::{assert_ge, assert_le};

    const BLOCK: usize = 512;

    fn test_arpeggiator() -> (Arpeggiator, ParameterBridge) {
        let bridge = ParameterBridge::default();
        let mut arp = Arpeggiator::new_with(bridge.handle(), Rng::new_with_seed(1234));
        arp.update_sample_rate(SampleRate::DEFAULT);
        (arp, bridge)
    }

    fn hold(midi: &mut MidiBuffer, keys: &[u8]) {
        for key in keys {
            midi.add_event(MidiChannel::default(), MidiUtils::new_note_on(*key, 100), 0);
        }
    }

    /// Runs `blocks` blocks and returns every event with its absolute sample
    /// position.
    fn run(
        arp: &mut Arpeggiator,
        mut first_block: MidiBuffer,
        blocks: usize,
        transport_fn: impl Fn(usize) -> Option<TransportInfo>,
    ) -> Vec<(usize, MidiMessage)> {
        let mut events = Vec::default();
        for block in 0..blocks {
            let mut midi = if block == 0 {
                core::mem::take(&mut first_block)
            } else {
                MidiBuffer::default()
            };
            let transport = transport_fn(block);
            arp.process_block(&mut midi, BLOCK, transport.as_ref());
            for e in midi.iter() {
                assert_le!(e.offset, BLOCK - 1);
                events.push((block * BLOCK + e.offset, e.message));
            }
        }
        events
    }

    fn note_ons(events: &[(usize, MidiMessage)]) -> Vec<(usize, u8)> {
        events
            .iter()
            .filter_map(|(when, message)| match message {
                MidiMessage::NoteOn { key, .. } => Some((*when, key.as_int())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn free_running_ascending() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::NoteDur, 0.5);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[64, 60, 67]);

        let events = run(&mut arp, midi, 300, |_| None);
        let ons = note_ons(&events);
        assert_ge!(ons.len(), 4);
        let keys: Vec<u8> = ons.iter().take(4).map(|(_, k)| *k).collect();
        assert_eq!(keys, vec![60, 64, 67, 60]);
        for pair in ons.windows(2) {
            assert_eq!(pair[1].0 - pair[0].0, 22050);
        }

        // Each note-on after the first is preceded, at the same sample, by
        // the previous note's note-off.
        for (when, key) in ons.iter().skip(1) {
            let i = events
                .iter()
                .position(|(w, m)| *w == *when && matches!(m, MidiMessage::NoteOn { key: k, .. } if k.as_int() == *key))
                .unwrap();
            assert!(matches!(events[i - 1], (w, MidiMessage::NoteOff { .. }) if w == *when));
        }
    }

    #[test]
    fn free_running_descending() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::NoteDur, 0.1);
        bridge.set(ParameterId::Ascending, 0.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60, 64, 67]);

        let ons = note_ons(&run(&mut arp, midi, 100, |_| None));
        let keys: Vec<u8> = ons.iter().take(5).map(|(_, k)| *k).collect();
        assert_eq!(keys, vec![67, 64, 60, 67, 64]);
    }

    #[test]
    fn input_notes_are_consumed_and_other_messages_pass() {
        let (mut arp, _bridge) = test_arpeggiator();
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);
        midi.add_event(
            MidiChannel::default(),
            MidiMessage::PitchBend {
                bend: midly::PitchBend(midly::num::u14::from(0x2000)),
            },
            7,
        );
        arp.process_block(&mut midi, BLOCK, None);
        assert_eq!(midi.len(), 1);
        assert!(matches!(midi.events()[0].message, MidiMessage::PitchBend { .. }));
        assert!(arp.held_notes().contains(60));

        let mut midi = MidiBuffer::default();
        midi.add_event(MidiChannel::default(), MidiUtils::new_note_on(60, 0), 3);
        arp.process_block(&mut midi, BLOCK, None);
        assert!(arp.held_notes().is_empty());
    }

    #[test]
    fn density_zero_is_silent() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Density, 0.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60, 64]);
        let events = run(&mut arp, midi, 100, |_| None);
        assert!(note_ons(&events).is_empty());
        // Steps still advance on rests.
        assert!(arp.run_state().step.is_some());
    }

    #[test]
    fn randomize_picks_only_held_notes() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Randomize, 1.0);
        bridge.set(ParameterId::NoteDur, 0.01);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[50, 70, 90]);
        let ons = note_ons(&run(&mut arp, midi, 200, |_| None));
        assert_ge!(ons.len(), 100);
        assert!(ons.iter().all(|(_, k)| [50, 70, 90].contains(k)));
        assert!([50, 70, 90]
            .iter()
            .all(|k| ons.iter().any(|(_, key)| key == k)));
    }

    #[test]
    fn width_scatters_pan() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Width, 0.5);
        bridge.set(ParameterId::NoteDur, 0.01);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);
        let mut pans = Vec::default();
        for _ in 0..100 {
            arp.process_block(&mut midi, BLOCK, None);
            midi.clear();
            pans.push(bridge.get(ParameterId::Pan));
        }
        assert!(pans.iter().all(|p| (-0.5..=0.5).contains(p)));
        assert!(pans.iter().any(|p| *p != 0.0));

        bridge.set(ParameterId::Width, 0.0);
        for _ in 0..20 {
            arp.process_block(&mut midi, BLOCK, None);
            midi.clear();
        }
        assert_eq!(bridge.get(ParameterId::Pan), 0.0);
    }

    #[test]
    fn tempo_synced_quarters() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Sync, 1.0);
        bridge.set(ParameterId::NoteDurSync, 2.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60, 64, 67]);

        let samples_per_beat = 22050.0;
        let events = run(&mut arp, midi, 200, |block| {
            Some(TransportInfo::new_with(
                Tempo(120.0),
                (block * BLOCK) as f64 / samples_per_beat,
                true,
            ))
        });
        let ons = note_ons(&events);
        assert_ge!(ons.len(), 4);
        assert_eq!(ons[0], (0, 60));
        for pair in ons.windows(2) {
            assert_eq!(pair[1].0 - pair[0].0, 22050);
        }
    }

    #[test]
    fn tempo_synced_stop_turns_note_off() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Sync, 1.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);

        arp.process_block(
            &mut midi,
            BLOCK,
            Some(&TransportInfo::new_with(Tempo(120.0), 0.0, true)),
        );
        assert_eq!(arp.sounding_note(), Some(u7::from(60)));

        let mut midi = MidiBuffer::default();
        arp.process_block(
            &mut midi,
            BLOCK,
            Some(&TransportInfo::new_with(Tempo(120.0), 0.5, false)),
        );
        assert_eq!(
            midi.events()[0],
            MidiEvent::new_with(MidiChannel::default(), MidiUtils::new_note_off(60, 0), 0)
        );
        assert_eq!(arp.sounding_note(), None);
    }

    #[test]
    fn incomplete_transport_runs_free() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Sync, 1.0);
        bridge.set(ParameterId::NoteDur, 0.5);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60, 64]);
        let ons = note_ons(&run(&mut arp, midi, 200, |_| {
            Some(TransportInfo {
                tempo: Some(Tempo(60.0)),
                ..Default::default()
            })
        }));
        assert_eq!(ons[0].0, 22050);
        assert_eq!(ons[1].0, 44100);
    }

    #[test]
    fn loop_back_fires_again() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Sync, 1.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);
        arp.process_block(
            &mut midi,
            BLOCK,
            Some(&TransportInfo::new_with(Tempo(120.0), 4.0, true)),
        );
        assert_eq!(arp.run_state().last_fired_beat, Some(4.0));

        let mut midi = MidiBuffer::default();
        arp.process_block(
            &mut midi,
            BLOCK,
            Some(&TransportInfo::new_with(Tempo(120.0), 0.0, true)),
        );
        assert!(midi.iter().any(|e| matches!(e.message, MidiMessage::NoteOn { .. })));
    }

    #[test]
    fn changing_division_while_playing_keeps_stepping() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::Sync, 1.0);
        bridge.set(ParameterId::NoteDurSync, 4.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);

        // Sixteenths until beat ~2.3, then quarters.
        const SWITCH_BLOCK: usize = 100;
        let samples_per_beat = 22050.0;
        let events = run(&mut arp, midi, 300, |block| {
            if block == SWITCH_BLOCK {
                bridge.set(ParameterId::NoteDurSync, 2.0);
            }
            Some(TransportInfo::new_with(
                Tempo(120.0),
                (block * BLOCK) as f64 / samples_per_beat,
                true,
            ))
        });
        let after_switch: Vec<(usize, MidiMessage)> = events
            .into_iter()
            .filter(|(when, _)| *when >= SWITCH_BLOCK * BLOCK)
            .collect();
        let frames: Vec<usize> = note_ons(&after_switch).iter().map(|(w, _)| *w).collect();
        assert_eq!(frames, vec![66150, 88200, 110250, 132300]);
        let note_offs = after_switch
            .iter()
            .filter(|(_, m)| matches!(m, MidiMessage::NoteOff { .. }))
            .count();
        assert_eq!(note_offs, frames.len());
    }

    #[test]
    fn full_buffer_keeps_the_note_sounding_until_there_is_room() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::NoteDur, 0.001);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);
        arp.process_block(&mut midi, BLOCK, None);
        assert_eq!(arp.sounding_note(), Some(u7::from(60)));

        let full = || {
            let mut midi = MidiBuffer::with_capacity(4);
            while midi.add_event(
                MidiChannel::default(),
                MidiMessage::PitchBend {
                    bend: midly::PitchBend(midly::num::u14::from(0x2000)),
                },
                0,
            ) {}
            midi
        };

        let mut midi = full();
        arp.process_block(&mut midi, BLOCK, None);
        assert!(midi.iter().all(|e| matches!(e.message, MidiMessage::PitchBend { .. })));
        assert_eq!(arp.sounding_note(), Some(u7::from(60)));

        let mut midi = MidiBuffer::default();
        arp.process_block(&mut midi, BLOCK, None);
        assert_eq!(midi.events()[0].message, MidiUtils::new_note_off(60, 0));
        assert_eq!(midi.events()[1].message, MidiUtils::new_note_on(60, 127));

        bridge.set(ParameterId::Arpeggiate, 0.0);
        let mut midi = full();
        arp.process_block(&mut midi, BLOCK, None);
        assert!(arp.sounding_note().is_some());

        let mut midi = MidiBuffer::default();
        arp.process_block(&mut midi, BLOCK, None);
        assert_eq!(midi.events()[0].message, MidiUtils::new_note_off(60, 0));
        assert!(arp.sounding_note().is_none());
    }

    #[test]
    fn bypass_passes_through_and_silences() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::NoteDur, 0.001);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);
        arp.process_block(&mut midi, BLOCK, None);
        assert!(arp.sounding_note().is_some());

        bridge.set(ParameterId::Arpeggiate, 0.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[72]);
        arp.process_block(&mut midi, BLOCK, None);
        assert_eq!(midi.len(), 2);
        assert_eq!(midi.events()[0].message, MidiUtils::new_note_on(72, 100));
        assert!(matches!(midi.events()[1].message, MidiMessage::NoteOff { .. }));
        assert!(arp.sounding_note().is_none());

        // Turning it back on releases whatever leaked through.
        bridge.set(ParameterId::Arpeggiate, 1.0);
        let mut midi = MidiBuffer::default();
        arp.process_block(&mut midi, 1, None);
        assert_eq!(midi.events()[0].message, MidiUtils::new_all_notes_off());
    }

    #[test]
    fn shrinking_duration_clamps_countdown() {
        let (mut arp, bridge) = test_arpeggiator();
        bridge.set(ParameterId::NoteDur, 10.0);
        let mut midi = MidiBuffer::default();
        hold(&mut midi, &[60]);
        arp.process_block(&mut midi, BLOCK, None);
        assert!(arp.sounding_note().is_none());

        bridge.set(ParameterId::NoteDur, 0.001);
        let mut midi = MidiBuffer::default();
        arp.process_block(&mut midi, BLOCK, None);
        assert_eq!(midi.events()[0].offset, 44);
    }
}
