// Copyright (c) 2024 Mike Tsao

use super::SynthEngine;
use crate::prelude::*;

/// Drives a [SynthEngine] the way a plugin host would, but offline: fixed-size
/// blocks, an optional running transport, and MIDI that callers schedule in
/// absolute frames.
#[derive(Debug)]
pub struct HostSimulator {
    engine: SynthEngine,
    audio: AudioBuffer,
    midi: MidiBuffer,
    pending: Vec<(usize, MidiMessage)>,

    tempo: Option<Tempo>,
    is_playing: bool,
    position: usize,
    song_position: usize,
}
impl HostSimulator {
    /// Prepares `engine` for `block_size`-frame blocks of `channel_count`
    /// channels at `sample_rate`.
    pub fn new_with(
        mut engine: SynthEngine,
        sample_rate: SampleRate,
        block_size: usize,
        channel_count: usize,
    ) -> Self {
        engine.prepare(sample_rate, block_size, channel_count);
        Self {
            engine,
            audio: AudioBuffer::new_with(channel_count, block_size),
            midi: MidiBuffer::default(),
            pending: Vec::default(),
            tempo: None,
            is_playing: false,
            position: 0,
            song_position: 0,
        }
    }

    #[allow(missing_docs)]
    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }

    #[allow(missing_docs)]
    pub fn engine_mut(&mut self) -> &mut SynthEngine {
        &mut self.engine
    }

    /// The frame position of the next block. Unlike the transport position,
    /// this always advances.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Reports `tempo` (or nothing, with None) to the engine from the next
    /// block on, and starts or stops the transport. A stopped transport keeps
    /// its position.
    pub fn set_transport(&mut self, tempo: Option<Tempo>, is_playing: bool) {
        self.tempo = tempo;
        self.is_playing = is_playing;
    }

    /// Schedules `message` at absolute frame `when`. Frames already rendered
    /// are delivered at the start of the next block.
    pub fn schedule(&mut self, when: usize, message: MidiMessage) {
        let index = self.pending.partition_point(|(w, _)| *w <= when);
        self.pending.insert(index, (when, message));
    }

    /// What the engine would be told about the transport for the next block.
    pub fn transport(&self) -> Option<TransportInfo> {
        self.tempo.map(|tempo| {
            let samples_per_beat = tempo.samples_per_beat(self.engine.sample_rate());
            TransportInfo::new_with(
                tempo,
                self.song_position as f64 / samples_per_beat,
                self.is_playing,
            )
        })
    }

    /// Renders one block. Returns the audio and the MIDI the engine played.
    pub fn render_block(&mut self) -> (&AudioBuffer, &MidiBuffer) {
        let block_size = self.audio.capacity();
        let block_end = self.position + block_size;

        self.midi.clear();
        let due = self.pending.partition_point(|(w, _)| *w < block_end);
        for (when, message) in self.pending.drain(..due) {
            self.midi.add_event(
                MidiChannel::default(),
                message,
                when.saturating_sub(self.position),
            );
        }

        self.audio.clear();
        let transport = self.transport();
        self.engine
            .render_block(&mut self.audio, &mut self.midi, transport.as_ref());
        self.position = block_end;
        if self.is_playing {
            self.song_position += block_size;
        }
        (&self.audio, &self.midi)
    }

    /// Renders at least `frame_count` frames, handing each block to `f` along
    /// with its starting frame.
    pub fn render_frames(
        &mut self,
        frame_count: usize,
        mut f: impl FnMut(usize, &AudioBuffer, &MidiBuffer),
    ) {
        let end = self.position + frame_count;
        while self.position < end {
            let start = self.position;
            let (audio, midi) = self.render_block();
            f(start, audio, midi);
        }
    }

    /// Renders `frame_count` frames to a 16-bit stereo WAV file at `path`.
    /// Mono engines are written to both channels.
    #[cfg(feature = "hound")]
    pub fn export_to_wav(
        &mut self,
        frame_count: usize,
        path: std::path::PathBuf,
    ) -> anyhow::Result<()> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.engine.sample_rate().0 as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        let mut result: Result<(), hound::Error> = Ok(());
        self.render_frames(frame_count, |_, audio, _| {
            if result.is_err() {
                return;
            }
            let right_channel = 1.min(audio.channel_count().saturating_sub(1));
            for (left, right) in audio
                .channel(0)
                .iter()
                .zip(audio.channel(right_channel).iter())
            {
                if let Err(e) = writer
                    .write_sample(i16::from(Sample(*left)))
                    .and_then(|_| writer.write_sample(i16::from(Sample(*right))))
                {
                    result = Err(e);
                    return;
                }
            }
        });
        result?;
        writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::MidiUtils;

    #[test]
    fn scheduled_midi_lands_at_the_right_offset() {
        let mut host = HostSimulator::new_with(SynthEngine::default(), SampleRate::DEFAULT, 64, 2);
        host.engine().parameters().set(ParameterId::Arpeggiate, 0.0);
        host.schedule(100, MidiUtils::new_note_on(60, 100));

        let (audio, midi) = host.render_block();
        assert!(midi.is_empty());
        assert!(audio.is_silent());

        let (audio, midi) = host.render_block();
        assert_eq!(midi.events()[0].offset, 36);
        assert!(audio.channel(0)[..36].iter().all(|s| *s == 0.0));
        assert_eq!(host.position(), 128);
    }

    #[test]
    fn transport_reports_beats() {
        let mut host = HostSimulator::new_with(SynthEngine::default(), SampleRate::DEFAULT, 441, 2);
        assert!(host.transport().is_none());
        host.set_transport(Some(Tempo(120.0)), true);
        host.render_frames(22050, |_, _, _| {});
        let transport = host.transport().unwrap();
        assert_eq!(transport.ppq_position, Some(1.0));
        assert_eq!(transport.is_playing, Some(true));
    }
}
