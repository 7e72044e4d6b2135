// Copyright (c) 2024 Mike Tsao

//! Fixed-capacity buffers for the render path. Both are sized once, outside
//! the audio callback, and never reallocate afterward as long as callers stay
//! within the capacity they asked for.

use super::{MidiChannel, MidiEvent, MidiMessage, SampleType};
use core::ops::Range;

/// A planar multichannel block of audio samples. The *capacity* is the
/// largest block it can hold; the *frame count* is the size of the block
/// currently being processed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<SampleType>>,
    frame_count: usize,
}
impl AudioBuffer {
    /// Creates a silent buffer whose frame count equals its capacity.
    pub fn new_with(channel_count: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; channel_count],
            frame_count: capacity,
        }
    }

    /// Resizes the buffer. This allocates, so call it from `prepare()`-type
    /// code only. Contents are cleared.
    pub fn resize(&mut self, channel_count: usize, capacity: usize) {
        self.channels.resize_with(channel_count, Vec::default);
        for channel in self.channels.iter_mut() {
            channel.clear();
            channel.resize(capacity, 0.0);
        }
        self.frame_count = capacity;
    }

    /// The number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The largest frame count this buffer can take without reallocating.
    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    /// The number of frames in the current block.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Sets the size of the current block. Silently limited to the capacity.
    pub fn set_frame_count(&mut self, frame_count: usize) {
        debug_assert!(frame_count <= self.capacity());
        self.frame_count = frame_count.min(self.capacity());
    }

    /// One channel of the current block.
    pub fn channel(&self, channel: usize) -> &[SampleType] {
        &self.channels[channel][..self.frame_count]
    }

    /// One channel of the current block, mutably.
    pub fn channel_mut(&mut self, channel: usize) -> &mut [SampleType] {
        &mut self.channels[channel][..self.frame_count]
    }

    /// Zeroes the current block on every channel.
    pub fn clear(&mut self) {
        let frame_count = self.frame_count;
        self.clear_range(0, frame_count);
    }

    /// Zeroes `len` frames starting at `start` on every channel.
    pub fn clear_range(&mut self, start: usize, len: usize) {
        let range = self.range(start, len);
        for channel in self.channels.iter_mut() {
            channel[range.clone()].fill(0.0);
        }
    }

    /// Multiplies `len` frames starting at `start`, on every channel, by a
    /// constant gain.
    pub fn apply_gain(&mut self, start: usize, len: usize, gain: SampleType) {
        if gain == 1.0 {
            return;
        }
        let range = self.range(start, len);
        for channel in self.channels.iter_mut() {
            channel[range.clone()].iter_mut().for_each(|s| *s *= gain);
        }
    }

    /// Multiplies one channel by a gain that moves linearly from `start_gain`
    /// toward `end_gain` across the range. The first frame gets `start_gain`;
    /// each following frame steps by `(end_gain - start_gain) / len`.
    pub fn apply_gain_ramp(
        &mut self,
        channel: usize,
        start: usize,
        len: usize,
        start_gain: SampleType,
        end_gain: SampleType,
    ) {
        let range = self.range(start, len);
        if range.is_empty() {
            return;
        }
        if start_gain == end_gain {
            if start_gain != 1.0 {
                self.channels[channel][range]
                    .iter_mut()
                    .for_each(|s| *s *= start_gain);
            }
            return;
        }
        let increment = (end_gain - start_gain) / range.len() as SampleType;
        let mut gain = start_gain;
        for s in self.channels[channel][range].iter_mut() {
            *s *= gain;
            gain += increment;
        }
    }

    /// Adds (mixes) `len` frames of `source`, starting at `source_start`, into
    /// this buffer starting at `dest_start`. Channels that exist in only one of
    /// the buffers are skipped.
    pub fn add_from(
        &mut self,
        dest_start: usize,
        source: &AudioBuffer,
        source_start: usize,
        len: usize,
    ) {
        let dest_range = self.range(dest_start, len);
        let source_range = source.range(source_start, len);
        let len = dest_range.len().min(source_range.len());
        for (dst, src) in self.channels.iter_mut().zip(source.channels.iter()) {
            dst[dest_range.start..dest_range.start + len]
                .iter_mut()
                .zip(src[source_range.start..source_range.start + len].iter())
                .for_each(|(d, s)| *d += *s);
        }
    }

    /// Whether any sample of the current block is nonzero.
    pub fn is_silent(&self) -> bool {
        (0..self.channel_count()).all(|c| self.channel(c).iter().all(|s| *s == 0.0))
    }

    fn range(&self, start: usize, len: usize) -> Range<usize> {
        let start = start.min(self.frame_count);
        let end = start.saturating_add(len).min(self.frame_count);
        start..end
    }
}

/// An ordered sequence of [MidiEvent]s for one audio block, kept sorted by
/// sample offset. Events with equal offsets keep their insertion order, so a
/// note-off added before a note-on at the same offset is delivered first.
#[derive(Clone, Debug, PartialEq)]
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
}
impl Default for MidiBuffer {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
impl MidiBuffer {
    /// Enough for any reasonable block.
    pub const DEFAULT_CAPACITY: usize = 512;

    /// Creates an empty buffer that can hold `capacity` events without
    /// allocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Inserts an event at its sorted position. Returns false, dropping the
    /// event, if the buffer is full.
    pub fn add_event(&mut self, channel: MidiChannel, message: MidiMessage, offset: usize) -> bool {
        if self.events.len() == self.events.capacity() {
            return false;
        }
        let index = self.events.partition_point(|e| e.offset <= offset);
        self.events
            .insert(index, MidiEvent::new_with(channel, message, offset));
        true
    }

    /// The events, in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events.iter()
    }

    /// The events as a slice, in delivery order.
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    /// Keeps only the events the predicate approves of. Order is preserved.
    pub fn retain<F: FnMut(&MidiEvent) -> bool>(&mut self, f: F) {
        self.events.retain(f);
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// How many events fit without allocating.
    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes all events. Keeps capacity.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::MidiUtils;

    #[test]
    fn audio_buffer_add_is_a_mix_not_an_overwrite() {
        let mut dst = AudioBuffer::new_with(2, 8);
        dst.channel_mut(0).fill(0.25);
        let mut src = AudioBuffer::new_with(2, 8);
        src.channel_mut(0).fill(0.5);
        src.channel_mut(1).fill(-0.5);

        dst.add_from(4, &src, 0, 4);
        assert_eq!(dst.channel(0)[..4], [0.25; 4]);
        assert_eq!(dst.channel(0)[4..], [0.75; 4]);
        assert_eq!(dst.channel(1)[..4], [0.0; 4]);
        assert_eq!(dst.channel(1)[4..], [-0.5; 4]);
    }

    #[test]
    fn audio_buffer_ranges_are_clamped() {
        let mut b = AudioBuffer::new_with(1, 4);
        b.channel_mut(0).fill(1.0);
        b.clear_range(2, 100);
        assert_eq!(b.channel(0), [1.0, 1.0, 0.0, 0.0]);
        b.apply_gain(10, 10, 0.0);
        assert_eq!(b.channel(0), [1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn audio_buffer_frame_count() {
        let mut b = AudioBuffer::new_with(2, 16);
        assert_eq!(b.capacity(), 16);
        b.set_frame_count(4);
        assert_eq!(b.channel(1).len(), 4);
        b.channel_mut(0).fill(1.0);
        b.set_frame_count(16);
        assert_eq!(b.channel(0)[4..], [0.0; 12]);
    }

    #[test]
    fn gain_ramp_matches_linear_steps() {
        let mut b = AudioBuffer::new_with(1, 4);
        b.channel_mut(0).fill(1.0);
        b.apply_gain_ramp(0, 0, 4, 0.0, 1.0);
        assert_eq!(b.channel(0), [0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn midi_buffer_keeps_events_sorted_and_stable() {
        let mut m = MidiBuffer::default();
        let ch = MidiChannel::default();
        assert!(m.add_event(ch, MidiUtils::new_note_on(60, 100), 10));
        assert!(m.add_event(ch, MidiUtils::new_note_on(62, 100), 2));
        assert!(m.add_event(ch, MidiUtils::new_note_off(62, 0), 10));
        let offsets: Vec<usize> = m.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![2, 10, 10]);
        assert_eq!(m.events()[1].message, MidiUtils::new_note_on(60, 100));
        assert_eq!(m.events()[2].message, MidiUtils::new_note_off(62, 0));
    }

    #[test]
    fn midi_buffer_refuses_to_grow() {
        let mut m = MidiBuffer::with_capacity(1);
        let capacity = m.events.capacity();
        for _ in 0..capacity {
            assert!(m.add_event(MidiChannel::default(), MidiUtils::new_note_on(1, 1), 0));
        }
        assert!(!m.add_event(MidiChannel::default(), MidiUtils::new_note_on(1, 1), 0));
        assert_eq!(m.len(), capacity);
    }
}
