// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use core::f64::consts::FRAC_PI_2;
use serde::{Deserialize, Serialize};

/// A gain that glides linearly to each new target over a fixed number of
/// samples, so that moving a gain knob doesn't click.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SmoothedGain {
    ramp_duration: Seconds,

    #[serde(skip)]
    e: SmoothedGainEphemerals,
}
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SmoothedGainEphemerals {
    current: SampleType,
    target: SampleType,
    step: SampleType,
    steps_remaining: usize,
    ramp_length: usize,
}
impl Default for SmoothedGain {
    fn default() -> Self {
        Self::new_with(Seconds(0.01))
    }
}
impl SmoothedGain {
    #[allow(missing_docs)]
    pub fn new_with(ramp_duration: Seconds) -> Self {
        Self {
            ramp_duration,
            e: Default::default(),
        }
    }

    /// Recomputes the ramp length for a new sample rate and jumps straight to
    /// the current target.
    pub fn prepare(&mut self, sample_rate: SampleRate) {
        self.e.ramp_length = sample_rate * self.ramp_duration;
        self.snap_to_target();
    }

    /// Starts a ramp toward `target`, unless that's already where we're going.
    pub fn set_target(&mut self, target: Normal) {
        let target = target.0 as SampleType;
        if target == self.e.target {
            return;
        }
        self.e.target = target;
        if self.e.ramp_length == 0 {
            self.snap_to_target();
        } else {
            self.e.steps_remaining = self.e.ramp_length;
            self.e.step = (target - self.e.current) / self.e.ramp_length as SampleType;
        }
    }

    /// Ends any ramp in progress.
    pub fn snap_to_target(&mut self) {
        self.e.current = self.e.target;
        self.e.steps_remaining = 0;
    }

    #[allow(missing_docs)]
    pub fn is_smoothing(&self) -> bool {
        self.e.steps_remaining > 0
    }

    #[allow(missing_docs)]
    pub fn current(&self) -> SampleType {
        self.e.current
    }

    /// Advances one sample and returns the gain for it.
    pub fn next_value(&mut self) -> SampleType {
        if self.e.steps_remaining == 0 {
            return self.e.target;
        }
        self.e.steps_remaining -= 1;
        if self.e.steps_remaining == 0 {
            self.e.current = self.e.target;
        } else {
            self.e.current += self.e.step;
        }
        self.e.current
    }

    /// Multiplies `len` frames of every channel, starting at `start`.
    pub fn apply_to_buffer(&mut self, buffer: &mut AudioBuffer, start: usize, len: usize) {
        if !self.is_smoothing() {
            buffer.apply_gain(start, len, self.e.target);
            return;
        }
        let end = (start + len).min(buffer.frame_count());
        for frame in start..end {
            let gain = self.next_value();
            for channel in 0..buffer.channel_count() {
                buffer.channel_mut(channel)[frame] *= gain;
            }
        }
    }
}

/// Applies a constant-power stereo pan to a whole block, ramping from the
/// gains used on the previous block so that pan changes don't click.
///
/// A pan of exactly zero leaves the buffer alone, including the ramp state,
/// which is what lets a freshly prepared synth with a centered pan behave as
/// a plain mono-to-stereo voice sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanStage {
    pan: BipolarNormal,
    previous_left: SampleType,
    previous_right: SampleType,
}
impl Default for PanStage {
    fn default() -> Self {
        let (left, right) = Self::gains_for(BipolarNormal::zero());
        Self {
            pan: BipolarNormal::zero(),
            previous_left: left,
            previous_right: right,
        }
    }
}
impl TransformsAudio for PanStage {
    fn transform(&mut self, buffer: &mut AudioBuffer) {
        if self.pan.0 == 0.0 || buffer.channel_count() < 2 {
            return;
        }
        let (left, right) = Self::gains_for(self.pan);
        let frame_count = buffer.frame_count();
        buffer.apply_gain_ramp(0, 0, frame_count, self.previous_left, left);
        buffer.apply_gain_ramp(1, 0, frame_count, self.previous_right, right);
        self.previous_left = left;
        self.previous_right = right;
    }
}
impl PanStage {
    /// Constant-power gains for a pan position: `left = cos(θ)`,
    /// `right = sin(θ)`, where θ runs from 0 (hard left) to π/2 (hard right).
    pub fn gains_for(pan: BipolarNormal) -> (SampleType, SampleType) {
        let angle = 0.5 * (pan.0 + 1.0) * FRAC_PI_2;
        (angle.cos() as SampleType, angle.sin() as SampleType)
    }

    #[allow(missing_docs)]
    pub fn pan(&self) -> BipolarNormal {
        self.pan
    }

    /// Takes effect on the next block.
    pub fn set_pan(&mut self, pan: BipolarNormal) {
        self.pan = pan;
    }

    /// Forgets the previous block's gains.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The gains most recently applied, (left, right).
    pub fn previous_gains(&self) -> (SampleType, SampleType) {
        (self.previous_left, self.previous_right)
    }
}
