// Copyright (c) 2024 Mike Tsao

use crate::{parameters::EnvelopeParameters, prelude::*};
use core::f64::consts::PI;
use delegate::delegate;
use derive_builder::Builder;
use kahan::KahanSum;
use serde::{Deserialize, Serialize};
use strum::EnumCount as UseEnumCount;
use strum_macros::{Display, EnumCount, EnumIter, FromRepr, IntoStaticStr};

/// Classic oscillator waveforms. The discriminant is the selector index that
/// the `osc` parameter carries.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumCount,
    EnumIter,
    FromRepr,
    IntoStaticStr,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Waveform {
    /// Sine wave
    #[default]
    Sine = 0,
    /// Triangle wave
    Triangle = 1,
    /// Sawtooth wave
    Sawtooth = 2,
    /// Square wave
    Square = 3,
}
impl Waveform {
    /// Maps a parameter value to a waveform, rounding to the nearest index and
    /// saturating at the ends.
    pub fn from_selector(value: ParameterType) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        let index = value.round().clamp(0.0, (Self::COUNT - 1) as f64) as usize;
        Self::from_repr(index).unwrap_or_default()
    }

    /// The waveform's amplitude at phase `x`, where one cycle spans
    /// `[-π, π)`.
    //
    // https://en.wikipedia.org/wiki/Sine_wave
    // https://en.wikipedia.org/wiki/Triangle_wave
    // https://en.wikipedia.org/wiki/Sawtooth_wave
    // https://en.wikipedia.org/wiki/Square_wave
    pub fn value_at(&self, x: f64) -> f64 {
        match self {
            Waveform::Sine => x.sin(),
            Waveform::Triangle => 2.0 / PI * x.sin().asin(),
            Waveform::Sawtooth => x / PI,
            Waveform::Square => {
                if x < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
        }
    }
}

/// A signal generator that produces traditional waveforms (sine, square,
/// triangle, sawtooth).
#[derive(Clone, Builder, Debug, Default, Serialize, Deserialize)]
#[builder(default)]
#[serde(rename_all = "kebab-case")]
pub struct Oscillator {
    /// The fundamental waveform for this oscillator.
    pub waveform: Waveform,

    /// Hertz. Any positive number. 440 = A4
    #[serde(skip)]
    pub frequency: FrequencyHz,

    #[serde(skip)]
    #[builder(setter(skip))]
    e: OscillatorEphemerals,
}
#[derive(Clone, Debug, Default)]
struct OscillatorEphemerals {
    // Where we are in the current cycle, 0.0..1.0. Kept across frequency and
    // waveform changes so that neither causes a discontinuity. Kahan summation
    // keeps the accumulated error from drifting the pitch over long notes.
    cycle_position: KahanSum<f64>,

    delta: f64,
    delta_updated: bool,

    c: Configurables,
}
impl Generates<SampleType> for Oscillator {
    fn generate(&mut self, values: &mut [SampleType]) -> bool {
        values
            .iter_mut()
            .for_each(|v| *v = self.next_sample() as SampleType);
        true
    }
}
impl Configurable for Oscillator {
    delegate! {
        to self.e.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.e.c.update_sample_rate(sample_rate);
        self.e.delta_updated = false;
    }

    fn reset(&mut self) {
        self.reset_phase();
    }
}
impl Oscillator {
    /// Sets the frequency. With `force`, the cycle restarts from the
    /// beginning, which is what a fresh note wants. Without it, the phase
    /// carries on and only the rate changes.
    pub fn set_frequency(&mut self, frequency: FrequencyHz, force: bool) {
        self.frequency = frequency;
        self.e.delta_updated = false;
        if force {
            self.reset_phase();
        }
    }

    #[allow(missing_docs)]
    pub fn frequency(&self) -> FrequencyHz {
        self.frequency
    }

    #[allow(missing_docs)]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Changes the waveform without disturbing the phase.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Restarts the cycle.
    pub fn reset_phase(&mut self) {
        self.e.cycle_position = Default::default();
    }

    /// The current position in the cycle, 0.0..1.0.
    pub fn cycle_position(&self) -> f64 {
        self.e.cycle_position.sum()
    }

    /// Produces one sample and advances the phase.
    pub fn next_sample(&mut self) -> f64 {
        self.update_delta();
        let x = self.e.cycle_position.sum() * 2.0 * PI - PI;
        let value = self.waveform.value_at(x);

        self.e.cycle_position += self.e.delta;
        let position = self.e.cycle_position.sum();
        if position >= 1.0 {
            self.e.cycle_position += -position.floor();
        }
        value
    }

    /// Writes `len` frames of signal, starting at `start`, to every channel
    /// of `buffer`.
    pub fn render(&mut self, buffer: &mut AudioBuffer, start: usize, len: usize) {
        let end = (start + len).min(buffer.frame_count());
        for frame in start..end {
            let value = self.next_sample() as SampleType;
            for channel in 0..buffer.channel_count() {
                buffer.channel_mut(channel)[frame] = value;
            }
        }
    }

    fn update_delta(&mut self) {
        if !self.e.delta_updated {
            self.e.delta = self.frequency.0.max(0.0) / self.e.c.sample_rate().0 as f64;

            // This resets the accumulated error.
            self.e.cycle_position = KahanSum::new_with_value(self.e.cycle_position.sum());

            self.e.delta_updated = true;
        }
    }
}

/// The stages of an ADSR envelope.
#[derive(Clone, Copy, Debug, Default, Display, IntoStaticStr, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Silent, waiting for a note.
    #[default]
    Idle,
    /// Rising from zero to full.
    Attack,
    /// Falling from full to the sustain level.
    Decay,
    /// Holding the sustain level until note-off.
    Sustain,
    /// Falling from wherever note-off caught us to zero.
    Release,
}

/// A signal generator that behaves like a typical ADSR envelope, with
/// exponentially curved segments.
///
/// Levels are computed from the position within the current stage,
/// `t = elapsed / length`, so each stage lands exactly where the next one
/// begins. The curve exponent `k` bends the segments:
///
/// - rising: `(e^(k·t) − 1) / (e^k − 1)`
/// - falling: `(e^(−k·(t−1)) − 1) / (e^k − 1)`
///
/// Exponents within 1e-6 of zero are treated as straight lines.
#[derive(Clone, Builder, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[builder(default)]
pub struct Envelope {
    /// Stage times, sustain level, and curve.
    parameters: EnvelopeParameters,

    #[serde(skip)]
    #[builder(setter(skip))]
    e: EnvelopeEphemerals,
}
#[derive(Clone, Debug, Default)]
struct EnvelopeEphemerals {
    stage: EnvelopeStage,
    level: f64,
    elapsed: usize,
    stage_length: usize,
    level_at_release: f64,

    c: Configurables,
}
impl Generates<SampleType> for Envelope {
    fn generate(&mut self, values: &mut [SampleType]) -> bool {
        let mut generated_signal = false;
        for value in values {
            *value = self.next_sample() as SampleType;
            generated_signal |= *value != 0.0;
        }
        generated_signal
    }
}
impl Configurable for Envelope {
    delegate! {
        to self.e.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.e.c.update_sample_rate(sample_rate);
        self.reset();
    }

    fn reset(&mut self) {
        self.enter_stage(EnvelopeStage::Idle);
    }
}
impl Envelope {
    const LINEAR_THRESHOLD: f64 = 1e-6;

    #[allow(missing_docs)]
    pub fn new_with(parameters: EnvelopeParameters) -> Self {
        Self {
            parameters,
            e: Default::default(),
        }
    }

    /// Takes a new parameter snapshot. Stage lengths take effect when the
    /// next stage begins; sustain level and curve take effect immediately.
    pub fn set_parameters(&mut self, parameters: EnvelopeParameters) {
        self.parameters = parameters;
    }

    #[allow(missing_docs)]
    pub fn parameters(&self) -> &EnvelopeParameters {
        &self.parameters
    }

    #[allow(missing_docs)]
    pub fn stage(&self) -> EnvelopeStage {
        self.e.stage
    }

    /// The most recently produced level.
    pub fn level(&self) -> f64 {
        self.e.level
    }

    /// Whether the envelope is anywhere but [EnvelopeStage::Idle].
    pub fn is_active(&self) -> bool {
        self.e.stage != EnvelopeStage::Idle
    }

    /// Starts the envelope from the top.
    pub fn note_on(&mut self) {
        self.enter_stage(EnvelopeStage::Attack);
    }

    /// Starts the release from whatever level the envelope has reached. A
    /// zero release, or a note-off while idle, goes straight to idle.
    pub fn note_off(&mut self) {
        if !self.is_active() {
            return;
        }
        if self.samples_for(self.parameters.release) > 0 {
            self.e.level_at_release = self.e.level;
            self.enter_stage(EnvelopeStage::Release);
        } else {
            self.reset();
        }
    }

    /// Produces one level and advances the envelope.
    pub fn next_sample(&mut self) -> f64 {
        loop {
            match self.e.stage {
                EnvelopeStage::Idle => {
                    self.e.level = 0.0;
                    return 0.0;
                }
                EnvelopeStage::Sustain => {
                    self.e.level = self.parameters.sustain.0;
                    return self.e.level;
                }
                EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Release => {
                    if self.e.elapsed < self.e.stage_length {
                        break;
                    }
                    self.enter_stage(match self.e.stage {
                        EnvelopeStage::Attack => EnvelopeStage::Decay,
                        EnvelopeStage::Decay => EnvelopeStage::Sustain,
                        _ => EnvelopeStage::Idle,
                    });
                }
            }
        }

        let t = self.e.elapsed as f64 / self.e.stage_length as f64;
        let k = self.parameters.expo;
        let sustain = self.parameters.sustain.0;
        self.e.level = match self.e.stage {
            EnvelopeStage::Attack => Self::rising(t, k),
            EnvelopeStage::Decay => Self::falling(t, k) * (1.0 - sustain) + sustain,
            _ => Self::falling(t, k) * self.e.level_at_release,
        };
        self.e.elapsed += 1;
        self.e.level
    }

    /// Multiplies `len` frames of every channel of `buffer`, starting at
    /// `start`, by the envelope, advancing it as it goes.
    pub fn apply_to_buffer(&mut self, buffer: &mut AudioBuffer, start: usize, len: usize) {
        match self.e.stage {
            EnvelopeStage::Idle => {
                self.e.level = 0.0;
                buffer.clear_range(start, len);
            }
            EnvelopeStage::Sustain => {
                self.e.level = self.parameters.sustain.0;
                buffer.apply_gain(start, len, self.e.level as SampleType);
            }
            _ => {
                let end = (start + len).min(buffer.frame_count());
                for frame in start..end {
                    let level = self.next_sample() as SampleType;
                    for channel in 0..buffer.channel_count() {
                        buffer.channel_mut(channel)[frame] *= level;
                    }
                }
            }
        }
    }

    // Zero-length stages are skipped, so stage() never reports one.
    fn enter_stage(&mut self, mut stage: EnvelopeStage) {
        let stage_length = loop {
            let (length, next) = match stage {
                EnvelopeStage::Attack => (
                    self.samples_for(self.parameters.attack),
                    EnvelopeStage::Decay,
                ),
                EnvelopeStage::Decay => (
                    self.samples_for(self.parameters.decay),
                    EnvelopeStage::Sustain,
                ),
                EnvelopeStage::Release => (
                    self.samples_for(self.parameters.release),
                    EnvelopeStage::Idle,
                ),
                EnvelopeStage::Idle | EnvelopeStage::Sustain => break 0,
            };
            if length > 0 {
                break length;
            }
            stage = next;
        };
        self.e.stage = stage;
        self.e.elapsed = 0;
        self.e.stage_length = stage_length;
        if stage == EnvelopeStage::Idle {
            self.e.level = 0.0;
            self.e.level_at_release = 0.0;
        }
    }

    fn samples_for(&self, seconds: Seconds) -> usize {
        self.e.c.sample_rate() * seconds
    }

    fn rising(t: f64, k: f64) -> f64 {
        if k.abs() < Self::LINEAR_THRESHOLD {
            t
        } else {
            (k * t).exp_m1() / k.exp_m1()
        }
    }

    fn falling(t: f64, k: f64) -> f64 {
        if k.abs() < Self::LINEAR_THRESHOLD {
            1.0 - t
        } else {
            (-k * (t - 1.0)).exp_m1() / k.exp_m1()
        }
    }
}
