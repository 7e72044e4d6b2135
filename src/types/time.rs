// Copyright (c) 2024 Mike Tsao

//! Handles digital-audio, wall-clock, and musical time.

use crate::types::ParameterType;
use core::{fmt, ops::Mul};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount, EnumIter, FromRepr, IntoStaticStr};
use synonym::Synonym;

/// Beats per minute.
#[derive(Synonym, Serialize, Deserialize, Clone, Copy, Debug, Derivative, PartialEq)]
#[derivative(Default)]
#[synonym(skip(Default))]
#[serde(rename_all = "kebab-case")]
pub struct Tempo(#[derivative(Default(value = "120.0"))] pub ParameterType);
impl Tempo {
    /// The largest value we'll allow.
    pub const MAX_VALUE: ParameterType = 1024.0;

    /// The smallest value we'll treat as a real tempo. Zero would mean an
    /// infinitely long beat.
    pub const MIN_VALUE: ParameterType = 1.0;

    /// Beats per second.
    pub fn bps(&self) -> ParameterType {
        self.0 / 60.0
    }

    /// How many samples one beat lasts at the given sample rate.
    pub fn samples_per_beat(&self, sample_rate: SampleRate) -> f64 {
        60.0 / self.0.clamp(Self::MIN_VALUE, Self::MAX_VALUE) * sample_rate.0 as f64
    }

    /// MIN..=MAX
    pub const fn range() -> core::ops::RangeInclusive<ParameterType> {
        Self::MIN_VALUE..=Self::MAX_VALUE
    }
}
impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:0.2} BPM", self.0))
    }
}

/// [BeatValue] enumerates the note divisions the arpeggiator can lock to when
/// following host tempo. The discriminant is the power-of-two denominator, so
/// [BeatValue::Quarter] is 4.
#[derive(
    Clone, Copy, Debug, Default, EnumCount, EnumIter, FromRepr, IntoStaticStr, PartialEq, Eq,
)]
pub enum BeatValue {
    /// semibreve
    Whole = 1,
    /// minim
    Half = 2,
    /// crotchet
    #[default]
    Quarter = 4,
    /// quaver
    Eighth = 8,
    /// semiquaver
    Sixteenth = 16,
    /// demisemiquaver
    ThirtySecond = 32,
    /// hemidemisemiquaver
    SixtyFourth = 64,
    /// semihemidemisemiquaver
    OneHundredTwentyEighth = 128,
}
impl BeatValue {
    /// Maps a selector index (0 = whole, 1 = half, ..., 7 = 128th) to a
    /// [BeatValue]. Out-of-range indexes saturate at the ends.
    pub fn from_index(index: usize) -> Self {
        let denominator = 1usize << index.min(7);
        Self::from_repr(denominator).unwrap_or_default()
    }

    /// The power-of-two denominator of this division.
    pub fn denominator(&self) -> usize {
        *self as usize
    }

    /// Length of this division in quarter-note beats (the unit of a host's
    /// ppq position). A whole note is four beats.
    pub fn beats(&self) -> f64 {
        4.0 / self.denominator() as f64
    }
}

/// Represents the [seconds](https://en.wikipedia.org/wiki/Second) unit of time.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Seconds(pub f64);
impl Seconds {
    /// Zero seconds.
    pub const fn zero() -> Seconds {
        Seconds(0.0)
    }
}

/// Samples per second. Always a positive integer; cannot be zero.
#[derive(Synonym, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[synonym(skip(Default))]
#[serde(rename_all = "kebab-case")]
pub struct SampleRate(#[derivative(Default(value = "44100"))] pub usize);
#[allow(missing_docs)]
impl SampleRate {
    pub const DEFAULT_SAMPLE_RATE: usize = 44100;
    pub const DEFAULT: SampleRate = SampleRate::new(Self::DEFAULT_SAMPLE_RATE);

    pub const fn new(value: usize) -> Self {
        if value != 0 {
            Self(value)
        } else {
            Self(Self::DEFAULT_SAMPLE_RATE)
        }
    }
}
impl From<f64> for SampleRate {
    fn from(value: f64) -> Self {
        Self::new(value as usize)
    }
}
impl From<SampleRate> for f64 {
    fn from(value: SampleRate) -> Self {
        value.0 as f64
    }
}
impl Mul<Seconds> for SampleRate {
    type Output = usize;

    /// The number of whole samples in the given duration, rounded to the
    /// nearest sample. Negative durations count as zero.
    fn mul(self, rhs: Seconds) -> Self::Output {
        (self.0 as f64 * rhs.0.max(0.0)).round() as usize
    }
}

/// What the host tells us about its transport for the current block. Any
/// field can be missing; hosts differ in what they report, and some report
/// nothing at all.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransportInfo {
    /// Host tempo.
    pub tempo: Option<Tempo>,
    /// Host position in quarter-note beats at the first sample of the block.
    pub ppq_position: Option<f64>,
    /// Whether the host transport is running.
    pub is_playing: Option<bool>,
}
impl TransportInfo {
    /// A transport that reports everything.
    pub fn new_with(tempo: Tempo, ppq_position: f64, is_playing: bool) -> Self {
        Self {
            tempo: Some(tempo),
            ppq_position: Some(ppq_position),
            is_playing: Some(is_playing),
        }
    }

    /// Returns (tempo, ppq, playing) only if the host reported all three.
    pub fn complete(&self) -> Option<(Tempo, f64, bool)> {
        match (self.tempo, self.ppq_position, self.is_playing) {
            (Some(tempo), Some(ppq), Some(is_playing)) => Some((tempo, ppq, is_playing)),
            _ => None,
        }
    }
}
