// Copyright (c) 2024 Mike Tsao

//! The [ParameterBridge] carries control values from the control context
//! (UI, host automation) to the render context. Every parameter is a single
//! lock-free slot. Writers never wait for readers, and readers never wait for
//! writers. There is no atomicity across slots, so a block can observe, say, a
//! new attack with an old decay; that's accepted.

use crate::{elements::Waveform, prelude::*};
use core::sync::atomic::{AtomicU64, Ordering};
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::EnumCount as UseEnumCount;
use strum_macros::{Display, EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        ArpeggiatorParameters, EnvelopeParameters, ParameterBridge, ParameterError, ParameterId,
        VoiceParameters,
    };
}

/// Errors for parameter access by name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// Nothing answers to that name.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
}

/// Identifies a [ParameterBridge] slot. The string forms (`"noteDur"` etc.)
/// are the names the control side uses.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ParameterId {
    /// Oscillator selector: 0 sine, 1 triangle, 2 sawtooth, 3 square.
    Osc,
    /// Voice output gain.
    Gain,
    /// Envelope attack, seconds.
    Attack,
    /// Envelope decay, seconds.
    Decay,
    /// Envelope sustain level, 0..=1.
    Sustain,
    /// Envelope release, seconds.
    Release,
    /// Envelope curve exponent.
    Expo,
    /// Free-running arpeggiator step length, seconds.
    NoteDur,
    /// Tempo-synced step division index: 0 whole through 7 128th.
    NoteDurSync,
    /// Probability that a step picks a random held note.
    Randomize,
    /// Probability that a step sounds at all.
    Density,
    /// Stereo scatter of arpeggiated notes.
    Width,
    /// 1 walks held notes upward, 0 downward.
    Ascending,
    /// 1 follows host tempo when the host reports it.
    Sync,
    /// 0 bypasses the arpeggiator.
    Arpeggiate,
    /// Output pan, -1..=1. Written by the arpeggiator; read by the pan stage.
    Pan,
}
impl ParameterId {
    /// The value a slot holds until someone writes to it.
    pub const fn default_value(&self) -> ParameterType {
        match self {
            ParameterId::Osc => 0.0,
            ParameterId::Gain => 0.5,
            ParameterId::Attack => 0.005,
            ParameterId::Decay => 0.005,
            ParameterId::Sustain => 1.0,
            ParameterId::Release => 0.005,
            ParameterId::Expo => 0.1,
            ParameterId::NoteDur => 0.1,
            ParameterId::NoteDurSync => 2.0,
            ParameterId::Randomize => 0.0,
            ParameterId::Density => 1.0,
            ParameterId::Width => 0.0,
            ParameterId::Ascending => 1.0,
            ParameterId::Sync => 0.0,
            ParameterId::Arpeggiate => 1.0,
            ParameterId::Pan => 0.0,
        }
    }

    /// The control-side name of this slot.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Looks up a slot by its control-side name.
    pub fn from_name(name: &str) -> Result<Self, ParameterError> {
        name.parse()
            .map_err(|_| ParameterError::UnknownParameter(name.to_string()))
    }
}

type Slots = [CachePadded<AtomicU64>; ParameterId::COUNT];

/// Shared, lock-free storage for every [ParameterId]. Cloning is cheap and
/// yields another handle onto the same slots, which is how the control
/// context gets its copy.
#[derive(Debug, Clone)]
pub struct ParameterBridge {
    slots: Arc<Slots>,
}
impl Default for ParameterBridge {
    fn default() -> Self {
        Self::new_with(|id| id.default_value())
    }
}
impl ParameterBridge {
    /// Creates a bridge whose initial values come from `initial_value`.
    pub fn new_with(initial_value: impl Fn(ParameterId) -> ParameterType) -> Self {
        let slots: Slots = core::array::from_fn(|i| {
            let value = ParameterId::from_repr(i)
                .map_or(0.0, |id| initial_value(id));
            CachePadded::new(AtomicU64::new(value.to_bits()))
        });
        Self {
            slots: Arc::new(slots),
        }
    }

    /// Another handle onto the same slots, for the control context.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    /// The most recently stored value.
    pub fn get(&self, id: ParameterId) -> ParameterType {
        ParameterType::from_bits(self.slots[id as usize].load(Ordering::Relaxed))
    }

    /// Stores a value. Never blocks.
    pub fn set(&self, id: ParameterId, value: ParameterType) {
        self.slots[id as usize].store(value.to_bits(), Ordering::Relaxed);
    }

    #[allow(missing_docs)]
    pub fn get_by_name(&self, name: &str) -> Result<ParameterType, ParameterError> {
        Ok(self.get(ParameterId::from_name(name)?))
    }

    #[allow(missing_docs)]
    pub fn set_by_name(&self, name: &str, value: ParameterType) -> Result<(), ParameterError> {
        match ParameterId::from_name(name) {
            Ok(id) => {
                self.set(id, value);
                Ok(())
            }
            Err(e) => {
                log::warn!("Ignoring write of {value} to {e}");
                Err(e)
            }
        }
    }

    fn get_bool(&self, id: ParameterId) -> bool {
        self.get(id) >= 0.5
    }

    fn get_seconds(&self, id: ParameterId) -> Seconds {
        let value = self.get(id);
        Seconds(if value.is_finite() { value.max(0.0) } else { 0.0 })
    }

    /// The envelope's view of the parameters for this block.
    pub fn envelope_parameters(&self) -> EnvelopeParameters {
        EnvelopeParameters {
            attack: self.get_seconds(ParameterId::Attack),
            decay: self.get_seconds(ParameterId::Decay),
            sustain: Normal::new(self.get(ParameterId::Sustain)),
            release: self.get_seconds(ParameterId::Release),
            expo: self.get(ParameterId::Expo),
        }
    }

    /// A voice's view of the parameters for this block.
    pub fn voice_parameters(&self) -> VoiceParameters {
        VoiceParameters {
            waveform: Waveform::from_selector(self.get(ParameterId::Osc)),
            gain: Normal::new(self.get(ParameterId::Gain)),
            envelope: self.envelope_parameters(),
        }
    }

    /// The arpeggiator's view of the parameters for this block.
    pub fn arpeggiator_parameters(&self) -> ArpeggiatorParameters {
        ArpeggiatorParameters {
            note_duration: self.get_seconds(ParameterId::NoteDur),
            sync_division: BeatValue::from_index(
                self.get(ParameterId::NoteDurSync).round().max(0.0) as usize,
            ),
            randomize: Normal::new(self.get(ParameterId::Randomize)),
            density: Normal::new(self.get(ParameterId::Density)),
            width: Normal::new(self.get(ParameterId::Width)),
            ascending: self.get_bool(ParameterId::Ascending),
            sync: self.get_bool(ParameterId::Sync),
            arpeggiate: self.get_bool(ParameterId::Arpeggiate),
        }
    }

    /// The current output pan.
    pub fn pan(&self) -> BipolarNormal {
        BipolarNormal::new(self.get(ParameterId::Pan))
    }
}

/// One block's worth of envelope settings.
///
/// Changing these while a stage is in progress takes effect at the next stage
/// transition for lengths, and immediately for sustain level and curve. The
/// resulting contour can be inconsistent with either the old or the new
/// settings. That's acceptable for a control-rate knob.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvelopeParameters {
    /// Attack time.
    pub attack: Seconds,
    /// Decay time.
    pub decay: Seconds,
    /// Sustain level.
    pub sustain: Normal,
    /// Release time.
    pub release: Seconds,
    /// Curve exponent. Near zero is linear; larger is more bowed.
    pub expo: ParameterType,
}
impl Default for EnvelopeParameters {
    fn default() -> Self {
        Self {
            attack: Seconds(ParameterId::Attack.default_value()),
            decay: Seconds(ParameterId::Decay.default_value()),
            sustain: Normal::new(ParameterId::Sustain.default_value()),
            release: Seconds(ParameterId::Release.default_value()),
            expo: ParameterId::Expo.default_value(),
        }
    }
}
impl EnvelopeParameters {
    /// A convenience constructor for tests and demos.
    pub fn new_with(attack: f64, decay: f64, sustain: f64, release: f64, expo: f64) -> Self {
        Self {
            attack: Seconds(attack),
            decay: Seconds(decay),
            sustain: Normal::new(sustain),
            release: Seconds(release),
            expo,
        }
    }
}

/// One block's worth of voice settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoiceParameters {
    #[allow(missing_docs)]
    pub waveform: Waveform,
    /// Applied through a short ramp so that knob moves don't click.
    pub gain: Normal,
    #[allow(missing_docs)]
    pub envelope: EnvelopeParameters,
}

/// One block's worth of arpeggiator settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArpeggiatorParameters {
    /// Step length when free-running.
    pub note_duration: Seconds,
    /// Step length when following host tempo.
    pub sync_division: BeatValue,
    /// Chance that a step's note is replaced by a random held note.
    pub randomize: Normal,
    /// Chance that a step sounds.
    pub density: Normal,
    /// Stereo scatter. Zero pins the pan to center.
    pub width: Normal,
    /// Walk direction.
    pub ascending: bool,
    /// Whether to follow host tempo when it's available.
    pub sync: bool,
    /// False passes MIDI straight through.
    pub arpeggiate: bool,
}
impl Default for ArpeggiatorParameters {
    fn default() -> Self {
        ParameterBridge::default().arpeggiator_parameters()
    }
}
