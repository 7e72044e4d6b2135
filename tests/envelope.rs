// Copyright (c) 2024 Mike Tsao

use arpsynth::prelude::*;
use float_cmp::approx_eq;
use more_asserts::{assert_gt, assert_lt};

fn envelope_with(parameters: EnvelopeParameters) -> Envelope {
    let mut envelope = Envelope::new_with(parameters);
    envelope.update_sample_rate(SampleRate::DEFAULT);
    envelope
}

#[test]
fn contour_has_no_jumps() {
    let mut envelope = envelope_with(EnvelopeParameters::new_with(0.01, 0.02, 0.5, 0.03, 2.0));
    envelope.note_on();

    let mut levels = Vec::default();
    for _ in 0..2000 {
        levels.push(envelope.next_sample());
    }
    assert_eq!(envelope.stage(), EnvelopeStage::Sustain);
    envelope.note_off();
    while envelope.is_active() {
        levels.push(envelope.next_sample());
    }
    levels.push(envelope.next_sample());

    // The steepest point is the end of the attack: k·e^k / (e^k − 1) / 441.
    for pair in levels.windows(2) {
        assert_lt!((pair[1] - pair[0]).abs(), 0.01);
    }
    assert!(levels.iter().all(|l| (0.0..=1.0).contains(l)));
    assert_eq!(*levels.last().unwrap(), 0.0);
}

#[test]
fn zero_time_envelope_is_a_gate() {
    let mut envelope = envelope_with(EnvelopeParameters::new_with(0.0, 0.0, 1.0, 0.0, 0.1));
    envelope.note_on();
    assert_eq!(envelope.next_sample(), 1.0);
    assert_eq!(envelope.stage(), EnvelopeStage::Sustain);

    envelope.note_off();
    assert!(!envelope.is_active());
    assert_eq!(envelope.next_sample(), 0.0);
}

#[test]
fn zero_exponent_is_linear_not_nan() {
    let mut envelope = envelope_with(EnvelopeParameters::new_with(0.001, 0.0, 1.0, 0.0, 0.0));
    envelope.note_on();
    let levels: Vec<f64> = (0..44).map(|_| envelope.next_sample()).collect();
    assert!(levels.iter().all(|l| l.is_finite()));
    assert!(approx_eq!(f64, levels[22], 0.5, epsilon = 0.05));
}

#[test]
fn idle_is_idempotent() {
    let mut envelope = envelope_with(Default::default());
    for _ in 0..3 {
        envelope.note_off();
        envelope.reset();
        assert_eq!(envelope.stage(), EnvelopeStage::Idle);
        assert_eq!(envelope.next_sample(), 0.0);
    }

    let mut buffer = AudioBuffer::new_with(2, 16);
    buffer.channel_mut(0).fill(1.0);
    envelope.apply_to_buffer(&mut buffer, 0, 16);
    assert!(buffer.is_silent());
}

#[test]
fn release_starts_where_attack_left_off() {
    let mut envelope = envelope_with(EnvelopeParameters::new_with(1.0, 0.1, 0.8, 0.5, 1.0));
    envelope.note_on();
    for _ in 0..4410 {
        envelope.next_sample();
    }
    let reached = envelope.level();
    assert_gt!(reached, 0.0);
    assert_lt!(reached, 0.5);

    envelope.note_off();
    assert_eq!(envelope.stage(), EnvelopeStage::Release);
    let first = envelope.next_sample();
    assert!(approx_eq!(f64, first, reached, epsilon = 1e-9));

    let mut previous = first;
    while envelope.is_active() {
        let level = envelope.next_sample();
        assert!(level <= previous);
        previous = level;
    }
}
