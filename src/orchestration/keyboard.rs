// Copyright (c) 2024 Mike Tsao

use crate::{prelude::*, util::MidiUtils};
use crossbeam::queue::ArrayQueue;
use delegate::delegate;
use std::sync::Arc;

/// A bounded, lock-free mailbox of MIDI messages from the control context
/// (an on-screen keyboard, say) to the render context. Clones share the same
/// queue.
#[derive(Debug)]
pub struct KeyboardQueue(Arc<ArrayQueue<MidiMessage>>);
impl Clone for KeyboardQueue {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}
impl KeyboardQueue {
    /// Creates a queue that holds up to `capacity` messages.
    pub fn new_with(capacity: usize) -> Self {
        Self(Arc::new(ArrayQueue::new(capacity.max(1))))
    }

    delegate! {
        to self.0 {
            #[allow(missing_docs)]
            pub fn len(&self) -> usize;
            #[allow(missing_docs)]
            pub fn is_empty(&self) -> bool;
            #[allow(missing_docs)]
            pub fn capacity(&self) -> usize;
        }
    }

    /// Queues a message. Returns false, dropping the message, if the queue is
    /// full.
    pub fn send(&self, message: MidiMessage) -> bool {
        self.0.push(message).is_ok()
    }

    #[allow(missing_docs)]
    pub fn note_on(&self, key: u8, velocity: u8) -> bool {
        self.send(MidiUtils::new_note_on(key, velocity))
    }

    #[allow(missing_docs)]
    pub fn note_off(&self, key: u8) -> bool {
        self.send(MidiUtils::new_note_off(key, 0))
    }

    /// Moves every waiting message into `midi` at offset 0, in the order they
    /// were sent. Messages that don't fit in `midi` stay queued for the next
    /// block.
    pub fn drain_into(&self, midi: &mut MidiBuffer) {
        while midi.len() < midi.capacity() {
            let Some(message) = self.0.pop() else {
                break;
            };
            midi.add_event(MidiChannel::default(), message, 0);
        }
    }
}
