// Copyright (c) 2024 Mike Tsao

pub use arpeggiator::{Arpeggiator, ArpeggiatorRunState};

mod arpeggiator;
