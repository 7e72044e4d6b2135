// Copyright (c) 2024 Mike Tsao

pub use synth::{new_synth_voice_manager, SynthVoice, SynthVoiceManager};

mod synth;
