// Copyright (c) 2024 Mike Tsao

//! The `render` example plays a held chord through the arpeggiator offline,
//! as a host would, and prints what the arpeggiator did. With the `hound`
//! feature it can also write the result to a WAV file.

use arpsynth::prelude::*;
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, about, long_about = None)]
struct Args {
    /// MIDI note numbers to hold down
    #[clap(default_values_t = vec![60, 64, 67])]
    notes: Vec<u8>,

    /// Seconds to render
    #[clap(short = 's', long, default_value_t = 4.0)]
    seconds: f64,

    /// Frames per block
    #[clap(short = 'b', long, default_value_t = 512)]
    block_size: usize,

    /// Follow this host tempo instead of free-running
    #[clap(short = 't', long)]
    tempo: Option<f64>,

    /// Parameter overrides, as name=value (for example noteDur=0.25)
    #[clap(short = 'p', long = "param")]
    parameters: Vec<String>,

    /// Settings file (JSON)
    #[clap(long)]
    settings: Option<std::path::PathBuf>,

    /// Write a WAVE file here
    #[clap(short = 'w', long)]
    wav: Option<std::path::PathBuf>,

    /// Print every arpeggiated note
    #[clap(short = 'v', long, value_parser)]
    verbose: bool,
}

fn parse_parameter(text: &str) -> anyhow::Result<(String, f64)> {
    let Some((name, value)) = text.split_once('=') else {
        return Err(anyhow::anyhow!("expected name=value, got '{text}'"));
    };
    Ok((name.trim().to_string(), value.trim().parse()?))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => SynthSettings::from_json(&std::fs::read_to_string(path)?)?,
        None => SynthSettings::default(),
    };
    let engine = SynthEngine::new_with(&settings);
    let parameters = engine.parameters();
    for text in args.parameters.iter() {
        let (name, value) = parse_parameter(text)?;
        parameters.set_by_name(&name, value)?;
    }

    let sample_rate = SampleRate::DEFAULT;
    let mut host = HostSimulator::new_with(engine, sample_rate, args.block_size, 2);
    if let Some(bpm) = args.tempo {
        parameters.set(ParameterId::Sync, 1.0);
        host.set_transport(Some(Tempo(bpm)), true);
    }
    for note in args.notes.iter() {
        host.schedule(0, MidiUtils::new_note_on(*note, 127));
    }

    let frame_count = sample_rate * Seconds(args.seconds);
    if let Some(path) = args.wav {
        #[cfg(feature = "hound")]
        {
            host.export_to_wav(frame_count, path.clone())?;
            eprintln!("Wrote {}", path.display());
        }
        #[cfg(not(feature = "hound"))]
        {
            return Err(anyhow::anyhow!(
                "can't write {}: built without the hound feature",
                path.display()
            ));
        }
    } else {
        let mut note_count = 0;
        let mut peak: SampleType = 0.0;
        host.render_frames(frame_count, |start, audio, midi| {
            for event in midi.iter() {
                if let MidiMessage::NoteOn { key, .. } = event.message {
                    note_count += 1;
                    if args.verbose {
                        println!(
                            "{:>10.4}s  note {:>3}  pan {:+.2}",
                            (start + event.offset) as f64 / sample_rate.0 as f64,
                            key.as_int(),
                            parameters.get(ParameterId::Pan)
                        );
                    }
                }
            }
            for channel in 0..audio.channel_count() {
                peak = audio
                    .channel(channel)
                    .iter()
                    .fold(peak, |peak, s| peak.max(s.abs()));
            }
        });
        println!(
            "{} notes in {:.2}s, peak {:.3}, {} dropped",
            note_count,
            args.seconds,
            peak,
            host.engine().dropped_note_count()
        );
    }
    Ok(())
}
