use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::ArgMatches;
use log::{info, warn};
use trackmix_lib::{AudioMixer, AudioTime, MixerError, MixerSettings, PcmFormat};

use crate::error::CliError;
use crate::logging;
use crate::wav::{self, WavTrack};

const MAXIMUM_TRACKS: usize = u8::MAX as usize + 1;
const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Everything the mixer emitted during a run.
#[derive(Debug, Default)]
struct Capture {
    format: Option<PcmFormat>,
    samples: Vec<f32>,
    buffers: usize,
    format_changes: usize,
    errors: Vec<MixerError>,
}

pub fn run(args: &ArgMatches, log_buffer: Arc<Mutex<VecDeque<String>>>) -> Result<i32, CliError> {
    let quiet = args.get_flag("quiet");
    match args.subcommand() {
        Some(("mix", mix_args)) => run_mix(mix_args, quiet, &log_buffer),
        Some(("create", create_args)) => match create_args.subcommand() {
            Some(("settings-json", _)) => {
                println!("{}", MixerSettings::default().to_json_pretty()?);
                Ok(0)
            }
            _ => Ok(-1),
        },
        _ => Ok(-1),
    }
}

fn run_mix(
    args: &ArgMatches,
    quiet: bool,
    log_buffer: &Arc<Mutex<VecDeque<String>>>,
) -> Result<i32, CliError> {
    let inputs: Vec<PathBuf> = args
        .get_many::<String>("INPUT")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();
    if inputs.len() > MAXIMUM_TRACKS {
        return Err(CliError::TooManyInputs(inputs.len()));
    }
    let out = args
        .get_one::<String>("out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mix.wav"));
    let chunk = args.get_one::<u32>("chunk").copied().unwrap_or(1024) as usize;

    let mut settings = match args.get_one::<String>("settings") {
        Some(path) => MixerSettings::load(path)?,
        None => MixerSettings::default(),
    };
    if let Some(main) = args.get_one::<u8>("main") {
        settings.main_track = *main;
    }
    let main = settings.main_track;
    if main as usize >= inputs.len() {
        return Err(CliError::MainTrackOutOfRange {
            main,
            tracks: inputs.len(),
        });
    }

    let tracks = inputs
        .iter()
        .map(|path| wav::read_wav(path))
        .collect::<Result<Vec<_>, _>>()?;

    info!("Starting trackmix: {} tracks, main track {}", tracks.len(), main);
    let capture = mix_tracks(&tracks, chunk, settings)?;

    let Some(format) = capture.format else {
        return Err(CliError::NoOutput);
    };
    wav::write_wav(&out, format, &capture.samples)?;

    if !quiet {
        print_summary(&out, format, &capture, tracks.len());
        if !capture.errors.is_empty() && !logging::echoes_stderr() {
            for line in logging::snapshot(log_buffer)
                .iter()
                .filter(|line| line.starts_with("[WARN]"))
            {
                eprintln!("{}", line);
            }
        }
    }

    Ok(0)
}

/// Feed every track through a mixer chunk by chunk, main track last in each
/// round, and collect what it emits.
fn mix_tracks(
    tracks: &[WavTrack],
    chunk: usize,
    settings: MixerSettings,
) -> Result<Capture, CliError> {
    let main = settings.main_track;
    if main as usize >= tracks.len() {
        return Err(CliError::MainTrackOutOfRange {
            main,
            tracks: tracks.len(),
        });
    }
    let mixer = AudioMixer::with_settings(settings)?;
    let capture = Arc::new(Mutex::new(Capture::default()));

    let sink = capture.clone();
    mixer.set_output_handler(move |buffer, _when| {
        let mut capture = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let format = buffer.format();
        if capture.format.is_some_and(|current| current != format) {
            warn!("output format changed to {}", format);
            capture.format_changes += 1;
        }
        capture.format = Some(format);
        if let Some(samples) = buffer.into_f32() {
            capture.samples.extend_from_slice(&samples);
        }
        capture.buffers += 1;
    });
    let sink = capture.clone();
    mixer.set_error_handler(move |err| {
        warn!("{}", err);
        sink.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .errors
            .push(err);
    });

    let main_track = &tracks[main as usize];
    let rounds = main_track.frame_count().div_ceil(chunk);
    for round in 0..rounds {
        let order = tracks
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != main as usize)
            .chain(std::iter::once((main as usize, main_track)));
        for (id, track) in order {
            let (start, end) = chunk_bounds(round, chunk, main_track.sample_rate, track.sample_rate);
            if let Some(buffer) = track.chunk(start, end - start) {
                let when = host_time(start, track.sample_rate);
                mixer.append(id as u8, buffer, Some(when));
            }
        }
    }

    drop(mixer);
    let mut capture = capture
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(std::mem::take(&mut *capture))
}

/// Frame range of a track at `rate` covering main-track round `round`.
///
/// Both ends come from the exact running position, so rounds tile the track
/// without drift when the rates differ.
fn chunk_bounds(round: usize, chunk: usize, main_rate: u32, rate: u32) -> (usize, usize) {
    let position = |round: usize| -> usize {
        let frames = round as u64 * chunk as u64;
        if main_rate == rate || main_rate == 0 {
            return frames as usize;
        }
        (frames * rate as u64 / main_rate as u64) as usize
    };
    (position(round), position(round + 1))
}

fn host_time(start: usize, sample_rate: u32) -> AudioTime {
    let nanos = start as u64 * NANOS_PER_SECOND / sample_rate.max(1) as u64;
    AudioTime::new(start as i64, sample_rate, Duration::from_nanos(nanos))
}

fn print_summary(out: &Path, format: PcmFormat, capture: &Capture, tracks: usize) {
    let frames = capture.samples.len() / format.channels.max(1) as usize;
    println!(
        "Mixed {} tracks into {}: {} buffers, {} frames at {}Hz/{}ch, {} errors",
        tracks,
        out.display(),
        capture.buffers,
        frames,
        format.sample_rate,
        format.channels,
        capture.errors.len()
    );
    if capture.format_changes > 0 {
        println!("Output format changed {} times", capture.format_changes);
    }
}
