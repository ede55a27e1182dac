use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use spdif::process::decode::Decoder;
use spdif::process::{BlockEvent, EventSink, SampleEvent};

use super::command::{AudioFormat, Cli, DecodeArgs};
use crate::capture::{CaptureReader, EdgeStream};
use crate::wav::WavWriter;

fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    if let Some(existing_ext) = base_path.extension() {
        if existing_ext == expected_ext {
            base_path.to_path_buf()
        } else {
            let mut path = base_path.to_path_buf();
            let new_name = format!(
                "{}.{}",
                base_path.file_name().unwrap().to_string_lossy(),
                expected_ext
            );
            path.set_file_name(new_name);
            path
        }
    } else {
        let mut path = base_path.to_path_buf();
        path.set_extension(expected_ext);
        path
    }
}

enum AudioWriter {
    Wav(WavWriter<File>),
    Raw(BufWriter<File>),
}

/// Sink that streams decoded subframes to the audio writer.
struct DecodeSink {
    writer: Option<AudioWriter>,
    blocks: u64,
    io_error: Option<io::Error>,
}

impl DecodeSink {
    fn write_audio(&mut self, event: &SampleEvent) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(AudioWriter::Wav(wav)) => {
                let pcm = event.subframe.pcm_16();
                let at_left_slot = wav.samples_written() % 2 == 0;

                // A dropped subframe would leave the channels phase-shifted
                // for the rest of the file; duplicate into the missed slot
                // to stay aligned.
                if event.frame_type.is_right() {
                    if at_left_slot {
                        wav.write_sample(pcm)?;
                    }
                } else if !at_left_slot {
                    wav.write_sample(pcm)?;
                }

                wav.write_sample(pcm)
            }
            Some(AudioWriter::Raw(out)) => out.write_all(&event.subframe.raw().to_le_bytes()),
            None => Ok(()),
        }
    }
}

impl EventSink for DecodeSink {
    fn sample(&mut self, event: &SampleEvent) {
        if self.io_error.is_some() {
            return;
        }

        if let Err(error) = self.write_audio(event) {
            log::error!("audio write failed: {error}");
            self.io_error = Some(error);
        }
    }

    fn block(&mut self, event: &BlockEvent<'_>) {
        self.blocks += 1;

        if !event.status.channels_match() {
            log::warn!(
                "block {}: left/right channel status mismatch",
                self.blocks
            );
        }

        log::debug!(
            "block {} spans {} ticks ({} .. {})",
            self.blocks,
            event.end - event.start,
            event.start,
            event.end
        );
    }
}

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding capture: {} (strict mode: {})",
        args.input.display(),
        cli.strict
    );

    let writer = match &args.output_path {
        Some(base_path) => Some(match args.format {
            AudioFormat::Wav => {
                let path = create_path_with_extension(base_path, "wav");
                log::info!("Writing PCM audio to {}", path.display());
                let mut wav = WavWriter::new(File::create(&path)?);
                wav.write_header()?;
                AudioWriter::Wav(wav)
            }
            AudioFormat::Raw => {
                let path = create_path_with_extension(base_path, "raw");
                log::info!("Writing raw subframes to {}", path.display());
                AudioWriter::Raw(BufWriter::new(File::create(&path)?))
            }
        }),
        None => None,
    };

    let mut decoder = Decoder::new(DecodeSink {
        writer,
        blocks: 0,
        io_error: None,
    });

    if cli.strict {
        decoder.set_fail_level(Level::Warn);
    }

    let pb = multi.map(|multi| {
        let pb = multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    });

    let mut reader = CaptureReader::new(&args.input)?;
    let mut edges = EdgeStream::default();
    let mut rows = 0u64;

    reader.for_each_sample(|at, level| {
        rows += 1;

        if let Some((dt, level)) = edges.feed(at, level) {
            decoder.push_edge(dt, level)?;
        }

        if let Some(ref pb) = pb {
            if rows % 65_536 == 0 {
                pb.set_message(format!(
                    "{} rows, {} subframes decoded",
                    rows,
                    decoder.syncs()
                ));
            }
        }

        if decoder.sink().io_error.is_some() {
            bail!("aborting decode after write failure");
        }

        Ok(())
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let syncs = decoder.syncs();
    let blocks = decoder.sink().blocks;
    let overruns = decoder.overruns();

    let mut sink = decoder.into_sink();
    match sink.writer.as_mut() {
        Some(AudioWriter::Wav(wav)) => {
            wav.finish()?;
            let samples = wav.samples_written();
            let duration = crate::timestamp::time_str(
                samples as f64 / 2.0 / f64::from(crate::wav::WAV_SAMPLE_RATE),
            );
            log::info!("Wrote {samples} channel samples ({duration})");
        }
        Some(AudioWriter::Raw(out)) => {
            out.flush()?;
            log::info!("Wrote {syncs} raw subframes");
        }
        None => {}
    }

    if let Some(error) = sink.io_error {
        bail!("audio output incomplete: {error}");
    }

    log::info!(
        "Read {rows} capture rows, {} edges, decoded {syncs} subframes in {blocks} blocks",
        edges.edges()
    );
    if overruns > 0 {
        log::warn!("{overruns} edges lost to ring overruns");
    }

    Ok(())
}
