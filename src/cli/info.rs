use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;
use serde::Serialize;

use spdif::process::decode::Decoder;
use spdif::process::{BlockEvent, EventSink, SampleEvent};
use spdif::structs::frame::FrameType;
use spdif::structs::status::BlockStatus;

use super::command::{Cli, InfoArgs};
use crate::capture::{CaptureReader, EdgeStream};
use crate::timestamp::{tick_rate_from_block, ticks_str};

/// Sink that only gathers statistics.
#[derive(Default)]
struct InfoSink {
    b_frames: u64,
    m_frames: u64,
    w_frames: u64,
    first_sample_time: Option<u64>,
    last_sample_time: u64,

    blocks: u64,
    mismatched_blocks: u64,
    block_ticks_min: u64,
    block_ticks_max: u64,
    last_status: Option<BlockStatus>,
}

impl EventSink for InfoSink {
    fn sample(&mut self, event: &SampleEvent) {
        match event.frame_type {
            FrameType::B => self.b_frames += 1,
            FrameType::W => self.w_frames += 1,
            _ => self.m_frames += 1,
        }

        self.first_sample_time.get_or_insert(event.start);
        self.last_sample_time = event.end;
    }

    fn block(&mut self, event: &BlockEvent<'_>) {
        let ticks = event.end - event.start;

        if self.blocks == 0 {
            self.block_ticks_min = ticks;
            self.block_ticks_max = ticks;
        } else {
            self.block_ticks_min = self.block_ticks_min.min(ticks);
            self.block_ticks_max = self.block_ticks_max.max(ticks);
        }

        self.blocks += 1;
        if !event.status.channels_match() {
            self.mismatched_blocks += 1;
        }
        self.last_status = Some(*event.status);
    }
}

#[derive(Serialize)]
struct SubframeCounts {
    b: u64,
    m: u64,
    w: u64,
}

#[derive(Serialize)]
struct BlockTiming {
    count: u64,
    min_ticks: u64,
    max_ticks: u64,
    jitter_ticks: u64,
    mismatched: u64,
}

#[derive(Serialize)]
struct ChannelStatusReport {
    professional: bool,
    non_audio: bool,
    copy_permitted: bool,
    pre_emphasis: bool,
    category_code: u8,
    left: String,
    right: String,
}

#[derive(Serialize)]
struct StreamReport {
    capture_rows: u64,
    edges: u64,
    subframes: SubframeCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<BlockTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_tick_rate_hz: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_status: Option<ChannelStatusReport>,
    edges_lost_to_overrun: u64,
}

fn hex_field(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing capture: {}", args.input.display());

    let mut decoder = Decoder::new(InfoSink::default());
    if cli.strict {
        decoder.set_fail_level(Level::Warn);
    }

    let pb = multi.map(|multi| {
        let pb = multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analyzing capture...");
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
        Ok(())
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let overruns = decoder.overruns();
    let prev_block_ticks = decoder.previous_block_ticks();
    let sink = decoder.into_sink();

    let tick_rate = (prev_block_ticks > 0).then(|| tick_rate_from_block(prev_block_ticks));

    let stream_duration = match (sink.first_sample_time, tick_rate) {
        (Some(first), Some(rate)) => Some(ticks_str(sink.last_sample_time - first, rate)),
        _ => None,
    };

    let report = StreamReport {
        capture_rows: rows,
        edges: edges.edges(),
        subframes: SubframeCounts {
            b: sink.b_frames,
            m: sink.m_frames,
            w: sink.w_frames,
        },
        blocks: (sink.blocks > 0).then(|| BlockTiming {
            count: sink.blocks,
            min_ticks: sink.block_ticks_min,
            max_ticks: sink.block_ticks_max,
            jitter_ticks: sink.block_ticks_max - sink.block_ticks_min,
            mismatched: sink.mismatched_blocks,
        }),
        estimated_tick_rate_hz: tick_rate,
        stream_duration,
        channel_status: sink.last_status.map(|status| ChannelStatusReport {
            professional: status.left.professional(),
            non_audio: status.left.non_audio(),
            copy_permitted: status.left.copy_permitted(),
            pre_emphasis: status.left.pre_emphasis(),
            category_code: status.left.category_code(),
            left: hex_field(&status.left.channel_status),
            right: hex_field(&status.right.channel_status),
        }),
        edges_lost_to_overrun: overruns,
    };

    if sink.b_frames == 0 && sink.m_frames == 0 && sink.w_frames == 0 {
        println!("No S/PDIF subframes found in the capture.");
        println!("This doesn't appear to be a valid biphase-mark edge capture.");
        return Ok(());
    }

    print!("{}", serde_yaml_ng::to_string(&report)?);

    Ok(())
}
