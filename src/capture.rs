use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Reader for logic-analyzer capture exports: one "time, level" row per
/// sampled point, times in capture ticks. Use "-" for stdin pipe input.
pub struct CaptureReader {
    reader: Box<dyn BufRead>,
}

impl CaptureReader {
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path_str = input_path.as_ref().to_string_lossy();

        let reader: Box<dyn BufRead> = if path_str == "-" {
            Box::new(BufReader::new(io::stdin().lock()))
        } else {
            let file = File::open(&input_path)
                .with_context(|| format!("opening capture {path_str}"))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader })
    }

    /// Feeds every capture row to `callback` as `(time, level)`.
    ///
    /// Blank lines are skipped and a single non-numeric header row is
    /// tolerated; anything else malformed aborts with the line number.
    pub fn for_each_sample<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(u64, bool) -> Result<()>,
    {
        let mut line = String::new();
        let mut line_no = 0usize;

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;

            let row = line.trim();
            if row.is_empty() {
                continue;
            }

            match parse_row(row) {
                Some((at, level)) => callback(at, level)?,
                None if line_no == 1 => {
                    log::debug!("skipping capture header: {row}");
                }
                None => bail!("malformed capture row at line {line_no}: {row:?}"),
            }
        }

        Ok(())
    }
}

fn parse_row(row: &str) -> Option<(u64, bool)> {
    let (time, level) = row.split_once(',')?;
    let at = time.trim().parse::<u64>().ok()?;
    let level = level.trim().parse::<i64>().ok()?;
    Some((at, level != 0))
}

/// Turns absolute-time level samples into the decoder's edge stream.
///
/// Consecutive samples at the same level are suppressed, so only genuine
/// transitions produce an edge. Gaps wider than `u16::MAX` ticks saturate;
/// the decoder treats them as an uncommonly long pulse and resynchronizes.
#[derive(Debug, Default)]
pub struct EdgeStream {
    last_at: u64,
    last_level: bool,
    edges: u64,
}

impl EdgeStream {
    /// Offers one capture sample; returns the `(dt, level)` edge if the
    /// level changed.
    pub fn feed(&mut self, at: u64, level: bool) -> Option<(u16, bool)> {
        if level == self.last_level {
            return None;
        }

        let gap = at.checked_sub(self.last_at);
        self.last_at = at;
        self.last_level = level;

        let Some(gap) = gap else {
            // Non-monotonic capture row; re-anchor at the new time.
            log::warn!("capture time went backwards at {at}, edge dropped");
            return None;
        };

        let dt = gap.min(u64::from(u16::MAX)) as u16;
        if dt == 0 {
            // Duplicate timestamp; the decoder contract forbids dt = 0.
            log::warn!("zero-width edge at {at} dropped");
            return None;
        }

        self.edges += 1;
        Some((dt, level))
    }

    /// Edges produced so far.
    pub fn edges(&self) -> u64 {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_duplicate_levels() {
        let mut stream = EdgeStream::default();

        assert_eq!(stream.feed(5, false), None);
        assert_eq!(stream.feed(10, true), Some((10, true)));
        assert_eq!(stream.feed(15, true), None);
        assert_eq!(stream.feed(40, false), Some((30, false)));
        assert_eq!(stream.edges(), 2);
    }

    #[test]
    fn zero_width_edges_are_dropped() {
        let mut stream = EdgeStream::default();

        assert_eq!(stream.feed(10, true), Some((10, true)));
        assert_eq!(stream.feed(10, false), None);
        assert_eq!(stream.feed(25, true), Some((15, true)));
    }

    #[test]
    fn backwards_time_is_rejected() {
        let mut stream = EdgeStream::default();

        assert_eq!(stream.feed(100, true), Some((100, true)));
        assert_eq!(stream.feed(40, false), None);
        // The stream re-anchors at the rejected row's time.
        assert_eq!(stream.feed(60, true), Some((20, true)));
        assert_eq!(stream.edges(), 2);
    }

    #[test]
    fn wide_gaps_saturate() {
        let mut stream = EdgeStream::default();

        assert_eq!(stream.feed(1_000_000, true), Some((u16::MAX, true)));
    }

    #[test]
    fn parses_rows() {
        assert_eq!(parse_row("1234, 1"), Some((1234, true)));
        assert_eq!(parse_row("99,0"), Some((99, false)));
        assert_eq!(parse_row("time, level"), None);
        assert_eq!(parse_row("garbage"), None);
    }
}
