use std::borrow::Cow;
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::time::Duration;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{debug, warn};
use crate::errors::SubtitleError;

// @module: SubRip timecode parsing, shifting and line classification

// @const: SRT timing line, only recognised at the start of a line
static TIMING_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3}) --> ([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3})").unwrap()
});

const MICROS_PER_SECOND: f64 = 1_000_000.0;

// @struct: Point in time inside a subtitle track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    // @field: Hours, unbounded (no day rollover)
    pub hours: u64,

    // @field: Minutes 0-59
    pub minutes: u8,

    // @field: Seconds 0-59
    pub seconds: u8,

    // @field: Milliseconds 0-999
    pub milliseconds: u16,
}

impl Timecode {
    /// Builds a timecode from a duration, dropping anything below one millisecond
    pub fn from_duration(duration: Duration) -> Self {
        let total_seconds = duration.as_secs();
        let remainder = total_seconds % 3600;

        Timecode {
            hours: total_seconds / 3600,
            minutes: (remainder / 60) as u8,
            seconds: (remainder % 60) as u8,
            milliseconds: duration.subsec_millis() as u16,
        }
    }

    /// Duration since the start of the track
    pub fn to_duration(&self) -> Duration {
        let whole_seconds = self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes as u64 * 60)
            .saturating_add(self.seconds as u64);

        Duration::from_secs(whole_seconds) + Duration::from_millis(self.milliseconds as u64)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

impl FromStr for Timecode {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timecode(s)
    }
}

/// Parse an `HH:MM:SS,mmm` timecode.
///
/// Only a wrong field count or a non-numeric field is an error. Minutes,
/// seconds or milliseconds past their range carry into the next unit, so
/// `00:75:00,000` reads as `01:15:00,000`.
pub fn parse_timecode(text: &str) -> Result<Timecode, SubtitleError> {
    let fields: Vec<&str> = text.split([':', ',']).collect();

    if fields.len() != 4 {
        return Err(SubtitleError::ParseError(text.to_string()));
    }

    let field = |raw: &str| -> Result<u64, SubtitleError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SubtitleError::ParseError(text.to_string()));
        }
        raw.parse::<u64>()
            .map_err(|_| SubtitleError::ParseError(text.to_string()))
    };

    let total_millis = field(fields[0])?
        .saturating_mul(3_600_000)
        .saturating_add(field(fields[1])?.saturating_mul(60_000))
        .saturating_add(field(fields[2])?.saturating_mul(1000))
        .saturating_add(field(fields[3])?);

    Ok(Timecode::from_duration(Duration::from_millis(total_millis)))
}

/// Format a duration as an SRT timecode (HH:MM:SS,mmm).
///
/// Milliseconds are truncated, never rounded. Hours keep growing past 23 and
/// widen beyond two digits when needed.
pub fn format_timecode(duration: Duration) -> String {
    Timecode::from_duration(duration).to_string()
}

// @struct: Signed offset applied to every timecode of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftDelta {
    // @field: Offset in whole microseconds
    micros: i64,
}

impl ShiftDelta {
    /// Converts a signed number of seconds to the nearest whole microsecond
    pub fn from_seconds(seconds: f64) -> Result<Self, SubtitleError> {
        if !seconds.is_finite() {
            return Err(SubtitleError::InvalidDelta(format!(
                "{} is not a finite number of seconds", seconds
            )));
        }

        let micros = (seconds * MICROS_PER_SECOND).round();
        if micros.abs() >= i64::MAX as f64 {
            return Err(SubtitleError::InvalidDelta(format!(
                "{} seconds is out of range", seconds
            )));
        }

        Ok(ShiftDelta { micros: micros as i64 })
    }

    /// Offset in microseconds
    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    /// Shift a point in time, clamping at zero
    pub fn apply(&self, time: Duration) -> Duration {
        let shifted = time.as_micros() as i128 + self.micros as i128;
        if shifted <= 0 {
            return Duration::ZERO;
        }

        Duration::from_micros(u64::try_from(shifted).unwrap_or(u64::MAX))
    }

    /// True when applying this delta to `time` hits the zero clamp
    fn clamps(&self, time: Duration) -> bool {
        (time.as_micros() as i128 + self.micros as i128) < 0
    }
}

impl FromStr for ShiftDelta {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seconds: f64 = s.trim().parse()
            .map_err(|_| SubtitleError::InvalidDelta(format!("'{}' is not a number", s)))?;
        Self::from_seconds(seconds)
    }
}

/// Counters reported by [`shift_reader`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShiftStats {
    /// Lines read
    pub lines: usize,
    /// Timing lines rewritten
    pub shifted: usize,
    /// Rewritten timing lines where at least one side hit zero
    pub clamped: usize,
    /// Timing-like lines left untouched because a timecode did not parse
    pub malformed: usize,
}

enum LineOutcome {
    PassThrough,
    Shifted { clamped: bool },
    Malformed,
}

/// Returns the `\n`, `\r\n` or `\r` ending of a line, or "" for an unterminated line
pub fn line_terminator(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else if line.ends_with('\r') {
        "\r"
    } else {
        ""
    }
}

/// Split text into lines, each keeping its terminator
///
/// `\n`, `\r\n` and a lone `\r` all end a line.
pub fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    let mut rest = content;

    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        let end = match rest.find(['\r', '\n']) {
            Some(i) if rest[i..].starts_with("\r\n") => i + 2,
            Some(i) => i + 1,
            None => rest.len(),
        };
        let (line, tail) = rest.split_at(end);
        rest = tail;
        Some(line)
    })
}

/// Read one line into `buf`, treating `\n`, `\r\n` and a lone `\r` as terminators
///
/// Returns the number of bytes appended, 0 at end of input.
fn read_srt_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let start = buf.len();
    let mut after_cr = false;

    loop {
        let (consumed, done) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                break;
            }

            if after_cr {
                if available[0] == b'\n' {
                    buf.push(b'\n');
                    (1, true)
                } else {
                    (0, true)
                }
            } else {
                match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                    Some(i) => {
                        buf.extend_from_slice(&available[..=i]);
                        after_cr = available[i] == b'\r';
                        (i + 1, !after_cr)
                    }
                    None => {
                        buf.extend_from_slice(available);
                        (available.len(), false)
                    }
                }
            }
        };

        reader.consume(consumed);
        if done {
            break;
        }
    }

    Ok(buf.len() - start)
}

fn shift_line_with_outcome<'a>(line: &'a str, delta: &ShiftDelta) -> (Cow<'a, str>, LineOutcome) {
    let Some(caps) = TIMING_LINE_REGEX.captures(line) else {
        return (Cow::Borrowed(line), LineOutcome::PassThrough);
    };

    let (start, end) = match (parse_timecode(&caps[1]), parse_timecode(&caps[2])) {
        (Ok(start), Ok(end)) => (start.to_duration(), end.to_duration()),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Leaving timing line unchanged: {}", e);
            return (Cow::Borrowed(line), LineOutcome::Malformed);
        }
    };

    let clamped = delta.clamps(start) || delta.clamps(end);
    let shifted = format!(
        "{} --> {}{}",
        format_timecode(delta.apply(start)),
        format_timecode(delta.apply(end)),
        line_terminator(line)
    );

    (Cow::Owned(shifted), LineOutcome::Shifted { clamped })
}

/// Shift a single line. Lines that are not timing lines come back borrowed and unchanged.
pub fn shift_line<'a>(line: &'a str, delta: &ShiftDelta) -> Cow<'a, str> {
    shift_line_with_outcome(line, delta).0
}

/// Shift every timing line of a document by `delta_seconds`.
///
/// Each input line keeps whatever terminator it carried. The delta is
/// validated before any line is looked at.
pub fn shift_document<I, S>(lines: I, delta_seconds: f64) -> Result<Vec<String>, SubtitleError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let delta = ShiftDelta::from_seconds(delta_seconds)?;

    Ok(lines
        .into_iter()
        .map(|line| shift_line(line.as_ref(), &delta).into_owned())
        .collect())
}

/// Shift a whole SRT document held in memory
pub fn shift_srt_string(content: &str, delta_seconds: f64) -> Result<String, SubtitleError> {
    let delta = ShiftDelta::from_seconds(delta_seconds)?;

    Ok(split_lines(content)
        .map(|line| shift_line(line, &delta))
        .collect())
}

/// Stream an SRT document from `reader` to `writer`, one line at a time
pub fn shift_reader<R: BufRead, W: Write>(mut reader: R, mut writer: W, delta: &ShiftDelta) -> Result<ShiftStats> {
    let mut stats = ShiftStats::default();
    let mut bytes = Vec::new();

    loop {
        bytes.clear();
        let read = read_srt_line(&mut reader, &mut bytes)
            .with_context(|| format!("Failed to read subtitle line {}", stats.lines + 1))?;
        if read == 0 {
            break;
        }
        stats.lines += 1;

        let line = std::str::from_utf8(&bytes)
            .with_context(|| format!("Subtitle line {} is not valid UTF-8", stats.lines))?;
        let (output, outcome) = shift_line_with_outcome(line, delta);
        match outcome {
            LineOutcome::PassThrough => {}
            LineOutcome::Shifted { clamped } => {
                stats.shifted += 1;
                if clamped {
                    stats.clamped += 1;
                }
            }
            LineOutcome::Malformed => stats.malformed += 1,
        }

        writer.write_all(output.as_bytes())
            .with_context(|| format!("Failed to write subtitle line {}", stats.lines))?;
    }

    writer.flush().context("Failed to flush shifted subtitles")?;

    debug!(
        "Shifted {} of {} lines ({} clamped, {} malformed)",
        stats.shifted, stats.lines, stats.clamped, stats.malformed
    );

    Ok(stats)
}

// @enum: Role of a line inside an SRT block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Cue number
    Index,
    /// Anything carrying an `-->` arrow
    Timing,
    /// Subtitle text
    Text,
    /// Block separator
    Blank,
}

/// Classify an SRT line for the translation pass
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim_start_matches('\u{feff}').trim();

    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        LineKind::Index
    } else if line.contains("-->") {
        LineKind::Timing
    } else {
        LineKind::Text
    }
}
