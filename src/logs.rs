//! Demultiplexing of the engine's framed log stream.
//!
//! When a container runs without a TTY the engine interleaves its output
//! streams in one body. Each frame carries an 8 byte header:
//!
//! ```text
//! [stream: 1][reserved: 3][payload length: 4, big endian][payload]
//! ```
//!
//! With a TTY the body is plain text; [`demux`] falls back to splitting it
//! on newlines when no frame can be read.

use std::fmt;

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
    Unknown(u8),
}

impl StreamKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            StreamKind::Stdin => "[STDIN] ",
            StreamKind::Stdout => "[STDOUT] ",
            StreamKind::Stderr => "[STDERR] ",
            StreamKind::Unknown(_) => "[UNKNOWN] ",
        }
    }
}

impl From<u8> for StreamKind {
    fn from(tag: u8) -> Self {
        match tag {
            0 => StreamKind::Stdin,
            1 => StreamKind::Stdout,
            2 => StreamKind::Stderr,
            other => StreamKind::Unknown(other),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdin => f.write_str("stdin"),
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
            StreamKind::Unknown(tag) => write!(f, "unknown({tag})"),
        }
    }
}

/// One frame of a multiplexed body. The payload borrows from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFrame<'a> {
    pub stream: StreamKind,
    pub payload: &'a [u8],
}

impl LogFrame<'_> {
    /// Payload as text with one trailing newline removed, prefixed with the
    /// stream tag.
    pub fn line(&self) -> String {
        let text = String::from_utf8_lossy(self.payload);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        format!("{}{}", self.stream.prefix(), text)
    }
}

/// Iterator over the complete frames at the start of `data`.
///
/// Iteration ends at the first header that is truncated, announces an empty
/// payload, or announces more bytes than remain.
pub fn frames(data: &[u8]) -> Frames<'_> {
    Frames { data, offset: 0 }
}

#[derive(Debug, Clone)]
pub struct Frames<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = LogFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.data[self.offset..];
        if rest.len() < HEADER_LEN {
            return None;
        }

        let size = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        if size == 0 {
            return None;
        }
        let payload = rest.get(HEADER_LEN..HEADER_LEN + size)?;

        self.offset += HEADER_LEN + size;
        Some(LogFrame {
            stream: StreamKind::from(rest[0]),
            payload,
        })
    }
}

/// Splits a buffered log body into display lines.
///
/// Framed bodies yield one prefixed line per frame. If the body is non-empty
/// but holds no readable frame it is treated as raw text: one unprefixed line
/// per `\n` separated segment, without the empty segment after a trailing
/// newline.
pub fn demux(data: &[u8]) -> Vec<String> {
    if data.is_empty() {
        return Vec::new();
    }

    let lines: Vec<String> = frames(data).map(|frame| frame.line()).collect();
    if !lines.is_empty() {
        return lines;
    }

    let text = String::from_utf8_lossy(data);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    text.split('\n').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag, 0, 0, 0];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_demux_framed_streams() {
        let mut data = frame(1, b"hello\n");
        data.extend(frame(2, b"oops\n"));
        data.extend(frame(0, b"typed"));
        assert_eq!(
            demux(&data),
            vec!["[STDOUT] hello", "[STDERR] oops", "[STDIN] typed"]
        );
    }

    #[test]
    fn test_unknown_stream_tag() {
        let data = frame(7, b"x");
        let parsed: Vec<_> = frames(&data).collect();
        assert_eq!(parsed[0].stream, StreamKind::Unknown(7));
        assert_eq!(demux(&data), vec!["[UNKNOWN] x"]);
    }

    #[test]
    fn test_only_one_trailing_newline_is_stripped() {
        let data = frame(1, b"a\n\n");
        assert_eq!(demux(&data), vec!["[STDOUT] a\n"]);
    }

    #[test]
    fn test_truncated_frame_stops_iteration() {
        let mut data = frame(1, b"complete");
        let mut partial = frame(2, b"cut off here");
        partial.truncate(12);
        data.extend(partial);
        assert_eq!(demux(&data), vec!["[STDOUT] complete"]);
    }

    #[test]
    fn test_zero_length_frame_stops_iteration() {
        let mut data = frame(1, b"first");
        data.extend([1, 0, 0, 0, 0, 0, 0, 0]);
        data.extend(frame(1, b"never read"));
        assert_eq!(demux(&data), vec!["[STDOUT] first"]);
    }

    #[test]
    fn test_raw_text_fallback() {
        assert_eq!(demux(b"line one\nline two\n"), vec!["line one", "line two"]);
        assert_eq!(demux(b"no newline"), vec!["no newline"]);
        assert_eq!(demux(b"a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(demux(b"").is_empty());
        assert_eq!(frames(b"").count(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let data = frame(1, &[0x66, 0xff, 0x6f]);
        assert_eq!(demux(&data), vec!["[STDOUT] f\u{fffd}o"]);
    }
}
