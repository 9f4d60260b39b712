//! Incremental decoder for the batch progress event stream.
//!
//! The server emits frames of the form `data: {json}\n\n`. Reads do not align
//! with frame boundaries, so the decoder keeps everything after the last
//! delimiter and prepends it to the next chunk.

use serde::Deserialize;

const DELIMITER: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data: ";

/// Status value carried by the final frame.
pub const STATUS_COMPLETED: &str = "completed";

/// One parsed progress frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressEvent {
    pub current: u64,
    pub total: u64,
    /// `running`/`processing` while in flight, `completed` on the last frame.
    #[serde(default)]
    pub status: Option<String>,
    /// Optional completion summary (records actually stored).
    #[serde(default)]
    pub processed: Option<u64>,
}

impl ProgressEvent {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some(STATUS_COMPLETED)
    }
}

/// Buffers raw body bytes and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Prefix of `buf` already searched for a delimiter.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame completed by it, in stream order.
    /// Carriage returns are dropped so CRLF-framed streams split the same way.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.buf.extend(chunk.iter().copied().filter(|&b| b != b'\r'));
        let mut events = Vec::new();
        loop {
            // A delimiter may straddle the old end of the buffer.
            let start = self.scanned.saturating_sub(DELIMITER.len() - 1);
            let Some(rel) = find_delimiter(&self.buf[start..]) else {
                self.scanned = self.buf.len();
                break;
            };
            let pos = start + rel;
            let segment: Vec<u8> = self.buf.drain(..pos + DELIMITER.len()).collect();
            self.scanned = 0;
            if let Some(ev) = parse_segment(&segment[..pos]) {
                events.push(ev);
            }
        }
        events
    }

    /// Bytes held back waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// End of stream: try the retained tail as a last, undelimited frame.
    pub fn finish(self) -> Option<ProgressEvent> {
        parse_segment(&self.buf)
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

/// Parse one segment. Anything that is not a `data: ` line carrying valid
/// JSON is dropped.
fn parse_segment(segment: &[u8]) -> Option<ProgressEvent> {
    let text = String::from_utf8_lossy(segment);
    let text = text.trim_start_matches('\n');
    if text.is_empty() {
        return None;
    }
    let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
        tracing::trace!(segment = %text, "skipping non-data segment");
        return None;
    };
    match serde_json::from_str::<ProgressEvent>(payload.trim_end()) {
        Ok(ev) => Some(ev),
        Err(e) => {
            tracing::trace!(error = %e, "skipping malformed progress frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(current: u64, total: u64, status: &str) -> String {
        format!(
            "data: {{\"current\": {current}, \"total\": {total}, \"status\": \"{status}\"}}\n\n"
        )
    }

    fn stream(n: u64) -> String {
        let mut s = String::new();
        for i in 1..n {
            s.push_str(&frame(i, n, "processing"));
        }
        s.push_str(&frame(n, n, "completed"));
        s
    }

    fn decode_all(chunks: &[&[u8]]) -> Vec<ProgressEvent> {
        let mut dec = FrameDecoder::new();
        let mut out = Vec::new();
        for c in chunks {
            out.extend(dec.push(c));
        }
        out.extend(dec.finish());
        out
    }

    #[test]
    fn single_chunk_with_many_frames() {
        let s = stream(5);
        let events = decode_all(&[s.as_bytes()]);
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].current, 1);
        assert!(!events[0].is_completed());
        assert!(events[4].is_completed());
    }

    #[test]
    fn split_mid_json_is_reassembled() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(b"data: {\"cur").is_empty());
        assert!(dec.pending_len() > 0);
        let events = dec.push(b"rent\":5,\"total\":10}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].current, 5);
        assert_eq!(events[0].total, 10);
        assert_eq!(dec.pending_len(), 0);
    }

    #[test]
    fn split_inside_delimiter() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(b"data: {\"current\":1,\"total\":2}\n").is_empty());
        let events = dec.push(b"\ndata: {\"current\":2,\"total\":2}\n\n");
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn every_two_way_split_matches_single_chunk() {
        let s = stream(4);
        let bytes = s.as_bytes();
        let whole = decode_all(&[bytes]);
        for cut in 0..=bytes.len() {
            let (a, b) = bytes.split_at(cut);
            assert_eq!(decode_all(&[a, b]), whole, "cut at {cut}");
        }
    }

    #[test]
    fn byte_at_a_time_matches_single_chunk() {
        let s = stream(6);
        let whole = decode_all(&[s.as_bytes()]);
        let chunks: Vec<&[u8]> = s.as_bytes().chunks(1).collect();
        assert_eq!(decode_all(&chunks), whole);
    }

    #[test]
    fn scan_resumes_after_previous_push() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(b"data: {\"current\":1,").is_empty());
        assert_eq!(dec.scanned, dec.pending_len());
        assert!(dec.push(b"\"total\":2}\n").is_empty());
        assert_eq!(dec.scanned, dec.pending_len());
        let events = dec.push(b"\ndata: {\"current\":2,\"total\":2}");
        assert_eq!(events.len(), 1);
        assert_eq!(dec.scanned, dec.pending_len());
        assert_eq!(dec.finish().map(|e| e.current), Some(2));
    }

    #[test]
    fn long_undelimited_tail_in_small_reads() {
        let mut dec = FrameDecoder::new();
        let mut payload = String::from("data: {\"current\":7,\"total\":9,\"note\":\"");
        payload.push_str(&"x".repeat(64 * 1024));
        payload.push_str("\"}\n\n");
        let mut events = Vec::new();
        for piece in payload.as_bytes().chunks(16) {
            events.extend(dec.push(piece));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].current, 7);
        assert_eq!(dec.pending_len(), 0);
    }

    #[test]
    fn malformed_and_foreign_segments_are_skipped() {
        let s = "data: not json\n\n: keep-alive\n\nevent: ping\n\ndata: {\"current\":1,\"total\":1,\"status\":\"completed\"}\n\n";
        let events = decode_all(&[s.as_bytes()]);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_completed());
    }

    #[test]
    fn crlf_framing_is_understood() {
        let s = "data: {\"current\":1,\"total\":2}\r\n\r\ndata: {\"current\":2,\"total\":2}\r\n\r\n";
        let events = decode_all(&[s.as_bytes()]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].current, 2);
    }

    #[test]
    fn multibyte_split_is_harmless() {
        let s = "data: {\"current\":1,\"total\":1,\"status\":\"completed\",\"note\":\"评论\"}\n\n";
        let bytes = s.as_bytes();
        let idx = s.find('评').unwrap() + 1;
        let events = decode_all(&[&bytes[..idx], &bytes[idx..]]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn undelimited_tail_is_parsed_on_finish() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(b"data: {\"current\":3,\"total\":3,\"status\":\"completed\"}").is_empty());
        let last = dec.finish().expect("tail frame");
        assert!(last.is_completed());
    }

    #[test]
    fn processed_summary_field() {
        let s = "data: {\"current\":9,\"total\":10,\"status\":\"completed\",\"processed\":9}\n\n";
        let events = decode_all(&[s.as_bytes()]);
        assert_eq!(events[0].processed, Some(9));
    }

    #[test]
    fn extra_blank_lines_between_frames() {
        let s = "data: {\"current\":1,\"total\":2}\n\n\ndata: {\"current\":2,\"total\":2}\n\n";
        let events = decode_all(&[s.as_bytes()]);
        assert_eq!(events.len(), 2);
    }
}
