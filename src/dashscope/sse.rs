//! Server-sent-events framing for DashScope streams (Bytes -> SseFrame)
//!
//! DashScope frames look like:
//!
//! ```text
//! id:1
//! event:result
//! :HTTP_STATUS/200
//! data:{"output":{...},"usage":{...},"request_id":"..."}
//! ```

use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<String>,
    pub event: Option<String>,
    pub http_status: Option<u16>,
    pub data: String,
}

impl SseFrame {
    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some("error")
            || self.http_status.map(|s| s >= 400).unwrap_or(false)
    }

    fn parse(raw: &str) -> Option<Self> {
        let mut frame = SseFrame::default();
        let mut data_lines: Vec<&str> = Vec::new();
        for line in raw.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix(':') {
                // ":HTTP_STATUS/200" carries the per-event status; other comments are ignored.
                if let Some(code) = comment.trim().strip_prefix("HTTP_STATUS/") {
                    frame.http_status = code.trim().parse().ok();
                }
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
                None => (line, ""),
            };
            match field {
                "id" => frame.id = Some(value.to_string()),
                "event" => frame.event = Some(value.to_string()),
                "data" => data_lines.push(value),
                _ => {}
            }
        }
        if data_lines.is_empty() && frame.event.is_none() {
            return None;
        }
        frame.data = data_lines.join("\n");
        Some(frame)
    }
}

/// Incrementally buffer bytes and emit complete frames split by a blank line.
///
/// Frames are decoded only once complete, so a multi-byte character split
/// across network chunks is reassembled. A frame that is not valid UTF-8
/// ends the stream with an error.
pub fn decode_frames(input: BoxStream<'static, Bytes>) -> BoxStream<'static, SseFrame> {
    let frames = stream::unfold(
        (input, BytesMut::new(), false),
        |(mut input, mut buf, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some((idx, delimiter_len)) = find_frame_end(&buf) {
                    let raw = buf.split_to(idx + delimiter_len);
                    match decode_frame(&raw[..idx]) {
                        Ok(Some(frame)) => return Some((Ok(frame), (input, buf, false))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), (input, buf, true))),
                    }
                }

                match input.next().await {
                    Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (input, buf, true))),
                    None => {
                        // EOF: parse what is left once
                        let rest = buf.split();
                        return match decode_frame(&rest) {
                            Ok(Some(frame)) => Some((Ok(frame), (input, buf, true))),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), (input, buf, true))),
                        };
                    }
                }
            }
        },
    );
    Box::pin(frames)
}

fn decode_frame(raw: &[u8]) -> Result<Option<SseFrame>> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        Error::validation_with_context(
            "Stream frame is not valid UTF-8",
            ErrorContext::new()
                .with_details(format!("invalid byte at offset {}", e.valid_up_to()))
                .with_source("sse_decoder"),
        )
    })?;
    Ok(SseFrame::parse(text))
}

fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|i| (i, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
