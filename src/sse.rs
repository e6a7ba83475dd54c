//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! [`process_sse`] turns the raw body of a streaming Messages API response into
//! [`StreamEvent`]s; [`text_fragments`] reduces those events to the text the
//! user sees.

use std::time::Instant;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::completion::FragmentStream;
use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_FRAGMENTS, STREAM_TTFF};
use crate::types::{ContentDelta, ErrorObject, StreamEvent};
use crate::{Error, Result};

const KNOWN_EVENT_TYPES: &[&str] = &[
    "ping",
    "message_start",
    "content_block_start",
    "content_block_delta",
    "content_block_stop",
    "message_delta",
    "message_stop",
    "error",
];

/// Process a stream of bytes into a stream of server-sent events.
///
/// Frames may be split across chunks arbitrarily, including in the middle of
/// a multi-byte character, and may use `\r\n` line endings.  Events of types
/// this crate does not know are skipped.  Error events become `Err` items.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });
    process_frames(stream)
}

fn process_frames<S>(stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                while let Some(frame) = next_frame(&mut buffer) {
                    if let Some(event) = parse_frame(&frame) {
                        return Some((event, (stream, buffer)));
                    }
                }

                match stream.next().await {
                    // JSON payloads never carry a raw CR, so dropping every CR
                    // normalizes CRLF framing.
                    Some(Ok(bytes)) => buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r')),
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // A final frame without its trailing blank line.
                        if !buffer.is_empty() {
                            let frame = std::mem::take(&mut buffer);
                            if let Some(event) = parse_frame(&frame) {
                                return Some((event, (stream, buffer)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Remove and return the first complete frame in the buffer.
fn next_frame(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut frame: Vec<u8> = buffer.drain(..end + 2).collect();
    frame.truncate(end);
    Some(frame)
}

/// Parse one frame.  Returns `None` for frames that carry nothing to report.
fn parse_frame(frame: &[u8]) -> Option<Result<StreamEvent>> {
    let text = match std::str::from_utf8(frame) {
        Ok(text) => text,
        Err(e) => {
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut event_type = None;
    let mut data = String::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event_type = Some(value),
            "data" => {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value);
            }
            _ => {}
        }
    }

    match event_type {
        None if data.is_empty() => None,
        Some("ping") => Some(Ok(StreamEvent::Ping)),
        Some("error") => Some(Err(parse_error_event(&data))),
        Some(other) if !KNOWN_EVENT_TYPES.contains(&other) => {
            debug!(event_type = other, "skipping unknown SSE event");
            None
        }
        _ => parse_event_data(&data),
    }
}

fn parse_event_data(data: &str) -> Option<Result<StreamEvent>> {
    match serde_json::from_str::<StreamEvent>(data) {
        Ok(StreamEvent::Error { error }) => Some(Err(Error::from_error_type(
            &error.error_type,
            error.message,
            None,
            None,
        ))),
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            // Newer API versions add event types; only fail on types we claim to know.
            let event_type = serde_json::from_str::<serde_json::Value>(data)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(String::from));
            match event_type {
                Some(t) if !KNOWN_EVENT_TYPES.contains(&t.as_str()) => {
                    debug!(event_type = %t, "skipping unknown SSE event");
                    None
                }
                _ => Some(Err(Error::serialization(
                    format!("Malformed SSE event '{data}': {e}"),
                    Some(Box::new(e)),
                ))),
            }
        }
    }
}

fn parse_error_event(data: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorObject,
    }

    match serde_json::from_str::<ErrorEnvelope>(data) {
        Ok(envelope) => Error::from_error_type(
            &envelope.error.error_type,
            envelope.error.message,
            None,
            None,
        ),
        Err(_) => Error::api(500, Some("stream_error".to_string()), data.to_string(), None),
    }
}

/// Reduce an event stream to its text fragments.
///
/// Only `text_delta` payloads are kept.  The fragment stream ends after
/// `message_stop`; an error event or transport failure yields one `Err` item
/// and ends the stream; an event stream that runs dry before `message_stop`
/// yields a `Streaming` error.
pub fn text_fragments<S>(events: S) -> FragmentStream
where
    S: Stream<Item = Result<StreamEvent>> + Send + 'static,
{
    let events = Box::pin(events);
    let start = Instant::now();
    Box::pin(stream::unfold(
        Some((events, false)),
        move |state| async move {
            let (mut events, mut seen_text) = state?;
            loop {
                match events.next().await {
                    Some(Ok(StreamEvent::ContentBlockDelta {
                        delta: ContentDelta::Text { text },
                        ..
                    })) => {
                        if text.is_empty() {
                            continue;
                        }
                        if !seen_text {
                            seen_text = true;
                            STREAM_TTFF.add(start.elapsed().as_secs_f64());
                        }
                        STREAM_FRAGMENTS.click();
                        STREAM_BYTES.count(text.len() as u64);
                        return Some((Ok(text), Some((events, seen_text))));
                    }
                    Some(Ok(StreamEvent::MessageStart { message })) => {
                        debug!(id = %message.id, model = %message.model, "message started");
                    }
                    Some(Ok(StreamEvent::MessageDelta { delta, usage })) => {
                        debug!(
                            stop_reason = delta.stop_reason.as_deref().unwrap_or(""),
                            output_tokens = usage.output_tokens,
                            "message delta"
                        );
                    }
                    Some(Ok(StreamEvent::MessageStop)) => return None,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), None));
                    }
                    None => {
                        STREAM_ERRORS.click();
                        return Some((
                            Err(Error::streaming(
                                "stream ended before message_stop",
                                None,
                            )),
                            None,
                        ));
                    }
                }
            }
        },
    ))
}
