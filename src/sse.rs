//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! `streamGenerateContent?alt=sse` answers with a sequence of events, each a
//! `data:` line carrying a complete `GenerateContentResponse` JSON document,
//! separated by blank lines.  This module turns the raw byte stream into a
//! stream of parsed responses.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::GenerateContentResponse;
use crate::{Error, Result};

/// Process a stream of bytes into a stream of server-sent events.
///
/// Events may be split across chunks or several may arrive in one chunk.
/// Both `\n\n` and `\r\n\r\n` are accepted as event separators.  Events that
/// carry no `data:` field (comments, keep-alives) are skipped.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });
    process_event_stream(stream)
}

/// Like [`process_sse`], for byte streams whose errors are already converted.
pub(crate) fn process_event_stream<S>(
    stream: S,
) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    // Bytes that have not yet formed a complete UTF-8 sequence.
    let pending: Vec<u8> = Vec::new();
    let buffer = String::new();

    stream::unfold(
        (stream, pending, buffer),
        move |(mut stream, mut pending, mut buffer)| async move {
            loop {
                if let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    match event {
                        Some(event) => {
                            if event.is_err() {
                                STREAM_ERRORS.click();
                            } else {
                                STREAM_EVENTS.click();
                            }
                            return Some((event, (stream, pending, buffer)));
                        }
                        None => continue,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend_from_slice(&bytes);
                        match std::str::from_utf8(&pending) {
                            Ok(text) => {
                                push_normalized(&mut buffer, text);
                                pending.clear();
                            }
                            Err(e) if e.error_len().is_none() => {
                                // Incomplete multi-byte sequence at the end of the chunk.
                                let valid = e.valid_up_to();
                                let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
                                push_normalized(&mut buffer, &text);
                                pending.drain(..valid);
                            }
                            Err(e) => {
                                STREAM_ERRORS.click();
                                pending.clear();
                                return Some((
                                    Err(Error::encoding(
                                        format!("Invalid UTF-8 in stream: {e}"),
                                        Some(Box::new(e)),
                                    )),
                                    (stream, pending, buffer),
                                ));
                            }
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, pending, buffer)));
                    }
                    None => {
                        // A final event may lack its trailing blank line.
                        if !buffer.trim().is_empty() {
                            let last = std::mem::take(&mut buffer);
                            if let Some(event) = parse_event(&last) {
                                return Some((event, (stream, pending, buffer)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Appends `text` with CRLF folded to LF.  A `\r` ending one chunk pairs
/// with a `\n` starting the next, so the fold runs over the whole buffer.
fn push_normalized(buffer: &mut String, text: &str) {
    buffer.push_str(text);
    if buffer.contains("\r\n") {
        *buffer = buffer.replace("\r\n", "\n");
    }
}

/// Extract a complete SSE event from a buffer string.
///
/// Returns `None` when the buffer does not yet hold a full event.  The inner
/// option is `None` for events without data.
fn extract_event(buffer: &str) -> Option<(Option<Result<GenerateContentResponse>>, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    Some((parse_event(event_text), rest.to_string()))
}

/// Parse the `data:` lines of one event.
fn parse_event(event_text: &str) -> Option<Result<GenerateContentResponse>> {
    let mut data = String::new();
    for line in event_text.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if data.trim().is_empty() {
        return None;
    }

    Some(parse_data(&data))
}

fn parse_data(data: &str) -> Result<GenerateContentResponse> {
    // The API reports mid-stream failures as an error document in a data field.
    #[derive(serde::Deserialize)]
    struct StreamError {
        error: StreamErrorDetail,
    }

    #[derive(serde::Deserialize)]
    struct StreamErrorDetail {
        #[serde(default)]
        code: u16,
        #[serde(default)]
        message: String,
        #[serde(default)]
        status: Option<String>,
    }

    if let Ok(StreamError { error }) = serde_json::from_str::<StreamError>(data) {
        return Err(Error::api(error.code, error.status, error.message));
    }

    serde_json::from_str::<GenerateContentResponse>(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunk(text: &str) -> Result<Bytes> {
        Ok(Bytes::from(text.as_bytes().to_vec()))
    }

    const HELLO: &str =
        r#"data: {"candidates": [{"content": {"role": "model", "parts": [{"text": "Hello"}]}}]}"#;
    const WORLD: &str =
        r#"data: {"candidates": [{"content": {"role": "model", "parts": [{"text": " world"}]}}]}"#;

    #[tokio::test]
    async fn parse_single_event() {
        let data = format!("{HELLO}\n\n");
        let stream = stream::iter(vec![chunk(&data)]);
        let mut events = Box::pin(process_event_stream(stream));

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "Hello");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_multiple_events_with_crlf() {
        let data = format!("{HELLO}\r\n\r\n{WORLD}\r\n\r\n");
        let stream = stream::iter(vec![chunk(&data)]);
        let events: Vec<_> = process_event_stream(stream).collect().await;

        let texts: Vec<String> = events.into_iter().map(|e| e.unwrap().text()).collect();
        assert_eq!(texts, vec!["Hello".to_string(), " world".to_string()]);
    }

    #[tokio::test]
    async fn crlf_separator_split_across_chunks() {
        let stream = stream::iter(vec![
            chunk(&format!("{HELLO}\r\n\r")),
            chunk(&format!("\n{WORLD}\r\n\r\n")),
        ]);
        let events: Vec<_> = process_event_stream(stream).collect().await;

        let texts: Vec<String> = events.into_iter().map(|e| e.unwrap().text()).collect();
        assert_eq!(texts, vec!["Hello".to_string(), " world".to_string()]);
    }

    #[tokio::test]
    async fn crlf_split_after_each_byte() {
        let data = format!("{HELLO}\r\n\r\n{WORLD}\r\n\r\n");
        let chunks: Vec<Result<Bytes>> = data
            .as_bytes()
            .chunks(1)
            .map(|b| Ok(Bytes::from(b.to_vec())))
            .collect();
        let events: Vec<_> = process_event_stream(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].as_ref().unwrap().text(), " world");
    }

    #[tokio::test]
    async fn handle_split_event() {
        let (head, tail) = HELLO.split_at(20);
        let stream = stream::iter(vec![chunk(head), chunk(tail), chunk("\n"), chunk("\n")]);
        let mut events = Box::pin(process_event_stream(stream));

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "Hello");
    }

    #[tokio::test]
    async fn handle_split_multibyte_character() {
        let data = "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"caf\u{e9}\"}]}}]}\n\n";
        let bytes = data.as_bytes();
        let split = data.find('\u{e9}').unwrap() + 1;
        let stream = stream::iter(vec![
            Ok(Bytes::from(bytes[..split].to_vec())),
            Ok(Bytes::from(bytes[split..].to_vec())),
        ]);
        let mut events = Box::pin(process_event_stream(stream));

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text(), "caf\u{e9}");
    }

    #[tokio::test]
    async fn final_event_without_separator() {
        let stream = stream::iter(vec![chunk(WORLD)]);
        let events: Vec<_> = process_event_stream(stream).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text(), " world");
    }

    #[tokio::test]
    async fn skip_comments_and_keepalives() {
        let data = format!(": keep-alive\n\n{HELLO}\n\n");
        let stream = stream::iter(vec![chunk(&data)]);
        let events: Vec<_> = process_event_stream(stream).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let stream = stream::iter(vec![chunk("data: {not json\n\n")]);
        let mut events = Box::pin(process_event_stream(stream));
        let event = events.next().await.unwrap();
        assert!(matches!(event, Err(Error::Serialization { .. })));
    }

    #[tokio::test]
    async fn error_document_in_stream() {
        let data = "data: {\"error\": {\"code\": 503, \"message\": \"overloaded\", \"status\": \"UNAVAILABLE\"}}\n\n";
        let stream = stream::iter(vec![chunk(data)]);
        let mut events = Box::pin(process_event_stream(stream));
        let err = events.next().await.unwrap().unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn transport_error_is_forwarded() {
        let stream = stream::iter(vec![
            chunk(&format!("{HELLO}\n\n")),
            Err(Error::streaming("connection reset", None)),
        ]);
        let events: Vec<_> = process_event_stream(stream).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(Error::Streaming { .. })));
    }
}
