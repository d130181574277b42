//! Incremental Server-Sent Events decoding shared by the Responses API
//! providers.
//!
//! Chunks arrive at arbitrary byte boundaries; only complete lines are
//! consumed. The event type comes from the `event:` line when present,
//! otherwise from the `type` field embedded in the JSON payload.

use log::debug;
use serde::Deserialize;

#[derive(Debug, PartialEq)]
pub(crate) struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

#[derive(Deserialize)]
struct EmbeddedType {
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: String,
    current_event_type: Option<String>,
}

impl SseDecoder {
    /// Feed raw bytes; returns the data events completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..pos + 1).collect();
            let line = line.trim();

            if let Some(event_type) = line.strip_prefix("event: ") {
                self.current_event_type = Some(event_type.to_string());
                continue;
            }

            if let Some(data) = line.strip_prefix("data: ") {
                if data == "[DONE]" {
                    debug!("Received [DONE] marker");
                    continue;
                }
                let event_type = self.current_event_type.take().or_else(|| {
                    serde_json::from_str::<EmbeddedType>(data)
                        .ok()
                        .map(|e| e.event_type)
                });
                events.push(SseEvent {
                    event_type,
                    data: data.to_string(),
                });
            }
        }
        events
    }
}

/// Payload of `*.delta` events.
#[derive(Deserialize, Debug)]
pub(crate) struct DeltaEvent {
    #[serde(default)]
    pub delta: String,
}
