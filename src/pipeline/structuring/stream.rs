//! Streamed response reassembly.
//!
//! The completion service answers with Server-Sent Events. `SseReader` turns
//! any `BufRead` into events, and `assemble_response` folds the resulting
//! text fragments into one string in arrival order.

use std::io::{self, BufRead};
use std::time::{Duration, Instant};

use super::GenerationFailure;

/// Concatenate fragments in arrival order. Stops at the first failure.
pub fn assemble_response<I>(fragments: I) -> Result<String, GenerationFailure>
where
    I: IntoIterator<Item = Result<String, GenerationFailure>>,
{
    let mut count = 0usize;
    let text = fragments.into_iter().try_fold(String::new(), |mut acc, fragment| {
        acc.push_str(&fragment?);
        count += 1;
        Ok::<_, GenerationFailure>(acc)
    })?;

    tracing::debug!(fragments = count, chars = text.len(), "Response assembled");
    Ok(text)
}

/// One dispatched Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name; `"message"` when the stream did not name it.
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
}

/// Incremental Server-Sent Events parser over a line reader.
pub struct SseReader<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> SseReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }

    /// Read lines until a blank line dispatches an event or input ends.
    fn read_event(&mut self) -> io::Result<Option<SseEvent>> {
        let mut event: Option<String> = None;
        let mut data: Option<String> = None;

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.finished = true;
                return Ok(dispatch(event, data));
            }

            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if event.is_some() || data.is_some() {
                    return Ok(dispatch(event, data));
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => match data.as_mut() {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                _ => {}
            }
        }
    }
}

fn dispatch(event: Option<String>, data: Option<String>) -> Option<SseEvent> {
    if event.is_none() && data.is_none() {
        return None;
    }
    Some(SseEvent {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.unwrap_or_default(),
    })
}

impl<R: BufRead> Iterator for SseReader<R> {
    type Item = io::Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Map prediction events onto response fragments.
///
/// `output` events carry text, `error` ends the stream with a failure,
/// `done` ends it normally (or with a failure when the prediction was
/// canceled). Input that runs out before `done` is a failure: a dropped
/// connection must not pass for a complete reply. Unknown events are skipped.
pub struct PredictionFragments<I> {
    events: I,
    deadline: Instant,
    timeout: Duration,
    finished: bool,
}

impl<I> PredictionFragments<I>
where
    I: Iterator<Item = io::Result<SseEvent>>,
{
    /// `timeout` is measured from `started`, so time spent creating the
    /// prediction counts against it.
    pub fn new(events: I, started: Instant, timeout: Duration) -> Self {
        Self {
            events,
            deadline: started + timeout,
            timeout,
            finished: false,
        }
    }

    fn fail(&mut self, failure: GenerationFailure) -> Option<Result<String, GenerationFailure>> {
        self.finished = true;
        Some(Err(failure))
    }
}

impl<I> Iterator for PredictionFragments<I>
where
    I: Iterator<Item = io::Result<SseEvent>>,
{
    type Item = Result<String, GenerationFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if Instant::now() > self.deadline {
                return self.fail(GenerationFailure::TimedOut(self.timeout));
            }

            let event = match self.events.next() {
                None => {
                    return self.fail(GenerationFailure::Stream(
                        "stream ended before done".into(),
                    ));
                }
                Some(Err(e)) if is_timeout(&e) => {
                    return self.fail(GenerationFailure::TimedOut(self.timeout));
                }
                Some(Err(e)) => return self.fail(GenerationFailure::Stream(e.to_string())),
                Some(Ok(event)) => event,
            };

            match event.event.as_str() {
                "output" => return Some(Ok(event.data)),
                "error" => return self.fail(GenerationFailure::Stream(error_detail(&event.data))),
                "done" => {
                    if done_was_canceled(&event.data) {
                        return self.fail(GenerationFailure::Stream(
                            "prediction was canceled".into(),
                        ));
                    }
                    self.finished = true;
                    return None;
                }
                other => {
                    tracing::trace!(event = other, "Skipping stream event");
                }
            }
        }
    }
}

impl<I> PredictionFragments<I> {
    /// Whether the overall deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.deadline
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// Error events carry either `{"detail": "..."}` or plain text.
fn error_detail(data: &str) -> String {
    serde_json::from_str::<serde_json::Value>(data)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| data.trim().to_string())
}

fn done_was_canceled(data: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(data)
        .ok()
        .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(|r| r == "canceled"))
        .unwrap_or(false)
}
