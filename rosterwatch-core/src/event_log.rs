//! JSONL serialization of derived event batches.
//!
//! Writes each public event of a collection as one JSON line to any
//! `Write` destination (stdout, file, pipe), in kind evaluation order.
//! Useful for piping a diff run into `jq` or archiving a server session.

use crate::events::EventCollection;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing an event log.
#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writer emitting event collections as JSONL.
///
/// # Example
///
/// ```ignore
/// // Log to stdout (for piping to jq, etc.)
/// let mut log = EventLogWriter::stdout();
///
/// // Log to file
/// let mut log = EventLogWriter::file("events.jsonl")?;
///
/// log.write_batch(&hopper.events)?;
/// ```
pub struct EventLogWriter {
    writer: Box<dyn Write + Send>,
}

impl EventLogWriter {
    /// Create a writer targeting stdout. Buffered to reduce syscall
    /// overhead when batches are large.
    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    /// Create a writer targeting a file. Buffered.
    pub fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Create a writer with a custom destination (pipe, socket, buffer).
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }

    /// Write every event in the collection as one JSON line, in kind
    /// evaluation order, then flush. Returns the number of lines written.
    pub fn write_batch(&mut self, events: &EventCollection) -> Result<usize, EventLogError> {
        let mut written = 0usize;
        for (_, list) in events.iter() {
            for event in list {
                serde_json::to_writer(&mut self.writer, event)?;
                self.writer.write_all(b"\n")?;
                written += 1;
            }
        }
        self.writer.flush()?;
        log::debug!("wrote {} events to log", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind, PlayerJoinServerEvent, PlayerLeaveServerEvent};
    use crate::link::Linkable;
    use crate::state::Player;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    /// Shared in-memory sink for inspecting writer output.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn player_link(steamid: &str) -> crate::link::Link {
        Player {
            steamid: steamid.into(),
            ..Player::new()
        }
        .create_link(true)
    }

    #[test]
    fn test_jsonl_shape_and_kind_order() {
        let mut events = EventCollection::new();
        // Recorded out of evaluation order on purpose.
        events
            .add(Event::PlayerLeaveServer(PlayerLeaveServerEvent {
                event_time: Utc::now(),
                player: player_link("2"),
            }))
            .unwrap();
        events
            .add(Event::PlayerJoinServer(PlayerJoinServerEvent {
                event_time: Utc::now(),
                player: player_link("1"),
            }))
            .unwrap();

        let buf = SharedBuf::default();
        let mut log = EventLogWriter::new(Box::new(buf.clone()));
        let written = log.write_batch(&events).unwrap();
        assert_eq!(written, 2);

        let raw = buf.0.lock().unwrap().clone();
        let text = String::from_utf8(raw).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        // Joins precede leaves, matching kind evaluation order.
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], EventKind::PlayerJoinServer.name());
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["type"], EventKind::PlayerLeaveServer.name());
    }
}
