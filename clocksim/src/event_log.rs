//! Append-only record of everything a machine did, one entry per internal step.
//!
//! Entries are kept in memory for the end-of-run report and, when a sink is
//! attached, written out as one line each:
//!
//! ```text
//! 2026-10-16 12:00:00.123 INFO RECEIVED MESSAGE: 4, global time: 3, local logical clock time: 9, message queue length: 0
//! 2026-10-16 12:00:00.124 INFO SENT MESSAGE: 10, TO: 7978, 7979, global time: 3, local logical clock time: 10
//! 2026-10-16 12:00:00.125 INFO INTERNAL EVENT, global time: 3, local logical clock time: 11
//! ```

use std::{
    fmt::Display,
    fs::File,
    io::{LineWriter, Write},
    path::Path,
};

use crate::{LogicalClock, Payload, Port, Result, SimulationError, Tick};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Receive,
    Send,
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A payload was drained; `queue_len` is what was left behind.
    Received { payload: Payload, queue_len: usize },
    /// The machine's clock value went out to every port in `to`.
    Sent { to: Vec<Port> },
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub global_tick: Tick,
    pub clock: LogicalClock,
    pub event: Event,
}

impl LogEntry {
    pub fn kind(&self) -> EventKind {
        match self.event {
            Event::Received { .. } => EventKind::Receive,
            Event::Sent { .. } => EventKind::Send,
            Event::Internal => EventKind::Internal,
        }
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (tick, clock) = (self.global_tick, self.clock);
        match &self.event {
            Event::Received { payload, queue_len } => write!(
                f,
                "RECEIVED MESSAGE: {payload}, global time: {tick}, local logical clock time: {clock}, message queue length: {queue_len}"
            ),
            Event::Sent { to } => {
                let to = to
                    .iter()
                    .map(Port::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "SENT MESSAGE: {clock}, TO: {to}, global time: {tick}, local logical clock time: {clock}"
                )
            }
            Event::Internal => write!(
                f,
                "INTERNAL EVENT, global time: {tick}, local logical clock time: {clock}"
            ),
        }
    }
}

pub struct EventLog {
    entries: Vec<LogEntry>,
    sink: Option<Box<dyn Write + Send>>,
}

impl EventLog {
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            sink: None,
        }
    }

    /// Truncates whatever a previous run left at `path`.
    pub fn to_file(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| SimulationError::LogOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_sink(LineWriter::new(file)))
    }

    pub fn with_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            entries: Vec::new(),
            sink: Some(Box::new(sink)),
        }
    }

    /// An entry whose line cannot be written is not recorded either.
    pub fn append(&mut self, entry: LogEntry) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(sink, "{now} INFO {entry}").map_err(SimulationError::LogWrite)?;
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush().map_err(SimulationError::LogWrite)?;
        }
        Ok(())
    }
}
