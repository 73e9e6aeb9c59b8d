//! A small testbed for watching logical clocks drift apart.
//!
//! A [`Simulation`] owns a fixed set of [`VirtualMachine`]s. Every machine
//! runs at its own clock rate, listens on its own TCP port and talks to its
//! peers with one short-lived connection per message. Each global tick the
//! driver advances every machine by `clock_rate` internal steps, and every
//! step lands in that machine's own [`EventLog`].

mod action;
mod communication;
mod error;
mod event_log;
pub mod helpers;
mod machine;
mod progress;
mod random;
mod report;
mod simulation;
mod simulation_builder;
pub mod time;

pub use action::{Action, ActionSource, Destination, ScriptedActions};

pub use communication::Inbox;
pub use communication::{Payload, Port, READY_TOKEN, RECEIVE_BUFFER_SIZE, RECEIVE_TIMEOUT};

pub use error::{Result, SimulationError};

pub use event_log::{Event, EventKind, EventLog, LogEntry};

pub use machine::{MAX_CLOCK_RATE, MIN_CLOCK_RATE, MachineConfig, VirtualMachine};

pub use random::{Randomizer, Seed};

pub use report::{MachineReport, SimulationReport};

pub use simulation::Simulation;
pub use simulation_builder::SimulationBuilder;

pub use time::{LogicalClock, Tick};
