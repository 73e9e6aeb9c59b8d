use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use log::warn;
use tokio::runtime::Handle;

use crate::{
    ActionSource, EventLog, Inbox, LogicalClock, Port, Result, SimulationError, Tick,
    communication::{connect_host, send_message},
    event_log::{Event, LogEntry},
};

pub const MIN_CLOCK_RATE: usize = 1;
pub const MAX_CLOCK_RATE: usize = 6;

/// Everything a machine needs to know about itself and its neighbours.
#[derive(Clone, Debug)]
pub struct MachineConfig {
    pub host: String,
    pub port: Port,
    /// Other machines' ports in a fixed order; `peers[0]` is the first
    /// destination, `peers[1]` the second.
    pub peers: Vec<Port>,
    pub clock_rate: usize,
}

pub struct VirtualMachine {
    config: MachineConfig,
    connect_host: String,
    clock: LogicalClock,
    steps: usize,
    inbox: Inbox,
    log: EventLog,
    actions: Box<dyn ActionSource>,
    runtime: Handle,
    delivery_failures: Arc<AtomicUsize>,
    abandoned_steps: usize,
}

impl VirtualMachine {
    /// `inbox` must be the same queue the machine's listener pushes into.
    /// Senders are spawned onto `runtime`. Fails if the clock rate lies
    /// outside [`MIN_CLOCK_RATE`]..=[`MAX_CLOCK_RATE`].
    pub fn new(
        config: MachineConfig,
        inbox: Inbox,
        log: EventLog,
        actions: Box<dyn ActionSource>,
        runtime: Handle,
    ) -> Result<Self> {
        if !(MIN_CLOCK_RATE..=MAX_CLOCK_RATE).contains(&config.clock_rate) {
            return Err(SimulationError::InvalidConfig(format!(
                "machine {} has clock rate {}, expected {MIN_CLOCK_RATE}..={MAX_CLOCK_RATE}",
                config.port, config.clock_rate
            )));
        }

        Ok(Self {
            connect_host: connect_host(&config.host),
            config,
            clock: LogicalClock::START,
            steps: 0,
            inbox,
            log,
            actions,
            runtime,
            delivery_failures: Arc::new(AtomicUsize::new(0)),
            abandoned_steps: 0,
        })
    }

    /// Advances this machine by one global tick: `clock_rate` internal steps.
    pub fn tick(&mut self, now: Tick) {
        for _ in 0..self.config.clock_rate {
            if let Err(err) = self.step(now) {
                self.abandoned_steps += 1;
                warn!(
                    "Machine {} abandoned step at clock {}: {err}",
                    self.config.port, self.clock
                );
            }
            self.clock.advance();
            self.steps += 1;
        }
    }

    fn step(&mut self, now: Tick) -> Result<()> {
        if let Some((payload, queue_len)) = self.inbox.pop()? {
            crate::debug_machine!(now, self.config.port, "Draining {payload}");
            return self.log.append(LogEntry {
                global_tick: now,
                clock: self.clock,
                event: Event::Received { payload, queue_len },
            });
        }

        let targets = self.actions.next_action().targets(&self.config.peers);
        for to in &targets {
            self.dispatch(*to);
        }

        let event = if targets.is_empty() {
            Event::Internal
        } else {
            Event::Sent { to: targets }
        };
        self.log.append(LogEntry {
            global_tick: now,
            clock: self.clock,
            event,
        })
    }

    // Not joined: a failed delivery only shows up in `delivery_failures`.
    fn dispatch(&self, to: Port) {
        let addr = format!("{}:{}", self.connect_host, to);
        let payload = self.clock.to_string();
        let from = self.config.port;
        let failures = Arc::clone(&self.delivery_failures);

        self.runtime.spawn(async move {
            if let Err(err) = send_message(&addr, &payload).await {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!("Machine {from} could not deliver {payload} to {addr}: {err}");
            }
        });
    }

    pub fn port(&self) -> Port {
        self.config.port
    }

    pub fn peers(&self) -> &[Port] {
        &self.config.peers
    }

    pub fn clock_rate(&self) -> usize {
        self.config.clock_rate
    }

    pub fn clock(&self) -> LogicalClock {
        self.clock
    }

    /// Internal steps executed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub(crate) fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    pub fn delivery_failures(&self) -> usize {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    pub fn abandoned_steps(&self) -> usize {
        self.abandoned_steps
    }

    /// Inbound connections this machine's listener gave up on.
    pub fn dropped_inbound(&self) -> usize {
        self.inbox.dropped()
    }
}
