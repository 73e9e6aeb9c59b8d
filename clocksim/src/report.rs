use std::fmt::Display;

use crate::{EventKind, LogEntry, LogicalClock, Port, Tick, VirtualMachine};

/// Final state of one machine after the driver stopped.
#[derive(Clone, Debug)]
pub struct MachineReport {
    pub port: Port,
    pub clock_rate: usize,
    pub steps: usize,
    pub clock: LogicalClock,
    pub queue_len: usize,
    pub received: usize,
    pub sent: usize,
    pub internal: usize,
    pub delivery_failures: usize,
    pub abandoned_steps: usize,
    pub dropped_inbound: usize,
    pub entries: Vec<LogEntry>,
}

impl From<&VirtualMachine> for MachineReport {
    fn from(vm: &VirtualMachine) -> Self {
        let log = vm.log();
        Self {
            port: vm.port(),
            clock_rate: vm.clock_rate(),
            steps: vm.steps(),
            clock: vm.clock(),
            queue_len: vm.inbox_len(),
            received: log.count(EventKind::Receive),
            sent: log.count(EventKind::Send),
            internal: log.count(EventKind::Internal),
            delivery_failures: vm.delivery_failures(),
            abandoned_steps: vm.abandoned_steps(),
            dropped_inbound: vm.dropped_inbound(),
            entries: log.entries().to_vec(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimulationReport {
    pub ticks: Tick,
    pub machines: Vec<MachineReport>,
}

impl Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Ran {} global ticks", self.ticks)?;
        writeln!(
            f,
            "{:>6} {:>4} {:>6} {:>6} {:>6} {:>9} {:>5} {:>5} {:>8} {:>9} {:>7}",
            "port", "rate", "steps", "clock", "queue", "received", "sent", "intl", "failures", "abandoned", "dropped"
        )?;
        for m in &self.machines {
            writeln!(
                f,
                "{:>6} {:>4} {:>6} {:>6} {:>6} {:>9} {:>5} {:>5} {:>8} {:>9} {:>7}",
                m.port,
                m.clock_rate,
                m.steps,
                m.clock,
                m.queue_len,
                m.received,
                m.sent,
                m.internal,
                m.delivery_failures,
                m.abandoned_steps,
                m.dropped_inbound
            )?;
        }
        Ok(())
    }
}
