use std::time::Duration;

use log::{debug, info, warn};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    VirtualMachine,
    progress::Bar,
    report::{MachineReport, SimulationReport},
    time::Tick,
};

/// Owns the machine set and global time.
///
/// Machines are advanced one at a time in a fixed order; listeners and
/// senders keep running on the tokio runtime in between.
pub struct Simulation {
    machines: Vec<VirtualMachine>,
    listeners: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    now: Tick,
    ticks: Tick,
    pacing: Duration,
    progress_bar: Bar,
}

impl Simulation {
    pub(crate) fn new(
        machines: Vec<VirtualMachine>,
        listeners: Vec<JoinHandle<()>>,
        shutdown: watch::Sender<bool>,
        ticks: Tick,
        pacing: Duration,
    ) -> Self {
        Self {
            machines,
            listeners,
            shutdown,
            now: Tick::default(),
            ticks,
            pacing,
            progress_bar: Bar::new(ticks),
        }
    }

    /// Drives every remaining global tick, pacing them in real time.
    ///
    /// With zero pacing the driver still yields after every tick, so
    /// listeners and senders sharing its runtime thread make progress.
    pub async fn run(&mut self) {
        while self.now < self.ticks {
            self.step();
            if self.pacing.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.pacing).await;
            }
        }

        self.progress_bar.finish();
        info!("Ran {} global ticks", self.ticks);
    }

    /// Advances global time by one and ticks every machine once.
    pub fn step(&mut self) -> Tick {
        self.now += 1;
        for machine in self.machines.iter_mut() {
            machine.tick(self.now);
        }
        debug!("global time: {}", self.now);
        self.progress_bar.make_progress(self.now);
        self.now
    }

    /// Stops every listener, waits for them and reports the final state.
    pub async fn shutdown(mut self) -> SimulationReport {
        self.shutdown.send_replace(true);
        for listener in self.listeners.drain(..) {
            if let Err(err) = listener.await {
                warn!("Listener task failed: {err}");
            }
        }

        for machine in self.machines.iter_mut() {
            if let Err(err) = machine.log_mut().flush() {
                warn!("Machine {} could not flush its log: {err}", machine.port());
            }
        }

        self.report()
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            ticks: self.now,
            machines: self.machines.iter().map(MachineReport::from).collect(),
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn machines(&self) -> &[VirtualMachine] {
        &self.machines
    }

    /// Direct access for driving a single machine out of the usual order.
    pub fn machine_mut(&mut self, index: usize) -> Option<&mut VirtualMachine> {
        self.machines.get_mut(index)
    }
}
