use std::{collections::HashMap, path::PathBuf, time::Duration};

use log::info;
use tokio::{net::TcpListener, runtime::Handle, sync::watch};

use crate::{
    ActionSource, EventLog, Inbox, MAX_CLOCK_RATE, MIN_CLOCK_RATE, MachineConfig, Port, Result,
    Simulation, SimulationError, VirtualMachine,
    communication::listen,
    random::{Randomizer, Seed, wall_clock_seed},
    time::Tick,
};

fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let module_path = record.module_path().unwrap_or("unknown");
            let crate_name = module_path.split("::").next().unwrap_or(module_path);
            use std::io::Write;
            writeln!(buf, "[{}] {}", crate_name, record.args())
        })
        .try_init();
}

pub struct SimulationBuilder {
    host: String,
    ports: Vec<Port>,
    ticks: Tick,
    pacing: Duration,
    seed: Option<Seed>,
    log_dir: Option<PathBuf>,
    clock_rates: Vec<usize>,
    action_sources: HashMap<usize, Box<dyn ActionSource>>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        SimulationBuilder {
            host: "0.0.0.0".to_string(),
            ports: vec![7977, 7978, 7979],
            ticks: Tick(60),
            pacing: Duration::from_millis(100),
            seed: None,
            log_dir: None,
            clock_rates: Vec::new(),
            action_sources: HashMap::new(),
        }
    }
}

impl SimulationBuilder {
    /// Address every machine binds to.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// One machine per port, in iteration order. Port 0 picks an ephemeral one.
    pub fn ports(mut self, ports: &[Port]) -> Self {
        self.ports = ports.to_vec();
        self
    }

    pub fn ticks(mut self, ticks: Tick) -> Self {
        self.ticks = ticks;
        self
    }

    /// Real time slept after every global tick.
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Base seed; each machine shifts it by its port. Defaults to wall-clock time.
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Writes each machine's event log to `<dir>/<port>.log`.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Pins clock rates by machine index instead of drawing them.
    pub fn clock_rates(mut self, rates: &[usize]) -> Self {
        self.clock_rates = rates.to_vec();
        self
    }

    /// Replaces the random action policy of the machine at `index`.
    pub fn actions(mut self, index: usize, source: impl ActionSource + 'static) -> Self {
        self.action_sources.insert(index, Box::new(source));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ports.len() < 2 {
            return Err(SimulationError::InvalidConfig(format!(
                "need at least two machines, got {}",
                self.ports.len()
            )));
        }
        if self.clock_rates.len() > self.ports.len() {
            return Err(SimulationError::InvalidConfig(format!(
                "{} clock rates for {} machines",
                self.clock_rates.len(),
                self.ports.len()
            )));
        }
        if let Some(rate) = self
            .clock_rates
            .iter()
            .find(|r| !(MIN_CLOCK_RATE..=MAX_CLOCK_RATE).contains(*r))
        {
            return Err(SimulationError::InvalidConfig(format!(
                "clock rate {rate} outside {MIN_CLOCK_RATE}..={MAX_CLOCK_RATE}"
            )));
        }
        if let Some(index) = self
            .action_sources
            .keys()
            .find(|index| **index >= self.ports.len())
        {
            return Err(SimulationError::InvalidConfig(format!(
                "action source for machine {index}, only {} machines",
                self.ports.len()
            )));
        }
        Ok(())
    }

    /// Binds every listener before any machine exists, so a port that cannot
    /// be bound aborts the whole run. Must be called inside a tokio runtime.
    pub async fn build(mut self) -> Result<Simulation> {
        init_logger();
        self.validate()?;

        let mut bound = Vec::with_capacity(self.ports.len());
        for port in &self.ports {
            let addr = format!("{}:{}", self.host, port);
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| SimulationError::Bind { addr, source })?;
            let port = listener.local_addr()?.port();
            bound.push((port, listener));
        }
        let ports: Vec<Port> = bound.iter().map(|(port, _)| *port).collect();

        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }

        let base_seed = self.seed.unwrap_or_else(wall_clock_seed);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runtime = Handle::current();

        let mut machines = Vec::with_capacity(bound.len());
        let mut listeners = Vec::with_capacity(bound.len());
        for (index, (port, listener)) in bound.into_iter().enumerate() {
            let log = match &self.log_dir {
                Some(dir) => EventLog::to_file(&dir.join(format!("{port}.log")))?,
                None => EventLog::in_memory(),
            };

            let mut randomizer = Randomizer::for_machine(base_seed, port);
            let clock_rate = match self.clock_rates.get(index) {
                Some(rate) => *rate,
                None => randomizer.clock_rate(),
            };
            let actions = self
                .action_sources
                .remove(&index)
                .unwrap_or_else(|| Box::new(randomizer) as Box<dyn ActionSource>);

            let config = MachineConfig {
                host: self.host.clone(),
                port,
                peers: ports.iter().copied().filter(|p| *p != port).collect(),
                clock_rate,
            };
            info!("Machine {port}'s internal clock rate is {clock_rate}");

            let inbox = Inbox::new(port);
            listeners.push(tokio::spawn(listen(
                listener,
                port,
                inbox.clone(),
                shutdown_rx.clone(),
            )));
            machines.push(VirtualMachine::new(
                config,
                inbox,
                log,
                actions,
                runtime.clone(),
            )?);
        }

        Ok(Simulation::new(
            machines,
            listeners,
            shutdown_tx,
            self.ticks,
            self.pacing,
        ))
    }
}
