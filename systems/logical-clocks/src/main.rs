use std::{error::Error, path::PathBuf, time::Duration};

use clap::Parser;
use clocksim::{SimulationBuilder, Tick};

/// Runs a handful of machines at random clock rates and logs what each one saw.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address every machine binds to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listening ports, one machine each
    #[arg(long, value_delimiter = ',', default_values_t = [7977, 7978, 7979])]
    ports: Vec<u16>,

    /// Global ticks to run
    #[arg(long, default_value_t = 60)]
    ticks: usize,

    /// Real time between global ticks, in milliseconds
    #[arg(long, default_value_t = 100)]
    pacing_ms: u64,

    /// Base seed for clock rates and actions (wall-clock time if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Directory receiving one <port>.log per machine
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut builder = SimulationBuilder::default()
        .host(args.host)
        .ports(&args.ports)
        .ticks(Tick(args.ticks))
        .pacing(Duration::from_millis(args.pacing_ms))
        .log_dir(args.log_dir);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    let mut sim = builder.build().await?;
    for machine in sim.machines() {
        println!(
            "Machine {}'s internal clock rate is {}",
            machine.port(),
            machine.clock_rate()
        );
    }

    sim.run().await;
    let report = sim.shutdown().await;

    print!("{report}");
    Ok(())
}
