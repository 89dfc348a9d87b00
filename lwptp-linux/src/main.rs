use std::{
    error::Error,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use lwptp::{
    bmc::foreign_master::DEFAULT_MAX_FOREIGN_RECORDS,
    filters::PiServo,
    port::{Port, PortState},
    timer::TimerBank,
};
use lwptp_linux::{
    clock::LinuxClock,
    config::Config,
    network::{get_clock_id, LinuxNetwork},
    tracing::{tracing_init, LogLevel},
};
use rand::{rngs::StdRng, SeedableRng};

/// Longest time the port waits for a packet before checking its timers
const POLL_TIMEOUT_MS: u32 = 10;

/// Time a faulty port waits before initializing again
const FAULT_RECOVERY_DELAY: Duration = Duration::from_secs(5);

static TIMERS: TimerBank = TimerBank::new();

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Configuration file to use
    #[clap(long, short = 'c', default_value = "/etc/lwptp/lwptp.toml")]
    config: PathBuf,

    /// Override the log level of the configuration file
    #[clap(long, short = 'l')]
    log_level: Option<LogLevel>,
}

/// Advance the timer bank with the wall time that passed, keeping the
/// sub-millisecond remainder for the next tick
fn run_ticker() {
    let mut last = Instant::now();

    loop {
        thread::sleep(Duration::from_millis(1));

        let elapsed_ms = last.elapsed().as_millis().min(u32::MAX as u128) as u32;
        if elapsed_ms > 0 {
            last += Duration::from_millis(elapsed_ms as u64);
            TIMERS.tick(elapsed_ms);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)?;
    tracing_init(args.log_level.unwrap_or(config.loglevel))?;

    let Some(clock_identity) = config.clock_identity.or_else(get_clock_id) else {
        return Err("could not derive a clock identity, set clock-identity in the config".into());
    };

    let instance_config = config.instance_config(clock_identity);
    let port_config = config.port_config();
    let servo_config = config.servo_config();

    instance_config.validate()?;
    port_config.validate(DEFAULT_MAX_FOREIGN_RECORDS)?;
    servo_config.validate()?;

    let Some(interface) = config.interface else {
        return Err("no network interface configured, set interface in the config".into());
    };

    let clock = LinuxClock::realtime();
    let network = LinuxNetwork::open(
        interface,
        config.timestamping,
        port_config.delay_mechanism,
        clock.clone(),
    )?;

    tracing::info!("starting ordinary clock {}", clock_identity);

    thread::Builder::new()
        .name("timers".into())
        .spawn(run_ticker)?;

    let mut port = Port::<_, _, _, PiServo, _>::new(
        instance_config,
        port_config,
        servo_config,
        clock,
        network,
        &TIMERS,
        StdRng::from_entropy(),
    );

    loop {
        port.run(POLL_TIMEOUT_MS);

        if matches!(port.state(), PortState::Faulty) {
            tracing::warn!(
                "port is faulty, reinitializing in {} seconds",
                FAULT_RECOVERY_DELAY.as_secs()
            );
            thread::sleep(FAULT_RECOVERY_DELAY);
            port.recover();
        }
    }
}
