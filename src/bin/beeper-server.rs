//! Network-controlled buzzer daemon for Raspberry Pi.
//!
//! Listens for a single client and beeps while an episode is active:
//! `start` begins beeping, `stop` ends it, `rate <millis>` changes the
//! cadence, and disconnecting shuts the buzzer down.

use clap::Parser;
use episodic::{Buzzer, CommandServer, EpisodicController};
use rppal::gpio::Gpio;
use std::error::Error;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "beeper-server", version, about = "Network-controlled GPIO buzzer")]
struct Args {
    /// Address to listen on for the command client
    #[arg(long, default_value = "0.0.0.0:9011")]
    listen: SocketAddr,

    /// BCM pin number driving the buzzer
    #[arg(long, default_value_t = 17)]
    pin: u8,

    /// Half-cycle duration in milliseconds (time spent in each ON or OFF phase)
    #[arg(long, default_value_t = 500)]
    half_cycle_ms: u64,
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let gpio = Gpio::new()?;
    let buzzer = Buzzer::new(&gpio, args.pin)?;

    let mut controller =
        EpisodicController::new(Duration::from_millis(args.half_cycle_ms), buzzer)?;
    controller.start_clean()?;

    let server = CommandServer::bind(args.listen, "beeper")?;
    server.serve(&mut controller)?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("beeper-server failed: {e}");
            ExitCode::FAILURE
        }
    }
}
