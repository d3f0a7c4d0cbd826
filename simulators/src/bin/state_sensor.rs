use clap::Parser;
use elevator_simulators::{init_logging, run_schedule, state_schedule, SensorArgs};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = SensorArgs::parse();
    init_logging();

    let failed = run_schedule(&args.url, "state", &state_schedule()).await;
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
