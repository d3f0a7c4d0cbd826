use clap::Parser;
use elevator_simulators::{demand_schedule, init_logging, run_schedule, SensorArgs};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = SensorArgs::parse();
    init_logging();

    let failed = run_schedule(&args.url, "demand", &demand_schedule()).await;
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
