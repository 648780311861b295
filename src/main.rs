use std::process::ExitCode;

use tracing::{error, info};
use wsburst::{Client, ClientError, Config, Endpoint};

const HOST: &str = "122.51.106.92:8500";
const PATH: &str = "/ws";

#[tokio::main]
async fn main() -> ExitCode {
    wsburst::logging::init();

    let client = Client::new(Endpoint::ws(HOST, PATH), Config::new());
    match client.run().await {
        Ok(report) => {
            info!(
                messages = report.receive.messages,
                bytes = report.receive.bytes,
                ticks = report.lifecycle.ticks,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e @ ClientError::Connect { .. }) => {
            error!("dial: {}", e.cause());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
