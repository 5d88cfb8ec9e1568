// SerialBridge - Serial to WebSocket telemetry bridge
use clap::Parser;
use serialbridge::cli::{execute_command, Args, ConsoleWriter, OutputWriter};
use serialbridge::BridgeError;

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let args = Args::parse();
    let format = args.output;

    match execute_command(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if ConsoleWriter::stderr(format).write_error(&e.to_string()).is_err() {
                eprintln!("Error: {}", e);
            }
            std::process::exit(1);
        }
    }
}
