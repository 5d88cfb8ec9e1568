use crate::cli::args::{Args, Command, ConfigArgs, ConfigCommand, ServeArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::link::PortEnumerator;
use crate::core::Bridge;
use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{SerialOpener, SystemPortEnumerator};
use crate::infrastructure::websocket::BridgeServer;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Execute CLI command
pub async fn execute_command(args: Args) -> BridgeResult<()> {
    let writer = ConsoleWriter::new(args.output);

    let config_manager = ConfigManager::new();
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    match args.command {
        Command::Serve(serve_args) => serve(serve_args, config, &writer).await,
        Command::Ports => {
            let ports = SystemPortEnumerator.list_ports()?;
            writer.write_ports(&ports)?;
            Ok(())
        }
        Command::Config(config_args) => {
            let source = match &args.config {
                Some(path) => Some(Path::new(path)),
                None => config_manager.active_config_path(),
            };
            execute_config_command(config_args, &writer, &config, source, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("serialbridge {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Apply command line overrides on top of the loaded configuration.
fn apply_overrides(mut config: BridgeConfig, args: ServeArgs) -> BridgeConfig {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config
}

async fn serve(args: ServeArgs, config: BridgeConfig, writer: &ConsoleWriter) -> BridgeResult<()> {
    let config = apply_overrides(config, args);

    let bridge = Bridge::new(
        &config,
        Arc::new(SerialOpener),
        Arc::new(SystemPortEnumerator),
    );
    let mut server =
        BridgeServer::new(&config.server.bind_addr(), bridge.broadcaster(), bridge.dispatcher())
            .await?;
    server.start().await?;

    writer.write_message(&format!(
        "Serial bridge listening on ws://{} (Press Ctrl+C to stop)",
        server.get_bind_addr()
    ))?;

    let interrupted = tokio::signal::ctrl_c().await;
    info!("Shutting down");

    server.stop().await?;
    bridge.shutdown().await;

    interrupted.map_err(BridgeError::from)
}

fn execute_config_command(
    args: ConfigArgs,
    writer: &ConsoleWriter,
    config: &BridgeConfig,
    source: Option<&Path>,
    config_manager: &ConfigManager,
) -> BridgeResult<()> {
    match args.command {
        ConfigCommand::Show => {
            writer.write_config(config, source)?;
            Ok(())
        }
        ConfigCommand::Init { output } => {
            let base = match output {
                Some(path) => path.into(),
                None => std::env::current_dir().map_err(|e| BridgeError::Config {
                    message: format!("Failed to get current directory: {}", e),
                })?,
            };
            let written = config_manager.init_project_config(&base)?;
            writer.write_message(&format!(
                "Project configuration initialized at '{}'",
                written.display()
            ))?;
            Ok(())
        }
    }
}
