//! Queue Scout CLI entry point

use queue_scout_cli::{run_cli, CliError};
use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        error!("CLI error: {}", e);

        let exit_code = match e {
            CliError::Configuration(_) => 1,
            CliError::Connect(_) => 2,
            CliError::CommandFailed { .. } => 3,
            CliError::InvalidArgument { .. } => 4,
            CliError::Io(_) => 5,
            CliError::Remote { .. } => 6,
        };

        std::process::exit(exit_code);
    }
}
