use anyhow::Result;
use clap::Subcommand;

mod inspect;

#[derive(Subcommand)]
pub enum PsbtCommand {
    /// Decode a PSBT's structure without any key
    Inspect {
        /// Path to the PSBT file (use '-' to read from stdin)
        path: std::path::PathBuf,
    },
}

pub fn handle_command(command: PsbtCommand) -> Result<()> {
    match command {
        PsbtCommand::Inspect { path } => inspect::handle_inspect_command(path),
    }
}
