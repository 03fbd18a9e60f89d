use anyhow::Result;
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

mod address;
mod input;
mod network;
mod psbt;
mod validate;

#[derive(Parser)]
#[command(name = "psbt-validator-cli")]
#[command(about = "Inspect and validate PSBTs against a master key", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Address encoding/decoding operations
    Address {
        #[command(subcommand)]
        command: address::AddressCommand,
    },
    /// PSBT structure operations
    Psbt {
        #[command(subcommand)]
        command: psbt::PsbtCommand,
    },
    /// Validate a PSBT and print what the signer would show
    Validate(validate::ValidateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Setup logging
    let mut c = ConfigBuilder::new();
    c.add_filter_allow_str("psbt_validator");
    let _ = TermLogger::init(level, c.build(), TerminalMode::Stderr, ColorChoice::Auto);

    match cli.command {
        Commands::Address { command } => address::handle_command(command),
        Commands::Psbt { command } => psbt::handle_command(command),
        Commands::Validate(args) => validate::handle_command(args),
    }
}
