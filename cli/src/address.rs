//! What the signer displays for an output, and the reverse lookup

use anyhow::{Context, Result};
use clap::Subcommand;
use psbt_validator::address::OutputScriptType;
use psbt_validator::bitcoin::Script;
use psbt_validator::{from_output_script_with_network, to_output_script_with_network, Network};
use std::path::Path;

use crate::input::{decode_input, read_input_bytes};
use crate::network::NetworkArg;

#[derive(Subcommand)]
pub enum AddressCommand {
    /// Print the output script an address pays to, with its template
    Script {
        address: String,
        #[arg(short, long, value_enum)]
        network: NetworkArg,
    },
    /// Print the address the signer shows for an output script
    Show {
        /// Output script as hex, or '-' to read it from stdin
        script: String,
        /// Only this network (default: every network)
        #[arg(short, long, value_enum)]
        network: Option<NetworkArg>,
    },
}

fn script_bytes(arg: &str) -> Result<Vec<u8>> {
    if arg == "-" {
        return decode_input(&read_input_bytes(Path::new("-"), "output script")?);
    }
    hex::decode(arg.trim()).context("Output script is not hex")
}

fn template(script: &Script) -> &'static str {
    OutputScriptType::classify(script).map_or("unknown", OutputScriptType::as_str)
}

pub fn handle_command(command: AddressCommand) -> Result<()> {
    match command {
        AddressCommand::Script { address, network } => {
            let script = to_output_script_with_network(&address, network.into())
                .with_context(|| format!("Not an address for {:?}: {}", network, address))?;
            println!("{} {}", template(&script), hex::encode(script.as_bytes()));
        }
        AddressCommand::Show { script, network } => {
            let bytes = script_bytes(&script)?;
            let script = Script::from_bytes(&bytes);
            let networks = match network {
                Some(network) => vec![Network::from(network)],
                None => Network::all().to_vec(),
            };
            println!("template: {}", template(script));
            for network in networks {
                let address = from_output_script_with_network(script, network)
                    .context("The signer has no address form for this script")?;
                println!("{}: {}", network, address);
            }
        }
    }
    Ok(())
}
