use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::input::{decode_input, read_input_bytes};
use crate::network::NetworkArg;
use psbt_validator::bitcoin::bip32::Xpriv;
use psbt_validator::{
    validate, ErrorCategory, EventSinkError, ExtendedPrivateKey, Network, RecordingSink,
    TransactionSummary, ValidationError, ValidationEvent,
};

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the PSBT file (use '-' to read from stdin)
    path: PathBuf,
    /// Network for address formatting and change path checks
    #[arg(short, long, value_enum)]
    network: NetworkArg,
    /// Master key as 128 hex chars: chain code then private key
    #[arg(long, conflicts_with = "xprv", required_unless_present = "xprv")]
    key_hex: Option<String>,
    /// Master key as a base58 extended private key (depth 0)
    #[arg(long)]
    xprv: Option<String>,
    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ErrorReport {
    tag: &'static str,
    code: u8,
    category: ErrorCategory,
}

impl From<ValidationError> for ErrorReport {
    fn from(e: ValidationError) -> Self {
        ErrorReport {
            tag: e.as_str(),
            code: e.code(),
            category: e.category(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    events: Vec<ValidationEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<TransactionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

fn master_key(args: &ValidateArgs) -> Result<ExtendedPrivateKey> {
    match (&args.key_hex, &args.xprv) {
        (Some(key_hex), _) => {
            let raw = hex::decode(key_hex.trim()).context("Invalid hex for master key")?;
            ExtendedPrivateKey::from_raw(&raw)
                .map_err(|e| anyhow::anyhow!("Invalid master key: {}", e))
        }
        (None, Some(xprv)) => {
            let xprv = Xpriv::from_str(xprv.trim()).context("Invalid extended private key")?;
            ExtendedPrivateKey::from_xpriv(&xprv)
                .map_err(|e| anyhow::anyhow!("Invalid master key: {}", e))
        }
        (None, None) => anyhow::bail!("Either --key-hex or --xprv is required"),
    }
}

fn print_event(event: &ValidationEvent) {
    match event {
        ValidationEvent::Progress { percent } => log::info!("progress: {}%", percent),
        ValidationEvent::OutputAddress { address, amount } => {
            println!("send   {} {} sat", address, amount)
        }
        ValidationEvent::ChangeAddress { address, amount } => {
            println!("change {} {} sat", address, amount)
        }
    }
}

fn print_summary(summary: &TransactionSummary) {
    println!("total:    {} sat", summary.total_with_change);
    println!("change:   {} sat", summary.total_change);
    println!("external: {} sat", summary.total_external());
    println!("fee:      {} sat", summary.fee);
    if summary.is_self_send {
        println!("self-send");
    }
}

pub fn handle_command(args: ValidateArgs) -> Result<()> {
    let raw_bytes = read_input_bytes(&args.path, "PSBT")?;
    let bytes = decode_input(&raw_bytes)?;
    let key = master_key(&args)?;
    let network: Network = args.network.into();

    if args.json {
        let mut sink = RecordingSink::new();
        let result = validate(&bytes, network, key, &mut sink);
        let (summary, error) = match result {
            Ok(summary) => (Some(summary), None),
            Err(e) => (None, Some(ErrorReport::from(e))),
        };
        let report = Report {
            events: sink.events,
            summary,
            error,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut sink = |event: &ValidationEvent| -> Result<bool, EventSinkError> {
        print_event(event);
        Ok(false)
    };
    match validate(&bytes, network, key, &mut sink) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => anyhow::bail!(
            "validation failed: {} (code {}, {:?})",
            e,
            e.code(),
            e.category()
        ),
    }
}
