use anyhow::Result;
use std::path::PathBuf;

use crate::input::{decode_input, read_input_bytes};
use psbt_validator::psbt::{InputMap, OutputMap, ParsedPsbt};

fn presence(present: bool) -> &'static str {
    if present {
        "yes"
    } else {
        "no"
    }
}

fn print_input(index: usize, input: &InputMap<'_>) {
    println!("  input {}", index);
    println!("    non_witness_utxo: {}", presence(input.non_witness_utxo.is_some()));
    match &input.witness_utxo {
        Some(utxo) => println!(
            "    witness_utxo: {} sat to {}",
            utxo.value.to_sat(),
            hex::encode(utxo.script_pubkey.as_bytes())
        ),
        None => println!("    witness_utxo: no"),
    }
    if let Some(sighash) = input.sighash_type {
        println!("    sighash_type: {:#04x}", sighash);
    }
    println!("    redeem_script: {}", presence(input.redeem_script.is_some()));
    println!("    witness_script: {}", presence(input.witness_script.is_some()));
    println!("    tap_internal_key: {}", presence(input.tap_internal_key.is_some()));
    for derivation in &input.derivations {
        println!("    key origin: {}", derivation.origin);
    }
}

fn print_output(index: usize, output: &OutputMap<'_>) {
    println!("  output {}", index);
    println!("    redeem_script: {}", presence(output.redeem_script.is_some()));
    println!("    witness_script: {}", presence(output.witness_script.is_some()));
    println!("    tap_internal_key: {}", presence(output.tap_internal_key.is_some()));
    println!("    tap_tree: {}", presence(output.has_tap_tree));
    for derivation in &output.derivations {
        println!("    key origin: {}", derivation.origin);
    }
}

pub fn handle_inspect_command(path: PathBuf) -> Result<()> {
    let raw_bytes = read_input_bytes(&path, "PSBT")?;
    let bytes = decode_input(&raw_bytes)?;

    let psbt = ParsedPsbt::parse(&bytes).map_err(|e| {
        anyhow::anyhow!("Failed to parse PSBT: {} (code {})", e, e.code())
    })?;
    let tx = psbt.unsigned_tx();

    println!("txid: {}", tx.compute_txid());
    println!("version: {}", tx.version);
    println!("lock_time: {}", tx.lock_time);
    println!("global xpubs: {}", psbt.global.xpubs.len());
    for entry in &psbt.global.xpubs {
        println!("  {} at {}", entry.xpub, entry.origin);
    }
    println!("inputs: {}", psbt.inputs.len());
    for (index, input) in psbt.inputs.iter().enumerate() {
        let outpoint = tx.inputs[index].previous_output;
        println!("  spends {}", outpoint);
        print_input(index, input);
    }
    println!("outputs: {}", psbt.outputs.len());
    for (index, output) in psbt.outputs.iter().enumerate() {
        let tx_output = &tx.outputs[index];
        println!(
            "  pays {} sat to {}",
            tx_output.value.to_sat(),
            hex::encode(tx_output.script_pubkey.as_bytes())
        );
        print_output(index, output);
    }
    Ok(())
}
