//! Reading PSBT bytes from a file or stdin

use anyhow::{Context, Result};
use base64::Engine;
use std::io::Read;
use std::path::Path;

/// Reads the whole file, or stdin when `path` is `-`.
pub fn read_input_bytes(path: &Path, what: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {} from stdin", what))?;
    } else {
        bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {} from {}", what, path.display()))?;
    }
    Ok(bytes)
}

/// Auto-detects hex, base64 or raw binary input.
///
/// Text input is trimmed first. Hex wins over base64 when a string is valid
/// as both.
pub fn decode_input(raw: &[u8]) -> Result<Vec<u8>> {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Ok(raw.to_vec());
    };
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Input is empty");
    }
    if let Ok(bytes) = hex::decode(text) {
        return Ok(bytes);
    }
    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(text) {
        return Ok(bytes);
    }
    Ok(raw.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: &[u8] = b"psbt\xff";

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_input(b"70736274ff\n").unwrap(), MAGIC);
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_input(b"  cHNidP8=  ").unwrap(), MAGIC);
    }

    #[test]
    fn test_raw_passthrough() {
        assert_eq!(decode_input(MAGIC).unwrap(), MAGIC);
    }

    #[test]
    fn test_empty_input() {
        assert!(decode_input(b" \n").is_err());
    }
}
