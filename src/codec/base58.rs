use super::CodecError;

/// Encodes `payload` followed by the first four bytes of its double-SHA256.
pub fn base58_check_encode(payload: &[u8]) -> Result<String, CodecError> {
    if payload.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    Ok(bs58::encode(payload).with_check().into_string())
}

/// Decodes a Base58Check string and returns the payload without checksum.
pub fn base58_check_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    let payload = bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|_| CodecError::CorruptEncoding)?;
    if payload.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    Ok(payload)
}
