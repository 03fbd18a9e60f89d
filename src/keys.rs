//! Master key handling.
//!
//! The engine only ever validates against a root key: depth, child number and
//! parent fingerprint are fixed, so the caller supplies nothing but the chain
//! code and the private key.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::bitcoin::bip32::{ChainCode, ChildNumber, DerivationPath, Fingerprint, Xpriv, Xpub};
use crate::bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use crate::error::ValidationError;
use crate::networks::Network;

pub const CHAIN_CODE_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 32;

/// Root extended private key supplied by the caller for one validation.
///
/// The key material is wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedPrivateKey {
    chain_code: [u8; CHAIN_CODE_LEN],
    private_key: [u8; PRIVATE_KEY_LEN],
}

impl ExtendedPrivateKey {
    /// Builds a key from a 32-byte chain code and a 32-byte private key.
    ///
    /// Either slice having another length is `InvalidXpriv`. Whether the
    /// private key is a valid scalar is only checked when it is first used.
    pub fn from_slices(chain_code: &[u8], private_key: &[u8]) -> Result<Self, ValidationError> {
        if chain_code.len() != CHAIN_CODE_LEN || private_key.len() != PRIVATE_KEY_LEN {
            return Err(ValidationError::InvalidXpriv);
        }
        let mut key = ExtendedPrivateKey {
            chain_code: [0; CHAIN_CODE_LEN],
            private_key: [0; PRIVATE_KEY_LEN],
        };
        key.chain_code.copy_from_slice(chain_code);
        key.private_key.copy_from_slice(private_key);
        Ok(key)
    }

    /// Builds a key from 64 raw bytes: chain code first, then private key.
    pub fn from_raw(raw: &[u8]) -> Result<Self, ValidationError> {
        if raw.len() != CHAIN_CODE_LEN + PRIVATE_KEY_LEN {
            return Err(ValidationError::InvalidXpriv);
        }
        let (chain_code, private_key) = raw.split_at(CHAIN_CODE_LEN);
        Self::from_slices(chain_code, private_key)
    }

    /// Takes the material out of a BIP32 key, which must be a master key.
    pub fn from_xpriv(xpriv: &Xpriv) -> Result<Self, ValidationError> {
        if xpriv.depth != 0
            || xpriv.parent_fingerprint != Fingerprint::from([0u8; 4])
            || xpriv.child_number != (ChildNumber::Normal { index: 0 })
        {
            return Err(ValidationError::InvalidXpriv);
        }
        let mut secret = xpriv.private_key.secret_bytes();
        let key = Self::from_slices(&xpriv.chain_code.to_bytes(), &secret);
        secret.zeroize();
        key
    }

    /// Expands into a root [`Xpriv`] for `network`.
    pub(crate) fn to_xpriv(&self, network: Network) -> Result<Xpriv, ValidationError> {
        let private_key =
            SecretKey::from_slice(&self.private_key).map_err(|_| ValidationError::InvalidXpriv)?;
        Ok(Xpriv {
            network: network.kind(),
            depth: 0,
            parent_fingerprint: Fingerprint::from([0u8; 4]),
            child_number: ChildNumber::Normal { index: 0 },
            private_key,
            chain_code: ChainCode::from(self.chain_code),
        })
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExtendedPrivateKey(..)")
    }
}

/// Derives public keys below the master key.
///
/// Holds the expanded root for the duration of one validation and erases it,
/// and every derived child secret, as soon as it is no longer needed.
pub(crate) struct KeyDeriver {
    secp: Secp256k1<All>,
    root: Xpriv,
    fingerprint: Fingerprint,
}

impl KeyDeriver {
    pub fn new(key: &ExtendedPrivateKey, network: Network) -> Result<Self, ValidationError> {
        let secp = Secp256k1::new();
        let root = key.to_xpriv(network)?;
        let fingerprint = root.fingerprint(&secp);
        Ok(KeyDeriver {
            secp,
            root,
            fingerprint,
        })
    }

    /// Fingerprint of the master public key, as written in PSBT key origins
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub fn derive_public_key(&self, path: &DerivationPath) -> Result<PublicKey, ValidationError> {
        let mut child = self.root.derive_priv(&self.secp, path)?;
        let public_key = child.private_key.public_key(&self.secp);
        child.private_key.non_secure_erase();
        Ok(public_key)
    }

    /// Extended public key at `path`, for comparing against global xpubs
    pub fn derive_xpub(&self, path: &DerivationPath) -> Result<Xpub, ValidationError> {
        let mut child = self.root.derive_priv(&self.secp, path)?;
        let xpub = Xpub::from_priv(&self.secp, &child);
        child.private_key.non_secure_erase();
        Ok(xpub)
    }
}

impl Drop for KeyDeriver {
    fn drop(&mut self) {
        self.root.private_key.non_secure_erase();
    }
}
