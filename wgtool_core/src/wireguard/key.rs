//! Wireguard keys.
//!
//! Keys are 32 bytes and travel as standard base64 text,
//! the same form `wg genkey` and `wg pubkey` print.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use x25519_dalek::{PublicKey, StaticSecret};

// Error handling
use log::trace;
use wgtool_error::WgError;

pub const KEY_LENGTH: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key([u8; KEY_LENGTH]);

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Key(bytes)
    }
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
    /// An all zero key stands for "no key" on the device side.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; KEY_LENGTH]
    }
    /// Public key matching this private key.
    pub fn public_key(&self) -> Key {
        let secret = StaticSecret::from(self.0);
        Key(PublicKey::from(&secret).to_bytes())
    }
}
impl FromStr for Key {
    type Err = WgError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64_STANDARD
            .decode(s.trim())
            .map_err(|e| WgError::InvalidKey(format!("{s:?}: {e}")))?;
        let bytes: [u8; KEY_LENGTH] = bytes.try_into().map_err(|e: Vec<u8>| {
            WgError::InvalidKey(format!(
                "{s:?}: expected {KEY_LENGTH} bytes, got {}",
                e.len()
            ))
        })?;
        Ok(Key(bytes))
    }
}
impl TryFrom<String> for Key {
    type Error = WgError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Key::from_str(&s)
    }
}
impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64_STANDARD.encode(self.0))
    }
}
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = self.to_string();
        write!(f, "Key({}...)", &string[..8])
    }
}

/// A private key and its public counterpart.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: Key,
    pub public_key: Key,
}
impl KeyPair {
    /*
     * Generate a fresh curve25519 key pair.
     */
    pub fn generate() -> Self {
        let secret = StaticSecret::from(rand::random::<[u8; KEY_LENGTH]>());
        let public = PublicKey::from(&secret);
        trace!("generated wireguard key pair");
        Self {
            private_key: Key(secret.to_bytes()),
            public_key: Key(public.to_bytes()),
        }
    }
    pub fn from_private_key(private_key: Key) -> Self {
        Self {
            public_key: private_key.public_key(),
            private_key,
        }
    }
}
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
