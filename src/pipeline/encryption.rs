//! # Stream Encryption
//!
//! AES-128 in CFB-8 mode, keyed with the 16-byte shared secret negotiated
//! during login. The secret is both key and IV. Each direction keeps its own
//! cipher state for the lifetime of the connection, so bytes must be fed
//! through exactly once and in wire order.
//!
//! Before [`EncryptionLayer::enable_encryption`] is called the layer passes
//! data through untouched.

use crate::error::{constants, ProtocolError, Result};
use aes::cipher::inout::InOutBuf;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tracing::debug;

type Aes128Cfb8Enc = cfb8::Encryptor<aes::Aes128>;
type Aes128Cfb8Dec = cfb8::Decryptor<aes::Aes128>;

/// Length of the shared secret in bytes.
pub const SHARED_SECRET_LEN: usize = 16;

/// Generates a fresh shared secret from the OS random source.
pub fn generate_shared_secret() -> Result<[u8; SHARED_SECRET_LEN]> {
    let mut secret = [0u8; SHARED_SECRET_LEN];
    getrandom::fill(&mut secret).map_err(|e| {
        ProtocolError::EncryptionFailure(format!("{}: {e}", constants::ERR_SECRET_GENERATION))
    })?;
    Ok(secret)
}

/// Optional CFB-8 cipher for both stream directions.
#[derive(Default)]
pub struct EncryptionLayer {
    encryptor: Option<Aes128Cfb8Enc>,
    decryptor: Option<Aes128Cfb8Dec>,
}

impl std::fmt::Debug for EncryptionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionLayer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl EncryptionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.encryptor.is_some()
    }

    /// Installs the shared secret. Everything processed afterwards is
    /// encrypted or decrypted.
    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<()> {
        if secret.len() != SHARED_SECRET_LEN {
            return Err(ProtocolError::EncryptionFailure(
                constants::ERR_INVALID_SECRET.to_string(),
            ));
        }

        let encryptor = Aes128Cfb8Enc::new_from_slices(secret, secret)
            .map_err(|e| ProtocolError::EncryptionFailure(e.to_string()))?;
        let decryptor = Aes128Cfb8Dec::new_from_slices(secret, secret)
            .map_err(|e| ProtocolError::DecryptionFailure(e.to_string()))?;

        self.encryptor = Some(encryptor);
        self.decryptor = Some(decryptor);
        debug!("Stream encryption enabled");
        Ok(())
    }

    /// Encrypts `data` in place. No-op while disabled.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        if let Some(cipher) = self.encryptor.as_mut() {
            let (blocks, _) = InOutBuf::from(data).into_chunks();
            cipher.encrypt_blocks_inout_mut(blocks);
        }
    }

    /// Decrypts `data` in place. No-op while disabled.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        if let Some(cipher) = self.decryptor.as_mut() {
            let (blocks, _) = InOutBuf::from(data).into_chunks();
            cipher.decrypt_blocks_inout_mut(blocks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn test_passthrough_before_enable() {
        let mut layer = EncryptionLayer::new();
        let mut data = *b"plain";
        layer.encrypt(&mut data);
        layer.decrypt(&mut data);
        assert_eq!(&data, b"plain");
    }

    #[test]
    fn test_roundtrip_across_calls() {
        let mut sender = EncryptionLayer::new();
        let mut receiver = EncryptionLayer::new();
        sender.enable_encryption(&SECRET).unwrap();
        receiver.enable_encryption(&SECRET).unwrap();

        let original: Vec<u8> = (0..=255).collect();
        let mut wire = original.clone();
        sender.encrypt(&mut wire[..100]);
        sender.encrypt(&mut wire[100..]);
        assert_ne!(wire, original);

        // Decrypt with different chunk boundaries than were used to encrypt.
        for chunk in wire.chunks_mut(7) {
            receiver.decrypt(chunk);
        }
        assert_eq!(wire, original);
    }

    #[test]
    fn test_stream_state_carries_over() {
        let mut layer = EncryptionLayer::new();
        layer.enable_encryption(&SECRET).unwrap();
        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        layer.encrypt(&mut first);
        layer.encrypt(&mut second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_secret_length() {
        let mut layer = EncryptionLayer::new();
        assert!(layer.enable_encryption(&[1, 2, 3]).is_err());
        assert!(!layer.is_enabled());
    }

    #[test]
    fn test_generated_secrets_differ() {
        let a = generate_shared_secret().unwrap();
        let b = generate_shared_secret().unwrap();
        assert_ne!(a, b);
    }
}
