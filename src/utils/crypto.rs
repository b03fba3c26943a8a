use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

pub const KEY_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid key length: expected {KEY_LENGTH} bytes")]
    InvalidKeyLength,
    #[error("invalid ciphertext")]
    InvalidCiphertext,
}

/// AES-256-GCM cipher for connection configurations at rest. Ciphertext
/// layout is `base64(nonce || sealed)`; a fresh random nonce per call.
#[derive(Clone)]
pub struct ConfigCipher {
    key: [u8; KEY_LENGTH],
}

impl ConfigCipher {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Builds a cipher from a base64-encoded 32-byte master key, as stored in
    /// `DATASOURCE_MASTER_KEY`.
    pub fn from_encoded_key(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| CryptoError::InvalidKeyLength)?;
        let key: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength)?;
        Ok(Self::new(key))
    }

    pub fn generate_key() -> [u8; KEY_LENGTH] {
        let rng = SystemRandom::new();
        let mut key = [0u8; KEY_LENGTH];
        rng.fill(&mut key).expect("system RNG failure");
        key
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let unbound =
            UnboundKey::new(&AES_256_GCM, &self.key).map_err(|_| CryptoError::EncryptionFailed)?;
        let sealing_key = LessSafeKey::new(unbound);
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(BASE64.encode(&sealed))
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let data = BASE64
            .decode(ciphertext)
            .map_err(|_| CryptoError::InvalidCiphertext)?;
        if data.len() < NONCE_LEN + 1 {
            return Err(CryptoError::InvalidCiphertext);
        }

        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let nonce_array: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidCiphertext)?;

        let unbound =
            UnboundKey::new(&AES_256_GCM, &self.key).map_err(|_| CryptoError::DecryptionFailed)?;
        let opening_key = LessSafeKey::new(unbound);
        let nonce = Nonce::assume_unique_for_key(nonce_array);

        let mut in_out = sealed.to_vec();
        let plaintext = opening_key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let cipher = ConfigCipher::new(ConfigCipher::generate_key());
        let plaintext: &[u8] = br#"{"host":"db.internal","password":"s3cret"}"#;

        let sealed = cipher.encrypt(plaintext).unwrap();
        assert_ne!(sealed.as_bytes(), plaintext);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn nonce_makes_ciphertext_unique() {
        let cipher = ConfigCipher::new(ConfigCipher::generate_key());
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let cipher = ConfigCipher::new(ConfigCipher::generate_key());
        let other = ConfigCipher::new(ConfigCipher::generate_key());
        let sealed = cipher.encrypt(b"payload").unwrap();
        assert!(matches!(
            other.decrypt(&sealed),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let cipher = ConfigCipher::new(ConfigCipher::generate_key());
        assert!(matches!(
            cipher.decrypt("%%% not base64 %%%"),
            Err(CryptoError::InvalidCiphertext)
        ));
        assert!(matches!(
            cipher.decrypt(&BASE64.encode(b"short")),
            Err(CryptoError::InvalidCiphertext)
        ));
    }
}
