//! Authenticated encryption for the container payload.
//!
//! ChaCha20-Poly1305 with a fresh random 96-bit nonce per call and a
//! detached 128-bit tag, so the container can store nonce, tag and
//! ciphertext as separate fields.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Nonce, Tag,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};
use crate::kdf::FileSecret;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A 96-bit AEAD nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeadNonce(pub [u8; NONCE_LEN]);

impl AeadNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// A 128-bit Poly1305 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTag(pub [u8; TAG_LEN]);

impl AuthTag {
    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

/// Output of [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Encrypted bytes, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Nonce used for this encryption only.
    pub nonce: AeadNonce,
    /// Tag over ciphertext and associated data.
    pub tag: AuthTag,
}

/// Encrypt `plaintext` under `key`, binding `associated_data` into the tag.
///
/// The associated data is authenticated but not included in the output.
pub fn seal(plaintext: &[u8], key: &FileSecret, associated_data: Option<&[u8]>) -> Result<Sealed> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let nonce = AeadNonce::generate();

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(
            Nonce::from_slice(nonce.as_bytes()),
            associated_data.unwrap_or_default(),
            &mut buffer,
        )
        .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

    Ok(Sealed {
        ciphertext: buffer,
        nonce,
        tag: AuthTag(tag.into()),
    })
}

/// Decrypt and authenticate.
///
/// Fails closed with [`CoreError::AuthenticationFailure`]; no plaintext is
/// returned unless the tag verifies.
pub fn open(
    ciphertext: &[u8],
    nonce: &AeadNonce,
    tag: &AuthTag,
    key: &FileSecret,
    associated_data: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce.as_bytes()),
            associated_data.unwrap_or_default(),
            &mut buffer,
            Tag::from_slice(tag.as_bytes()),
        )
        .map_err(|_| CoreError::AuthenticationFailure)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(b: u8) -> FileSecret {
        FileSecret::from_bytes([b; 32])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = seal(b"payload bytes", &key(1), Some(b"a,b".as_slice())).unwrap();
        assert_ne!(sealed.ciphertext, b"payload bytes");
        assert_eq!(sealed.ciphertext.len(), 13);

        let plain = open(&sealed.ciphertext, &sealed.nonce, &sealed.tag, &key(1), Some(b"a,b".as_slice())).unwrap();
        assert_eq!(&plain[..], b"payload bytes");
    }

    #[test]
    fn test_fresh_nonce_each_call() {
        let a = seal(b"same", &key(1), None).unwrap();
        let b = seal(b"same", &key(1), None).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal(b"secret", &key(1), None).unwrap();
        assert!(matches!(
            open(&sealed.ciphertext, &sealed.nonce, &sealed.tag, &key(2), None),
            Err(CoreError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_aad_mismatch_fails() {
        let sealed = seal(b"secret", &key(1), Some(b"h1,h2".as_slice())).unwrap();
        assert!(open(&sealed.ciphertext, &sealed.nonce, &sealed.tag, &key(1), Some(b"h1".as_slice())).is_err());
        assert!(open(&sealed.ciphertext, &sealed.nonce, &sealed.tag, &key(1), None).is_err());
    }

    #[test]
    fn test_absent_aad_equals_empty_aad() {
        let sealed = seal(b"x", &key(1), None).unwrap();
        assert!(open(&sealed.ciphertext, &sealed.nonce, &sealed.tag, &key(1), Some(b"".as_slice())).is_ok());
    }

    #[test]
    fn test_tamper_tag_and_nonce() {
        let sealed = seal(b"secret", &key(1), None).unwrap();

        let mut tag = sealed.tag;
        tag.0[0] ^= 0x01;
        assert!(open(&sealed.ciphertext, &sealed.nonce, &tag, &key(1), None).is_err());

        let mut nonce = sealed.nonce;
        nonce.0[11] ^= 0x80;
        assert!(open(&sealed.ciphertext, &nonce, &sealed.tag, &key(1), None).is_err());
    }

    #[test]
    fn test_empty_plaintext() {
        let sealed = seal(b"", &key(5), Some(b"ctx".as_slice())).unwrap();
        assert!(sealed.ciphertext.is_empty());
        let plain = open(&sealed.ciphertext, &sealed.nonce, &sealed.tag, &key(5), Some(b"ctx".as_slice())).unwrap();
        assert!(plain.is_empty());
    }

    proptest! {
        #[test]
        fn single_bit_flip_fails_closed(
            plaintext in proptest::collection::vec(any::<u8>(), 1..256),
            ad in proptest::collection::vec(any::<u8>(), 0..32),
            target in 0usize..3,
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = FileSecret::from_bytes([9; 32]);
            let sealed = seal(&plaintext, &key, Some(ad.as_slice())).unwrap();

            let mut ciphertext = sealed.ciphertext.clone();
            let mut tag = sealed.tag;
            let mut ad = ad;
            match target {
                0 => {
                    let i = index.index(ciphertext.len());
                    ciphertext[i] ^= 1 << bit;
                }
                1 => tag.0[index.index(TAG_LEN)] ^= 1 << bit,
                _ => ad.push(bit),
            }

            let result = open(&ciphertext, &sealed.nonce, &tag, &key, Some(ad.as_slice()));
            prop_assert!(matches!(result, Err(CoreError::AuthenticationFailure)));
        }
    }
}
