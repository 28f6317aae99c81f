//! The outer binary frame of a SMAB file.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "SMAB"
//! 4       1     container version
//! 5       4     header length (u32 LE)
//! 9       n     header JSON
//! 9+n     12    AEAD nonce
//! 21+n    16    AEAD tag
//! 37+n    4     ciphertext length (u32 LE)
//! 41+n    m     ciphertext
//! ```
//!
//! Nothing may follow the ciphertext. Length prefixes are bounded before any
//! allocation happens.

use smab_core::{AeadNonce, AuthTag, Sealed, NONCE_LEN, TAG_LEN};

use crate::error::{FormatError, Result};
use crate::header::SmabHeader;

/// Leading magic bytes.
pub const MAGIC: [u8; 4] = *b"SMAB";

/// Current container frame version.
pub const CONTAINER_VERSION: u8 = 1;

/// Default bound on a single length-prefixed section (64 MiB).
pub const DEFAULT_MAX_SECTION_LEN: usize = 64 * 1024 * 1024;

/// A parsed SMAB file: header plus the sealed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    header: SmabHeader,
    nonce: AeadNonce,
    tag: AuthTag,
    ciphertext: Vec<u8>,
}

impl Container {
    /// Frame a header with sealed payload bytes.
    pub fn new(header: SmabHeader, sealed: Sealed) -> Self {
        Self {
            header,
            nonce: sealed.nonce,
            tag: sealed.tag,
            ciphertext: sealed.ciphertext,
        }
    }

    /// The header, as parsed. Its signature is not checked here.
    pub fn header(&self) -> &SmabHeader {
        &self.header
    }

    /// AEAD nonce.
    pub fn nonce(&self) -> &AeadNonce {
        &self.nonce
    }

    /// AEAD tag.
    pub fn tag(&self) -> &AuthTag {
        &self.tag
    }

    /// Encrypted payload.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Replace the header, keeping the sealed payload byte-for-byte.
    ///
    /// The new header must describe the same sealed file: same id, salt,
    /// key hash, owner and sealed allow-list.
    pub fn with_header(&self, header: SmabHeader) -> Result<Self> {
        let current = &self.header;
        if header.id() != current.id() {
            return Err(FormatError::HeaderMismatch("file id"));
        }
        if header.salt() != current.salt() {
            return Err(FormatError::HeaderMismatch("salt"));
        }
        if header.key_hash() != current.key_hash() {
            return Err(FormatError::HeaderMismatch("key hash"));
        }
        if header.owner() != current.owner() {
            return Err(FormatError::HeaderMismatch("owner public key"));
        }
        if header.sealed_hashes() != current.sealed_hashes() {
            return Err(FormatError::HeaderMismatch("sealed hashes"));
        }

        Ok(Self {
            header,
            nonce: self.nonce,
            tag: self.tag,
            ciphertext: self.ciphertext.clone(),
        })
    }

    /// Serialize to the on-disk byte layout.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = self.header.to_json()?;
        let header_len = section_len("header", header.len())?;
        let ciphertext_len = section_len("ciphertext", self.ciphertext.len())?;

        let mut out = Vec::with_capacity(
            MAGIC.len() + 1 + 4 + header.len() + NONCE_LEN + TAG_LEN + 4 + self.ciphertext.len(),
        );
        out.extend_from_slice(&MAGIC);
        out.push(CONTAINER_VERSION);
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(self.tag.as_bytes());
        out.extend_from_slice(&ciphertext_len.to_le_bytes());
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Parse with the default section bound.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with_limit(bytes, DEFAULT_MAX_SECTION_LEN)
    }

    /// Parse, rejecting any section longer than `max_section_len`.
    pub fn decode_with_limit(bytes: &[u8], max_section_len: usize) -> Result<Self> {
        let mut r = Reader::new(bytes);

        let magic = r.array::<4>("magic")?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let version = r.array::<1>("version")?[0];
        if version != CONTAINER_VERSION {
            return Err(FormatError::UnsupportedVersion {
                what: "container",
                found: version,
                supported: CONTAINER_VERSION,
            });
        }

        let header_bytes = r.section("header", max_section_len)?;
        let header = SmabHeader::from_json(header_bytes)?;
        let nonce = AeadNonce(r.array::<NONCE_LEN>("nonce")?);
        let tag = AuthTag(r.array::<TAG_LEN>("tag")?);
        let ciphertext = r.section("ciphertext", max_section_len)?.to_vec();

        if r.remaining() != 0 {
            return Err(FormatError::Malformed(format!(
                "{} trailing bytes after ciphertext",
                r.remaining()
            )));
        }

        Ok(Self {
            header,
            nonce,
            tag,
            ciphertext,
        })
    }
}

fn section_len(what: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| FormatError::TooLarge {
        what,
        len,
        max: u32::MAX as usize,
    })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(FormatError::Truncated(what));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    /// A u32 LE length prefix followed by that many bytes.
    fn section(&mut self, what: &'static str, max: usize) -> Result<&'a [u8]> {
        let len = u32::from_le_bytes(self.array::<4>(what)?) as usize;
        if len > max {
            return Err(FormatError::TooLarge { what, len, max });
        }
        self.take(len, what)
    }
}
