//! Golden test vectors for deterministic verification.
//!
//! These pin the canonical signing messages and the resulting Ed25519
//! signatures for headers and update tokens, plus the PBKDF2 key hash.
//! Any change to field order, framing or domain labels shows up here first.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use smab_core::{AllowList, ContentHash, FileId, KeyHash, Keypair, Salt};
use smab_format::{SmabHeader, HEADER_VERSION};
use smab_perms::{TokenNonce, UpdateTokenPayload};

/// A golden header vector.
#[derive(Debug, Clone)]
pub struct HeaderVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    /// File id as a big-endian integer.
    pub file_id: u128,
    pub salt: [u8; 32],
    pub password: &'static [u8],
    pub iterations: u32,
    /// Allow-list at creation time.
    pub sealed: &'static [&'static str],
    /// Live allow-list the header is signed for.
    pub allowed: &'static [&'static str],
    /// Expected owner public key (hex).
    pub expected_public_key: &'static str,
    /// Expected PBKDF2 key hash (hex).
    pub expected_key_hash: &'static str,
    /// Expected header signature (hex).
    pub expected_signature: &'static str,
}

/// A golden update-token vector.
#[derive(Debug, Clone)]
pub struct TokenVector {
    pub name: &'static str,
    pub seed: [u8; 32],
    pub file_id: u128,
    pub add: &'static [&'static str],
    pub remove: &'static [&'static str],
    pub expires_at: i64,
    pub nonce: [u8; 16],
    /// Expected canonical signing message (hex).
    pub expected_message: &'static str,
    /// Expected token signature (hex).
    pub expected_signature: &'static str,
}

/// Get all golden header vectors.
pub fn header_vectors() -> Vec<HeaderVector> {
    vec![
        HeaderVector {
            name: "empty allow-list",
            seed: [0x42; 32],
            file_id: 0x00000000_0000_4000_8000_000000000001,
            salt: [0x11; 32],
            password: b"hunter2",
            iterations: 1000,
            sealed: &[],
            allowed: &[],
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_key_hash: "0d47cd8dba88a634772fad5a40df80ea41e4e5b9351f3634f9b8f249bbfa9641",
            expected_signature: "05250b1e0b8f72837157d5c042ed376d35a07d223639c05d204176809616c67b678f68ede691fb93342f4176e8157088faa90042ca5108f7495e08af7f802608",
        },
        HeaderVector {
            name: "sealed and live lists differ",
            seed: [0x42; 32],
            file_id: 0x6f1c2d3e_4b5a_4978_8a9b_0c1d2e3f4a5b,
            salt: [
                0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22,
                23, 24, 25, 26, 27, 28, 29, 30, 31,
            ],
            password: b"correct horse",
            iterations: 1000,
            sealed: &["aa11", "bb22"],
            allowed: &["abc123", "bb22"],
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_key_hash: "67d13ea64761843ed78a407d66d0af0ddb745f3071ee473708fc89250a64d26e",
            expected_signature: "0f28b8f946a55b2630e4767d5fd98c20ad4941da6ca20409d1d86e56aeaedaa41469ce2921f7bcc2289e2e6c5c232b5abd0afa7968a617262a9455b798d57604",
        },
        HeaderVector {
            name: "zero seed, empty password",
            seed: [0x00; 32],
            file_id: 0xffffffff_ffff_4fff_bfff_ffffffffffff,
            salt: [0x00; 32],
            password: b"",
            iterations: 1,
            sealed: &["x"],
            allowed: &[],
            expected_public_key: "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_key_hash: "4bf0fe3a26d6c15881a7058acac711a7d90c40ac741b8e792163cee1f43983bf",
            expected_signature: "a22cdb3b19e87f2f54dda716fbff376b493bc202e4d877f76cb788c569d9ca3120d52f3180ff40766a542adac7457415c01df35b72c4a8373e4ad5310e8c320c",
        },
    ]
}

/// Get all golden token vectors.
pub fn token_vectors() -> Vec<TokenVector> {
    vec![
        TokenVector {
            name: "grant one hash",
            seed: [0x42; 32],
            file_id: 0x6f1c2d3e_4b5a_4978_8a9b_0c1d2e3f4a5b,
            add: &["abc123"],
            remove: &[],
            expires_at: 1_700_000_000_000,
            nonce: [0x07; 16],
            expected_message: "736d61622f7570646174652d746f6b656e2f76316f1c2d3e4b5a49788a9b0c1d2e3f4a5b0000000100000006616263313233000000000000018bcfe5680007070707070707070707070707070707",
            expected_signature: "484e8aa23080b4fed6014fb690026ac2e795c7190d77fa719c58eb3c3c38eebf46e6b4937845cfd7b4c8bb8152b4f5fcd619d186c594ded8dd7fcf17ed637f0c",
        },
        TokenVector {
            name: "grant and revoke",
            seed: [0x42; 32],
            file_id: 0x6f1c2d3e_4b5a_4978_8a9b_0c1d2e3f4a5b,
            // Given unsorted; the signed form is sorted.
            add: &["cc33", "aa11"],
            remove: &["bb22"],
            expires_at: 1_700_604_800_000,
            nonce: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
            expected_message: "736d61622f7570646174652d746f6b656e2f76316f1c2d3e4b5a49788a9b0c1d2e3f4a5b00000002000000046161313100000004636333330000000100000004626232320000018bf3f1ec00000102030405060708090a0b0c0d0e0f",
            expected_signature: "c6827f9c5c5242c0e7f0381379ea420f7b4dbe8115df316874df0b018473046b22c21887363d9b3614ffcef736e664339f5c70a03990464b9518eccb62ab1b02",
        },
        TokenVector {
            name: "empty delta",
            seed: [0x00; 32],
            file_id: 0x00000000_0000_4000_8000_000000000001,
            add: &[],
            remove: &[],
            expires_at: 0,
            nonce: [0x00; 16],
            expected_message: "736d61622f7570646174652d746f6b656e2f7631000000000000400080000000000000010000000000000000000000000000000000000000000000000000000000000000",
            expected_signature: "d72179bf929abe3d727941e434ffa52cf464d75101dcad279253d361c1b3fa32ab831249bf27dc9be94428bd10c3fb46b422d7853b6a201af613e872500a0107",
        },
    ]
}

fn hashes(items: &[&str]) -> smab_core::Result<Vec<ContentHash>> {
    items.iter().map(|s| ContentHash::new(*s)).collect()
}

/// Build the signed header a vector describes.
///
/// The header goes through its JSON form unsigned, then the owner signs the
/// successor carrying the vector's live allow-list.
pub fn header_from_vector(vector: &HeaderVector) -> smab_format::Result<SmabHeader> {
    let keypair = Keypair::from_seed(&vector.seed);
    let salt = Salt(vector.salt);
    let key_hash = KeyHash::derive(vector.password, &salt, vector.iterations)?;

    let unsigned = serde_json::json!({
        "version": HEADER_VERSION,
        "id": FileId::from_bytes(vector.file_id.to_be_bytes()).to_string(),
        "salt": BASE64.encode(salt.as_bytes()),
        "keyHash": BASE64.encode(key_hash.0),
        "ownerPublicKey": BASE64.encode(keypair.public_key().to_spki_der()?),
        "allowedHashes": vector.sealed,
        "sealedHashes": vector.sealed,
        "signature": null,
    });

    let allowed: AllowList = hashes(vector.allowed)?.into_iter().collect();
    let header = SmabHeader::from_json(unsigned.to_string().as_bytes())?;
    let signature = keypair.sign(&header.signing_message_for(&allowed));
    header.with_allowed_hashes(allowed, signature)
}

/// Build the token payload a vector describes.
pub fn token_payload_from_vector(vector: &TokenVector) -> smab_core::Result<UpdateTokenPayload> {
    Ok(UpdateTokenPayload {
        file_id: FileId::from_bytes(vector.file_id.to_be_bytes()),
        add: hashes(vector.add)?.into_iter().collect(),
        remove: hashes(vector.remove)?.into_iter().collect(),
        expires_at: vector.expires_at,
        nonce: TokenNonce(vector.nonce),
    })
}

/// Check every vector. Returns `(name, matches, actual signature hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let headers = header_vectors().into_iter().map(|v| {
        let actual = header_from_vector(&v)
            .ok()
            .and_then(|h| h.signature().map(|s| s.to_hex()))
            .unwrap_or_default();
        let matches = actual == v.expected_signature;
        (v.name.to_string(), matches, actual)
    });

    let tokens = token_vectors().into_iter().map(|v| {
        let actual = token_payload_from_vector(&v)
            .map(|p| Keypair::from_seed(&v.seed).sign(&p.signing_message()).to_hex())
            .unwrap_or_default();
        let matches = actual == v.expected_signature;
        (v.name.to_string(), matches, actual)
    });

    headers.chain(tokens).collect()
}
