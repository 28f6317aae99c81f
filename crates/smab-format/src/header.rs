//! The signed file header and its JSON wire encoding.
//!
//! ```json
//! {
//!   "version": 1,
//!   "id": "6f1c2d3e-....",
//!   "salt": "<base64>",
//!   "keyHash": "<base64>",
//!   "ownerPublicKey": "<base64 SubjectPublicKeyInfo DER>",
//!   "allowedHashes": ["..."],
//!   "sealedHashes": ["..."],
//!   "signature": "<base64>" | null
//! }
//! ```
//!
//! `sealedHashes` is the allow-list at encryption time and is what the
//! payload's associated data was built from. It never changes.
//! `allowedHashes` is the live allow-list and is the one to consult for
//! permission decisions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};

use smab_core::{
    AllowList, CanonicalWriter, ContentHash, CoreError, FileId, KeyHash, Keypair, OwnerPublicKey,
    OwnerSignature, Salt,
};

use crate::error::{FormatError, Result};

/// Current header format version.
pub const HEADER_VERSION: u8 = 1;

/// Domain label for header signatures.
pub const HEADER_SIGN_DOMAIN: &[u8] = b"smab/header-sig/v1";

/// Authenticated metadata preceding the ciphertext.
///
/// Fields are private: a header is created signed and can only be replaced
/// by a successor whose owner signature verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmabHeader {
    version: u8,
    id: FileId,
    salt: Salt,
    key_hash: KeyHash,
    owner: OwnerPublicKey,
    allowed_hashes: AllowList,
    sealed_hashes: AllowList,
    signature: Option<OwnerSignature>,
}

impl SmabHeader {
    /// Create and sign the header for a new file.
    ///
    /// The initial allow-list is also recorded as the sealed list.
    pub fn create(owner: &Keypair, salt: Salt, key_hash: KeyHash, allowed: AllowList) -> Self {
        let mut header = Self {
            version: HEADER_VERSION,
            id: FileId::generate(),
            salt,
            key_hash,
            owner: owner.public_key(),
            sealed_hashes: allowed.clone(),
            allowed_hashes: allowed,
            signature: None,
        };
        header.signature = Some(owner.sign(&header.signing_message()));
        header
    }

    /// Format version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Unique file id.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Salt for both password derivations.
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Stored key-verification hash.
    pub fn key_hash(&self) -> &KeyHash {
        &self.key_hash
    }

    /// Owner public key.
    pub fn owner(&self) -> &OwnerPublicKey {
        &self.owner
    }

    /// The live allow-list.
    pub fn allowed_hashes(&self) -> &AllowList {
        &self.allowed_hashes
    }

    /// The allow-list frozen at encryption time.
    pub fn sealed_hashes(&self) -> &AllowList {
        &self.sealed_hashes
    }

    /// Owner signature, if present.
    pub fn signature(&self) -> Option<&OwnerSignature> {
        self.signature.as_ref()
    }

    /// AEAD associated data for the payload of this file.
    pub fn associated_data(&self) -> Vec<u8> {
        self.sealed_hashes.to_associated_data()
    }

    /// The canonical message this header's signature covers.
    pub fn signing_message(&self) -> Vec<u8> {
        self.signing_message_for(&self.allowed_hashes)
    }

    /// The message a successor of this header with `allowed` as its live
    /// allow-list would have to be signed over.
    ///
    /// Layout: domain | version | id | salt | key hash | owner key |
    /// sealed hashes | allowed hashes.
    pub fn signing_message_for(&self, allowed: &AllowList) -> Vec<u8> {
        CanonicalWriter::new(HEADER_SIGN_DOMAIN)
            .u8(self.version)
            .fixed(self.id.as_bytes())
            .bytes(self.salt.as_bytes())
            .bytes(self.key_hash.as_bytes())
            .bytes(self.owner.as_bytes())
            .strs(self.sealed_hashes.iter().map(ContentHash::as_str))
            .strs(allowed.iter().map(ContentHash::as_str))
            .finish()
    }

    /// Verify the owner signature. An unsigned header never verifies.
    pub fn verify(&self) -> std::result::Result<(), CoreError> {
        let signature = self.signature.as_ref().ok_or(CoreError::InvalidSignature)?;
        self.owner.verify(&self.signing_message(), signature)
    }

    /// Build the successor header carrying `allowed` and a signature the
    /// owner produced over [`signing_message_for`](Self::signing_message_for).
    ///
    /// Fails unless the signature verifies; `self` is left untouched.
    pub fn with_allowed_hashes(&self, allowed: AllowList, signature: OwnerSignature) -> Result<Self> {
        let next = Self {
            allowed_hashes: allowed,
            signature: Some(signature),
            ..self.clone()
        };
        next.verify()?;
        Ok(next)
    }

    /// Re-sign with the owner keypair for a new allow-list.
    ///
    /// `self` must verify first, so an edited header is never re-signed.
    pub fn amend(&self, owner: &Keypair, allowed: AllowList) -> Result<Self> {
        if owner.public_key() != self.owner {
            return Err(FormatError::HeaderMismatch("keypair does not own this header"));
        }
        self.verify()?;
        let signature = owner.sign(&self.signing_message_for(&allowed));
        self.with_allowed_hashes(allowed, signature)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let wire = HeaderWire {
            version: self.version,
            id: self.id.to_string(),
            salt: BASE64.encode(self.salt.as_bytes()),
            key_hash: BASE64.encode(self.key_hash.as_bytes()),
            owner_public_key: BASE64.encode(self.owner.to_spki_der()?),
            allowed_hashes: self.allowed_hashes.iter().map(ContentHash::as_str).collect(),
            sealed_hashes: self.sealed_hashes.iter().map(ContentHash::as_str).collect(),
            signature: self.signature.map(|s| BASE64.encode(s.as_bytes())),
        };
        serde_json::to_vec(&wire).map_err(|e| FormatError::Malformed(e.to_string()))
    }

    /// Decode from JSON, naming the offending field on failure.
    ///
    /// This does not verify the signature; call [`verify`](Self::verify).
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| FormatError::Malformed(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| FormatError::Malformed("header is not a JSON object".into()))?;

        let version = required(obj, "version")?
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| invalid("version", "expected an integer in 0..=255"))?;
        if version != HEADER_VERSION {
            return Err(FormatError::UnsupportedVersion {
                what: "header",
                found: version,
                supported: HEADER_VERSION,
            });
        }

        let id = required_str(obj, "id")?
            .parse::<FileId>()
            .map_err(|e| invalid("id", e))?;
        let salt = Salt::from_slice(&required_b64(obj, "salt")?).map_err(|e| invalid("salt", e))?;
        let key_hash =
            KeyHash::from_slice(&required_b64(obj, "keyHash")?).map_err(|e| invalid("keyHash", e))?;
        let owner = OwnerPublicKey::from_spki_der(&required_b64(obj, "ownerPublicKey")?)
            .map_err(|e| invalid("ownerPublicKey", e))?;
        let allowed_hashes = required_hashes(obj, "allowedHashes")?;
        let sealed_hashes = required_hashes(obj, "sealedHashes")?;

        let signature = match obj.get("signature") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                OwnerSignature::from_slice(&decode_b64("signature", s)?)
                    .map_err(|e| invalid("signature", e))?,
            ),
            Some(_) => return Err(invalid("signature", "expected a base64 string or null")),
        };

        Ok(Self {
            version,
            id,
            salt,
            key_hash,
            owner,
            allowed_hashes,
            sealed_hashes,
            signature,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeaderWire<'a> {
    version: u8,
    id: String,
    salt: String,
    key_hash: String,
    owner_public_key: String,
    allowed_hashes: Vec<&'a str>,
    sealed_hashes: Vec<&'a str>,
    signature: Option<String>,
}

fn invalid(field: &'static str, reason: impl ToString) -> FormatError {
    FormatError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(FormatError::MissingField(field)),
        Some(v) => Ok(v),
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    required(obj, field)?
        .as_str()
        .ok_or_else(|| invalid(field, "expected a string"))
}

fn required_b64(obj: &Map<String, Value>, field: &'static str) -> Result<Vec<u8>> {
    decode_b64(field, required_str(obj, field)?)
}

fn decode_b64(field: &'static str, text: &str) -> Result<Vec<u8>> {
    BASE64.decode(text).map_err(|e| invalid(field, e))
}

fn required_hashes(obj: &Map<String, Value>, field: &'static str) -> Result<AllowList> {
    let items = required(obj, field)?
        .as_array()
        .ok_or_else(|| invalid(field, "expected an array of strings"))?;

    items
        .iter()
        .map(|item| {
            let text = item
                .as_str()
                .ok_or_else(|| invalid(field, "expected an array of strings"))?;
            ContentHash::new(text).map_err(|e| invalid(field, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> ContentHash {
        ContentHash::new(s).unwrap()
    }

    fn sample(owner: &Keypair) -> SmabHeader {
        let allowed: AllowList = vec![h("aa11"), h("bb22")].into_iter().collect();
        SmabHeader::create(owner, Salt([5u8; 32]), KeyHash([6u8; 32]), allowed)
    }

    fn json_object(header: &SmabHeader) -> Map<String, Value> {
        let bytes = header.to_json().unwrap();
        match serde_json::from_slice::<Value>(&bytes).unwrap() {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn decode(obj: Map<String, Value>) -> Result<SmabHeader> {
        SmabHeader::from_json(&serde_json::to_vec(&Value::Object(obj)).unwrap())
    }

    #[test]
    fn test_created_header_verifies() {
        let owner = Keypair::generate();
        let header = sample(&owner);

        assert_eq!(header.version(), HEADER_VERSION);
        assert_eq!(header.allowed_hashes(), header.sealed_hashes());
        header.verify().unwrap();
    }

    #[test]
    fn test_json_roundtrip() {
        let header = sample(&Keypair::generate());
        let decoded = SmabHeader::from_json(&header.to_json().unwrap()).unwrap();

        assert_eq!(decoded, header);
        decoded.verify().unwrap();
    }

    #[test]
    fn test_json_field_names() {
        let obj = json_object(&sample(&Keypair::generate()));
        for key in [
            "version",
            "id",
            "salt",
            "keyHash",
            "ownerPublicKey",
            "allowedHashes",
            "sealedHashes",
            "signature",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj["id"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_missing_field_is_named() {
        for field in ["version", "id", "salt", "keyHash", "ownerPublicKey", "allowedHashes", "sealedHashes"] {
            let mut obj = json_object(&sample(&Keypair::generate()));
            obj.remove(field);
            match decode(obj) {
                Err(FormatError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected MissingField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_bad_base64_is_named() {
        for field in ["salt", "keyHash", "ownerPublicKey", "signature"] {
            let mut obj = json_object(&sample(&Keypair::generate()));
            obj.insert(field.to_string(), Value::String("not*base64!".into()));
            match decode(obj) {
                Err(FormatError::InvalidField { field: name, .. }) => assert_eq!(name, field),
                other => panic!("expected InvalidField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_wrong_salt_length_is_invalid() {
        let mut obj = json_object(&sample(&Keypair::generate()));
        obj.insert("salt".into(), Value::String(BASE64.encode([1u8; 8])));
        assert!(matches!(
            decode(obj),
            Err(FormatError::InvalidField { field: "salt", .. })
        ));
    }

    #[test]
    fn test_null_signature_decodes_but_does_not_verify() {
        let mut obj = json_object(&sample(&Keypair::generate()));
        obj.insert("signature".into(), Value::Null);
        let header = decode(obj).unwrap();

        assert!(header.signature().is_none());
        assert_eq!(header.verify(), Err(CoreError::InvalidSignature));
    }

    #[test]
    fn test_unsupported_version() {
        let mut obj = json_object(&sample(&Keypair::generate()));
        obj.insert("version".into(), Value::from(2));
        assert!(matches!(
            decode(obj),
            Err(FormatError::UnsupportedVersion { found: 2, .. })
        ));

        let mut obj = json_object(&sample(&Keypair::generate()));
        obj.insert("version".into(), Value::from(300));
        assert!(matches!(
            decode(obj),
            Err(FormatError::InvalidField { field: "version", .. })
        ));
    }

    #[test]
    fn test_edited_allow_list_fails_verification() {
        let mut obj = json_object(&sample(&Keypair::generate()));
        obj.insert("allowedHashes".into(), serde_json::json!(["aa11", "bb22", "cc33"]));
        let header = decode(obj).unwrap();
        assert_eq!(header.verify(), Err(CoreError::InvalidSignature));
    }

    #[test]
    fn test_amend_resigns_and_keeps_identity() {
        let owner = Keypair::generate();
        let header = sample(&owner);
        let next_list: AllowList = vec![h("zz99")].into_iter().collect();

        let next = header.amend(&owner, next_list.clone()).unwrap();
        next.verify().unwrap();
        assert_eq!(next.id(), header.id());
        assert_eq!(next.sealed_hashes(), header.sealed_hashes());
        assert_eq!(next.allowed_hashes(), &next_list);
        assert_ne!(next.signature(), header.signature());
    }

    #[test]
    fn test_amend_refuses_unverified_header() {
        let owner = Keypair::generate();
        let header = sample(&owner);
        let mut json: serde_json::Value = serde_json::from_slice(&header.to_json().unwrap()).unwrap();
        json["allowedHashes"] = serde_json::json!(["evil"]);
        let edited = SmabHeader::from_json(&serde_json::to_vec(&json).unwrap()).unwrap();

        let next_list = edited.allowed_hashes().apply_delta(&[h("x")], std::iter::empty());
        assert!(matches!(
            edited.amend(&owner, next_list),
            Err(FormatError::Core(CoreError::InvalidSignature))
        ));

        json["signature"] = serde_json::Value::Null;
        let unsigned = SmabHeader::from_json(&serde_json::to_vec(&json).unwrap()).unwrap();
        assert!(unsigned.amend(&owner, AllowList::new()).is_err());
    }

    #[test]
    fn test_amend_by_stranger_rejected() {
        let header = sample(&Keypair::generate());
        let stranger = Keypair::generate();
        assert!(matches!(
            header.amend(&stranger, AllowList::new()),
            Err(FormatError::HeaderMismatch(_))
        ));
    }

    #[test]
    fn test_with_allowed_hashes_requires_matching_signature() {
        let owner = Keypair::generate();
        let header = sample(&owner);
        let list: AllowList = vec![h("new")].into_iter().collect();

        // Signature over the current list, not the proposed one.
        let wrong = owner.sign(&header.signing_message());
        assert!(header.with_allowed_hashes(list.clone(), wrong).is_err());

        let right = owner.sign(&header.signing_message_for(&list));
        assert!(header.with_allowed_hashes(list, right).is_ok());
    }

    #[test]
    fn test_signing_message_layout() {
        let header = sample(&Keypair::from_seed(&[1u8; 32]));
        let msg = header.signing_message();
        let d = HEADER_SIGN_DOMAIN.len();

        assert!(msg.starts_with(HEADER_SIGN_DOMAIN));
        assert_eq!(msg[d], HEADER_VERSION);
        assert_eq!(&msg[d + 1..d + 17], header.id().as_bytes());
        // salt: u32 length then 32 bytes
        assert_eq!(&msg[d + 17..d + 21], &[0, 0, 0, 32]);
        assert_eq!(&msg[d + 21..d + 53], header.salt().as_bytes());
    }
}
