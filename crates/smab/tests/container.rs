//! End-to-end container tests: create, open, tamper, persist.

use std::collections::BTreeSet;

use bytes::Bytes;
use proptest::prelude::*;
use smab::core::CoreError;
use smab::format::{FormatError, CONTAINER_VERSION};
use smab::{
    ActorBaseFileData, AllowList, ContentHash, FileModData, FileSwap, Keypair, Replacement, Smab,
    SmabConfig, SmabError,
};

const PASSWORD: &[u8] = b"correct horse battery staple";

fn config() -> SmabConfig {
    SmabConfig {
        kdf_iterations: 1_000,
        ..SmabConfig::default()
    }
}

fn smab() -> Smab {
    Smab::in_memory(config()).unwrap()
}

fn h(s: &str) -> ContentHash {
    ContentHash::new(s).unwrap()
}

fn paths(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn payload() -> ActorBaseFileData {
    ActorBaseFileData {
        description: "Summer outfit".into(),
        appearance: Bytes::from_static(b"{\"equip\":[1,2,3]}"),
        body_shape: Bytes::from_static(&[1, 2, 3, 4]),
        manipulation: Bytes::from_static(b"manip"),
        files: vec![FileModData {
            game_paths: paths(&["chara/equipment/e0100/texture/v01_c0101e0100_top_d.tex"]),
            length: 4096,
            hash: h("3f7a9c"),
        }],
        file_swaps: vec![FileSwap {
            game_paths: paths(&["chara/equipment/e0200/material/v0001/mt_c0101e0200_glv_a.mtrl"]),
            swap_path: "chara/equipment/e0201/material/v0001/mt_c0101e0201_glv_a.mtrl".into(),
        }],
    }
}

/// Byte offsets of the sections after the header.
struct Layout {
    nonce: usize,
    tag: usize,
    ciphertext: usize,
}

fn layout(bytes: &[u8]) -> Layout {
    let header_len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
    let nonce = 9 + header_len;
    Layout {
        nonce,
        tag: nonce + 12,
        ciphertext: nonce + 12 + 16 + 4,
    }
}

/// Re-frame a container with an edited header JSON.
fn with_edited_header(bytes: &[u8], edit: impl FnOnce(&mut serde_json::Value)) -> Vec<u8> {
    let header_len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
    let mut json: serde_json::Value = serde_json::from_slice(&bytes[9..9 + header_len]).unwrap();
    edit(&mut json);
    let header = serde_json::to_vec(&json).unwrap();

    let mut out = bytes[..5].to_vec();
    out.extend_from_slice(&(header.len() as u32).to_le_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&bytes[9 + header_len..]);
    out
}

#[test]
fn roundtrip_preserves_payload() {
    let smab = smab();
    let owner = Keypair::generate();
    let data = payload();

    let bytes = smab.create_container(PASSWORD, &owner, &data).unwrap();
    assert_eq!(&bytes[..4], b"SMAB");
    assert_eq!(bytes[4], CONTAINER_VERSION);

    let view = smab.open_container(&bytes, PASSWORD).unwrap();
    assert_eq!(view.description(), "Summer outfit");
    assert_eq!(view.appearance(), &data.appearance);
    assert_eq!(view.body_shape(), &data.body_shape);
    assert_eq!(view.manipulation(), &data.manipulation);
    assert_eq!(view.owner(), &owner.public_key());
    assert!(view.valid_hashes().is_empty());
    assert_eq!(
        view.replacement_for("chara/equipment/e0100/texture/v01_c0101e0100_top_d.tex"),
        Some(&Replacement::Modded { hash: h("3f7a9c"), length: 4096 })
    );
    assert!(matches!(
        view.replacement_for("chara/equipment/e0200/material/v0001/mt_c0101e0200_glv_a.mtrl"),
        Some(Replacement::Swap { .. })
    ));
}

#[test]
fn description_only_export() {
    let smab = smab();
    let bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &ActorBaseFileData::with_description("demo"))
        .unwrap();

    let view = smab.open_container(&bytes, PASSWORD).unwrap();
    assert_eq!(view.description(), "demo");
    assert!(view.replacements().is_empty());
}

#[test]
fn initial_allow_list_is_readable() {
    let smab = smab();
    let allowed: AllowList = [h("aa11"), h("bb22")].into_iter().collect();
    let bytes = smab
        .create_container_with(PASSWORD, &Keypair::generate(), &payload(), allowed)
        .unwrap();

    let view = smab.open_container(&bytes, PASSWORD).unwrap();
    assert!(view.is_hash_allowed(&h("aa11")));
    assert!(view.is_hash_allowed(&h("bb22")));
    assert!(!view.is_hash_allowed(&h("cc33")));
}

#[test]
fn wrong_password_is_password_mismatch() {
    let smab = smab();
    let bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();

    assert!(matches!(
        smab.open_container(&bytes, b"wrong"),
        Err(SmabError::PasswordMismatch)
    ));
}

#[test]
fn mismatched_iterations_look_like_wrong_password() {
    let bytes = smab()
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();
    let other = Smab::in_memory(SmabConfig {
        kdf_iterations: 1_001,
        ..SmabConfig::default()
    })
    .unwrap();

    assert!(matches!(
        other.open_container(&bytes, PASSWORD),
        Err(SmabError::PasswordMismatch)
    ));
}

#[test]
fn flipped_bits_fail_authentication() {
    let smab = smab();
    let bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();
    let at = layout(&bytes);

    for offset in [
        at.nonce,
        at.nonce + 11,
        at.tag,
        at.tag + 15,
        at.ciphertext,
        bytes.len() - 1,
    ] {
        let mut tampered = bytes.clone();
        tampered[offset] ^= 0x01;
        assert!(
            matches!(
                smab.open_container(&tampered, PASSWORD),
                Err(SmabError::Core(CoreError::AuthenticationFailure))
            ),
            "offset {offset} not detected"
        );
    }
}

#[test]
fn edited_sealed_list_fails_authentication() {
    let smab = smab();
    let allowed: AllowList = [h("aa11")].into_iter().collect();
    let bytes = smab
        .create_container_with(PASSWORD, &Keypair::generate(), &payload(), allowed)
        .unwrap();

    let tampered = with_edited_header(&bytes, |json| {
        json["sealedHashes"] = serde_json::json!(["aa12"]);
    });
    assert!(matches!(
        smab.open_container(&tampered, PASSWORD),
        Err(SmabError::Core(CoreError::AuthenticationFailure))
    ));
}

#[test]
fn edited_live_allow_list_fails_signature() {
    let smab = smab();
    let bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();

    let tampered = with_edited_header(&bytes, |json| {
        json["allowedHashes"] = serde_json::json!(["sneaky"]);
    });
    assert!(matches!(
        smab.open_container(&tampered, PASSWORD),
        Err(SmabError::Core(CoreError::InvalidSignature))
    ));
}

#[test]
fn missing_header_field_is_named() {
    let smab = smab();
    let bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();

    let tampered = with_edited_header(&bytes, |json| {
        json.as_object_mut().unwrap().remove("keyHash");
    });
    assert!(matches!(
        smab.open_container(&tampered, PASSWORD),
        Err(SmabError::Format(FormatError::MissingField("keyHash")))
    ));
}

#[test]
fn unsupported_container_version() {
    let smab = smab();
    let mut bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();
    bytes[4] = CONTAINER_VERSION + 1;

    assert!(matches!(
        smab.open_container(&bytes, PASSWORD),
        Err(SmabError::Format(FormatError::UnsupportedVersion { .. }))
    ));
}

#[test]
fn owner_pinning() {
    let smab = smab();
    let owner = Keypair::generate();
    let bytes = smab.create_container(PASSWORD, &owner, &payload()).unwrap();

    smab.open_container_with_owner(&bytes, PASSWORD, &owner.public_key())
        .unwrap();
    assert!(matches!(
        smab.open_container_with_owner(&bytes, PASSWORD, &Keypair::generate().public_key()),
        Err(SmabError::OwnerMismatch { .. })
    ));
}

#[test]
fn oversized_payload_rejected() {
    let smab = Smab::in_memory(SmabConfig {
        kdf_iterations: 1_000,
        max_payload_len: 64,
        ..SmabConfig::default()
    })
    .unwrap();
    let mut data = payload();
    data.appearance = Bytes::from(vec![7u8; 1024]);

    assert!(matches!(
        smab.create_container(PASSWORD, &Keypair::generate(), &data),
        Err(SmabError::PayloadTooLarge { .. })
    ));
}

#[test]
fn save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outfit.smab");
    let smab = smab();
    let bytes = smab
        .create_container(PASSWORD, &Keypair::generate(), &payload())
        .unwrap();

    smab.save_container(&path, &bytes).unwrap();
    let view = smab.load_container(&path, PASSWORD).unwrap();
    assert_eq!(view.description(), "Summer outfit");

    assert!(smab.save_container(&path, b"garbage").is_err());
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_roundtrip(
        description in ".{0,64}",
        appearance in proptest::collection::vec(any::<u8>(), 0..256),
        manipulation in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let smab = smab();
        let data = ActorBaseFileData {
            description: description.clone(),
            appearance: Bytes::from(appearance),
            manipulation: Bytes::from(manipulation),
            ..ActorBaseFileData::default()
        };

        let bytes = smab.create_container(PASSWORD, &Keypair::generate(), &data).unwrap();
        let view = smab.open_container(&bytes, PASSWORD).unwrap();

        prop_assert_eq!(view.description(), description.as_str());
        prop_assert_eq!(view.appearance(), &data.appearance);
        prop_assert_eq!(view.manipulation(), &data.manipulation);
    }
}
