//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a deterministic owner, a cheap
//! KDF configuration, and a clock that only moves when told to.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;

use smab::{
    ActorBaseData, ActorBaseFileData, AllowList, ContentHash, FileModData, FileSwap, Keypair,
    OwnerPublicKey, Smab, SmabConfig, SmabHeader, UpdateToken,
};
use smab_perms::FixedClock;

/// PBKDF2 iterations used by fixtures. Far below the production default.
pub const FIXTURE_KDF_ITERATIONS: u32 = 1_000;

/// Password used by fixture containers.
pub const FIXTURE_PASSWORD: &[u8] = b"fixture password";

/// Time the fixture clock starts at (2025-01-14T16:00:00Z).
pub const FIXTURE_EPOCH_MILLIS: i64 = 1_736_870_400_000;

/// Configuration with a low iteration count.
pub fn fixture_config() -> SmabConfig {
    SmabConfig {
        kdf_iterations: FIXTURE_KDF_ITERATIONS,
        ..SmabConfig::default()
    }
}

/// An owner keypair with an engine and a controllable clock.
pub struct TestFixture {
    pub owner: Keypair,
    pub clock: Arc<FixedClock>,
    pub smab: Smab,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::with_keypair(Keypair::generate())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_keypair(Keypair::from_seed(&seed))
    }

    fn with_keypair(owner: Keypair) -> Self {
        let clock = Arc::new(FixedClock::new(FIXTURE_EPOCH_MILLIS));
        let smab = Smab::in_memory(fixture_config())
            .unwrap_or_else(|e| panic!("fixture config rejected: {e}"))
            .with_clock(clock.clone());
        Self { owner, clock, smab }
    }

    pub fn public_key(&self) -> OwnerPublicKey {
        self.owner.public_key()
    }

    /// Encrypt `payload` under [`FIXTURE_PASSWORD`].
    pub fn create(&self, payload: &ActorBaseFileData) -> smab::Result<Vec<u8>> {
        self.smab.create_container(FIXTURE_PASSWORD, &self.owner, payload)
    }

    /// As [`create`](Self::create), with an initial allow-list.
    pub fn create_with(
        &self,
        payload: &ActorBaseFileData,
        allowed: AllowList,
    ) -> smab::Result<Vec<u8>> {
        self.smab
            .create_container_with(FIXTURE_PASSWORD, &self.owner, payload, allowed)
    }

    /// Open a container created by this fixture.
    pub fn open(&self, bytes: &[u8]) -> smab::Result<ActorBaseData> {
        self.smab.open_container(bytes, FIXTURE_PASSWORD)
    }

    /// Issue a token adding `hashes` with the default lifetime.
    pub fn grant(
        &self,
        header: &SmabHeader,
        hashes: impl IntoIterator<Item = ContentHash>,
    ) -> smab::Result<UpdateToken> {
        self.smab
            .issue_update_token(&self.owner, header, hashes, [], None)
    }

    /// Issue a token removing `hashes` with the default lifetime.
    pub fn revoke(
        &self,
        header: &SmabHeader,
        hashes: impl IntoIterator<Item = ContentHash>,
    ) -> smab::Result<UpdateToken> {
        self.smab
            .issue_update_token(&self.owner, header, [], hashes, None)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures for distinct owners.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A small payload with one mod file and one swap.
pub fn demo_payload() -> ActorBaseFileData {
    ActorBaseFileData {
        description: "demo".into(),
        appearance: Bytes::from_static(b"{\"customize\":{}}"),
        body_shape: Bytes::new(),
        manipulation: Bytes::from_static(b"manip"),
        files: vec![FileModData {
            game_paths: BTreeSet::from([
                "chara/equipment/e0100/texture/v01_c0101e0100_top_d.tex".to_string(),
            ]),
            length: 1024,
            hash: demo_hash(),
        }],
        file_swaps: vec![FileSwap {
            game_paths: BTreeSet::from([
                "chara/equipment/e0200/material/v0001/mt_c0101e0200_glv_a.mtrl".to_string(),
            ]),
            swap_path: "chara/equipment/e0201/material/v0001/mt_c0101e0201_glv_a.mtrl".into(),
        }],
    }
}

fn demo_hash() -> ContentHash {
    "1f2e3d4c5b6a79880f1e2d3c4b5a6978"
        .parse()
        .unwrap_or_else(|e| panic!("demo hash rejected: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use smab::SmabError;

    fn h(s: &str) -> ContentHash {
        ContentHash::new(s).unwrap()
    }

    #[test]
    fn test_fixture_roundtrip() {
        let fixture = TestFixture::new();
        let bytes = fixture.create(&demo_payload()).unwrap();
        let view = fixture.open(&bytes).unwrap();

        assert_eq!(view.description(), "demo");
        assert_eq!(view.owner(), &fixture.public_key());
        assert_eq!(view.replacements().len(), 2);
    }

    #[test]
    fn test_fixture_grant_and_revoke() {
        let fixture = TestFixture::new();
        let bytes = fixture
            .create_with(&demo_payload(), [h("keep")].into_iter().collect())
            .unwrap();
        let view = fixture.open(&bytes).unwrap();

        let token = fixture.grant(view.header(), [h("abc123")]).unwrap();
        let granted = fixture.smab.apply_update_token(view.header(), &token).unwrap();
        assert!(granted.allowed_hashes().contains(&h("abc123")));
        assert!(granted.allowed_hashes().contains(&h("keep")));

        let token = fixture.revoke(&granted, [h("keep")]).unwrap();
        let revoked = fixture.smab.apply_update_token(&granted, &token).unwrap();
        assert_eq!(revoked.allowed_hashes().len(), 1);
    }

    #[test]
    fn test_fixture_clock_drives_expiry() {
        let fixture = TestFixture::new();
        let bytes = fixture.create(&demo_payload()).unwrap();
        let header = fixture.open(&bytes).unwrap().header().clone();

        let token = fixture.grant(&header, [h("abc123")]).unwrap();
        fixture.clock.advance(8 * 24 * 60 * 60 * 1000);

        assert!(matches!(
            fixture.smab.apply_update_token(&header, &token),
            Err(SmabError::Token(_))
        ));
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);
        let pks: Vec<_> = parties.iter().map(|p| p.public_key()).collect();
        assert_ne!(pks[0], pks[1]);
        assert_ne!(pks[1], pks[2]);
        assert_ne!(pks[0], pks[2]);

        let bytes = parties[0].create(&demo_payload()).unwrap();
        assert!(matches!(
            parties[1].smab.open_container_with_owner(
                &bytes,
                FIXTURE_PASSWORD,
                &parties[1].public_key()
            ),
            Err(SmabError::OwnerMismatch { .. })
        ));
    }

    #[test]
    fn test_save_and_load_through_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.smab");
        let fixture = TestFixture::with_seed([9; 32]);

        let bytes = fixture.create(&demo_payload()).unwrap();
        fixture.smab.save_container(&path, &bytes).unwrap();
        let view = fixture.smab.load_container(&path, FIXTURE_PASSWORD).unwrap();
        assert_eq!(view.description(), "demo");
    }
}
