//! Property-based tests for the simulated engine.

use attest_core::{Attribute, CredentialId, OutOfBandId};
use attest_harness::{SimEngine, invitation_url, parse_invitation};
use proptest::prelude::*;

fn stored_ids(seed: u64, count: usize) -> Vec<CredentialId> {
    let engine = SimEngine::with_seed(seed);
    (0..count)
        .map(|i| engine.store_credential(vec![Attribute::new("n", i.to_string())], None))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_same_seed_same_ids(seed in any::<u64>(), count in 1usize..16) {
        prop_assert_eq!(stored_ids(seed, count), stored_ids(seed, count));
    }

    #[test]
    fn prop_created_invitations_parse_back(oob in "[a-z0-9-]{1,24}") {
        let id = OutOfBandId::new(oob);
        prop_assert_eq!(parse_invitation(&invitation_url(&id)), Ok(id));
    }
}
