//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::json;

use hypdid_core::{Did, Event, Keypair, PublicKey};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random public key.
///
/// Derived through a keypair so every generated key is a valid Ed25519
/// point, not just random bytes.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a random DID.
pub fn did() -> impl Strategy<Value = Did> {
    public_key().prop_map(|key| Did::from_key(&key))
}

/// Generate a payload-wrapped event with simple scalar fields.
pub fn event() -> impl Strategy<Value = Event> {
    prop::collection::hash_map("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,16}", 0..4).prop_map(|fields| {
        json!({ "payload": fields })
    })
}
