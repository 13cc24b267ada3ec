//! Golden key-codec vectors.
//!
//! Known key/DID pairs pinning the base64url encoding, so any other
//! implementation of the codec can be checked against the same strings.

use hypdid_core::{decode_key, Did, PublicKey};

/// A known key and its expected DID string.
pub struct GoldenDid {
    pub name: &'static str,
    pub key: [u8; 32],
    pub did: &'static str,
}

/// All golden vectors.
pub fn all_vectors() -> Vec<GoldenDid> {
    vec![
        GoldenDid {
            name: "all-zero key",
            key: [0x00; 32],
            did: "did:hyp:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        },
        GoldenDid {
            name: "all-ones key",
            key: [0xff; 32],
            did: "did:hyp:__________________________________________8",
        },
        GoldenDid {
            name: "counting key",
            key: {
                let mut key = [0u8; 32];
                let mut i = 0;
                while i < 32 {
                    key[i] = i as u8;
                    i += 1;
                }
                key
            },
            did: "did:hyp:AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8",
        },
    ]
}

/// Check every vector in both directions. Panics on the first mismatch.
pub fn verify_all_vectors() {
    for vector in all_vectors() {
        let did = Did::from_key(&PublicKey(vector.key));
        assert_eq!(did.as_str(), vector.did, "encode mismatch: {}", vector.name);

        let decoded = decode_key(did.encoded_key()).unwrap();
        assert_eq!(decoded.0, vector.key, "decode mismatch: {}", vector.name);
    }
}
