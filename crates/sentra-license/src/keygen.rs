//! Opaque key and credential generation.
//!
//! Everything here draws from the thread-local CSPRNG; entropy-source
//! failure is the only failure mode and is fatal.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// License key alphabet: uppercase letters and digits minus the
/// visually ambiguous I, O, 0, 1.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const KEY_GROUPS: usize = 5;
const KEY_GROUP_LEN: usize = 4;

/// Generate a license key: 5 groups of 4 characters, e.g.
/// `7XKQ-M2NP-W9RT-ABCD-EF34`.
pub fn generate_license_key() -> String {
    let mut rng = rand::rng();
    let mut key = String::with_capacity(KEY_GROUPS * KEY_GROUP_LEN + KEY_GROUPS - 1);
    for group in 0..KEY_GROUPS {
        if group > 0 {
            key.push('-');
        }
        for _ in 0..KEY_GROUP_LEN {
            let idx = rand::Rng::random_range(&mut rng, 0..KEY_ALPHABET.len());
            key.push(KEY_ALPHABET[idx] as char);
        }
    }
    key
}

/// Intake check for the fixed key pattern
/// `[A-Z0-9]{4}(-[A-Z0-9]{4}){4}`. Malformed keys are treated
/// identically to unknown ones, so this never needs to be stricter
/// than the generator's alphabet.
pub fn is_well_formed_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    if bytes.len() != KEY_GROUPS * KEY_GROUP_LEN + KEY_GROUPS - 1 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if i % (KEY_GROUP_LEN + 1) == KEY_GROUP_LEN {
            *b == b'-'
        } else {
            b.is_ascii_uppercase() || b.is_ascii_digit()
        }
    })
}

/// Cryptographically random opaque token (32 bytes, base64url, no
/// padding).
fn random_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Organization service credential (`sk_…`).
pub fn generate_api_key() -> String {
    format!("sk_{}", random_token())
}

/// Agent service credential (`agent_…`).
pub fn generate_agent_key() -> String {
    format!("agent_{}", random_token())
}

/// Webhook shared signing secret (`whsec_…`).
pub fn generate_webhook_secret() -> String {
    format!("whsec_{}", random_token())
}

/// One-way hash of a machine identifier, hex-encoded.
///
/// Raw machine identifiers are never persisted or compared directly;
/// this digest is the only form the license ever stores.
pub fn hash_machine_id(machine_id: &str) -> String {
    sha256_hex(machine_id)
}

/// One-way hash of a raw credential for at-rest storage.
pub fn hash_credential(raw: &str) -> String {
    sha256_hex(raw)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_key_format() {
        let key = generate_license_key();
        assert_eq!(key.len(), 24);
        let groups: Vec<&str> = key.split('-').collect();
        assert_eq!(groups.len(), 5);
        for group in groups {
            assert_eq!(group.len(), 4);
            assert!(
                group
                    .bytes()
                    .all(|b| KEY_ALPHABET.contains(&b))
            );
        }
    }

    #[test]
    fn license_key_avoids_ambiguous_characters() {
        for _ in 0..50 {
            let key = generate_license_key();
            assert!(!key.contains(['I', 'O', '0', '1']));
        }
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = generate_license_key();
        let b = generate_license_key();
        assert_ne!(a, b);
    }

    #[test]
    fn well_formed_key_accepts_generated_keys() {
        assert!(is_well_formed_key(&generate_license_key()));
        // The intake pattern is wider than the generator alphabet.
        assert!(is_well_formed_key("AB01-CD10-EF10-GH10-IJ10"));
    }

    #[test]
    fn well_formed_key_rejects_malformed_input() {
        assert!(!is_well_formed_key(""));
        assert!(!is_well_formed_key("ABCD-EFGH"));
        assert!(!is_well_formed_key("abcd-efgh-jklm-npqr-stuv"));
        assert!(!is_well_formed_key("ABCD-EFGH-JKLM-NPQR-STU"));
        assert!(!is_well_formed_key("ABCD EFGH JKLM NPQR STUV"));
    }

    #[test]
    fn credentials_carry_kind_prefixes() {
        assert!(generate_api_key().starts_with("sk_"));
        assert!(generate_agent_key().starts_with("agent_"));
        assert!(generate_webhook_secret().starts_with("whsec_"));
    }

    #[test]
    fn machine_hash_is_deterministic_and_opaque() {
        let h1 = hash_machine_id("mac-00:11:22:33");
        let h2 = hash_machine_id("mac-00:11:22:33");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // sha256 hex
        assert!(!h1.contains("mac-00"));
    }

    #[test]
    fn different_machines_different_hashes() {
        assert_ne!(hash_machine_id("machine-a"), hash_machine_id("machine-b"));
    }
}
