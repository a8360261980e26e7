//! Deterministic human-readable names for keys without a profile.
//!
//! The same key always yields the same `"<Adjective> <Animal>"` pair; the
//! words are picked from a SHA-256 digest of the key's hex form.

use sha2::{Digest, Sha256};

const ADJECTIVES: [&str; 32] = [
    "Amber", "Brave", "Calm", "Daring", "Eager", "Fancy", "Gentle", "Happy", "Icy", "Jolly",
    "Keen", "Lively", "Mellow", "Nimble", "Odd", "Proud", "Quick", "Rapid", "Silent", "Tidy",
    "Upbeat", "Vivid", "Witty", "Young", "Zesty", "Bold", "Clever", "Dusty", "Fuzzy", "Grand",
    "Humble", "Lucky",
];

const ANIMALS: [&str; 32] = [
    "Badger", "Beaver", "Bison", "Cobra", "Crane", "Dingo", "Eagle", "Ferret", "Gecko", "Heron",
    "Ibis", "Jackal", "Koala", "Lemur", "Marmot", "Newt", "Otter", "Panda", "Quail", "Raven",
    "Salmon", "Tapir", "Urchin", "Viper", "Walrus", "Yak", "Zebra", "Falcon", "Gopher", "Hare",
    "Lynx", "Moose",
];

/// Generate a stable display name from a hex key.
pub fn generate_name(key_hex: &str) -> String {
    let digest = Sha256::digest(key_hex.to_lowercase().as_bytes());
    let adjective = ADJECTIVES[usize::from(digest[0]) % ADJECTIVES.len()];
    let animal = ANIMALS[usize::from(digest[1]) % ANIMALS.len()];
    format!("{adjective} {animal}")
}
