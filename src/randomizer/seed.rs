// src/randomizer/seed.rs

use crate::models::round::RoundKind;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Builds the participant's seed key.
///
/// Every identifier is length-prefixed, so `("ab", "c")` and `("a", "bc")`
/// can never produce the same key regardless of what characters ids contain.
pub fn seed_base(room_id: &str, participant_id: &str, round_kind: RoundKind) -> String {
    format!(
        "{}:{}|{}:{}|{}",
        room_id.len(),
        room_id,
        participant_id.len(),
        participant_id,
        round_kind.as_str()
    )
}

/// Reduces a key to a 32-bit seed.
///
/// FNV-1a over the UTF-8 bytes, then a murmur3 finalizer so keys differing
/// only in their last byte still land far apart.
pub fn seed_of(key: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    avalanche(hash)
}

/// Seed for one participant's round.
pub fn seed(room_id: &str, participant_id: &str, round_kind: RoundKind) -> u32 {
    seed_of(&seed_base(room_id, participant_id, round_kind))
}

fn avalanche(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
