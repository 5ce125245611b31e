use rand::Rng;

/// Room-code alphabet: 24 uppercase symbols. I and O are left out because
/// they are too easy to confuse with 1 and 0 when read off someone's screen.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

pub const CODE_LEN: usize = 4;

/// Draws a fresh 4-character room code. Uniqueness against live rooms is the
/// caller's job (conditional create plus retry).
pub fn generate_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
