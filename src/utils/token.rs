use rand::RngCore;

/// Length in bytes of the random material behind a link token.
/// 32 bytes keeps collisions out of reach even across very large campaigns.
pub const LINK_TOKEN_BYTES: usize = 32;

/// Hex length of a generated link token.
pub const LINK_TOKEN_LEN: usize = LINK_TOKEN_BYTES * 2;

pub fn generate_link_token() -> String {
    let mut bytes = [0u8; LINK_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
