use tracing::{error, warn};

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Cuts `plain` to at most 72 bytes without splitting a UTF-8 sequence.
/// Both hashing and verification go through here.
fn truncate_password(plain: &str) -> &str {
    if plain.len() <= MAX_PASSWORD_BYTES {
        return plain;
    }
    let mut end = MAX_PASSWORD_BYTES;
    while !plain.is_char_boundary(end) {
        end -= 1;
    }
    &plain[..end]
}

pub fn hash_password(plain: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(truncate_password(plain), cost).map_err(|e| {
        error!(error = %e, "bcrypt hash_password error");
        anyhow::anyhow!(e.to_string())
    })
}

/// A malformed stored hash verifies as `false`.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(truncate_password(plain), hash) {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "bcrypt verify on malformed hash");
            false
        }
    }
}
