//! Redemption token generation.
//!
//! Tokens are 12-digit decimal strings drawn uniformly from
//! `[100_000_000_000, 999_999_999_999]`, so they never carry a leading zero.
//! These functions are pure: the caller supplies the RNG and the set of tokens
//! that are already taken, and every retry loop is bounded.

use crate::errors::{Error, Result};
use rand::Rng;
use std::collections::HashSet;

/// Smallest token value (inclusive).
pub const CODE_MIN: u64 = 100_000_000_000;
/// Largest token value (inclusive).
pub const CODE_MAX: u64 = 999_999_999_999;
/// Number of digits in every generated token.
pub const CODE_LENGTH: usize = 12;

/// Draws one candidate token without checking it against anything.
pub fn draw_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Draws a token that is not in `exclude`, resampling on collision.
///
/// Fails with `GenerationExhausted` once `max_attempts` candidates have all collided.
pub fn generate_code<R: Rng + ?Sized>(
    rng: &mut R,
    exclude: &HashSet<String>,
    max_attempts: u32,
) -> Result<String> {
    for attempt in 1..=max_attempts {
        let candidate = draw_code(rng);
        if !exclude.contains(&candidate) {
            if attempt > 1 {
                tracing::debug!("Token collision resolved after {} draws", attempt);
            }
            return Ok(candidate);
        }
    }

    tracing::warn!(
        "Gave up drawing a token after {} colliding candidates",
        max_attempts
    );
    Err(Error::GenerationExhausted {
        attempts: max_attempts,
    })
}

/// Generates `count` tokens that are pairwise distinct.
pub fn generate_batch<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    max_attempts: u32,
) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(count);
    let mut codes = Vec::with_capacity(count);

    for _ in 0..count {
        let code = generate_code(rng, &seen, max_attempts)?;
        seen.insert(code.clone());
        codes.push(code);
    }

    Ok(codes)
}

/// Whether `code` has the shape of a generated token.
///
/// Advisory only: redemption looks up any string and treats a malformed one as a miss.
#[must_use]
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH
        && code.bytes().all(|b| b.is_ascii_digit())
        && !code.starts_with('0')
}
