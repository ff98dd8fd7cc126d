// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Opaque session token minting.
//!
//! The token handed to clients carries no claims and no structure; it is
//! nothing but a random store key. Anyone holding it holds the session, so
//! the bytes come from the system CSPRNG and are never logged.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

use crate::error::AppError;

/// Raw entropy per token. 96 bytes encode to exactly [`TOKEN_LENGTH`]
/// base64url characters with no padding.
const TOKEN_BYTES: usize = 96;

/// Length of a minted token string.
pub const TOKEN_LENGTH: usize = 128;

#[derive(Debug, Error)]
pub enum TokenError {
    /// The system CSPRNG refused to produce bytes.
    #[error("system RNG unavailable")]
    Rng,
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::internal()
    }
}

/// Mint a fresh opaque session token: 96 random bytes, base64url encoded
/// without padding. URL-safe, header-safe, cookie-safe.
pub fn mint_session_token() -> Result<String, TokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new().fill(&mut bytes).map_err(|_| TokenError::Rng)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
