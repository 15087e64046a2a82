// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! Sessions are minted by the identity service, not by this backend. These
//! tests pin the claim format so a token built the way that service builds
//! it is accepted by the middleware.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use lyfez_backend::error::AppError;
use lyfez_backend::middleware::auth::{create_jwt, verify_jwt, Claims};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Encode arbitrary claims, the way an external issuer would.
fn encode_claims<T: Serialize>(claims: &T, signing_key: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("Failed to create JWT")
}

#[test]
fn test_externally_issued_token_is_accepted() {
    let user_id = 12345678u64;
    let token = encode_claims(
        &Claims {
            sub: user_id.to_string(),
            exp: now() + 86400,
            iat: now(),
        },
        SIGNING_KEY,
    );

    assert_eq!(verify_jwt(&token, SIGNING_KEY).unwrap(), user_id);
}

#[test]
fn test_created_token_round_trips() {
    let token = create_jwt(98765432, SIGNING_KEY).unwrap();
    assert_eq!(verify_jwt(&token, SIGNING_KEY).unwrap(), 98765432);
}

#[test]
fn test_expired_token_is_rejected() {
    let token = encode_claims(
        &Claims {
            sub: "42".to_string(),
            exp: now() - 3600,
            iat: now() - 7200,
        },
        SIGNING_KEY,
    );

    assert!(matches!(
        verify_jwt(&token, SIGNING_KEY),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_non_numeric_subject_is_rejected() {
    let token = encode_claims(
        &Claims {
            sub: "alice@example.com".to_string(),
            exp: now() + 86400,
            iat: now(),
        },
        SIGNING_KEY,
    );

    assert!(matches!(
        verify_jwt(&token, SIGNING_KEY),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_wrong_algorithm_is_rejected() {
    let claims = Claims {
        sub: "42".to_string(),
        exp: now() + 86400,
        iat: now(),
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(verify_jwt(&token, SIGNING_KEY).is_err());
}
