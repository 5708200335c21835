//! Signed-request authorization.
//!
//! Every mutation passes through [`SignatureAuthorizer::authorize`] before the
//! ledger sees it. The checks run in a fixed order and stop at the first
//! failure: body shape, signer lookup, product scope, key derivation,
//! signature. Read-only calls never come through here.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::signing::{self, KeyError};
use crate::store::{DbError, DbHandle, User};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid request body: {0}")]
    MalformedRequest(&'static str),

    #[error("User not found")]
    UnknownUser(String),

    #[error("Insufficient scopes")]
    Forbidden { username: String, product: String },

    #[error("Invalid signature")]
    InvalidSignature,

    /// The stored secret for this user cannot be turned into a public key.
    #[error("Unusable key material for {username}: {source}")]
    KeyMaterial {
        username: String,
        #[source]
        source: KeyError,
    },

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Source of registered signers.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Fetch a signer's key material and scopes.
    async fn find_user(&self, username: &str) -> Result<Option<User>, DbError>;
}

#[async_trait]
impl UserLookup for DbHandle {
    async fn find_user(&self, username: &str) -> Result<Option<User>, DbError> {
        self.get_user(username.to_string()).await
    }
}

/// A request that passed every check, with its content untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedRequest {
    pub username: String,
    pub product: String,
    pub content: Value,
}

/// Verifies that a mutation was signed by a registered, in-scope user.
#[derive(Debug, Clone)]
pub struct SignatureAuthorizer<L = DbHandle> {
    users: L,
}

impl<L: UserLookup> SignatureAuthorizer<L> {
    pub fn new(users: L) -> Self {
        Self { users }
    }

    /// Accept or reject a raw `{content, username, signature}` body.
    pub async fn authorize(&self, body: Value) -> Result<AuthorizedRequest, AuthError> {
        let (content, username, signature) = split_body(body)?;
        let product = content
            .get("product")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MalformedRequest("content.product is required"))?
            .to_string();

        let Some(user) = self.users.find_user(&username).await? else {
            warn!(%username, "rejected request from unknown user");
            return Err(AuthError::UnknownUser(username));
        };

        if !user.has_scope(&product) {
            warn!(%username, %product, "rejected request outside user scope");
            return Err(AuthError::Forbidden { username, product });
        }

        let public_key = signing::verifying_key_from_material(&user.key_material).map_err(
            |source| AuthError::KeyMaterial {
                username: username.clone(),
                source,
            },
        )?;

        if !signing::verify_content(&content, &signature, &public_key) {
            warn!(%username, %product, "rejected request with invalid signature");
            return Err(AuthError::InvalidSignature);
        }

        debug!(%username, %product, "request authorized");
        Ok(AuthorizedRequest {
            username,
            product,
            content,
        })
    }
}

fn split_body(body: Value) -> Result<(Value, String, String), AuthError> {
    let Value::Object(mut body) = body else {
        return Err(AuthError::MalformedRequest("body must be an object"));
    };

    let content = match body.remove("content") {
        Some(content @ Value::Object(_)) => content,
        _ => return Err(AuthError::MalformedRequest("content is required")),
    };
    let username = non_empty_string(&mut body, "username")
        .ok_or(AuthError::MalformedRequest("username is required"))?;
    let signature = non_empty_string(&mut body, "signature")
        .ok_or(AuthError::MalformedRequest("signature is required"))?;

    Ok((content, username, signature))
}

fn non_empty_string(body: &mut Map<String, Value>, field: &str) -> Option<String> {
    match body.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{sign_request, signing_key_from_hex};
    use serde_json::json;
    use std::collections::HashMap;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const OTHER_KEY: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    struct Users(HashMap<String, User>);

    #[async_trait]
    impl UserLookup for Users {
        async fn find_user(&self, username: &str) -> Result<Option<User>, DbError> {
            Ok(self.0.get(username).cloned())
        }
    }

    fn authorizer(key_material: &str, scopes: &[&str]) -> SignatureAuthorizer<Users> {
        let user = User {
            username: "ci".into(),
            key_material: key_material.into(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
        };
        SignatureAuthorizer::new(Users(HashMap::from([("ci".to_string(), user)])))
    }

    fn signed(content: Value, key_hex: &str) -> Value {
        let key = signing_key_from_hex(key_hex).unwrap();
        serde_json::to_value(sign_request(content, "ci", &key).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_signature() {
        let auth = authorizer(KEY, &["agent"]);
        let content = json!({"product": "agent", "version": "1.0", "os": "MacOS"});

        let accepted = auth.authorize(signed(content.clone(), KEY)).await.unwrap();
        assert_eq!(accepted.username, "ci");
        assert_eq!(accepted.product, "agent");
        // forwarded unchanged, including un-normalized tokens
        assert_eq!(accepted.content, content);
    }

    #[tokio::test]
    async fn missing_fields_are_malformed() {
        let auth = authorizer(KEY, &["agent"]);
        let bodies = [
            json!(null),
            json!({"username": "ci", "signature": "ab"}),
            json!({"content": {"product": "agent"}, "signature": "ab"}),
            json!({"content": {"product": "agent"}, "username": "ci"}),
            json!({"content": {"version": "1"}, "username": "ci", "signature": "ab"}),
            json!({"content": {"product": ""}, "username": "ci", "signature": "ab"}),
            json!({"content": {"product": "agent"}, "username": "", "signature": "ab"}),
        ];

        for body in bodies {
            let err = auth.authorize(body.clone()).await.unwrap_err();
            assert!(matches!(err, AuthError::MalformedRequest(_)), "{body}");
        }
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let auth = authorizer(KEY, &["agent"]);
        let mut body = signed(json!({"product": "agent"}), KEY);
        body["username"] = json!("ghost");

        let err = auth.authorize(body).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn scope_is_checked_before_signature() {
        let auth = authorizer(KEY, &["Y"]);

        // valid signature, wrong product
        let err = auth
            .authorize(signed(json!({"product": "X"}), KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { ref product, .. } if product == "X"));

        // garbage signature, wrong product: still Forbidden
        let body = json!({"content": {"product": "X"}, "username": "ci", "signature": "00"});
        let err = auth.authorize(body).await.unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn wrong_signer_is_invalid() {
        let auth = authorizer(KEY, &["agent"]);
        let err = auth
            .authorize(signed(json!({"product": "agent"}), OTHER_KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[tokio::test]
    async fn tampered_content_is_invalid() {
        let auth = authorizer(KEY, &["agent"]);
        let mut body = signed(json!({"product": "agent", "tested": true}), KEY);
        body["content"]["tested"] = json!(false);

        let err = auth.authorize(body).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[tokio::test]
    async fn corrupt_key_material_is_reported() {
        let auth = authorizer("not-hex", &["agent"]);
        let err = auth
            .authorize(signed(json!({"product": "agent"}), KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::KeyMaterial { .. }));
    }

    #[tokio::test]
    async fn works_against_the_store() {
        let db = DbHandle::in_memory().unwrap();
        db.put_user(User {
            username: "ci".into(),
            key_material: KEY.into(),
            scopes: vec!["agent".into()],
        })
        .await
        .unwrap();

        let auth = SignatureAuthorizer::new(db);
        let accepted = auth
            .authorize(signed(json!({"product": "agent"}), KEY))
            .await
            .unwrap();
        assert_eq!(accepted.product, "agent");
    }
}
