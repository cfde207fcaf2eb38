//! Authentication of [`Principal`]s.

use derive_more::Debug;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use service::domain::tenant;
use uuid::Uuid;

use crate::define_error;

/// Caller authenticated by the identity provider, acting on behalf of a
/// tenant (cabinet).
#[derive(Clone, Debug)]
pub struct Principal {
    /// ID of the authenticated user.
    pub user_id: Uuid,

    /// ID of the tenant the user acts on behalf of.
    pub tenant_id: tenant::Id,

    /// Role of the user inside the tenant.
    pub role: String,

    /// [`tenant::Plan`] of the tenant.
    pub plan: tenant::Plan,
}

/// Claims of a bearer [JWT] identifying a [`Principal`].
///
/// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Claims {
    /// ID of the user.
    pub sub: Uuid,

    /// ID of the tenant (cabinet).
    pub cabinet: Uuid,

    /// Role of the user.
    pub role: String,

    /// Plan of the tenant, as `BASIC` or `PREMIUM`.
    pub plan: String,

    /// Expiration time, as a Unix timestamp.
    pub exp: u64,
}

impl TryFrom<Claims> for Principal {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let Claims {
            sub,
            cabinet,
            role,
            plan,
            exp: _,
        } = claims;

        Ok(Self {
            user_id: sub,
            tenant_id: cabinet.into(),
            role,
            plan: plan.parse().map_err(|_| AuthError::UnknownPlan)?,
        })
    }
}

/// Verifier of bearer [JWT]s signed with HS256.
///
/// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
#[derive(Clone, Debug)]
pub struct Authenticator {
    /// Key to verify [JWT] signatures with.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    key: DecodingKey,

    /// [`Validation`] rules of [JWT]s.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    validation: Validation,
}

impl Authenticator {
    /// Creates a new [`Authenticator`] verifying tokens signed with the
    /// provided `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Authenticates the [`Principal`] presenting the provided bearer
    /// `token`.
    ///
    /// # Errors
    ///
    /// If the `token` is malformed, expired, wrongly signed, or names an
    /// unknown plan.
    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!("rejected bearer token: {e}");
                AuthError::InvalidToken
            })?
            .claims
            .try_into()
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Bearer token is invalid or expired"]
        InvalidToken,

        #[code = "UNKNOWN_PLAN"]
        #[status = FORBIDDEN]
        #[message = "Bearer token names an unknown plan"]
        UnknownPlan,
    }
}
