//! [`Context`]-related definitions.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use juniper::IntoFieldError as _;
use tokio::sync::OnceCell;

use crate::{
    auth::{AuthError, Authenticator, Principal},
    AsError, Error, GraphqlResponse, Service,
};

/// GraphQL request context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// [`Authenticator`] of the request [`Principal`].
    authenticator: Authenticator,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Outcome of the [`Principal`] authentication, once performed.
    principal: OnceCell<Result<Principal, Error>>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .expect("invalid status code")
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Returns the authenticated [`Principal`] of this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided bearer token is invalid.
    pub async fn principal(&self) -> Result<&Principal, Error> {
        self.principal
            .get_or_init(|| async { self.authenticate().await })
            .await
            .as_ref()
            .map_err(|e| self.error()(e.clone()))
    }

    /// Performs the [`Principal`] authentication.
    async fn authenticate(&self) -> Result<Principal, Error> {
        let res = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        match res {
            Ok(TypedHeader(Authorization(bearer))) => self
                .authenticator
                .authenticate(bearer.token())
                .map_err(Error::from),
            Err(e) if e.is_missing() => {
                Err(AuthError::AuthorizationRequired.into())
            }
            Err(e) => Err(e.into_error()),
        }
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = GraphqlResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let missing = |ext: &str| {
            GraphqlResponse::failed(
                http::StatusCode::INTERNAL_SERVER_ERROR,
                Error::internal(&format!("missing `{ext}` extension"))
                    .into_field_error(),
            )
        };

        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| missing("Service"))?;
        let authenticator = parts
            .extensions
            .get::<Authenticator>()
            .cloned()
            .ok_or_else(|| missing("Authenticator"))?;

        Ok(Self {
            service,
            authenticator,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
            principal: OnceCell::new(),
        })
    }
}
