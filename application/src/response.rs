//! [`GraphqlResponse`] definitions.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use derive_more::Debug;
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    DefaultScalarValue, FieldError, ScalarValue,
};

/// Outcome of a GraphQL request over the invoicing API, along with the HTTP
/// status to report if the request failed.
#[derive(Debug)]
pub struct GraphqlResponse<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// HTTP status reported when the [`GraphqlResponse::body`] is not OK.
    pub error_status: http::StatusCode,

    /// Executed GraphQL operations.
    #[debug(skip)]
    pub body: GraphQLBatchResponse<S>,
}

impl<S: ScalarValue> GraphqlResponse<S> {
    /// Creates a [`GraphqlResponse`] failed before any operation was
    /// executed.
    #[must_use]
    pub fn failed(error_status: http::StatusCode, err: FieldError<S>) -> Self {
        Self {
            error_status,
            body: GraphQLBatchResponse::Single(GraphQLResponse::error(err)),
        }
    }

    /// Returns the HTTP status of this [`GraphqlResponse`].
    ///
    /// Operations rejected as a whole (unparsable, invalid against the
    /// schema) report the [`GraphqlResponse::error_status`], while executed
    /// ones report `200 OK` with their errors inside the body.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        if self.body.is_ok() {
            http::StatusCode::OK
        } else {
            self.error_status
        }
    }
}

impl<S: ScalarValue> IntoResponse for GraphqlResponse<S> {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body)).into_response()
    }
}
