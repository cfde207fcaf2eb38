//! GraphQL boundary of the invoicing [`Service`].
//!
//! Every request is authenticated into a [`Principal`] scoped to a single
//! tenant, whose invoices are then created, edited, settled, archived and
//! listed through the [`api::Schema`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod auth;
pub mod config;
mod context;
pub mod error;
pub mod response;

use std::sync::Arc;

use axum::Extension;
use juniper_axum::extract::JuniperRequest;
// Used in binary.
use axum_client_ip as _;
use refinery as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    auth::{Authenticator, Principal},
    config::Config,
    context::Context,
    error::{AsError, Error},
    response::GraphqlResponse,
};

/// Invoicing [`Service`] backed by [`Postgres`].
///
/// [`Postgres`]: service::infra::Postgres
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Postgres>;

/// Executes the GraphQL operations of a single HTTP request against the
/// [`api::Schema`].
pub async fn graphql(
    Extension(schema): Extension<Arc<api::Schema>>,
    context: Context,
    JuniperRequest(request): JuniperRequest,
) -> GraphqlResponse {
    let body = request.execute(&*schema, &context).await;
    let resp = GraphqlResponse {
        error_status: context.error_status_code(),
        body,
    };
    if !resp.body.is_ok() {
        tracing::debug!(status = %resp.status(), "GraphQL request rejected");
    }
    resp
}
