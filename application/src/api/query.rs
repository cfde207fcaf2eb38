//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Invoice` of the current cabinet with the specified ID.
    ///
    /// Archived `Invoice`s are returned too.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVOICE_NOT_EXISTS` - the current cabinet has no `Invoice` with the
    ///                          specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "invoice",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn invoice(
        id: api::invoice::Id,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        let tenant_id = ctx.principal().await?.tenant_id;

        ctx.service()
            .execute(query::invoice::ById::by((tenant_id, id.into())))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::InvoiceError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Lists `Invoice`s of the current cabinet, most recently issued first.
    ///
    /// Archived `Invoice`s are omitted unless `includeArchived` is set.
    #[tracing::instrument(
        skip_all,
        fields(
            case_id = ?case_id.map(|id| id.to_string()),
            client_id = ?client_id.map(|id| id.to_string()),
            gql.name = "invoices",
            include_archived = ?include_archived,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn invoices(
        status: Option<api::invoice::Status>,
        include_archived: Option<bool>,
        case_id: Option<api::invoice::CaseId>,
        client_id: Option<api::invoice::ClientId>,
        ctx: &Context,
    ) -> Result<Vec<api::Invoice>, Error> {
        let tenant_id = ctx.principal().await?.tenant_id;

        Ok(ctx
            .service()
            .execute(query::invoices::List::by(read::invoice::list::Selector {
                tenant_id,
                filter: read::invoice::list::Filter {
                    status: status.map(Into::into),
                    include_archived: include_archived.unwrap_or_default(),
                    case_id: case_id.map(Into::into),
                    client_id: client_id.map(Into::into),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Returns the per-status summary of the active `Invoice`s of the
    /// current cabinet.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "invoiceSummary",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn invoice_summary(
        ctx: &Context,
    ) -> Result<api::invoice::Summary, Error> {
        let tenant_id = ctx.principal().await?.tenant_id;

        ctx.service()
            .execute(query::invoices::Summary::by(tenant_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the usage of the `Invoice`s quota of the current cabinet plan.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "invoiceQuota",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn invoice_quota(
        ctx: &Context,
    ) -> Result<api::invoice::Quota, Error> {
        let principal = ctx.principal().await?;

        ctx.service()
            .execute(query::CheckQuota {
                tenant_id: principal.tenant_id,
                plan: principal.plan,
                resource: query::quota::Resource::Invoices,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}
