//! GraphQL [`Mutation`]s definitions.

use common::DateTime;
use juniper::graphql_object;
use service::{command, numbering, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Issues a new `Invoice` for a case of the current cabinet.
    ///
    /// The `Invoice` is numbered sequentially per cabinet and year, and is
    /// `SENT` straight away.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_INVOICE` - provided lines, tax rate or notes are invalid;
    /// - `QUOTA_EXCEEDED` - the cabinet plan allows no more active
    ///                      `Invoice`s;
    /// - `CASE_NOT_EXISTS` - the current cabinet has no such case;
    /// - `NUMBER_CONFLICT` - no free `InvoiceNumber` could be allocated;
    /// - `NUMBERS_EXHAUSTED` - all the `InvoiceNumber`s of the year are
    ///                         used.
    #[tracing::instrument(
        skip_all,
        fields(
            case_id = %case_id,
            gql.name = "createInvoice",
            lines = lines.len(),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_invoice(
        case_id: api::invoice::CaseId,
        lines: Vec<api::invoice::LineInput>,
        due_at: DateTime,
        tax_rate: Option<api::invoice::Decimal>,
        notes: Option<String>,
        client_id: Option<api::invoice::ClientId>,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        let principal = ctx.principal().await?;

        ctx.service()
            .execute(command::CreateInvoice {
                tenant_id: principal.tenant_id,
                plan: principal.plan,
                case_id: case_id.into(),
                client_id: client_id.map(Into::into),
                lines: lines.into_iter().map(Into::into).collect(),
                tax_rate: tax_rate.map(Into::into),
                due_at: due_at.coerce(),
                notes,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Applies the provided `InvoicePatch` to the `Invoice` of the current
    /// cabinet.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_INVOICE` - provided lines, tax rate or notes are invalid;
    /// - `IMMUTABLE_FIELD` - the patch changes the number, the case or the
    ///                       issue `DateTime`;
    /// - `INVOICE_NOT_EXISTS` - the current cabinet has no `Invoice` with the
    ///                          specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateInvoice",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_invoice(
        id: api::invoice::Id,
        patch: api::invoice::Patch,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        let tenant_id = ctx.principal().await?.tenant_id;

        ctx.service()
            .execute(command::UpdateInvoice {
                tenant_id,
                invoice_id: id.into(),
                patch: patch.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Archives the `Invoice` of the current cabinet.
    ///
    /// Archived `Invoice`s are kept, but omitted from listings by default.
    /// Archiving an already archived `Invoice` does nothing.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVOICE_NOT_EXISTS` - the current cabinet has no `Invoice` with the
    ///                          specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "archiveInvoice",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn archive_invoice(
        id: api::invoice::Id,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        let tenant_id = ctx.principal().await?.tenant_id;

        ctx.service()
            .execute(command::ArchiveInvoice {
                tenant_id,
                invoice_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Invoice` of the current cabinet as `PAID`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVOICE_NOT_EXISTS` - the current cabinet has no `Invoice` with the
    ///                          specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markInvoicePaid",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_invoice_paid(
        id: api::invoice::Id,
        ctx: &Context,
    ) -> Result<api::Invoice, Error> {
        let tenant_id = ctx.principal().await?.tenant_id;

        ctx.service()
            .execute(command::MarkInvoicePaid {
                tenant_id,
                invoice_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum LifecycleError {
        #[code = "CASE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Case does not exist"]
        CaseNotExists,

        #[code = "IMMUTABLE_FIELD"]
        #[status = BAD_REQUEST]
        #[message = "`Invoice` number, case and issue date cannot be changed"]
        ImmutableField,

        #[code = "NUMBER_CONFLICT"]
        #[status = CONFLICT]
        #[message = "Failed to allocate a free `InvoiceNumber`, retry later"]
        NumberConflict,

        #[code = "NUMBERS_EXHAUSTED"]
        #[status = CONFLICT]
        #[message = "All the `InvoiceNumber`s of the year are used"]
        NumbersExhausted,
    }
}

/// Creates a new `INVALID_INVOICE` [`Error`] out of the provided
/// [`ValidationError`].
///
/// [`ValidationError`]: service::domain::invoice::ValidationError
fn invalid(e: &impl ToString) -> Error {
    Error {
        code: "INVALID_INVOICE",
        status_code: http::StatusCode::BAD_REQUEST,
        message: e.to_string(),
        details: Vec::new(),
        backtrace: None,
    }
}

impl AsError for numbering::Error {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Exhausted(_) => {
                Some(LifecycleError::NumbersExhausted.into())
            }
        }
    }
}

impl AsError for command::create_invoice::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CaseNotExists(_) => {
                Some(LifecycleError::CaseNotExists.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::NumberConflict(_) => {
                Some(LifecycleError::NumberConflict.into())
            }
            Self::Numbering(e) => e.try_as_error(),
            Self::QuotaExceeded {
                current_count,
                limit,
            } => {
                let count = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
                Some(
                    Error {
                        code: "QUOTA_EXCEEDED",
                        status_code: http::StatusCode::FORBIDDEN,
                        message: self.to_string(),
                        details: Vec::new(),
                        backtrace: None,
                    }
                    .with_detail("currentCount", count(*current_count))
                    .with_detail("limit", count(*limit)),
                )
            }
            Self::Validation(e) => Some(invalid(e)),
        }
    }
}

impl AsError for command::update_invoice::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ImmutableField(_) => {
                Some(LifecycleError::ImmutableField.into())
            }
            Self::InvoiceNotExists(_) => {
                Some(api::InvoiceError::NotExists.into())
            }
            Self::Validation(e) => Some(invalid(e)),
        }
    }
}

impl AsError for command::archive_invoice::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvoiceNotExists(_) => {
                Some(api::InvoiceError::NotExists.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::create_invoice::ExecutionError,
        domain::{case, invoice::ValidationError},
    };

    use crate::AsError as _;

    #[test]
    fn quota_exceeded_carries_usage() {
        let err = ExecutionError::QuotaExceeded {
            current_count: 10,
            limit: 10,
        }
        .as_error();

        assert_eq!(err.code, "QUOTA_EXCEEDED");
        assert_eq!(err.status_code, http::StatusCode::FORBIDDEN);
        assert_eq!(err.details, [("currentCount", 10), ("limit", 10)]);
    }

    #[test]
    fn validation_is_bad_request() {
        let err =
            ExecutionError::Validation(ValidationError::NoLines).as_error();

        assert_eq!(err.code, "INVALID_INVOICE");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_case_is_not_found() {
        let err = ExecutionError::CaseNotExists(case::Id::new()).as_error();

        assert_eq!(err.code, "CASE_NOT_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }
}
