//! [`Command`] for marking an [`Invoice`] as paid.

use tracerr::Traced;

use crate::{
    domain::{
        invoice::{self, Status},
        tenant, Invoice,
    },
    Service,
};

use super::{
    update_invoice::{self, Patch},
    Command, UpdateInvoice,
};

/// [`Command`] for marking an [`Invoice`] as paid.
///
/// Equivalent to an [`UpdateInvoice`] with the [`Status::Paid`].
#[derive(Clone, Copy, Debug)]
pub struct MarkInvoicePaid {
    /// ID of the tenant owning the [`Invoice`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Invoice`] to be marked as paid.
    pub invoice_id: invoice::Id,
}

impl<Db, Clk> Command<MarkInvoicePaid> for Service<Db, Clk>
where
    Self: Command<
        UpdateInvoice,
        Ok = Invoice,
        Err = Traced<update_invoice::ExecutionError>,
    >,
{
    type Ok = Invoice;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkInvoicePaid,
    ) -> Result<Self::Ok, Self::Err> {
        let MarkInvoicePaid {
            tenant_id,
            invoice_id,
        } = cmd;

        self.execute(UpdateInvoice {
            tenant_id,
            invoice_id,
            patch: Patch {
                status: Some(Status::Paid),
                ..Patch::default()
            },
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

/// Error of [`MarkInvoicePaid`] [`Command`] execution.
pub type ExecutionError = update_invoice::ExecutionError;
