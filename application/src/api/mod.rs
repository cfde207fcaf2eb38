//! GraphQL API definitions.

pub mod invoice;
mod mutation;
mod query;
pub mod scalar;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{invoice::Invoice, mutation::Mutation, query::Query};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

/// Creates a new GraphQL [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

define_error! {
    enum InvoiceError {
        #[code = "INVOICE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Invoice` does not exist"]
        NotExists,
    }
}
