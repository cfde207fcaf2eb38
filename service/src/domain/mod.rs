//! Domain definitions.

pub mod case;
pub mod client;
pub mod invoice;
pub mod tenant;

pub use self::{case::Case, invoice::Invoice};
