//! Read entities definitions.

pub mod invoice;
