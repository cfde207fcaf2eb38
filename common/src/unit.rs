//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing a deadline an entity is due by.
#[derive(Clone, Copy, Debug)]
pub struct Deadline;

/// Marker type describing an entity settlement.
#[derive(Clone, Copy, Debug)]
pub struct Settlement;
