//! [`Clock`] abstractions.

use crate::DateTime;

/// Source of the current [`DateTime`].
pub trait Clock {
    /// Returns the current [`DateTime`].
    fn now(&self) -> DateTime;
}

/// [`Clock`] reading the system wall clock in UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Clock for System {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}

/// [`Clock`] frozen at the provided [`DateTime`].
#[derive(Clone, Copy, Debug)]
pub struct Fixed(pub DateTime);

impl Clock for Fixed {
    fn now(&self) -> DateTime {
        self.0
    }
}

#[cfg(test)]
mod spec {
    use crate::DateTime;

    use super::{Clock as _, Fixed, System};

    #[test]
    fn fixed_never_moves() {
        let at = DateTime::from_rfc3339("2024-03-01T10:00:00Z").unwrap();
        let clock = Fixed(at);

        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn system_is_after_epoch() {
        assert!(System.now() > DateTime::UNIX_EPOCH);
    }
}
