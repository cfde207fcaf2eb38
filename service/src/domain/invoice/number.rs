//! [`Number`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{
    private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

#[cfg(doc)]
use crate::domain::Invoice;

/// Human-readable public identifier of an [`Invoice`], unique per tenant.
///
/// Formatted as `FAC-{year}-{seq}`, where both parts are zero-padded to 4
/// digits, so the lexicographic order of numbers matches their allocation
/// order within a year.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Number {
    /// Calendar year this [`Number`] was allocated in.
    year: u16,

    /// Sequential part of this [`Number`] within its year.
    seq: u16,
}

impl Number {
    /// Prefix of every [`Number`].
    pub const PREFIX: &'static str = "FAC";

    /// Greatest sequential part a [`Number`] may have within a year.
    pub const MAX_SEQ: u32 = 9999;

    /// Greatest year a [`Number`] may be allocated in.
    pub const MAX_YEAR: i32 = 9999;

    /// Creates a new [`Number`] if both the `year` and the `seq` fit the
    /// 4-digit format.
    #[must_use]
    pub fn new(year: i32, seq: u32) -> Option<Self> {
        if !(1..=Self::MAX_SEQ).contains(&seq) {
            return None;
        }
        Some(Self {
            year: u16::try_from(year)
                .ok()
                .filter(|y| i32::from(*y) <= Self::MAX_YEAR)?,
            seq: u16::try_from(seq).ok()?,
        })
    }

    /// Returns the year of this [`Number`].
    #[must_use]
    pub fn year(self) -> i32 {
        i32::from(self.year)
    }

    /// Returns the sequential part of this [`Number`].
    #[must_use]
    pub fn seq(self) -> u32 {
        u32::from(self.seq)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}-{:04}", Self::PREFIX, self.year, self.seq)
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        /// Parses exactly 4 ASCII digits.
        fn digits(s: &str) -> Option<u32> {
            (s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()))
                .then(|| s.parse().ok())
                .flatten()
        }

        let (year, seq) = s
            .strip_prefix(Self::PREFIX)
            .and_then(|s| s.strip_prefix('-'))
            .and_then(|s| s.split_once('-'))
            .ok_or("invalid `Number` format")?;
        let year = digits(year)
            .and_then(|y| i32::try_from(y).ok())
            .ok_or("invalid `Number` year")?;
        let seq = digits(seq).ok_or("invalid `Number` sequence")?;

        Self::new(year, seq).ok_or("`Number` is out of range")
    }
}

#[cfg(feature = "postgres")]
impl<'a> FromSql<'a> for Number {
    fn from_sql(
        ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(<&str>::from_sql(ty, raw)?.parse()?)
    }

    fn accepts(ty: &Type) -> bool {
        <&str as FromSql<'_>>::accepts(ty)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Number {
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.to_string().to_sql(ty, w)
    }

    fn accepts(ty: &Type) -> bool {
        <String as ToSql>::accepts(ty)
    }
}

/// Per-tenant and per-year counter the sequential part of a [`Number`] is
/// allocated from.
#[derive(Clone, Copy, Debug)]
pub struct Sequence;

#[cfg(test)]
mod spec {
    use super::Number;

    #[test]
    fn formats_zero_padded() {
        assert_eq!(Number::new(2024, 1).unwrap().to_string(), "FAC-2024-0001");
        assert_eq!(
            Number::new(2024, 9999).unwrap().to_string(),
            "FAC-2024-9999",
        );
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Number::new(2024, 0).is_none());
        assert!(Number::new(2024, 10_000).is_none());
        assert!(Number::new(-1, 1).is_none());
        assert!(Number::new(10_000, 1).is_none());
    }

    #[test]
    fn parses() {
        let n: Number = "FAC-2024-0042".parse().unwrap();

        assert_eq!(n.year(), 2024);
        assert_eq!(n.seq(), 42);

        for invalid in [
            "",
            "FAC-2024-42",
            "FAC-2024-00042",
            "FAC-24-0001",
            "INV-2024-0001",
            "FAC-2024-0000",
            "FAC-2024-+001",
            "FAC_2024_0001",
        ] {
            assert!(invalid.parse::<Number>().is_err(), "{invalid}");
        }
    }

    #[test]
    fn orders_as_allocated() {
        let first = Number::new(2024, 9).unwrap();
        let second = Number::new(2024, 10).unwrap();
        let next_year = Number::new(2025, 1).unwrap();

        assert!(first < second);
        assert!(second < next_year);
        assert!(first.to_string() < second.to_string());
    }
}
