//! [`Invoice`] read models definitions.

use common::Money;
use derive_more::{From, Into};

use crate::domain::invoice::{self, Status};
#[cfg(doc)]
use crate::domain::Invoice;

/// Number of the non-archived [`Invoice`]s of a tenant.
#[derive(Clone, Copy, Debug, Default, Eq, From, Hash, Into, PartialEq)]
pub struct ActiveCount(u32);

/// Aggregated [`Invoice`]s of a single [`Status`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusSummary {
    /// [`Status`] of the aggregated [`Invoice`]s.
    pub status: Status,

    /// Number of the aggregated [`Invoice`]s.
    pub count: u32,

    /// Sum of the aggregated [`Invoice::total`]s.
    pub total: Money,
}

/// Per-[`Status`] summary of the non-archived [`Invoice`]s of a tenant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Summary {
    /// [`StatusSummary`] of every [`Status`], in [`Status::ALL`] order.
    statuses: Vec<StatusSummary>,
}

impl Summary {
    /// Creates a new [`Summary`] merging the provided [`StatusSummary`]
    /// groups.
    ///
    /// Every [`Status`] is present in the resulting [`Summary`], even if
    /// there are no groups of it.
    #[must_use]
    pub fn new(groups: impl IntoIterator<Item = StatusSummary>) -> Self {
        let mut statuses = Status::ALL
            .iter()
            .map(|&status| StatusSummary {
                status,
                count: 0,
                total: Money::ZERO,
            })
            .collect::<Vec<_>>();
        for group in groups {
            let found =
                statuses.iter_mut().find(|s| s.status == group.status);
            if let Some(s) = found {
                s.count += group.count;
                s.total = s.total + group.total;
            }
        }
        Self { statuses }
    }

    /// Returns [`StatusSummary`] of every [`Status`].
    #[must_use]
    pub fn statuses(&self) -> &[StatusSummary] {
        &self.statuses
    }

    /// Returns [`StatusSummary`] of the provided [`Status`].
    #[must_use]
    pub fn of(&self, status: Status) -> Option<&StatusSummary> {
        self.statuses.iter().find(|s| s.status == status)
    }

    /// Returns the total number of the summarized [`Invoice`]s.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.statuses.iter().map(|s| s.count).sum()
    }

    /// Returns the sum of all the summarized [`Invoice::total`]s.
    #[must_use]
    pub fn total(&self) -> Money {
        self.statuses.iter().map(|s| s.total).sum()
    }
}

pub mod list {
    //! [`Invoice`]s list definitions.

    use crate::domain::{case, client, invoice::Status, tenant, Invoice};

    /// Selector of [`Invoice`]s of a tenant.
    #[derive(Clone, Copy, Debug)]
    pub struct Selector {
        /// ID of the tenant owning the [`Invoice`]s.
        pub tenant_id: tenant::Id,

        /// [`Filter`] of the [`Invoice`]s.
        pub filter: Filter,
    }

    /// Filter of an [`Invoice`]s list.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// [`Status`] the [`Invoice`]s should have.
        pub status: Option<Status>,

        /// Indicator whether archived [`Invoice`]s are included.
        pub include_archived: bool,

        /// ID of the [`Case`] the [`Invoice`]s should bill.
        ///
        /// [`Case`]: crate::domain::Case
        pub case_id: Option<case::Id>,

        /// ID of the client the [`Invoice`]s should be addressed to.
        pub client_id: Option<client::Id>,
    }

    impl Filter {
        /// Checks whether the provided [`Invoice`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, invoice: &Invoice) -> bool {
            (self.include_archived || !invoice.archived)
                && self.status.map_or(true, |s| invoice.status == s)
                && self.case_id.map_or(true, |id| invoice.case_id == id)
                && self
                    .client_id
                    .map_or(true, |id| invoice.client_id == Some(id))
        }
    }
}

impl From<&invoice::Invoice> for StatusSummary {
    fn from(invoice: &invoice::Invoice) -> Self {
        Self {
            status: invoice.status,
            count: 1,
            total: invoice.total,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::domain::{
        invoice::{self, Status},
        tenant,
    };

    use super::{list::Filter, StatusSummary, Summary};

    #[test]
    fn summary_covers_every_status() {
        let summary = Summary::new([
            StatusSummary {
                status: Status::Paid,
                count: 2,
                total: "100.00".parse().unwrap(),
            },
            StatusSummary {
                status: Status::Paid,
                count: 1,
                total: "20.50".parse().unwrap(),
            },
            StatusSummary {
                status: Status::Sent,
                count: 1,
                total: "1.00".parse().unwrap(),
            },
        ]);

        assert_eq!(summary.statuses().len(), Status::ALL.len());
        assert_eq!(summary.of(Status::Paid).unwrap().count, 3);
        assert_eq!(
            summary.of(Status::Paid).unwrap().total,
            "120.50".parse::<Money>().unwrap(),
        );
        assert_eq!(summary.of(Status::Draft).unwrap().count, 0);
        assert_eq!(summary.of(Status::Overdue).unwrap().total, Money::ZERO);
        assert_eq!(summary.count(), 4);
        assert_eq!(summary.total(), "121.50".parse::<Money>().unwrap());
    }

    #[test]
    fn filter_matches() {
        let now = DateTime::from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let mut inv = invoice::spec::invoice(tenant::Id::new(), now);

        assert!(Filter::default().matches(&inv));
        assert!(Filter {
            status: Some(Status::Sent),
            case_id: Some(inv.case_id),
            ..Filter::default()
        }
        .matches(&inv));
        assert!(!Filter {
            status: Some(Status::Paid),
            ..Filter::default()
        }
        .matches(&inv));
        assert!(!Filter {
            client_id: Some(crate::domain::client::Id::new()),
            ..Filter::default()
        }
        .matches(&inv));

        inv.archived = true;
        assert!(!Filter::default().matches(&inv));
        assert!(Filter {
            include_archived: true,
            ..Filter::default()
        }
        .matches(&inv));
    }
}
