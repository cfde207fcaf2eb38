//! [`Invoice`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{Allocate, By, Insert, Lock, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        invoice::{self, Line},
        tenant, Invoice,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `invoices` table to build an [`Invoice`] from.
macro_rules! columns {
    () => {
        "id, tenant_id, number, case_id, client_id, \
         tax_rate, subtotal, tax, total, \
         status, issued_at, due_at, paid_at, \
         notes, archived, updated_at"
    };
}

impl<C> Postgres<C>
where
    C: Connection,
{
    /// Queries [`Invoice`]s with the provided SQL statement selecting the
    /// `columns!()`, loading their [`Line`]s.
    async fn invoices(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Invoice>, Traced<database::Error>> {
        let rows = self.query(sql, params).await.map_err(tracerr::wrap!())?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids = rows
            .iter()
            .map(|row| row.get("id"))
            .collect::<Vec<invoice::Id>>();
        let mut lines = self.lines(&ids).await.map_err(tracerr::wrap!())?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: invoice::Id = row.get("id");
                invoice_from_row(&row, lines.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    /// Loads [`Line`]s of the [`Invoice`]s with the provided IDs, in their
    /// positions order.
    async fn lines(
        &self,
        ids: &[invoice::Id],
    ) -> Result<HashMap<invoice::Id, Vec<Line>>, Traced<database::Error>> {
        const SQL: &str = "\
            SELECT invoice_id, description, quantity, unit_price \
            FROM invoice_lines \
            WHERE invoice_id = ANY($1::UUID[]) \
            ORDER BY invoice_id, position";
        let rows = self.query(SQL, &[&ids]).await.map_err(tracerr::wrap!())?;

        let mut lines = HashMap::<_, Vec<_>>::with_capacity(ids.len());
        for row in rows {
            lines.entry(row.get("invoice_id")).or_default().push(Line {
                description: row.get("description"),
                quantity: row.get("quantity"),
                unit_price: row.get("unit_price"),
            });
        }
        Ok(lines)
    }

    /// Stores the provided [`Line`]s of the [`Invoice`] with the provided
    /// ID, in their positions order.
    async fn insert_lines(
        &self,
        id: invoice::Id,
        lines: &[Line],
    ) -> Result<(), Traced<database::Error>> {
        let (positions, descriptions): (Vec<i32>, Vec<_>) = (1..)
            .zip(lines)
            .map(|(pos, l)| (pos, AsRef::<str>::as_ref(&l.description)))
            .unzip();
        let quantities =
            lines.iter().map(|l| l.quantity.value()).collect::<Vec<_>>();
        let unit_prices =
            lines.iter().map(|l| l.unit_price.amount()).collect::<Vec<_>>();
        let totals =
            lines.iter().map(|l| l.total().amount()).collect::<Vec<_>>();

        const SQL: &str = "\
            INSERT INTO invoice_lines (invoice_id, position, description, \
                                       quantity, unit_price, total) \
            SELECT $1::UUID, l.position, l.description, \
                   l.quantity, l.unit_price, l.total \
            FROM UNNEST($2::INT4[], $3::VARCHAR[], \
                        $4::NUMERIC[], $5::NUMERIC[], $6::NUMERIC[]) \
                 AS l(position, description, quantity, unit_price, total)";
        self.exec(
            SQL,
            &[
                &id,
                &positions,
                &descriptions,
                &quantities,
                &unit_prices,
                &totals,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

/// Builds an [`Invoice`] out of the provided `columns!()` [`Row`] and its
/// [`Line`]s.
fn invoice_from_row(row: &Row, lines: Vec<Line>) -> Invoice {
    Invoice {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        number: row.get("number"),
        case_id: row.get("case_id"),
        client_id: row.get("client_id"),
        lines,
        tax_rate: row.get("tax_rate"),
        subtotal: row.get("subtotal"),
        tax: row.get("tax"),
        total: row.get("total"),
        status: row.get("status"),
        issued_at: row.get("issued_at"),
        due_at: row.get("due_at"),
        paid_at: row.get("paid_at"),
        notes: row.get("notes"),
        archived: row.get("archived"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Invoice>, (tenant::Id, invoice::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, (tenant::Id, invoice::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, id) = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM invoices \
              WHERE id = $1::UUID \
                AND tenant_id = $2::UUID"
        );
        Ok(self
            .invoices(SQL, &[&id, &tenant_id])
            .await
            .map_err(tracerr::wrap!())?
            .pop())
    }
}

impl<C> Database<Lock<By<Invoice, (tenant::Id, invoice::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Invoice, (tenant::Id, invoice::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, id) = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM invoices \
            WHERE id = $1::UUID \
              AND tenant_id = $2::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id, &tenant_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Insert<Invoice>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(invoice): Insert<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        let Invoice {
            id,
            tenant_id,
            number,
            case_id,
            client_id,
            lines,
            tax_rate,
            subtotal,
            tax,
            total,
            status,
            issued_at,
            due_at,
            paid_at,
            notes,
            archived,
            updated_at,
        } = invoice;
        let seq = i32::try_from(number.seq()).unwrap_or(i32::MAX);

        const SQL: &str = "\
            INSERT INTO invoices (id, tenant_id, number, year, seq, \
                                  case_id, client_id, \
                                  tax_rate, subtotal, tax, total, \
                                  status, issued_at, due_at, paid_at, \
                                  notes, archived, updated_at) \
            VALUES ($1::UUID, $2::UUID, $3::VARCHAR, $4::INT4, $5::INT4, \
                    $6::UUID, $7::UUID, \
                    $8::NUMERIC, $9::NUMERIC, $10::NUMERIC, $11::NUMERIC, \
                    $12::INT2, $13::TIMESTAMPTZ, $14::TIMESTAMPTZ, \
                    $15::TIMESTAMPTZ, \
                    $16::VARCHAR, $17::BOOLEAN, $18::TIMESTAMPTZ)";
        self.exec(
            SQL,
            &[
                &id,
                &tenant_id,
                &number,
                &number.year(),
                &seq,
                &case_id,
                &client_id,
                &tax_rate,
                &subtotal,
                &tax,
                &total,
                &status,
                &issued_at,
                &due_at,
                &paid_at,
                &notes,
                &archived,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        self.insert_lines(id, &lines)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Invoice>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(invoice): Update<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        // Identity of an `Invoice` is never updated.
        let Invoice {
            id,
            tenant_id,
            number: _,
            case_id: _,
            client_id,
            lines,
            tax_rate,
            subtotal,
            tax,
            total,
            status,
            issued_at: _,
            due_at,
            paid_at,
            notes,
            archived,
            updated_at,
        } = invoice;

        const SQL: &str = "\
            UPDATE invoices \
            SET client_id = $2::UUID, \
                tax_rate = $3::NUMERIC, \
                subtotal = $4::NUMERIC, \
                tax = $5::NUMERIC, \
                total = $6::NUMERIC, \
                status = $7::INT2, \
                due_at = $8::TIMESTAMPTZ, \
                paid_at = $9::TIMESTAMPTZ, \
                notes = $10::VARCHAR, \
                archived = $11::BOOLEAN, \
                updated_at = $12::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND tenant_id = $13::UUID";
        let updated = self
            .exec(
                SQL,
                &[
                    &id,
                    &client_id,
                    &tax_rate,
                    &subtotal,
                    &tax,
                    &total,
                    &status,
                    &due_at,
                    &paid_at,
                    &notes,
                    &archived,
                    &updated_at,
                    &tenant_id,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        if updated == 0 {
            return Ok(());
        }

        const DELETE_LINES_SQL: &str = "\
            DELETE FROM invoice_lines \
            WHERE invoice_id = $1::UUID";
        self.exec(DELETE_LINES_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;

        self.insert_lines(id, &lines)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Allocate<By<invoice::Sequence, (tenant::Id, i32)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = u32;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Allocate(by): Allocate<By<invoice::Sequence, (tenant::Id, i32)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, year) = by.into_inner();

        // Counter never falls behind the numbers already stored, so numbers
        // imported bypassing it are never reissued.
        const SQL: &str = "\
            INSERT INTO invoice_counters (tenant_id, year, last_seq) \
            VALUES ($1::UUID, $2::INT4, \
                    (SELECT COALESCE(MAX(seq), 0) \
                     FROM invoices \
                     WHERE tenant_id = $1::UUID \
                       AND year = $2::INT4) + 1) \
            ON CONFLICT (tenant_id, year) DO UPDATE \
            SET last_seq = GREATEST(invoice_counters.last_seq, \
                                    EXCLUDED.last_seq - 1) + 1 \
            RETURNING last_seq";
        let row = self
            .query(SQL, &[&tenant_id, &year])
            .await
            .map_err(tracerr::wrap!())?
            .pop();
        Ok(row.map_or(0, |row| {
            u32::try_from(row.get::<_, i32>("last_seq")).unwrap_or(u32::MAX)
        }))
    }
}

impl<C> Database<Select<By<Vec<Invoice>, read::invoice::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Invoice>, read::invoice::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::invoice::list::Selector {
            tenant_id,
            filter:
                read::invoice::list::Filter {
                    status,
                    include_archived,
                    case_id,
                    client_id,
                },
        } = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&tenant_id];

        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let case_idx = case_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let client_idx = client_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });

        let sql = format!(
            concat!(
                "SELECT ",
                columns!(),
                " FROM invoices \
                  WHERE tenant_id = $1::UUID \
                        {archived} \
                        {status} \
                        {case} \
                        {client} \
                  ORDER BY issued_at DESC, id DESC"
            ),
            archived = if include_archived { "" } else { "AND NOT archived" },
            status = status_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND status = ${idx}::INT2"))
            }),
            case = case_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND case_id = ${idx}::UUID"))
            }),
            client = client_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND client_id = ${idx}::UUID"))
            }),
        );
        self.invoices(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<read::invoice::ActiveCount, tenant::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::invoice::ActiveCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::invoice::ActiveCount, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let tenant_id: tenant::Id = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*) AS count \
            FROM invoices \
            WHERE tenant_id = $1::UUID \
              AND NOT archived";
        let count = self
            .query_opt(SQL, &[&tenant_id])
            .await
            .map_err(tracerr::wrap!())?
            .map_or(0, |row| row.get::<_, i64>("count"));
        Ok(u32::try_from(count).unwrap_or(u32::MAX).into())
    }
}

impl<C> Database<Select<By<read::invoice::Summary, tenant::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::invoice::Summary;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::invoice::Summary, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let tenant_id: tenant::Id = by.into_inner();

        const SQL: &str = "\
            SELECT status, COUNT(*) AS count, SUM(total) AS total \
            FROM invoices \
            WHERE tenant_id = $1::UUID \
              AND NOT archived \
            GROUP BY status";
        let rows = self
            .query(SQL, &[&tenant_id])
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::invoice::Summary::new(rows.into_iter().map(|row| {
            read::invoice::StatusSummary {
                status: row.get("status"),
                count: u32::try_from(row.get::<_, i64>("count"))
                    .unwrap_or(u32::MAX),
                total: Money::new(row.get::<_, Decimal>("total")),
            }
        })))
    }
}
