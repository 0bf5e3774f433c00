//! Leases, payment channels and invoices: the books the matcher reads.

use kodi_core::{ChannelKind, Lease, Money, OutstandingInvoice, PaymentChannel, ReconciliationContext};
use sqlx::{Executor, Row, Sqlite};

use crate::db::{parse_stored_date, DbPool, StorageError, DATE_FORMAT};

pub async fn insert_lease(pool: &DbPool, lease: &Lease) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO leases (id, landlord_id, tenant_name, tenant_phone, account_ref, monthly_rent_cents, active) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&lease.id)
    .bind(&lease.landlord_id)
    .bind(&lease.tenant_name)
    .bind(&lease.tenant_phone)
    .bind(&lease.account_ref)
    .bind(lease.monthly_rent.to_cents())
    .bind(lease.active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_payment_channel(pool: &DbPool, channel: &PaymentChannel) -> Result<(), StorageError> {
    sqlx::query("INSERT OR IGNORE INTO payment_channels (landlord_id, kind, number) VALUES (?, ?, ?)")
        .bind(&channel.landlord_id)
        .bind(channel.kind.as_str())
        .bind(&channel.number)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_invoice(pool: &DbPool, invoice: &OutstandingInvoice) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO invoices (id, lease_id, amount_due_cents, due_date, external_reference) VALUES (?, ?, ?, ?, ?)"
    )
    .bind(&invoice.id)
    .bind(&invoice.lease_id)
    .bind(invoice.amount_due.to_cents())
    .bind(invoice.due_date.format(DATE_FORMAT).to_string())
    .bind(&invoice.external_reference)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_active_leases(pool: &DbPool, landlord_id: &str) -> Result<Vec<Lease>, StorageError> {
    let rows = sqlx::query_as::<_, (String, String, String, Option<String>, Option<String>, i64, bool)>(
        "SELECT id, landlord_id, tenant_name, tenant_phone, account_ref, monthly_rent_cents, active FROM leases WHERE active = 1 AND landlord_id = ? ORDER BY id"
    )
    .bind(landlord_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Lease {
            id: r.0,
            landlord_id: r.1,
            tenant_name: r.2,
            tenant_phone: r.3,
            account_ref: r.4,
            monthly_rent: Money::from_cents(r.5),
            active: r.6,
        })
        .collect())
}

/// Every registered channel, across all landlords, so a number shared by
/// several landlords is visible as such.
pub async fn list_payment_channels(pool: &DbPool) -> Result<Vec<PaymentChannel>, StorageError> {
    let rows = sqlx::query_as::<_, (String, String, String)>(
        "SELECT landlord_id, kind, number FROM payment_channels ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(landlord_id, kind, number)| -> Result<PaymentChannel, StorageError> {
            let kind = kind.parse::<ChannelKind>().map_err(StorageError::InvalidData)?;
            Ok(PaymentChannel { landlord_id, kind, number })
        })
        .collect()
}

pub async fn list_outstanding_invoices(
    pool: &DbPool,
    landlord_id: &str,
) -> Result<Vec<OutstandingInvoice>, StorageError> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.lease_id, i.amount_due_cents, i.due_date, i.external_reference
        FROM invoices i
        JOIN leases l ON l.id = i.lease_id
        WHERE i.status = 'outstanding' AND l.landlord_id = ?
        ORDER BY i.due_date, i.id
        "#,
    )
    .bind(landlord_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| -> Result<OutstandingInvoice, StorageError> {
            let due_date: String = r.try_get("due_date")?;
            Ok(OutstandingInvoice {
                id: r.try_get("id")?,
                lease_id: r.try_get("lease_id")?,
                amount_due: Money::from_cents(r.try_get("amount_due_cents")?),
                due_date: parse_stored_date(&due_date)?,
                external_reference: r.try_get("external_reference")?,
            })
        })
        .collect()
}

/// Snapshot of one landlord's books for the matcher.
pub async fn load_reconciliation_context(
    pool: &DbPool,
    landlord_id: &str,
) -> Result<ReconciliationContext, StorageError> {
    Ok(ReconciliationContext {
        leases: list_active_leases(pool, landlord_id).await?,
        channels: list_payment_channels(pool).await?,
        invoices: list_outstanding_invoices(pool, landlord_id).await?,
    })
}

/// Reduces the invoice balance by `amount`, marking it paid once nothing is
/// owed. Returns the remaining balance.
pub async fn apply_invoice_payment<'e, E>(
    executor: E,
    invoice_id: &str,
    amount: Money,
) -> Result<Money, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let cents = amount.to_cents();
    let row = sqlx::query(
        r#"
        UPDATE invoices
        SET amount_due_cents = MAX(amount_due_cents - ?, 0),
            status = CASE WHEN amount_due_cents - ? <= 0 THEN 'paid' ELSE status END
        WHERE id = ?
        RETURNING amount_due_cents
        "#,
    )
    .bind(cents)
    .bind(cents)
    .bind(invoice_id)
    .fetch_optional(executor)
    .await?;

    match row {
        Some(r) => Ok(Money::from_cents(r.try_get("amount_due_cents")?)),
        None => Err(StorageError::InvalidData(format!("unknown invoice '{invoice_id}'"))),
    }
}
