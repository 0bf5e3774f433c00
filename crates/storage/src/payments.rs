use chrono::{DateTime, Utc};
use kodi_core::{
    Dialect, MatchMethod, Money, PaymentEvent, RawRow, ReconciliationResult, ReconciliationStatus,
    TransactionOutcome, UploadRun,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::db::{parse_stored_datetime, DbPool, StorageError, DATETIME_FORMAT};
use crate::ledger::apply_invoice_payment;

// ── Payment events ───────────────────────────────────────────────────────────

/// Inserts an event unless `(provider, external_transaction_id)` already
/// exists. Returns the new row id, or `None` for a duplicate. The check and
/// the insert are one statement, so concurrent uploads cannot both win.
pub async fn insert_payment_event<'e, E>(
    executor: E,
    event: &PaymentEvent,
) -> Result<Option<i64>, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let raw_json = event.raw.to_json()?;
    let row = sqlx::query(
        r#"
        INSERT INTO payment_events (
            provider, external_transaction_id, landlord_id, amount_cents, occurred_at,
            narrative, payer_phone, payer_paybill, payer_account_ref,
            reconciliation_status, raw_json
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (provider, external_transaction_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&event.provider)
    .bind(&event.external_transaction_id)
    .bind(&event.landlord_id)
    .bind(event.amount.to_cents())
    .bind(event.occurred_at.format(DATETIME_FORMAT).to_string())
    .bind(&event.narrative)
    .bind(&event.payer_phone)
    .bind(&event.payer_paybill)
    .bind(&event.payer_account_ref)
    .bind(event.status.to_string())
    .bind(raw_json)
    .fetch_optional(executor)
    .await?;

    Ok(match row {
        Some(r) => Some(r.try_get("id")?),
        None => None,
    })
}

pub async fn find_payment_event(
    pool: &DbPool,
    provider: &str,
    external_transaction_id: &str,
) -> Result<Option<PaymentEvent>, StorageError> {
    let row = sqlx::query(
        r#"
        SELECT id, provider, external_transaction_id, landlord_id, amount_cents, occurred_at,
               narrative, payer_phone, payer_paybill, payer_account_ref, reconciliation_status,
               matched_invoice_id, matched_lease_id, confidence, method, raw_json
        FROM payment_events
        WHERE provider = ? AND external_transaction_id = ?
        "#,
    )
    .bind(provider)
    .bind(external_transaction_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(event_from_row).transpose()
}

pub async fn count_payment_events(pool: &DbPool) -> Result<i64, StorageError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_events")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn event_from_row(r: &SqliteRow) -> Result<PaymentEvent, StorageError> {
    let occurred_at: String = r.try_get("occurred_at")?;
    let status: String = r.try_get("reconciliation_status")?;
    let method: Option<String> = r.try_get("method")?;
    let confidence: Option<i64> = r.try_get("confidence")?;
    let raw_json: String = r.try_get("raw_json")?;

    Ok(PaymentEvent {
        id: Some(r.try_get("id")?),
        provider: r.try_get("provider")?,
        external_transaction_id: r.try_get("external_transaction_id")?,
        landlord_id: r.try_get("landlord_id")?,
        amount: Money::from_cents(r.try_get("amount_cents")?),
        occurred_at: parse_stored_datetime(&occurred_at)?,
        narrative: r.try_get("narrative")?,
        payer_phone: r.try_get("payer_phone")?,
        payer_paybill: r.try_get("payer_paybill")?,
        payer_account_ref: r.try_get("payer_account_ref")?,
        status: status
            .parse::<ReconciliationStatus>()
            .map_err(StorageError::InvalidData)?,
        matched_invoice_id: r.try_get("matched_invoice_id")?,
        matched_lease_id: r.try_get("matched_lease_id")?,
        confidence: confidence.map(|c| c.clamp(0, 100) as u8),
        method: method
            .map(|m| m.parse::<MatchMethod>())
            .transpose()
            .map_err(StorageError::InvalidData)?,
        raw: RawRow::from_json(&raw_json)?,
    })
}

/// Folds the matcher's decision into the stored event.
pub async fn update_payment_event_match<'e, E>(
    executor: E,
    event_id: i64,
    result: &ReconciliationResult,
) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let status = if result.matched {
        ReconciliationStatus::Matched
    } else {
        ReconciliationStatus::Unmatched
    };
    let reasons_json = serde_json::to_string(&result.reasons)?;

    let updated = sqlx::query(
        r#"
        UPDATE payment_events
        SET reconciliation_status = ?, matched_invoice_id = ?, matched_lease_id = ?,
            confidence = ?, method = ?, reasons_json = ?
        WHERE id = ?
        "#,
    )
    .bind(status.to_string())
    .bind(&result.invoice_id)
    .bind(&result.lease_id)
    .bind(i64::from(result.confidence))
    .bind(result.method.map(|m| m.as_str()))
    .bind(reasons_json)
    .bind(event_id)
    .execute(executor)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(StorageError::InvalidData(format!("unknown payment event {event_id}")));
    }
    Ok(())
}

/// What [`record_payment`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPayment {
    pub event_id: i64,
    /// Set when the payment was applied to a matched invoice.
    pub invoice: Option<InvoiceSettlement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSettlement {
    pub invoice_id: String,
    /// Balance still owed after this payment.
    pub remaining: Money,
    /// Part of the payment the invoice could not absorb.
    pub unapplied: Money,
}

/// Stores a reconciled payment in one database transaction: the event, the
/// matcher's decision, and the payment against the matched invoice. Returns
/// `None` without writing anything when the event key already exists. Any
/// failure rolls the whole payment back, so a later upload of the same
/// statement processes it again.
pub async fn record_payment(
    pool: &DbPool,
    event: &PaymentEvent,
    result: &ReconciliationResult,
) -> Result<Option<RecordedPayment>, StorageError> {
    let mut tx = pool.begin().await?;

    let Some(event_id) = insert_payment_event(&mut *tx, event).await? else {
        tx.rollback().await?;
        return Ok(None);
    };
    update_payment_event_match(&mut *tx, event_id, result).await?;

    let invoice = match (result.matched, result.invoice_id.as_deref()) {
        (true, Some(invoice_id)) => {
            let due: Option<(i64,)> =
                sqlx::query_as("SELECT amount_due_cents FROM invoices WHERE id = ?")
                    .bind(invoice_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let remaining = apply_invoice_payment(&mut *tx, invoice_id, event.amount).await?;
            let due = Money::from_cents(due.map(|(cents,)| cents).unwrap_or_default());
            let unapplied = if event.amount > due {
                event.amount - due
            } else {
                Money::zero()
            };
            Some(InvoiceSettlement {
                invoice_id: invoice_id.to_string(),
                remaining,
                unapplied,
            })
        }
        _ => None,
    };

    tx.commit().await?;
    Ok(Some(RecordedPayment { event_id, invoice }))
}

// ── Upload history ───────────────────────────────────────────────────────────

pub async fn insert_upload_run(pool: &DbPool, run: &UploadRun) -> Result<i64, StorageError> {
    let details_json = serde_json::to_string(&run.details)?;
    let created_at = run.created_at.unwrap_or_else(Utc::now).to_rfc3339();

    let row = sqlx::query(
        r#"
        INSERT INTO upload_runs (
            file_name, dialect, provider, landlord_id, content_hash,
            total, matched, unmatched, duplicates, errors, details_json, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&run.file_name)
    .bind(run.dialect.as_str())
    .bind(&run.provider)
    .bind(&run.landlord_id)
    .bind(&run.content_hash)
    .bind(run.total)
    .bind(run.matched)
    .bind(run.unmatched)
    .bind(run.duplicates)
    .bind(run.errors)
    .bind(details_json)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("id")?)
}

/// Most recent uploads first.
pub async fn list_upload_runs(pool: &DbPool, limit: i64) -> Result<Vec<UploadRun>, StorageError> {
    let rows = sqlx::query(
        r#"
        SELECT id, file_name, dialect, provider, landlord_id, content_hash,
               total, matched, unmatched, duplicates, errors, details_json, created_at
        FROM upload_runs
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

fn run_from_row(r: &SqliteRow) -> Result<UploadRun, StorageError> {
    let dialect: String = r.try_get("dialect")?;
    let details_json: String = r.try_get("details_json")?;
    let created_at: String = r.try_get("created_at")?;

    let details: Vec<TransactionOutcome> = serde_json::from_str(&details_json)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StorageError::InvalidData(format!("timestamp '{created_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(UploadRun {
        id: Some(r.try_get("id")?),
        file_name: r.try_get("file_name")?,
        dialect: dialect
            .parse::<Dialect>()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?,
        provider: r.try_get("provider")?,
        landlord_id: r.try_get("landlord_id")?,
        content_hash: r.try_get("content_hash")?,
        total: r.try_get("total")?,
        matched: r.try_get("matched")?,
        unmatched: r.try_get("unmatched")?,
        duplicates: r.try_get("duplicates")?,
        errors: r.try_get("errors")?,
        details,
        created_at: Some(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kodi_core::{Direction, NormalizedTransaction};

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::create_db(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    fn tx(reference: &str) -> NormalizedTransaction {
        let headers = vec!["Receipt No.".to_string(), "Paid In".to_string()];
        let cells = vec![reference.to_string(), "15,000.00".to_string()];
        NormalizedTransaction {
            reference: reference.to_string(),
            occurred_at: NaiveDate::from_ymd_opt(2026, 2, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            amount: Money::from_cents(1_500_000),
            direction: Direction::Credit,
            narrative: "MPESA PAYBILL 222111 - 254712345678".to_string(),
            running_balance: None,
            payer_phone: Some("254712345678".to_string()),
            payer_paybill: Some("222111".to_string()),
            payer_account_ref: None,
            raw: RawRow::from_cells(Some(headers.as_slice()), &cells),
        }
    }

    // ── payment events ──

    #[tokio::test]
    async fn duplicate_insert_returns_none() {
        let (_dir, pool) = test_db().await;
        let event = PaymentEvent::from_transaction(&tx("QAB1234567"), "mpesa", "L1");

        let first = insert_payment_event(&pool, &event).await.unwrap();
        assert!(first.is_some());
        let second = insert_payment_event(&pool, &event).await.unwrap();
        assert_eq!(second, None);
        assert_eq!(count_payment_events(&pool).await.unwrap(), 1);

        // Same reference from another provider is a different payment.
        let other = PaymentEvent::from_transaction(&tx("QAB1234567"), "kcb", "L1");
        assert!(insert_payment_event(&pool, &other).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stored_event_reads_back_with_match() {
        let (_dir, pool) = test_db().await;
        let event = PaymentEvent::from_transaction(&tx("QAB1234567"), "mpesa", "L1");
        let id = insert_payment_event(&pool, &event).await.unwrap().unwrap();

        let stored = find_payment_event(&pool, "mpesa", "QAB1234567").await.unwrap().unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.status, ReconciliationStatus::Unmatched);
        assert_eq!(stored.amount, Money::from_cents(1_500_000));
        assert_eq!(stored.occurred_at, event.occurred_at);
        assert_eq!(stored.raw.get("Paid In"), Some("15,000.00"));

        let result = ReconciliationResult::matched(
            MatchMethod::PhoneAmount,
            95,
            Some("lease-1".to_string()),
            Some("inv-1".to_string()),
            vec!["phone and amount".to_string()],
        );
        update_payment_event_match(&pool, id, &result).await.unwrap();

        let stored = find_payment_event(&pool, "mpesa", "QAB1234567").await.unwrap().unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Matched);
        assert_eq!(stored.matched_invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(stored.matched_lease_id.as_deref(), Some("lease-1"));
        assert_eq!(stored.confidence, Some(95));
        assert_eq!(stored.method, Some(MatchMethod::PhoneAmount));
    }

    // ── recorded payments ──

    async fn seed_invoice(pool: &DbPool, due_cents: i64) {
        crate::insert_lease(
            pool,
            &kodi_core::Lease {
                id: "lease-1".to_string(),
                landlord_id: "L1".to_string(),
                tenant_name: "Achieng".to_string(),
                tenant_phone: Some("254712345678".to_string()),
                account_ref: None,
                monthly_rent: Money::from_cents(2_000_000),
                active: true,
            },
        )
        .await
        .unwrap();
        crate::insert_invoice(
            pool,
            &kodi_core::OutstandingInvoice {
                id: "inv-1".to_string(),
                lease_id: "lease-1".to_string(),
                amount_due: Money::from_cents(due_cents),
                due_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                external_reference: None,
            },
        )
        .await
        .unwrap();
    }

    fn matched_to(invoice_id: &str) -> ReconciliationResult {
        ReconciliationResult::matched(
            MatchMethod::PhoneAmount,
            90,
            Some("lease-1".to_string()),
            Some(invoice_id.to_string()),
            vec!["phone and rent".to_string()],
        )
    }

    #[tokio::test]
    async fn record_payment_settles_invoice_and_reports_surplus() {
        let (_dir, pool) = test_db().await;
        seed_invoice(&pool, 1_000_000).await;
        let event = PaymentEvent::from_transaction(&tx("QAB1234567"), "mpesa", "L1");

        let recorded = record_payment(&pool, &event, &matched_to("inv-1"))
            .await
            .unwrap()
            .unwrap();
        let settlement = recorded.invoice.unwrap();
        assert_eq!(settlement.invoice_id, "inv-1");
        assert!(settlement.remaining.is_zero());
        assert_eq!(settlement.unapplied, Money::from_cents(500_000));

        let stored = find_payment_event(&pool, "mpesa", "QAB1234567").await.unwrap().unwrap();
        assert_eq!(stored.id, Some(recorded.event_id));
        assert_eq!(stored.status, ReconciliationStatus::Matched);
        assert!(crate::list_outstanding_invoices(&pool, "L1").await.unwrap().is_empty());

        assert_eq!(record_payment(&pool, &event, &matched_to("inv-1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_invoice_update_rolls_back_the_event() {
        let (_dir, pool) = test_db().await;
        seed_invoice(&pool, 1_500_000).await;
        let event = PaymentEvent::from_transaction(&tx("QAB1234567"), "mpesa", "L1");

        let err = record_payment(&pool, &event, &matched_to("inv-gone")).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
        assert_eq!(count_payment_events(&pool).await.unwrap(), 0);

        // Nothing was half-written, so the same payment can be recorded again.
        let recorded = record_payment(&pool, &event, &matched_to("inv-1")).await.unwrap();
        assert!(recorded.is_some());
        assert!(crate::list_outstanding_invoices(&pool, "L1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_payment_is_recorded_without_settlement() {
        let (_dir, pool) = test_db().await;
        let event = PaymentEvent::from_transaction(&tx("QAB1234567"), "mpesa", "L1");
        let result = ReconciliationResult::unmatched(vec!["no lease".to_string()]);

        let recorded = record_payment(&pool, &event, &result).await.unwrap().unwrap();
        assert_eq!(recorded.invoice, None);
        let stored = find_payment_event(&pool, "mpesa", "QAB1234567").await.unwrap().unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Unmatched);
    }

    #[tokio::test]
    async fn missing_event_is_none() {
        let (_dir, pool) = test_db().await;
        assert!(find_payment_event(&pool, "mpesa", "NOPE").await.unwrap().is_none());
    }

    // ── upload runs ──

    #[tokio::test]
    async fn upload_runs_listed_newest_first() {
        let (_dir, pool) = test_db().await;

        let mut first = UploadRun::new("feb.csv", Dialect::Mpesa, "mpesa", "L1");
        first.record(TransactionOutcome::duplicate(&tx("QAB0000001")));
        let first_id = insert_upload_run(&pool, &first).await.unwrap();

        let mut second = UploadRun::new("march.csv", Dialect::Kcb, "kcb", "L1");
        second.content_hash = Some("abc123".to_string());
        second.record(TransactionOutcome::error(&tx("FT1"), "disk full"));
        let second_id = insert_upload_run(&pool, &second).await.unwrap();

        let runs = list_upload_runs(&pool, 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, Some(second_id));
        assert_eq!(runs[0].dialect, Dialect::Kcb);
        assert_eq!(runs[0].errors, 1);
        assert_eq!(runs[0].content_hash.as_deref(), Some("abc123"));
        assert_eq!(runs[0].details[0].error.as_deref(), Some("disk full"));
        assert!(runs[0].created_at.is_some());
        assert_eq!(runs[1].id, Some(first_id));
        assert_eq!(runs[1].duplicates, 1);

        assert_eq!(list_upload_runs(&pool, 1).await.unwrap().len(), 1);
    }
}
