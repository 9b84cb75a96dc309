// Vendor Bills - resolve vendor + expense account, then create the bill
//
// Every step is one sequential Odoo call; the output of each is the input of
// the next. Nothing is rolled back: a vendor created here stays even when the
// bill creation that follows fails.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

use crate::command::BillIntent;
use crate::config::OdooCredentials;
use crate::error::{WebhookError, WebhookResult};
use crate::odoo::{DomainTerm, OdooClient, Session};

pub const PARTNER_MODEL: &str = "res.partner";
pub const ACCOUNT_MODEL: &str = "account.account";
pub const MOVE_MODEL: &str = "account.move";

/// Narration stamped on every bill created through the webhook
pub const NARRATION: &str = "Webhook auto-created";

// ============================================================================
// REMOTE RESOLVER
// ============================================================================

/// Find a supplier partner by exact name, creating it when absent.
pub async fn ensure_vendor(client: &OdooClient, session: &Session, name: &str) -> WebhookResult<i64> {
    let domain = [
        DomainTerm::new("name", "=", name),
        DomainTerm::new("supplier_rank", ">=", 1),
    ];

    if let Some(&partner_id) = client
        .search(session, PARTNER_MODEL, &domain, Some(1))
        .await?
        .first()
    {
        tracing::debug!(partner_id, vendor = %name, "Vendor found");
        return Ok(partner_id);
    }

    let partner_id = client
        .create(
            session,
            PARTNER_MODEL,
            json!({ "name": name, "supplier_rank": 1 }),
        )
        .await?;
    tracing::info!(partner_id, vendor = %name, "Vendor created");
    Ok(partner_id)
}

/// Pick an active expense account: "software" by name first, then any
/// account typed "Expenses".
pub async fn pick_expense_account(client: &OdooClient, session: &Session) -> WebhookResult<i64> {
    let searches = [
        [
            DomainTerm::new("name", "ilike", "software"),
            DomainTerm::new("deprecated", "=", false),
        ],
        [
            DomainTerm::new("user_type_id.name", "=", "Expenses"),
            DomainTerm::new("deprecated", "=", false),
        ],
    ];

    for domain in &searches {
        if let Some(&account_id) = client
            .search(session, ACCOUNT_MODEL, domain, Some(1))
            .await?
            .first()
        {
            tracing::debug!(account_id, "Expense account resolved");
            return Ok(account_id);
        }
    }

    tracing::warn!("No expense account matched either search");
    Err(WebhookError::AccountNotFound)
}

// ============================================================================
// BILL CREATOR
// ============================================================================

/// `account.move` values for a one-line vendor bill.
pub fn bill_values(
    partner_id: i64,
    account_id: i64,
    bill: &BillIntent,
    invoice_date: NaiveDate,
) -> Value {
    json!({
        "move_type": "in_invoice",
        "partner_id": partner_id,
        "invoice_date": invoice_date.format("%Y-%m-%d").to_string(),
        "invoice_line_ids": [[0, 0, {
            "name": bill.description,
            "quantity": 1,
            "price_unit": bill.amount,
            "account_id": account_id,
        }]],
        "narration": NARRATION,
    })
}

/// Create the vendor bill and return the new move id.
pub async fn create_bill(
    client: &OdooClient,
    session: &Session,
    partner_id: i64,
    account_id: i64,
    bill: &BillIntent,
    invoice_date: NaiveDate,
) -> WebhookResult<i64> {
    let values = bill_values(partner_id, account_id, bill, invoice_date);
    let move_id = client.create(session, MOVE_MODEL, values).await?;

    tracing::info!(
        move_id,
        partner_id,
        account_id,
        amount = bill.amount,
        currency = %bill.currency,
        "Vendor bill created"
    );
    Ok(move_id)
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Authenticate, resolve vendor and account, create the bill dated today (UTC).
pub async fn submit_bill(credentials: &OdooCredentials, bill: &BillIntent) -> WebhookResult<i64> {
    let client = OdooClient::new(credentials.url.as_str());
    submit_bill_with(&client, credentials, bill, Utc::now().date_naive()).await
}

/// Same as [`submit_bill`] with an explicit client and invoice date.
pub async fn submit_bill_with(
    client: &OdooClient,
    credentials: &OdooCredentials,
    bill: &BillIntent,
    invoice_date: NaiveDate,
) -> WebhookResult<i64> {
    let session = client.authenticate(credentials).await?;
    let partner_id = ensure_vendor(client, &session, &bill.vendor).await?;
    let account_id = pick_expense_account(client, &session).await?;
    create_bill(client, &session, partner_id, account_id, bill, invoice_date).await
}
