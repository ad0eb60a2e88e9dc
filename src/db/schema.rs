//! PostgreSQL schema bootstrap
//!
//! Every statement is `IF NOT EXISTS`, so running it on each start is safe.

use anyhow::Result;
use sqlx::PgPool;

/// Create the ledger tables, indexes and the account number sequence
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    for &(name, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    tracing::info!("Ledger schema initialized successfully");
    Ok(())
}

const SCHEMA: &[(&str, &str)] = &[
    ("account_number_seq", CREATE_ACCOUNT_NUMBER_SEQ),
    ("accounts_tb", CREATE_ACCOUNTS_TABLE),
    ("movements_tb", CREATE_MOVEMENTS_TABLE),
    ("idx_movements_account", CREATE_MOVEMENTS_INDEX),
    ("transfers_tb", CREATE_TRANSFERS_TABLE),
    ("fees_tb", CREATE_FEES_TABLE),
    ("idx_fees_account", CREATE_FEES_INDEX),
    ("idempotency_tb", CREATE_IDEMPOTENCY_TABLE),
    ("fee_outbox_tb", CREATE_FEE_OUTBOX_TABLE),
    ("idx_fee_outbox_pending", CREATE_FEE_OUTBOX_INDEX),
    ("fee_notices_tb", CREATE_FEE_NOTICES_TABLE),
];

const CREATE_ACCOUNT_NUMBER_SEQ: &str =
    "CREATE SEQUENCE IF NOT EXISTS account_number_seq START WITH 100000 MINVALUE 100000";

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts_tb (
    account_id UUID PRIMARY KEY,
    account_number INTEGER NOT NULL,
    name VARCHAR(100) NOT NULL,
    tax_id CHAR(11) NOT NULL,
    credential_hash TEXT NOT NULL,
    credential_salt TEXT NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT accounts_tb_tax_id_key UNIQUE (tax_id),
    CONSTRAINT accounts_tb_account_number_key UNIQUE (account_number)
)
"#;

const CREATE_MOVEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS movements_tb (
    movement_seq BIGSERIAL PRIMARY KEY,
    movement_id TEXT NOT NULL UNIQUE,
    account_id UUID NOT NULL REFERENCES accounts_tb(account_id),
    kind CHAR(1) NOT NULL CHECK (kind IN ('C', 'D')),
    value NUMERIC(30, 10) NOT NULL CHECK (value > 0),
    created_at TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_MOVEMENTS_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_movements_account \
     ON movements_tb (account_id, movement_seq DESC)";

const CREATE_TRANSFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transfers_tb (
    transfer_id UUID PRIMARY KEY,
    source_account_id UUID NOT NULL REFERENCES accounts_tb(account_id),
    destination_account_id UUID NOT NULL REFERENCES accounts_tb(account_id),
    value NUMERIC(30, 10) NOT NULL CHECK (value > 0),
    created_at TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_FEES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fees_tb (
    fee_seq BIGSERIAL PRIMARY KEY,
    fee_id UUID NOT NULL UNIQUE,
    transfer_id UUID NOT NULL UNIQUE REFERENCES transfers_tb(transfer_id),
    account_id UUID NOT NULL REFERENCES accounts_tb(account_id),
    value NUMERIC(30, 10) NOT NULL CHECK (value > 0),
    created_at TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_FEES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_fees_account ON fees_tb (account_id, fee_seq DESC)";

const CREATE_IDEMPOTENCY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS idempotency_tb (
    idempotency_key UUID PRIMARY KEY,
    command VARCHAR(16) NOT NULL,
    request JSONB NOT NULL,
    result JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_FEE_OUTBOX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fee_outbox_tb (
    outbox_seq BIGSERIAL PRIMARY KEY,
    transfer_id UUID NOT NULL UNIQUE REFERENCES transfers_tb(transfer_id),
    payload JSONB NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    delivered_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_FEE_OUTBOX_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_fee_outbox_pending \
     ON fee_outbox_tb (outbox_seq) WHERE delivered_at IS NULL";

const CREATE_FEE_NOTICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fee_notices_tb (
    transfer_id UUID PRIMARY KEY,
    source_account_id UUID NOT NULL,
    destination_account_id UUID NOT NULL,
    value NUMERIC(30, 10) NOT NULL,
    fee NUMERIC(30, 10),
    published_at TIMESTAMPTZ NOT NULL,
    received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;
