//! SQL schema for the gym SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 UTC strings, so text comparison is
/// chronological comparison.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS members (
    member_id        TEXT PRIMARY KEY,
    given_name       TEXT NOT NULL,
    family_name      TEXT,
    email            TEXT,
    phone            TEXT,
    notes            TEXT,
    status           TEXT NOT NULL,   -- pending | active | frozen | expired | cancelled
    payment_status   TEXT NOT NULL,   -- paid | unpaid
    membership_start TEXT,
    membership_end   TEXT,
    created_by       TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    version          INTEGER NOT NULL DEFAULT 0
);

-- Payments are never updated, only inserted or administratively deleted.
CREATE TABLE IF NOT EXISTS payments (
    payment_id    TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
    amount_cents  INTEGER NOT NULL CHECK (amount_cents >= 0),
    method        TEXT NOT NULL,
    period_months INTEGER NOT NULL CHECK (period_months >= 1),
    status        TEXT NOT NULL,
    notes         TEXT,
    paid_at       TEXT NOT NULL,
    recorded_by   TEXT
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,
    message         TEXT NOT NULL,
    member_id       TEXT REFERENCES members(member_id) ON DELETE SET NULL,
    created_by      TEXT,
    created_at      TEXT NOT NULL
);

-- One row per (notification, reader) acknowledgement.
CREATE TABLE IF NOT EXISTS notification_reads (
    notification_id TEXT NOT NULL REFERENCES notifications(notification_id) ON DELETE CASCADE,
    reader_id       TEXT NOT NULL,
    read_at         TEXT NOT NULL,
    PRIMARY KEY (notification_id, reader_id)
);

CREATE TABLE IF NOT EXISTS accounts (
    account_id      TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    credential_hash TEXT NOT NULL,
    role            TEXT NOT NULL,   -- employee | admin | super-admin
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS members_status_idx       ON members(status);
CREATE INDEX IF NOT EXISTS members_name_idx         ON members(lower(given_name), phone);
CREATE INDEX IF NOT EXISTS payments_member_idx      ON payments(member_id);
CREATE INDEX IF NOT EXISTS payments_paid_idx        ON payments(paid_at);
CREATE INDEX IF NOT EXISTS notifications_member_idx ON notifications(member_id, kind, created_at);
CREATE INDEX IF NOT EXISTS notifications_created_idx ON notifications(created_at);

PRAGMA user_version = 1;
";
