//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 UTC strings with microsecond
//! precision. Enums are stored under their `Display` names. UUIDs are stored
//! as hyphenated lowercase strings.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use gym_core::{
  account::Account,
  member::{Member, MemberProfile},
  notification::Notification,
  payment::Payment,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

fn decode_u32(column: &'static str, v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::Decode { column, value: v.to_string() })
}

fn decode_u64(column: &'static str, v: i64) -> Result<u64> {
  u64::try_from(v).map_err(|_| Error::Decode { column, value: v.to_string() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const MEMBER_COLUMNS: &str = "member_id, given_name, family_name, email, \
  phone, notes, status, payment_status, membership_start, membership_end, \
  created_by, created_at, updated_at, version";

/// Raw values read directly from a `members` row.
pub struct RawMember {
  pub member_id:        String,
  pub given_name:       String,
  pub family_name:      Option<String>,
  pub email:            Option<String>,
  pub phone:            Option<String>,
  pub notes:            Option<String>,
  pub status:           String,
  pub payment_status:   String,
  pub membership_start: Option<String>,
  pub membership_end:   Option<String>,
  pub created_by:       Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
  pub version:          i64,
}

impl RawMember {
  /// Read a row selected with [`MEMBER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:        row.get(0)?,
      given_name:       row.get(1)?,
      family_name:      row.get(2)?,
      email:            row.get(3)?,
      phone:            row.get(4)?,
      notes:            row.get(5)?,
      status:           row.get(6)?,
      payment_status:   row.get(7)?,
      membership_start: row.get(8)?,
      membership_end:   row.get(9)?,
      created_by:       row.get(10)?,
      created_at:       row.get(11)?,
      updated_at:       row.get(12)?,
      version:          row.get(13)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:        decode_uuid(&self.member_id)?,
      profile:          MemberProfile {
        given_name:  self.given_name,
        family_name: self.family_name,
        email:       self.email,
        phone:       self.phone,
        notes:       self.notes,
      },
      status:           decode_enum("members.status", &self.status)?,
      payment_status:   decode_enum("members.payment_status", &self.payment_status)?,
      membership_start: decode_opt_dt(self.membership_start)?,
      membership_end:   decode_opt_dt(self.membership_end)?,
      created_by:       decode_opt_uuid(self.created_by)?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
      version:          decode_u64("members.version", self.version)?,
    })
  }
}

pub const PAYMENT_COLUMNS: &str = "payment_id, member_id, amount_cents, method, \
  period_months, status, notes, paid_at, recorded_by";

/// Raw values read directly from a `payments` row.
pub struct RawPayment {
  pub payment_id:    String,
  pub member_id:     String,
  pub amount_cents:  i64,
  pub method:        String,
  pub period_months: i64,
  pub status:        String,
  pub notes:         Option<String>,
  pub paid_at:       String,
  pub recorded_by:   Option<String>,
}

impl RawPayment {
  /// Read a row selected with [`PAYMENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id:    row.get(0)?,
      member_id:     row.get(1)?,
      amount_cents:  row.get(2)?,
      method:        row.get(3)?,
      period_months: row.get(4)?,
      status:        row.get(5)?,
      notes:         row.get(6)?,
      paid_at:       row.get(7)?,
      recorded_by:   row.get(8)?,
    })
  }

  pub fn into_payment(self) -> Result<Payment> {
    Ok(Payment {
      payment_id:    decode_uuid(&self.payment_id)?,
      member_id:     decode_uuid(&self.member_id)?,
      amount_cents:  self.amount_cents,
      method:        decode_enum("payments.method", &self.method)?,
      period_months: decode_u32("payments.period_months", self.period_months)?,
      status:        decode_enum("payments.status", &self.status)?,
      notes:         self.notes,
      paid_at:       decode_dt(&self.paid_at)?,
      recorded_by:   decode_opt_uuid(self.recorded_by)?,
    })
  }
}

/// Selects a notification together with its comma-joined readers.
pub const NOTIFICATION_COLUMNS: &str = "n.notification_id, n.kind, n.message, \
  n.member_id, n.created_by, n.created_at, \
  (SELECT group_concat(r.reader_id, ',') FROM notification_reads r \
   WHERE r.notification_id = n.notification_id)";

/// Raw values read directly from a `notifications` row plus its readers.
pub struct RawNotification {
  pub notification_id: String,
  pub kind:            String,
  pub message:         String,
  pub member_id:       Option<String>,
  pub created_by:      Option<String>,
  pub created_at:      String,
  pub read_by:         Option<String>,
}

impl RawNotification {
  /// Read a row selected with [`NOTIFICATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      kind:            row.get(1)?,
      message:         row.get(2)?,
      member_id:       row.get(3)?,
      created_by:      row.get(4)?,
      created_at:      row.get(5)?,
      read_by:         row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    let read_by = self
      .read_by
      .as_deref()
      .unwrap_or_default()
      .split(',')
      .filter(|s| !s.is_empty())
      .map(decode_uuid)
      .collect::<Result<BTreeSet<_>>>()?;

    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      kind: decode_enum("notifications.kind", &self.kind)?,
      message: self.message,
      member_id: decode_opt_uuid(self.member_id)?,
      created_by: decode_opt_uuid(self.created_by)?,
      created_at: decode_dt(&self.created_at)?,
      read_by,
    })
  }
}

pub const ACCOUNT_COLUMNS: &str =
  "account_id, name, email, credential_hash, role, created_at, updated_at";

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:      String,
  pub name:            String,
  pub email:           String,
  pub credential_hash: String,
  pub role:            String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawAccount {
  /// Read a row selected with [`ACCOUNT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:      row.get(0)?,
      name:            row.get(1)?,
      email:           row.get(2)?,
      credential_hash: row.get(3)?,
      role:            row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:      decode_uuid(&self.account_id)?,
      name:            self.name,
      email:           self.email,
      credential_hash: self.credential_hash,
      role:            decode_enum("accounts.role", &self.role)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = decode_dt("2025-01-01T09:00:00Z").unwrap();
    let late = decode_dt("2025-01-01T10:00:00.5Z").unwrap();
    assert_eq!(encode_dt(early), "2025-01-01T09:00:00.000000Z");
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn unknown_enum_value_is_reported() {
    let err = decode_enum::<gym_core::member::MemberStatus>("members.status", "paused")
      .unwrap_err();
    assert!(matches!(err, Error::Decode { column: "members.status", .. }));
  }
}
