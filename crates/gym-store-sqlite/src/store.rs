//! [`SqliteStore`] — the SQLite implementation of [`GymStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use gym_core::{
  account::{Account, NewAccount},
  member::{Member, MemberStatus, NewMember},
  notification::{NewNotification, Notification, Suppression},
  payment::{NewPayment, Payment},
  store::{Commit, GymStore, PaymentQuery, Unique},
};

use crate::{
  Result,
  encode::{
    ACCOUNT_COLUMNS, MEMBER_COLUMNS, NOTIFICATION_COLUMNS, PAYMENT_COLUMNS,
    RawAccount, RawMember, RawNotification, RawPayment, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gym store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row encoding ────────────────────────────────────────────────────────────

/// A member flattened into owned column values, ready to move into a
/// connection closure.
struct MemberRow {
  member_id:        String,
  given_name:       String,
  family_name:      Option<String>,
  email:            Option<String>,
  phone:            Option<String>,
  notes:            Option<String>,
  status:           String,
  payment_status:   String,
  membership_start: Option<String>,
  membership_end:   Option<String>,
  created_by:       Option<String>,
  created_at:       String,
  updated_at:       String,
  version:          i64,
}

impl MemberRow {
  fn new(m: &Member) -> Self {
    Self {
      member_id:        encode_uuid(m.member_id),
      given_name:       m.profile.given_name.clone(),
      family_name:      m.profile.family_name.clone(),
      email:            m.profile.email.clone(),
      phone:            m.profile.phone.clone(),
      notes:            m.profile.notes.clone(),
      status:           m.status.to_string(),
      payment_status:   m.payment_status.to_string(),
      membership_start: m.membership_start.map(encode_dt),
      membership_end:   m.membership_end.map(encode_dt),
      created_by:       m.created_by.map(encode_uuid),
      created_at:       encode_dt(m.created_at),
      updated_at:       encode_dt(m.updated_at),
      version:          m.version as i64,
    }
  }

  fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      &format!(
        "INSERT INTO members ({MEMBER_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
      ),
      rusqlite::params![
        self.member_id,
        self.given_name,
        self.family_name,
        self.email,
        self.phone,
        self.notes,
        self.status,
        self.payment_status,
        self.membership_start,
        self.membership_end,
        self.created_by,
        self.created_at,
        self.updated_at,
        self.version,
      ],
    )?;
    Ok(())
  }

  /// Whether another member has the same given name, family name and phone.
  /// Names compare ASCII case-insensitively; absent fields match only absent
  /// fields.
  fn has_namesake(&self, conn: &rusqlite::Connection) -> rusqlite::Result<bool> {
    Ok(
      conn
        .query_row(
          "SELECT 1 FROM members
           WHERE lower(given_name) = lower(?1)
             AND lower(family_name) IS lower(?2)
             AND phone IS ?3
           LIMIT 1",
          rusqlite::params![self.given_name, self.family_name, self.phone],
          |_| Ok(()),
        )
        .optional()?
        .is_some(),
    )
  }

  /// Write the row if the stored version is still `self.version`, bumping
  /// it. Returns `false` when the version check failed.
  fn update_versioned(&self, conn: &rusqlite::Connection) -> rusqlite::Result<bool> {
    let changed = conn.execute(
      "UPDATE members SET
         given_name = ?2, family_name = ?3, email = ?4, phone = ?5, notes = ?6,
         status = ?7, payment_status = ?8,
         membership_start = ?9, membership_end = ?10,
         updated_at = ?11, version = version + 1
       WHERE member_id = ?1 AND version = ?12",
      rusqlite::params![
        self.member_id,
        self.given_name,
        self.family_name,
        self.email,
        self.phone,
        self.notes,
        self.status,
        self.payment_status,
        self.membership_start,
        self.membership_end,
        self.updated_at,
        self.version,
      ],
    )?;
    Ok(changed == 1)
  }
}

struct NotificationRow {
  notification_id: String,
  kind:            String,
  message:         String,
  member_id:       Option<String>,
  created_by:      Option<String>,
  created_at:      String,
}

impl NotificationRow {
  fn new(n: &Notification) -> Self {
    Self {
      notification_id: encode_uuid(n.notification_id),
      kind:            n.kind.to_string(),
      message:         n.message.clone(),
      member_id:       n.member_id.map(encode_uuid),
      created_by:      n.created_by.map(encode_uuid),
      created_at:      encode_dt(n.created_at),
    }
  }

  fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO notifications
         (notification_id, kind, message, member_id, created_by, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      rusqlite::params![
        self.notification_id,
        self.kind,
        self.message,
        self.member_id,
        self.created_by,
        self.created_at,
      ],
    )?;
    Ok(())
  }
}

/// The only UNIQUE constraint in the schema is `accounts.email`.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(failure, _)
      if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn materialize(inputs: Vec<NewNotification>) -> Vec<Notification> {
  inputs
    .into_iter()
    .map(|n| n.into_notification(Uuid::new_v4()))
    .collect()
}

// ─── GymStore impl ───────────────────────────────────────────────────────────

impl GymStore for SqliteStore {
  type Error = crate::Error;

  // ── Members ───────────────────────────────────────────────────────────────

  async fn add_member(&self, input: NewMember) -> Result<Unique<Member>> {
    let member = input.into_member(Uuid::new_v4());
    let row = MemberRow::new(&member);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if row.has_namesake(&tx)? {
          return Ok(false);
        }
        row.insert(&tx)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if inserted { Unique::Written(member) } else { Unique::Duplicate })
  }

  async fn get_member(&self, id: Uuid) -> Result<Option<Member>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?1"),
              rusqlite::params![id_str],
              RawMember::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMember::into_member).transpose()
  }

  async fn list_members(&self, statuses: Vec<MemberStatus>) -> Result<Vec<Member>> {
    let statuses: Vec<String> = statuses.iter().map(ToString::to_string).collect();

    let raws: Vec<RawMember> = self
      .conn
      .call(move |conn| {
        let filter = if statuses.is_empty() {
          String::new()
        } else {
          let slots = vec!["?"; statuses.len()].join(", ");
          format!("WHERE status IN ({slots})")
        };
        let mut stmt = conn.prepare(&format!(
          "SELECT {MEMBER_COLUMNS} FROM members {filter} ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(statuses.iter()), RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMember::into_member).collect()
  }

  async fn commit_member(
    &self,
    member: Member,
    notifications: Vec<NewNotification>,
  ) -> Result<Commit<Member>> {
    let row = MemberRow::new(&member);
    let notifications = materialize(notifications);
    let rows: Vec<NotificationRow> = notifications.iter().map(NotificationRow::new).collect();

    let landed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !row.update_versioned(&tx)? {
          return Ok(false);
        }
        for n in &rows {
          n.insert(&tx)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !landed {
      return Ok(Commit::Stale);
    }
    Ok(Commit::Committed(Member { version: member.version + 1, ..member }))
  }

  async fn delete_member(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM members WHERE member_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Payments ──────────────────────────────────────────────────────────────

  async fn commit_payment(
    &self,
    member: Member,
    payment: NewPayment,
  ) -> Result<Commit<(Payment, Member)>> {
    let payment = payment.into_payment(Uuid::new_v4());
    let row = MemberRow::new(&member);

    let payment_id    = encode_uuid(payment.payment_id);
    let member_id     = encode_uuid(payment.member_id);
    let amount_cents  = payment.amount_cents;
    let method        = payment.method.to_string();
    let period_months = i64::from(payment.period_months);
    let status        = payment.status.to_string();
    let notes         = payment.notes.clone();
    let paid_at       = encode_dt(payment.paid_at);
    let recorded_by   = payment.recorded_by.map(encode_uuid);

    let landed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !row.update_versioned(&tx)? {
          return Ok(false);
        }
        tx.execute(
          &format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
          ),
          rusqlite::params![
            payment_id,
            member_id,
            amount_cents,
            method,
            period_months,
            status,
            notes,
            paid_at,
            recorded_by,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !landed {
      return Ok(Commit::Stale);
    }
    let member = Member { version: member.version + 1, ..member };
    Ok(Commit::Committed((payment, member)))
  }

  async fn list_payments(&self, query: PaymentQuery) -> Result<Vec<Payment>> {
    let member_id = query.member_id.map(encode_uuid);
    // SQLite treats a negative LIMIT as "no limit".
    let limit = query
      .limit
      .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let raws: Vec<RawPayment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PAYMENT_COLUMNS} FROM payments
           WHERE ?1 IS NULL OR member_id = ?1
           ORDER BY paid_at DESC, rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![member_id, limit], RawPayment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPayment::into_payment).collect()
  }

  async fn delete_payment(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM payments WHERE payment_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn append_notification(
    &self,
    input: NewNotification,
    suppress: Option<Suppression>,
  ) -> Result<Option<Notification>> {
    let notification = input.into_notification(Uuid::new_v4());
    let row = NotificationRow::new(&notification);
    let since = suppress.map(|s| encode_dt(s.since));

    let appended = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let (Some(since), Some(member_id)) = (&since, &row.member_id) {
          let seen = tx
            .query_row(
              "SELECT 1 FROM notifications
               WHERE member_id = ?1 AND kind = ?2 AND created_at >= ?3
               LIMIT 1",
              rusqlite::params![member_id, row.kind, since],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if seen {
            return Ok(false);
          }
        }
        row.insert(&tx)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(appended.then_some(notification))
  }

  async fn list_unread(&self, reader: Uuid, limit: usize) -> Result<Vec<Notification>> {
    let reader = encode_uuid(reader);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications n
           WHERE NOT EXISTS (
             SELECT 1 FROM notification_reads r
             WHERE r.notification_id = n.notification_id AND r.reader_id = ?1
           )
           ORDER BY n.created_at DESC, n.rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![reader, limit], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_read(&self, id: Uuid, reader: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let id = encode_uuid(id);
    let reader = encode_uuid(reader);
    let at = encode_dt(at);

    let found = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM notifications WHERE notification_id = ?1",
            rusqlite::params![id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          conn.execute(
            "INSERT OR IGNORE INTO notification_reads (notification_id, reader_id, read_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![id, reader, at],
          )?;
        }
        Ok(exists)
      })
      .await?;

    Ok(found)
  }

  async fn mark_all_read(&self, reader: Uuid, at: DateTime<Utc>) -> Result<usize> {
    let reader = encode_uuid(reader);
    let at = encode_dt(at);

    let marked = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO notification_reads (notification_id, reader_id, read_at)
           SELECT notification_id, ?1, ?2 FROM notifications",
          rusqlite::params![reader, at],
        )?)
      })
      .await?;

    Ok(marked)
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn add_account(&self, input: NewAccount) -> Result<Unique<Account>> {
    let account = input.into_account(Uuid::new_v4());

    let id         = encode_uuid(account.account_id);
    let name       = account.name.clone();
    let email      = account.email.clone();
    let hash       = account.credential_hash.clone();
    let role       = account.role.to_string();
    let created_at = encode_dt(account.created_at);
    let updated_at = encode_dt(account.updated_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let insert = conn.execute(
          &format!("INSERT INTO accounts ({ACCOUNT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![id, name, email, hash, role, created_at, updated_at],
        );
        match insert {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(if inserted { Unique::Written(account) } else { Unique::Duplicate })
  }

  async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
              rusqlite::params![id_str],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn find_account_by_email(&self, email: String) -> Result<Option<Account>> {
    let email = email.trim().to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
              rusqlite::params![email],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn list_accounts(&self) -> Result<Vec<Account>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn update_account(&self, account: Account) -> Result<Unique<bool>> {
    let id         = encode_uuid(account.account_id);
    let updated_at = encode_dt(account.updated_at);
    let role       = account.role.to_string();

    let outcome = self
      .conn
      .call(move |conn| {
        let update = conn.execute(
          "UPDATE accounts SET
             name = ?2, email = ?3, credential_hash = ?4, role = ?5, updated_at = ?6
           WHERE account_id = ?1",
          rusqlite::params![
            id,
            account.name,
            account.email,
            account.credential_hash,
            role,
            updated_at,
          ],
        );
        match update {
          Ok(changed) => Ok(Unique::Written(changed > 0)),
          Err(e) if is_unique_violation(&e) => Ok(Unique::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(outcome)
  }

  async fn delete_account(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM accounts WHERE account_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }
}
