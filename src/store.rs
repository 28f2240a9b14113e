/// Credential store: the single owner of account, session, history, and
/// reset-request persistence. The core computes what to write; the store
/// only reads and writes it.
///
/// `PgCredentialStore` is the production backend. `MemoryCredentialStore`
/// backs the integration tests and relaxed-mode local experimentation.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::auth::lockout::{self, FailureOutcome};
use crate::error::AppError;
use crate::model::{Account, PasswordHistoryEntry, ResetRequest, Session};
use crate::secret::StoredSecret;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up by email when the identifier contains `@`, by handle otherwise.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, AppError>;
    async fn find_by_email_verification(&self, hash: &str) -> Result<Option<Account>, AppError>;
    async fn find_by_phone_and_birth_date(
        &self,
        phone: &str,
        birth_date: NaiveDate,
    ) -> Result<Option<Account>, AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;
    async fn handle_exists(&self, handle: &str) -> Result<bool, AppError>;
    async fn phone_exists(&self, phone: &str) -> Result<bool, AppError>;

    async fn insert_account(&self, account: &Account) -> Result<(), AppError>;
    /// Increments the failure counter and applies the lockout policy in
    /// one atomic step, returning the state that was persisted.
    /// Concurrent failures must each count.
    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, AppError>;
    /// Resets the failure counter, clears the lock and any pending
    /// step-up secret, and stamps the last-login origin.
    async fn record_login_success(
        &self,
        id: Uuid,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;
    async fn store_step_up_secret(&self, id: Uuid, secret: &StoredSecret) -> Result<(), AppError>;
    async fn mark_email_verified(&self, id: Uuid) -> Result<(), AppError>;
    async fn mark_phone_verified(&self, id: Uuid) -> Result<(), AppError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn request_deactivation(
        &self,
        id: Uuid,
        requested_at: DateTime<Utc>,
        delete_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;
    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AppError>;
    async fn revoke_session(&self, token_hash: &str, now: DateTime<Utc>) -> Result<(), AppError>;
    async fn revoke_all_sessions(&self, account_id: Uuid, now: DateTime<Utc>)
        -> Result<(), AppError>;

    async fn insert_history(&self, entry: &PasswordHistoryEntry) -> Result<(), AppError>;
    /// Most recent history entries first.
    async fn recent_history(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PasswordHistoryEntry>, AppError>;

    async fn insert_reset_request(&self, request: &ResetRequest) -> Result<(), AppError>;
    /// Both hashes must match the same request record.
    async fn find_reset_request(
        &self,
        reset_hash: &str,
        sms_hash: &str,
    ) -> Result<Option<ResetRequest>, AppError>;
    async fn mark_reset_used(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), AppError>;
}

// ---------------------------------------------------------------------------
// Postgres backend
// ---------------------------------------------------------------------------

/// Flat row shape for the accounts table; secret hash/expiry column pairs
/// fold into `StoredSecret` slots on conversion.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    handle: String,
    email: String,
    phone_number: Option<String>,
    birth_date: NaiveDate,
    password_hash: String,
    failed_login_count: i32,
    locked_until: Option<DateTime<Utc>>,
    is_email_verified: bool,
    is_phone_verified: bool,
    email_verification_hash: Option<String>,
    email_verification_expires: Option<DateTime<Utc>>,
    sms_verification_hash: Option<String>,
    sms_verification_expires: Option<DateTime<Utc>>,
    login_step_up_hash: Option<String>,
    login_step_up_expires: Option<DateTime<Utc>>,
    last_login_ip: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    delete_requested_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn secret_slot(hash: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<StoredSecret> {
    match (hash, expires_at) {
        (Some(hash), Some(expires_at)) => Some(StoredSecret { hash, expires_at }),
        _ => None,
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            handle: row.handle,
            email: row.email,
            phone_number: row.phone_number,
            birth_date: row.birth_date,
            password_hash: row.password_hash,
            failed_login_count: row.failed_login_count,
            locked_until: row.locked_until,
            is_email_verified: row.is_email_verified,
            is_phone_verified: row.is_phone_verified,
            email_verification: secret_slot(
                row.email_verification_hash,
                row.email_verification_expires,
            ),
            sms_verification: secret_slot(row.sms_verification_hash, row.sms_verification_expires),
            login_step_up: secret_slot(row.login_step_up_hash, row.login_step_up_expires),
            last_login_ip: row.last_login_ip,
            last_login_at: row.last_login_at,
            delete_requested_at: row.delete_requested_at,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_account(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<Account>, AppError> {
        // Column names are compile-time constants, never user input.
        let query = format!("SELECT * FROM accounts WHERE {} = $1", column);
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        if identifier.contains('@') {
            self.fetch_account("email", identifier).await
        } else {
            self.fetch_account("handle", identifier).await
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, AppError> {
        self.fetch_account("handle", handle).await
    }

    async fn find_by_email_verification(&self, hash: &str) -> Result<Option<Account>, AppError> {
        self.fetch_account("email_verification_hash", hash).await
    }

    async fn find_by_phone_and_birth_date(
        &self,
        phone: &str,
        birth_date: NaiveDate,
    ) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE phone_number = $1 AND birth_date = $2",
        )
        .bind(phone)
        .bind(birth_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn handle_exists(&self, handle: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE handle = $1)",
        )
        .bind(handle)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE phone_number = $1)",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, handle, email, phone_number, birth_date, password_hash,
                failed_login_count, locked_until, is_email_verified, is_phone_verified,
                email_verification_hash, email_verification_expires,
                sms_verification_hash, sms_verification_expires,
                login_step_up_hash, login_step_up_expires,
                last_login_ip, last_login_at, delete_requested_at, deleted_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(account.id)
        .bind(&account.handle)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(account.birth_date)
        .bind(&account.password_hash)
        .bind(account.failed_login_count)
        .bind(account.locked_until)
        .bind(account.is_email_verified)
        .bind(account.is_phone_verified)
        .bind(account.email_verification.as_ref().map(|s| s.hash.clone()))
        .bind(account.email_verification.as_ref().map(|s| s.expires_at))
        .bind(account.sms_verification.as_ref().map(|s| s.hash.clone()))
        .bind(account.sms_verification.as_ref().map(|s| s.expires_at))
        .bind(account.login_step_up.as_ref().map(|s| s.hash.clone()))
        .bind(account.login_step_up.as_ref().map(|s| s.expires_at))
        .bind(&account.last_login_ip)
        .bind(account.last_login_at)
        .bind(account.delete_requested_at)
        .bind(account.deleted_at)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, AppError> {
        // Server-side increment; the CASE mirrors `lockout::record_failure`.
        let lock_until = now + chrono::Duration::minutes(lockout::LOCK_MINUTES);
        let (failed_login_count, locked_until) =
            sqlx::query_as::<_, (i32, Option<DateTime<Utc>>)>(
                r#"
                UPDATE accounts
                SET failed_login_count = CASE
                        WHEN failed_login_count + 1 >= $2 THEN 0
                        ELSE failed_login_count + 1
                    END,
                    locked_until = CASE
                        WHEN failed_login_count + 1 >= $2 THEN $3
                        ELSE NULL
                    END
                WHERE id = $1
                RETURNING failed_login_count, locked_until
                "#,
            )
            .bind(id)
            .bind(lockout::MAX_FAILED_ATTEMPTS)
            .bind(lock_until)
            .fetch_one(&self.pool)
            .await?;

        Ok(FailureOutcome {
            failed_login_count,
            locked_until,
        })
    }

    async fn record_login_success(
        &self,
        id: Uuid,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_count = 0,
                locked_until = NULL,
                login_step_up_hash = NULL,
                login_step_up_expires = NULL,
                last_login_ip = $2,
                last_login_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ip_address)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_step_up_secret(&self, id: Uuid, secret: &StoredSecret) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE accounts SET login_step_up_hash = $2, login_step_up_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(&secret.hash)
        .bind(secret.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET is_email_verified = true,
                email_verification_hash = NULL,
                email_verification_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_phone_verified(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET is_phone_verified = true,
                sms_verification_hash = NULL,
                sms_verification_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn request_deactivation(
        &self,
        id: Uuid,
        requested_at: DateTime<Utc>,
        delete_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE accounts SET delete_requested_at = $2, deleted_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(requested_at)
        .bind(delete_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, account_id, token_hash, expires_at,
                ip_address, user_agent, created_at, revoked_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id)
        .bind(session.account_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .bind(session.revoked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AppError> {
        let session =
            sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token_hash = $1")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;
        Ok(session)
    }

    async fn revoke_session(&self, token_hash: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET revoked_at = $2 WHERE token_hash = $1")
            .bind(token_hash)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_sessions(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessions SET revoked_at = $2 WHERE account_id = $1 AND revoked_at IS NULL",
        )
        .bind(account_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_history(&self, entry: &PasswordHistoryEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO password_history (id, account_id, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.id)
        .bind(entry.account_id)
        .bind(&entry.password_hash)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_history(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PasswordHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, PasswordHistoryEntry>(
            r#"
            SELECT * FROM password_history
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn insert_reset_request(&self, request: &ResetRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_requests (
                id, account_id, reset_hash, sms_hash, expires_at, used_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(request.id)
        .bind(request.account_id)
        .bind(&request.reset_hash)
        .bind(&request.sms_hash)
        .bind(request.expires_at)
        .bind(request.used_at)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_reset_request(
        &self,
        reset_hash: &str,
        sms_hash: &str,
    ) -> Result<Option<ResetRequest>, AppError> {
        let request = sqlx::query_as::<_, ResetRequest>(
            "SELECT * FROM password_reset_requests WHERE reset_hash = $1 AND sms_hash = $2",
        )
        .bind(reset_hash)
        .bind(sms_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn mark_reset_used(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE password_reset_requests SET used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    accounts: HashMap<Uuid, Account>,
    sessions: Vec<Session>,
    history: Vec<PasswordHistoryEntry>,
    resets: Vec<ResetRequest>,
}

/// In-memory credential store. Per-account updates hold one lock, so the
/// compare-and-increment guarantees the Postgres backend gets from
/// single-row UPDATEs hold here too.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_account<T>(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Account) -> T,
    ) -> Result<T, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal("account vanished from store".to_string()))?;
        Ok(apply(account))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        let inner = self.inner.lock().unwrap();
        let account = if identifier.contains('@') {
            inner.accounts.values().find(|a| a.email == identifier)
        } else {
            inner.accounts.values().find(|a| a.handle == identifier)
        };
        Ok(account.cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.inner.lock().unwrap().accounts.get(&id).cloned())
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.values().find(|a| a.handle == handle).cloned())
    }

    async fn find_by_email_verification(&self, hash: &str) -> Result<Option<Account>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .values()
            .find(|a| {
                a.email_verification
                    .as_ref()
                    .map(|s| s.hash == hash)
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn find_by_phone_and_birth_date(
        &self,
        phone: &str,
        birth_date: NaiveDate,
    ) -> Result<Option<Account>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.phone_number.as_deref() == Some(phone) && a.birth_date == birth_date)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.values().any(|a| a.email == email))
    }

    async fn handle_exists(&self, handle: &str) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.values().any(|a| a.handle == handle))
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .values()
            .any(|a| a.phone_number.as_deref() == Some(phone)))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, AppError> {
        self.with_account(id, |account| {
            let outcome = lockout::record_failure(account.failed_login_count, now);
            account.failed_login_count = outcome.failed_login_count;
            account.locked_until = outcome.locked_until;
            outcome
        })
    }

    async fn record_login_success(
        &self,
        id: Uuid,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.with_account(id, |account| {
            account.failed_login_count = 0;
            account.locked_until = None;
            account.login_step_up = None;
            account.last_login_ip = Some(ip_address.to_string());
            account.last_login_at = Some(now);
        })
    }

    async fn store_step_up_secret(&self, id: Uuid, secret: &StoredSecret) -> Result<(), AppError> {
        self.with_account(id, |account| {
            account.login_step_up = Some(secret.clone());
        })
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<(), AppError> {
        self.with_account(id, |account| {
            account.is_email_verified = true;
            account.email_verification = None;
        })
    }

    async fn mark_phone_verified(&self, id: Uuid) -> Result<(), AppError> {
        self.with_account(id, |account| {
            account.is_phone_verified = true;
            account.sms_verification = None;
        })
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        self.with_account(id, |account| {
            account.password_hash = password_hash.to_string();
        })
    }

    async fn request_deactivation(
        &self,
        id: Uuid,
        requested_at: DateTime<Utc>,
        delete_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.with_account(id, |account| {
            account.delete_requested_at = Some(requested_at);
            account.deleted_at = Some(delete_at);
        })
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.inner.lock().unwrap().sessions.push(session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_session(&self, token_hash: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.sessions.iter_mut().find(|s| s.token_hash == token_hash) {
            session.revoked_at = Some(now);
        }
        Ok(())
    }

    async fn revoke_all_sessions(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        for session in inner
            .sessions
            .iter_mut()
            .filter(|s| s.account_id == account_id && s.revoked_at.is_none())
        {
            session.revoked_at = Some(now);
        }
        Ok(())
    }

    async fn insert_history(&self, entry: &PasswordHistoryEntry) -> Result<(), AppError> {
        self.inner.lock().unwrap().history.push(entry.clone());
        Ok(())
    }

    async fn recent_history(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PasswordHistoryEntry>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<PasswordHistoryEntry> = inner
            .history
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn insert_reset_request(&self, request: &ResetRequest) -> Result<(), AppError> {
        self.inner.lock().unwrap().resets.push(request.clone());
        Ok(())
    }

    async fn find_reset_request(
        &self,
        reset_hash: &str,
        sms_hash: &str,
    ) -> Result<Option<ResetRequest>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .resets
            .iter()
            .find(|r| r.reset_hash == reset_hash && r.sms_hash == sms_hash)
            .cloned())
    }

    async fn mark_reset_used(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(request) = inner.resets.iter_mut().find(|r| r.id == id) {
            request.used_at = Some(now);
        }
        Ok(())
    }
}
