use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use password_hash::{PasswordHash, PasswordVerifier};
use serde::{Deserialize, Serialize};

use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult, UserRole};
use acpn_sql::Value;

use crate::model::{AuditContext, CreateUser, RegisterInput, Resource, User, UserStatus};
use crate::service::{AuthError, AuthService};

/// Filters for user listing.
#[derive(Debug, Default)]
pub struct UserFilters {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

/// A short-lived token record in the KV index.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    user_id: String,
    expires_at: i64,
}

pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.len() < 8 {
        return Err(AuthError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl AuthService {
    /// Self-service registration. The account starts pending and
    /// unapproved; the returned token is handed to the mailer for email
    /// verification.
    pub fn register(&self, input: RegisterInput) -> Result<(User, String), AuthError> {
        if input.name.trim().is_empty() {
            return Err(AuthError::Validation("name cannot be empty".into()));
        }
        if !input.email.contains('@') {
            return Err(AuthError::Validation("invalid email address".into()));
        }

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            name: input.name,
            email: input.email.to_lowercase(),
            password_hash: hash_password(&input.password)?,
            role: UserRole::Member,
            status: UserStatus::Pending,
            is_approved: false,
            email_verified: false,
            created_at: now.clone(),
            updated_at: now,
        };

        self.insert_user(&user).map_err(|e| match e {
            AuthError::Conflict(_) => {
                AuthError::Conflict("email is already registered".into())
            }
            other => other,
        })?;

        let token =
            self.issue_kv_token("verify", &user.id, self.config.verification_token_ttl)?;

        tracing::info!(user_id = %user.id, "user registered, pending approval");
        Ok((user, token))
    }

    /// Admin-created account: active, approved and verified immediately.
    pub fn create_user(&self, ctx: &AuditContext, input: CreateUser) -> Result<User, AuthError> {
        if !input.email.contains('@') {
            return Err(AuthError::Validation("invalid email address".into()));
        }

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            name: input.name,
            email: input.email.to_lowercase(),
            password_hash: hash_password(&input.password)?,
            role: input.role,
            status: UserStatus::Active,
            is_approved: true,
            email_verified: true,
            created_at: now.clone(),
            updated_at: now,
        };

        self.insert_user(&user).map_err(|e| match e {
            AuthError::Conflict(_) => {
                AuthError::Conflict("email is already registered".into())
            }
            other => other,
        })?;

        self.record_audit(
            ctx,
            "user.create",
            Resource::User,
            Some(&user.id),
            serde_json::json!({ "after": user.api_view() }),
        )?;

        Ok(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, AuthError> {
        self.get_record("users", id)
    }

    /// Find a user by email (case-insensitive via lowercase storage).
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM users WHERE email = ?1",
                &[Value::Text(email.to_lowercase())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        match rows.first().and_then(|r| r.get_str("data")) {
            Some(data) => Ok(Some(
                serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// List users with pagination and optional role/status filters.
    pub fn list_users(
        &self,
        params: &ListParams,
        filters: &UserFilters,
    ) -> Result<ListResult<User>, AuthError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(role) = filters.role {
            f.push(("role", Value::Text(role.as_str().into())));
        }
        if let Some(status) = filters.status {
            f.push(("status", Value::Text(status.as_str().into())));
        }
        let (items, total) = self.list_records("users", &f, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Update profile fields with JSON merge-patch. Credentials, role and
    /// lifecycle state have dedicated operations and cannot be patched.
    pub fn update_user(
        &self,
        ctx: &AuditContext,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<User, AuthError> {
        let current: User = self.get_record("users", id)?;
        let before = current.api_view();
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            for protected in [
                "id",
                "password_hash",
                "role",
                "status",
                "is_approved",
                "email_verified",
                "created_at",
            ] {
                obj.remove(protected);
            }
        }

        let mut base =
            serde_json::to_value(&current).map_err(|e| AuthError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["updated_at"] = serde_json::json!(now);

        let mut updated: User =
            serde_json::from_value(base).map_err(|e| AuthError::Internal(e.to_string()))?;
        updated.email = updated.email.to_lowercase();

        self.persist_user(&updated)?;

        self.record_audit(
            ctx,
            "user.update",
            Resource::User,
            Some(id),
            serde_json::json!({ "before": before, "after": updated.api_view() }),
        )?;

        Ok(updated)
    }

    // ── Lifecycle transitions ──

    /// Admin approval. Members become active once also email-verified.
    pub fn approve_user(&self, ctx: &AuditContext, id: &str) -> Result<User, AuthError> {
        self.transition(ctx, id, "user.approve", |user| {
            user.is_approved = true;
            if user.status == UserStatus::Pending && user.email_verified {
                user.status = UserStatus::Active;
            }
            Ok(())
        })
    }

    /// Admin rejection of a pending registration.
    pub fn reject_user(
        &self,
        ctx: &AuditContext,
        id: &str,
        reason: Option<String>,
    ) -> Result<User, AuthError> {
        let user = self.transition(ctx, id, "user.reject", |user| {
            if user.status != UserStatus::Pending {
                return Err(AuthError::Validation(
                    "only pending registrations can be rejected".into(),
                ));
            }
            user.status = UserStatus::Rejected;
            user.is_approved = false;
            Ok(())
        })?;
        if let Some(reason) = reason {
            tracing::info!(user_id = %id, %reason, "registration rejected");
        }
        Ok(user)
    }

    pub fn suspend_user(&self, ctx: &AuditContext, id: &str) -> Result<User, AuthError> {
        self.transition(ctx, id, "user.suspend", |user| {
            user.status = UserStatus::Suspended;
            Ok(())
        })
    }

    pub fn reactivate_user(&self, ctx: &AuditContext, id: &str) -> Result<User, AuthError> {
        self.transition(ctx, id, "user.reactivate", |user| {
            user.status = UserStatus::Active;
            Ok(())
        })
    }

    pub fn deactivate_user(&self, ctx: &AuditContext, id: &str) -> Result<User, AuthError> {
        self.transition(ctx, id, "user.deactivate", |user| {
            user.status = UserStatus::Inactive;
            Ok(())
        })
    }

    /// Change a user's role assignment. The target role document must
    /// exist and be active.
    pub fn change_user_role(
        &self,
        ctx: &AuditContext,
        id: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let role_doc = self.get_role_by_name(role.as_str())?;
        if !role_doc.is_active {
            return Err(AuthError::Validation(format!(
                "role '{}' is inactive",
                role_doc.name
            )));
        }
        self.transition(ctx, id, "user.role.change", |user| {
            user.role = role;
            Ok(())
        })
    }

    /// Seed the superadmin account at server bootstrap.
    ///
    /// The password hash comes from the server configuration, so the
    /// plaintext never passes through this process. Idempotent: an
    /// existing account with the email is returned unchanged.
    pub fn ensure_superadmin(
        &self,
        ctx: &AuditContext,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        if let Some(existing) = self.find_user_by_email(email)? {
            return Ok(existing);
        }

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            name: name.to_string(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            role: UserRole::Superadmin,
            status: UserStatus::Active,
            is_approved: true,
            email_verified: true,
            created_at: now.clone(),
            updated_at: now,
        };
        self.insert_user(&user)?;

        self.record_audit(
            ctx,
            "user.bootstrap",
            Resource::User,
            Some(&user.id),
            serde_json::json!({ "after": user.api_view() }),
        )?;

        tracing::info!(user_id = %user.id, "superadmin account seeded");
        Ok(user)
    }

    // ── Email verification / password reset ──

    /// Consume an email-verification token.
    pub fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.consume_kv_token("verify", token)?;
        let mut user: User = self.get_record("users", &user_id)?;
        user.email_verified = true;
        if user.status == UserStatus::Pending && user.is_approved {
            user.status = UserStatus::Active;
        }
        user.updated_at = now_rfc3339();
        self.persist_user(&user)?;
        Ok(user)
    }

    /// Issue a password-reset token. Returns None for unknown emails so
    /// the endpoint can answer uniformly without leaking registrations.
    pub fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        match self.find_user_by_email(email)? {
            Some(user) => {
                let token = self.issue_kv_token("reset", &user.id, self.config.reset_token_ttl)?;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    /// Consume a password-reset token and set the new password.
    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let user_id = self.consume_kv_token("reset", token)?;
        let mut user: User = self.get_record("users", &user_id)?;
        user.password_hash = hash_password(new_password)?;
        user.updated_at = now_rfc3339();
        self.persist_user(&user)?;

        // A stolen session must not outlive a password reset.
        self.revoke_all_user_sessions(&user_id)?;
        Ok(())
    }

    // ── Internals ──

    fn transition(
        &self,
        ctx: &AuditContext,
        id: &str,
        action: &str,
        mutate: impl FnOnce(&mut User) -> Result<(), AuthError>,
    ) -> Result<User, AuthError> {
        let mut user: User = self.get_record("users", id)?;
        let before = user.api_view();
        mutate(&mut user)?;
        user.updated_at = now_rfc3339();
        self.persist_user(&user)?;
        self.record_audit(
            ctx,
            action,
            Resource::User,
            Some(id),
            serde_json::json!({ "before": before, "after": user.api_view() }),
        )?;
        Ok(user)
    }

    fn insert_user(&self, user: &User) -> Result<(), AuthError> {
        self.insert_record(
            "users",
            &user.id,
            user,
            &[
                ("name", Value::Text(user.name.clone())),
                ("email", Value::Text(user.email.clone())),
                ("role", Value::Text(user.role.as_str().into())),
                ("status", Value::Text(user.status.as_str().into())),
                ("created_at", Value::Text(user.created_at.clone())),
                ("updated_at", Value::Text(user.updated_at.clone())),
            ],
        )
    }

    fn persist_user(&self, user: &User) -> Result<(), AuthError> {
        self.update_record(
            "users",
            &user.id,
            user,
            &[
                ("name", Value::Text(user.name.clone())),
                ("email", Value::Text(user.email.clone())),
                ("role", Value::Text(user.role.as_str().into())),
                ("status", Value::Text(user.status.as_str().into())),
                ("updated_at", Value::Text(user.updated_at.clone())),
            ],
        )
    }

    fn issue_kv_token(&self, kind: &str, user_id: &str, ttl: i64) -> Result<String, AuthError> {
        let token = new_id();
        let record = TokenRecord {
            user_id: user_id.to_string(),
            expires_at: chrono::Utc::now().timestamp() + ttl,
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|e| AuthError::Internal(e.to_string()))?;
        self.kv
            .set(&format!("{}/{}", kind, token), &bytes)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        Ok(token)
    }

    fn consume_kv_token(&self, kind: &str, token: &str) -> Result<String, AuthError> {
        let key = format!("{}/{}", kind, token);
        let bytes = self
            .kv
            .get(&key)
            .map_err(|e| AuthError::Storage(e.to_string()))?
            .ok_or_else(|| AuthError::NotFound("token is invalid or already used".into()))?;

        // Single-use: remove before inspecting expiry.
        self.kv
            .delete(&key)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let record: TokenRecord =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::Internal(e.to_string()))?;
        if record.expires_at < chrono::Utc::now().timestamp() {
            return Err(AuthError::Validation("token has expired".into()));
        }
        Ok(record.user_id)
    }
}
