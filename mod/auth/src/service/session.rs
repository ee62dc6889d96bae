use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use acpn_core::new_id;
use acpn_sql::Value;

use crate::model::{Claims, Session, TokenPair, User};
use crate::service::user::verify_password;
use crate::service::{AuthError, AuthService};

impl AuthService {
    /// Verify credentials and issue a token pair.
    ///
    /// Enforces the authentication invariant: the account must be active,
    /// and members must additionally be approved.
    pub fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let user = self
            .find_user_by_email(email)?
            .ok_or_else(|| AuthError::Unauthorized("invalid credentials".into()))?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::Unauthorized("invalid credentials".into()));
        }

        if !user.can_authenticate() {
            return Err(AuthError::Unauthorized(format!(
                "account is {} and cannot sign in",
                user.status.as_str()
            )));
        }

        let tokens = self.issue_tokens(&user)?;
        tracing::info!(user_id = %user.id, "login");
        Ok((user, tokens))
    }

    /// Issue a JWT token pair (access + refresh) for a user, recording a
    /// session for refresh rotation and revocation.
    pub fn issue_tokens(&self, user: &User) -> Result<TokenPair, AuthError> {
        let session_id = new_id();
        let now = chrono::Utc::now();
        let access_exp = now + chrono::Duration::seconds(self.config.access_token_ttl);
        let refresh_exp = now + chrono::Duration::seconds(self.config.refresh_token_ttl);

        let access_claims = Claims {
            sub: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            sid: session_id.clone(),
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
        };
        let refresh_claims = Claims {
            exp: refresh_exp.timestamp(),
            ..access_claims.clone()
        };

        let key = EncodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let access_token = encode(&Header::default(), &access_claims, &key)
            .map_err(|e| AuthError::Internal(format!("JWT encode failed: {}", e)))?;
        let refresh_token = encode(&Header::default(), &refresh_claims, &key)
            .map_err(|e| AuthError::Internal(format!("JWT encode failed: {}", e)))?;

        let session = Session {
            id: session_id,
            user_id: user.id.clone(),
            issued_at: now.to_rfc3339(),
            expires_at: refresh_exp.to_rfc3339(),
            revoked: false,
        };

        self.insert_record(
            "sessions",
            &session.id,
            &session,
            &[
                ("user_id", Value::Text(session.user_id.clone())),
                ("revoked", Value::Integer(0)),
                ("issued_at", Value::Text(session.issued_at.clone())),
                ("expires_at", Value::Text(session.expires_at.clone())),
            ],
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl,
        })
    }

    /// Verify and decode a JWT access token.
    /// Returns the claims if valid and the session is not revoked.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AuthError::Unauthorized(format!("invalid token: {}", e)))?;

        let claims = token_data.claims;

        if let Ok(session) = self.get_record::<Session>("sessions", &claims.sid) {
            if session.revoked {
                return Err(AuthError::Unauthorized("session has been revoked".into()));
            }
        }

        Ok(claims)
    }

    /// Refresh an access token using a refresh token.
    /// Validates the refresh token, revokes the old session, and issues a
    /// new pair.
    pub fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify_token(refresh_token)?;

        let user: User = self
            .get_record("users", &claims.sub)
            .map_err(|_| AuthError::Unauthorized("user not found".into()))?;

        if !user.can_authenticate() {
            return Err(AuthError::Unauthorized(format!(
                "account is {} and cannot sign in",
                user.status.as_str()
            )));
        }

        self.revoke_session(&claims.sid)?;
        self.issue_tokens(&user)
    }

    /// Revoke a session (its tokens become invalid).
    pub fn revoke_session(&self, session_id: &str) -> Result<(), AuthError> {
        let mut session: Session = self.get_record("sessions", session_id)?;
        session.revoked = true;

        self.update_record(
            "sessions",
            session_id,
            &session,
            &[("revoked", Value::Integer(1))],
        )?;

        Ok(())
    }

    /// Revoke all active sessions for a user.
    pub fn revoke_all_user_sessions(&self, user_id: &str) -> Result<u64, AuthError> {
        let affected = self
            .sql
            .exec(
                "UPDATE sessions SET revoked = 1, \
                 data = REPLACE(data, '\"revoked\":false', '\"revoked\":true') \
                 WHERE user_id = ?1 AND revoked = 0",
                &[Value::Text(user_id.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuditContext, CreateUser, RegisterInput};
    use crate::service::test_support::test_service;
    use acpn_core::UserRole;

    fn active_user(svc: &AuthService, email: &str) -> User {
        svc.create_user(
            &AuditContext::system(),
            CreateUser {
                name: "Sess".into(),
                email: email.into(),
                password: "password123".into(),
                role: UserRole::Member,
            },
        )
        .unwrap()
    }

    #[test]
    fn login_issues_verifiable_tokens() {
        let svc = test_service();
        let user = active_user(&svc, "s1@acpn.example");

        let (logged_in, tokens) = svc.login("s1@acpn.example", "password123").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(tokens.token_type, "Bearer");

        let claims = svc.verify_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Member);
    }

    #[test]
    fn wrong_password_and_unknown_email_are_uniform() {
        let svc = test_service();
        active_user(&svc, "s2@acpn.example");

        let e1 = svc.login("s2@acpn.example", "wrong").unwrap_err();
        let e2 = svc.login("ghost@acpn.example", "whatever").unwrap_err();
        assert_eq!(e1.to_string(), e2.to_string());
    }

    #[test]
    fn pending_member_cannot_login() {
        let svc = test_service();
        svc.register(RegisterInput {
            name: "Pending".into(),
            email: "pend@acpn.example".into(),
            password: "password123".into(),
        })
        .unwrap();

        let err = svc.login("pend@acpn.example", "password123").unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
    }

    #[test]
    fn refresh_rotates_sessions() {
        let svc = test_service();
        active_user(&svc, "s3@acpn.example");
        let (_, tokens1) = svc.login("s3@acpn.example", "password123").unwrap();

        let tokens2 = svc.refresh_tokens(&tokens1.refresh_token).unwrap();
        assert_ne!(tokens2.access_token, tokens1.access_token);

        // Old session is revoked, new one works.
        assert!(svc.verify_token(&tokens1.access_token).is_err());
        assert!(svc.verify_token(&tokens2.access_token).is_ok());
    }

    #[test]
    fn revoke_all_invalidates_every_session() {
        let svc = test_service();
        let user = active_user(&svc, "s4@acpn.example");
        let (_, t1) = svc.login("s4@acpn.example", "password123").unwrap();
        let (_, t2) = svc.login("s4@acpn.example", "password123").unwrap();

        let revoked = svc.revoke_all_user_sessions(&user.id).unwrap();
        assert_eq!(revoked, 2);
        assert!(svc.verify_token(&t1.access_token).is_err());
        assert!(svc.verify_token(&t2.access_token).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        let svc = test_service();
        assert!(svc.verify_token("this.is.not.a.valid.jwt").is_err());
    }
}
