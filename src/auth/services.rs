use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser, UpdateProfileRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::{CreateUserError, CredentialStore},
        repo_types::{NewUser, ProfileUpdate, Role, User},
        tokens,
    },
    config::AppConfig,
    error::{ApiError, ApiResult},
    mail::{self, MailMessage, Mailer},
    records::services::check_money,
    state::AppState,
};

impl From<CreateUserError> for ApiError {
    fn from(e: CreateUserError) -> Self {
        match e {
            CreateUserError::DuplicateEmail => ApiError::DuplicateEmail,
            CreateUserError::Other(e) => ApiError::Storage(e),
        }
    }
}

/// Registration, verification, login and password recovery.
#[derive(Clone)]
pub struct AuthWorkflow {
    users: Arc<dyn CredentialStore>,
    mailer: Arc<dyn Mailer>,
    keys: JwtKeys,
    config: Arc<AppConfig>,
}

impl FromRef<AppState> for AuthWorkflow {
    fn from_ref(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            mailer: state.mailer.clone(),
            keys: JwtKeys::from_ref(state),
            config: state.config.clone(),
        }
    }
}

impl AuthWorkflow {
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Name, email and password are required"));
        }

        let password_hash =
            hash_password_blocking(self.config.password.clone(), password.to_string()).await?;
        let token = tokens::generate_token();

        let user = self
            .users
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::User,
                is_verified: false,
                verification_token: Some(token.clone()),
            })
            .await
            .map_err(|e| {
                if matches!(e, CreateUserError::DuplicateEmail) {
                    warn!("email already registered");
                }
                ApiError::from(e)
            })?;

        info!(user_id = %user.id, "user registered");
        self.dispatch(mail::verification_email(&self.config.mail, &user.email, &token));
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> ApiResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::InvalidToken);
        }
        match self.users.consume_verification_token(token).await? {
            Some(user_id) => {
                info!(%user_id, "email verified");
                Ok(())
            }
            None => {
                warn!("unknown or already used verification token");
                Err(ApiError::InvalidToken)
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let user = match self.users.find_by_email(email.trim()).await? {
            Some(u) => u,
            None => {
                warn!("login unknown email");
                return Err(ApiError::UserNotFound);
            }
        };

        let ok = verify_password_blocking(password.to_string(), user.password_hash.clone()).await?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }
        if !user.is_verified {
            warn!(user_id = %user.id, "login before verification");
            return Err(ApiError::UnverifiedAccount);
        }

        let token = self.keys.sign(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthResponse {
            token,
            user: PublicUser::from(&user),
        })
    }

    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            warn!("password reset for unknown email");
            if self.config.uniform_forgot_password {
                return Ok(());
            }
            return Err(ApiError::UserNotFound);
        };

        let token = tokens::generate_token();
        let expires = tokens::reset_expiry(tokens::now_millis());
        self.users.set_reset_token(user.id, &token, expires).await?;

        info!(user_id = %user.id, "password reset requested");
        self.dispatch(mail::password_reset_email(&self.config.mail, &user.email, &token));
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        if new_password.is_empty() {
            return Err(ApiError::validation("New password is required"));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::InvalidOrExpiredToken);
        }

        let user = self
            .users
            .find_by_reset_token(token, tokens::now_millis())
            .await?
            .ok_or(ApiError::InvalidOrExpiredToken)?;

        let hash =
            hash_password_blocking(self.config.password.clone(), new_password.to_string()).await?;

        // a concurrent reset may have consumed the token while we were hashing
        if self.users.complete_password_reset(user.id, token, &hash).await? == 0 {
            return Err(ApiError::InvalidOrExpiredToken);
        }
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> ApiResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))
    }

    #[instrument(skip(self, req))]
    pub async fn update_profile(&self, user_id: Uuid, req: UpdateProfileRequest) -> ApiResult<User> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        if req.monthly_salary.is_sign_negative() || req.expected_savings.is_sign_negative() {
            return Err(ApiError::validation("Amounts must not be negative"));
        }
        check_money("Monthly salary", req.monthly_salary)?;
        check_money("Expected savings", req.expected_savings)?;
        if !(1..=31).contains(&req.salary_deposit_day) {
            return Err(ApiError::validation("Salary deposit day must be between 1 and 31"));
        }

        let user = self
            .users
            .update_profile(
                user_id,
                ProfileUpdate {
                    name: name.to_string(),
                    monthly_salary: req.monthly_salary,
                    expected_savings: req.expected_savings,
                    salary_deposit_day: req.salary_deposit_day,
                },
            )
            .await?
            .ok_or(ApiError::NotFound("User"))?;
        info!(%user_id, "profile updated");
        Ok(user)
    }

    /// Seeds a verified administrator.
    pub async fn create_admin(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Name, email and password are required"));
        }
        let password_hash =
            hash_password_blocking(self.config.password.clone(), password.to_string()).await?;
        let user = self
            .users
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::Admin,
                is_verified: true,
                verification_token: None,
            })
            .await?;
        info!(user_id = %user.id, "admin created");
        Ok(user)
    }

    /// Delivery is best-effort; failures are logged and never reach the caller.
    fn dispatch(&self, message: MailMessage) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                warn!(error = %e, to = %message.to, subject = %message.subject, "failed to send mail");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use rust_decimal::Decimal;

    use super::*;
    use crate::testing::{Harness, RecordingMailer};

    fn workflow(h: &Harness) -> AuthWorkflow {
        AuthWorkflow::from_ref(&h.state)
    }

    async fn wait_for_mail(mailer: &RecordingMailer, n: usize) -> Vec<MailMessage> {
        for _ in 0..100 {
            let sent = mailer.sent.lock().await.clone();
            if sent.len() >= n {
                return sent;
            }
            tokio::task::yield_now().await;
        }
        mailer.sent.lock().await.clone()
    }

    async fn registered(h: &Harness, email: &str, password: &str) -> User {
        workflow(h)
            .register("Ana", email, password)
            .await
            .expect("register")
    }

    async fn verified(h: &Harness, email: &str, password: &str) -> User {
        let user = registered(h, email, password).await;
        let token = h.users.get(user.id).await.unwrap().verification_token.unwrap();
        workflow(h).verify_email(&token).await.expect("verify");
        user
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let h = Harness::new();
        let wf = workflow(&h);
        for (name, email, pw) in [("", "a@x.io", "pw"), ("A", " ", "pw"), ("A", "a@x.io", "")] {
            let err = wf.register(name, email, pw).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn register_accepts_any_nonempty_email() {
        let h = Harness::new();
        for email in ["ana@localhost", "not-an-address"] {
            let user = registered(&h, email, "pw").await;
            assert_eq!(user.email, email);
        }
    }

    #[tokio::test]
    async fn register_stores_hash_and_token_and_sends_link() {
        let h = Harness::new();
        let user = registered(&h, "ana@example.com", "hunter22").await;

        let stored = h.users.get(user.id).await.unwrap();
        assert!(!stored.is_verified);
        assert_ne!(stored.password_hash, "hunter22");
        let token = stored.verification_token.expect("token issued");
        assert_eq!(token.len(), 64);

        let sent = wait_for_mail(&h.mailer, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
        assert!(sent[0].text.contains(&token));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_distinct_error() {
        let h = Harness::new();
        registered(&h, "ana@example.com", "pw").await;
        let err = workflow(&h)
            .register("Other", "ana@example.com", "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
    }

    #[tokio::test]
    async fn mail_failure_does_not_fail_registration() {
        let h = Harness::new();
        h.mailer.fail.store(true, Ordering::SeqCst);
        let res = workflow(&h).register("Ana", "ana@example.com", "pw").await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn login_blocked_until_verified() {
        let h = Harness::new();
        let wf = workflow(&h);
        let user = registered(&h, "ana@example.com", "pw").await;

        let err = wf.login("ana@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::UnverifiedAccount));

        let token = h.users.get(user.id).await.unwrap().verification_token.unwrap();
        wf.verify_email(&token).await.unwrap();

        let res = wf.login("ana@example.com", "pw").await.expect("login");
        assert_eq!(res.user.id, user.id);
        assert_eq!(res.user.role, Role::User);
        let claims = JwtKeys::from_ref(&h.state).verify(&res.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "ana@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_always_invalid_credentials() {
        let h = Harness::new();
        let wf = workflow(&h);
        // unverified and verified accounts both report the password problem first
        registered(&h, "new@example.com", "pw").await;
        verified(&h, "ana@example.com", "pw").await;
        for email in ["new@example.com", "ana@example.com"] {
            let err = wf.login(email, "nope").await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn login_unknown_email_is_user_not_found() {
        let h = Harness::new();
        let err = workflow(&h).login("ghost@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));
    }

    #[tokio::test]
    async fn verification_token_is_single_use() {
        let h = Harness::new();
        let wf = workflow(&h);
        let user = registered(&h, "ana@example.com", "pw").await;
        let token = h.users.get(user.id).await.unwrap().verification_token.unwrap();

        wf.verify_email(&token).await.expect("first use");
        let err = wf.verify_email(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));

        let stored = h.users.get(user.id).await.unwrap();
        assert!(stored.is_verified);
        assert!(stored.verification_token.is_none());
    }

    #[tokio::test]
    async fn forgot_password_unknown_email_leaks_by_default() {
        let h = Harness::new();
        let err = workflow(&h).forgot_password("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));
    }

    #[tokio::test]
    async fn forgot_password_uniform_mode_hides_existence() {
        let mut cfg = AppConfig::for_tests();
        cfg.uniform_forgot_password = true;
        let h = Harness::with_config(cfg);
        assert!(workflow(&h).forgot_password("ghost@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn forgot_password_overwrites_previous_token() {
        let h = Harness::new();
        let wf = workflow(&h);
        let user = verified(&h, "ana@example.com", "pw").await;

        wf.forgot_password("ana@example.com").await.unwrap();
        let first = h.users.get(user.id).await.unwrap().reset_password_token.unwrap();
        wf.forgot_password("ana@example.com").await.unwrap();
        let stored = h.users.get(user.id).await.unwrap();
        let second = stored.reset_password_token.clone().unwrap();
        assert_ne!(first, second);
        assert!(stored.reset_password_expires.unwrap() > tokens::now_millis());

        let err = wf.reset_password(&first, "new-pw").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn reset_password_replaces_hash_and_clears_token() {
        let h = Harness::new();
        let wf = workflow(&h);
        let user = verified(&h, "ana@example.com", "old-pw").await;
        wf.forgot_password("ana@example.com").await.unwrap();
        let token = h.users.get(user.id).await.unwrap().reset_password_token.unwrap();

        wf.reset_password(&token, "new-pw").await.expect("reset");

        let stored = h.users.get(user.id).await.unwrap();
        assert!(stored.reset_password_token.is_none());
        assert!(stored.reset_password_expires.is_none());
        assert!(wf.login("ana@example.com", "new-pw").await.is_ok());
        assert!(matches!(
            wf.login("ana@example.com", "old-pw").await.unwrap_err(),
            ApiError::InvalidCredentials
        ));

        let err = wf.reset_password(&token, "again").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected_even_when_it_matches() {
        let h = Harness::new();
        let wf = workflow(&h);
        let user = verified(&h, "ana@example.com", "pw").await;
        wf.forgot_password("ana@example.com").await.unwrap();
        let token = h.users.get(user.id).await.unwrap().reset_password_token.unwrap();

        let now = tokens::now_millis();
        h.users
            .edit(user.id, |u| u.reset_password_expires = Some(now - 1))
            .await;
        let err = wf.reset_password(&token, "new-pw").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidOrExpiredToken));

        h.users
            .edit(user.id, |u| u.reset_password_expires = Some(now))
            .await;
        let err = wf.reset_password(&token, "new-pw").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn profile_update_validates_ranges() {
        let h = Harness::new();
        let wf = workflow(&h);
        let user = verified(&h, "ana@example.com", "pw").await;

        let bad_day = UpdateProfileRequest {
            name: "Ana".into(),
            monthly_salary: Decimal::from(3000),
            expected_savings: Decimal::from(500),
            salary_deposit_day: 32,
        };
        assert!(matches!(
            wf.update_profile(user.id, bad_day).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let fractional = UpdateProfileRequest {
            name: "Ana".into(),
            monthly_salary: Decimal::new(30_000_001, 4),
            expected_savings: Decimal::from(500),
            salary_deposit_day: 1,
        };
        assert!(matches!(
            wf.update_profile(user.id, fractional).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let ok = UpdateProfileRequest {
            name: "Ana B".into(),
            monthly_salary: Decimal::from(3000),
            expected_savings: Decimal::from(500),
            salary_deposit_day: 25,
        };
        let updated = wf.update_profile(user.id, ok).await.unwrap();
        assert_eq!(updated.name, "Ana B");
        assert_eq!(updated.monthly_salary, Decimal::from(3000));
        assert_eq!(updated.salary_deposit_day, 25);
    }

    #[tokio::test]
    async fn create_admin_is_verified_admin() {
        let h = Harness::new();
        let admin = workflow(&h)
            .create_admin("Root", "root@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.is_verified);
        assert!(workflow(&h).login("root@example.com", "pw").await.is_ok());
    }
}
