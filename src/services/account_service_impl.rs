//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::repositories::user::hash_password;
use crate::db::{InsertOutcome, NewUser, Store};
use crate::domain::lockout::{AttemptState, FailureOutcome, Gate, LockoutPolicy};
use crate::domain::{FieldErrors, UserId};
use crate::services::account_service::{
    AccountError, AccountService, ProfileUpdate, RegisteredUser, Registration, SessionGrant,
    UserProfile,
};
use crate::services::activation::{
    ActivationTokens, TokenSubject, activation_link, decode_uid, encode_uid,
};
use crate::services::mailer::{Mailer, activation_email};

const DUPLICATE_EMAIL: &str = "user with this email already exists.";
const REGISTERED: &str =
    "Registration successful! Please check your email to activate your account.";
const DUMMY_PASSWORD: &str = "smartanom-no-such-account";

pub struct SeaOrmAccountService {
    store: Store,
    config: Config,
    mailer: Arc<dyn Mailer>,
    policy: LockoutPolicy,
    tokens: ActivationTokens,
    /// Verified against when the email is unknown, with the configured
    /// Argon2 cost.
    dummy_hash: Option<String>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let policy = LockoutPolicy::from_config(&config.security.lockout);
        let tokens = ActivationTokens::from_config(&config.security);
        let dummy_hash = match hash_password(DUMMY_PASSWORD, Some(&config.security)) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(error = %e, "Failed to prepare dummy password hash");
                None
            }
        };
        Self {
            store,
            config,
            mailer,
            policy,
            tokens,
            dummy_hash,
        }
    }

    async fn issue_session(&self, profile: UserProfile) -> Result<SessionGrant, AccountError> {
        let token = self.store.get_or_create_token(profile.id.value()).await?;
        Ok(SessionGrant {
            token,
            user: profile,
        })
    }

    async fn user_by_email(&self, email: &str) -> Result<crate::db::User, AccountError> {
        self.store
            .get_user_by_email(email)
            .await?
            .ok_or(AccountError::UserNotFound)
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(&self, registration: Registration) -> Result<RegisteredUser, AccountError> {
        let outcome = self
            .store
            .create_user(
                NewUser {
                    email: &registration.email,
                    name: &registration.name,
                    contact: &registration.contact,
                    password: &registration.password,
                },
                &self.config.security,
            )
            .await?;

        let user = match outcome {
            InsertOutcome::Created(user) => user,
            InsertOutcome::DuplicateEmail => {
                return Err(FieldErrors::single("email", DUPLICATE_EMAIL).into());
            }
        };

        let (user, password_hash) = self
            .store
            .get_user_with_password(user.id)
            .await?
            .ok_or_else(|| AccountError::Internal("User vanished after insert".to_string()))?;

        let token = self
            .tokens
            .make_token(&TokenSubject::new(&user, &password_hash), Utc::now())?;
        let link = activation_link(
            &self.config.email.frontend_base_url,
            &encode_uid(user.id),
            &token,
        );

        if let Err(e) = self
            .mailer
            .send(&activation_email(&user.email, &user.name, &link))
            .await
        {
            error!(user_id = user.id, error = %format!("{e:#}"), "Failed to send activation email");
            metrics::counter!("smartanom_activation_emails_failed_total").increment(1);
            return Err(AccountError::EmailDelivery(e.to_string()));
        }

        info!(user_id = user.id, "User registered, activation email sent");
        metrics::counter!("smartanom_registrations_total").increment(1);

        Ok(RegisteredUser {
            user_id: UserId::new(user.id),
            email: user.email,
            message: REGISTERED.to_string(),
        })
    }

    async fn activate(&self, uidb64: &str, token: &str) -> Result<SessionGrant, AccountError> {
        let Some(user_id) = decode_uid(uidb64) else {
            return Err(AccountError::InvalidActivationLink);
        };

        let Some((user, password_hash)) = self.store.get_user_with_password(user_id).await? else {
            return Err(AccountError::InvalidActivationLink);
        };

        if !self
            .tokens
            .check_token(&TokenSubject::new(&user, &password_hash), token, Utc::now())
        {
            warn!(user_id, "Rejected activation token");
            return Err(AccountError::InvalidActivationLink);
        }

        let user = self
            .store
            .activate_user(user_id)
            .await?
            .ok_or(AccountError::InvalidActivationLink)?;

        info!(user_id, "Account activated");
        metrics::counter!("smartanom_activations_total").increment(1);

        self.issue_session(user.into()).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<SessionGrant, AccountError> {
        let now = Utc::now();

        let Some((user, password_hash)) = self.store.get_user_by_email_with_password(email).await?
        else {
            // Unknown emails pay the same Argon2 cost as a wrong password.
            if let Some(dummy) = &self.dummy_hash {
                let _ = self.store.verify_password(dummy.clone(), password).await;
            }
            metrics::counter!("smartanom_logins_total", "outcome" => "failed").increment(1);
            return Err(AccountError::InvalidCredentials {
                attempts_remaining: None,
            });
        };

        let state = AttemptState {
            failed_attempts: user.failed_login_attempts,
            last_failed: user.last_failed_login,
        };

        match self.policy.check(state, now) {
            Gate::Locked { until } => {
                warn!(user_id = user.id, "Login rejected, account locked");
                metrics::counter!("smartanom_logins_total", "outcome" => "locked").increment(1);
                return Err(AccountError::Locked {
                    remaining: until - now,
                });
            }
            Gate::Proceed {
                reset_counter: true,
            } => {
                self.store.reset_failed_logins(user.id).await?;
                info!(
                    user_id = user.id,
                    previous_failures = user.failed_login_attempts,
                    "Lockout window elapsed, failure counter reset"
                );
            }
            Gate::Proceed { .. } => {}
        }

        if !self.store.verify_password(password_hash, password).await? {
            let failures = self.store.record_failed_login(user.id, now).await?;
            metrics::counter!("smartanom_logins_total", "outcome" => "failed").increment(1);

            return match self.policy.after_failure(failures, now) {
                FailureOutcome::AttemptsRemaining(remaining) => {
                    warn!(user_id = user.id, failures, "Failed login");
                    Err(AccountError::InvalidCredentials {
                        attempts_remaining: Some(remaining),
                    })
                }
                FailureOutcome::Locked { until } => {
                    warn!(
                        user_id = user.id,
                        failures,
                        until = %until,
                        "Account locked after repeated failed logins"
                    );
                    metrics::counter!("smartanom_lockouts_total").increment(1);
                    Err(AccountError::Locked {
                        remaining: until - now,
                    })
                }
            };
        }

        self.store.record_successful_login(user.id, now).await?;

        if !user.is_active {
            return Err(AccountError::Inactive);
        }
        if !user.email_verified {
            return Err(AccountError::EmailNotVerified);
        }

        info!(user_id = user.id, "User logged in");
        metrics::counter!("smartanom_logins_total", "outcome" => "success").increment(1);

        self.issue_session(user.into()).await
    }

    async fn authenticate_token(&self, token: &str) -> Result<UserProfile, AccountError> {
        let Some(user_id) = self.store.find_token_owner(token).await? else {
            return Err(AccountError::Unauthorized);
        };

        self.store
            .get_user(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(AccountError::Unauthorized)
    }

    async fn profile(&self, user_id: UserId) -> Result<UserProfile, AccountError> {
        self.store
            .get_user(user_id.value())
            .await?
            .map(UserProfile::from)
            .ok_or(AccountError::UserNotFound)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, AccountError> {
        let user = self
            .store
            .update_user_profile(
                user_id.value(),
                update.name.as_deref(),
                update.contact.as_deref(),
            )
            .await?
            .ok_or(AccountError::UserNotFound)?;

        info!(user_id = user.id, "Profile updated");
        Ok(user.into())
    }

    async fn force_activate(&self, email: &str) -> Result<UserProfile, AccountError> {
        let user = self.user_by_email(email).await?;
        let user = self
            .store
            .activate_user(user.id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        info!(user_id = user.id, "Account activated by operator");
        Ok(user.into())
    }

    async fn unlock(&self, email: &str) -> Result<UserProfile, AccountError> {
        let user = self.user_by_email(email).await?;
        self.store.reset_failed_logins(user.id).await?;

        info!(user_id = user.id, "Failed-login counter cleared by operator");
        self.profile(UserId::new(user.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::OutgoingEmail;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "recording"
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.security.argon2_memory_cost_kib = 1024;
        config.security.argon2_time_cost = 1;
        config.security.secret_key = "unit-test-secret".to_string();
        config
    }

    async fn service(mailer: Arc<RecordingMailer>) -> SeaOrmAccountService {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        SeaOrmAccountService::new(store, test_config(), mailer)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            name: "Ana".to_string(),
            contact: "0917".to_string(),
            password: "lettuce-123".to_string(),
        }
    }

    fn link_parts(email: &OutgoingEmail) -> (String, String) {
        let link = email
            .body
            .lines()
            .find(|l| l.contains("/activate/"))
            .unwrap();
        let mut parts = link.rsplit('/');
        let token = parts.next().unwrap().to_string();
        let uid = parts.next().unwrap().to_string();
        (uid, token)
    }

    #[tokio::test]
    async fn register_activate_then_login() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(mailer.clone()).await;

        let registered = svc.register(registration("ana@example.com")).await.unwrap();
        assert_eq!(registered.email, "ana@example.com");

        let err = svc.login("ana@example.com", "lettuce-123").await.unwrap_err();
        assert!(matches!(err, AccountError::Inactive));

        let email = mailer.sent.lock().unwrap()[0].clone();
        let (uid, token) = link_parts(&email);
        let grant = svc.activate(&uid, &token).await.unwrap();
        assert!(grant.user.is_active && grant.user.email_verified);

        let again = svc.activate(&uid, &token).await.unwrap_err();
        assert!(matches!(again, AccountError::InvalidActivationLink));

        let session = svc.login("ana@example.com", "lettuce-123").await.unwrap();
        assert_eq!(session.token, grant.token);
        assert_eq!(
            svc.authenticate_token(&session.token).await.unwrap().id,
            registered.user_id
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_a_field_error() {
        let svc = service(Arc::new(RecordingMailer::default())).await;
        svc.register(registration("dup@example.com")).await.unwrap();

        match svc.register(registration("dup@example.com")).await {
            Err(AccountError::Validation(errors)) => {
                assert_eq!(errors.get("email").unwrap(), [DUPLICATE_EMAIL]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mail_failure_keeps_user() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        });
        let svc = service(mailer).await;

        let err = svc.register(registration("nomail@example.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::EmailDelivery(_)));
        assert!(
            svc.store
                .get_user_by_email("nomail@example.com")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn dummy_hash_uses_configured_cost() {
        let svc = service(Arc::new(RecordingMailer::default())).await;
        let dummy = svc.dummy_hash.clone().unwrap();

        assert!(dummy.starts_with("$argon2id$"));
        assert!(dummy.contains("m=1024,t=1"));
        assert!(!svc.store.verify_password(dummy, "lettuce-123").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_email_costs_as_much_as_a_wrong_password() {
        let mut config = test_config();
        config.security.argon2_memory_cost_kib = 8192;
        config.security.argon2_time_cost = 2;
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let svc = SeaOrmAccountService::new(store, config, Arc::new(RecordingMailer::default()));
        svc.register(registration("known@example.com")).await.unwrap();
        svc.force_activate("known@example.com").await.unwrap();

        let start = std::time::Instant::now();
        for _ in 0..3 {
            let err = svc.login("ghost@example.com", "wrong").await.unwrap_err();
            assert!(matches!(
                err,
                AccountError::InvalidCredentials {
                    attempts_remaining: None
                }
            ));
        }
        let unknown = start.elapsed();

        let start = std::time::Instant::now();
        for _ in 0..3 {
            svc.login("known@example.com", "wrong").await.unwrap_err();
        }
        let known = start.elapsed();

        assert!(
            unknown * 3 >= known,
            "unknown email took {unknown:?}, wrong password took {known:?}"
        );
    }

    #[tokio::test]
    async fn fifth_failure_locks_and_correct_password_is_not_checked() {
        let svc = service(Arc::new(RecordingMailer::default())).await;
        svc.register(registration("lock@example.com")).await.unwrap();
        svc.force_activate("lock@example.com").await.unwrap();

        for expected in (1..=4).rev() {
            match svc.login("lock@example.com", "wrong").await {
                Err(AccountError::InvalidCredentials { attempts_remaining }) => {
                    assert_eq!(attempts_remaining, Some(expected));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        let fifth = svc.login("lock@example.com", "wrong").await.unwrap_err();
        assert!(matches!(fifth, AccountError::Locked { .. }));

        let sixth = svc.login("lock@example.com", "lettuce-123").await.unwrap_err();
        match sixth {
            AccountError::Locked { remaining } => {
                assert!(remaining <= chrono::Duration::hours(24));
                assert!(remaining > chrono::Duration::hours(23));
            }
            other => panic!("unexpected {other:?}"),
        }

        svc.unlock("lock@example.com").await.unwrap();
        assert!(svc.login("lock@example.com", "lettuce-123").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_email_is_plain_invalid_credentials() {
        let svc = service(Arc::new(RecordingMailer::default())).await;
        let err = svc.login("ghost@example.com", "whatever").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::InvalidCredentials {
                attempts_remaining: None
            }
        ));
    }

    #[tokio::test]
    async fn garbage_activation_inputs_are_generic() {
        let svc = service(Arc::new(RecordingMailer::default())).await;
        for (uid, token) in [("%%%", "x"), ("OTk5", "abc-def"), ("", "")] {
            let err = svc.activate(uid, token).await.unwrap_err();
            assert!(matches!(err, AccountError::InvalidActivationLink));
        }
    }
}
