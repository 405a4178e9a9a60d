//! User service
//!
//! Signup, login and bearer sessions:
//! - the first account to sign up becomes an admin, later ones are members
//! - sessions expire after `session_days`; expired sessions are removed
//!   the first time they are presented

use crate::db;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const EMAIL_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 8;

const DEFAULT_SESSION_DAYS: i64 = 7;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Signup form as posted by the client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl SignupInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: email.into(),
            password_confirm: password.clone(),
            password,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_days(user_repo, session_repo, DEFAULT_SESSION_DAYS)
    }

    pub fn with_session_days(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_days: session_days.max(1),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` when a field breaks the signup rules
    /// - `UserExists` when the username or email is taken
    pub async fn signup(&self, input: SignupInput) -> Result<User, UserServiceError> {
        validate_signup(&input)?;

        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::Member
        };

        let password_hash = hash_password(&input.password)?;
        let user = match self
            .user_repo
            .create(&User::new(username, email, password_hash, role))
            .await
        {
            Ok(user) => user,
            Err(e) if db::is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(
                    "Username or email is already registered".to_string(),
                ))
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!("Registered user {} ({})", user.username, user.role);
        Ok(user)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let username = input.username.trim();
        if username.is_empty() || input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&Session::issue(user.id, self.session_days))
            .await
            .context("Failed to create session")?;

        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a bearer token to its user.
    ///
    /// Unknown and expired tokens yield `None`; an expired session is deleted.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await.context("Failed to get user")?)
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Remove every expired session, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }
}

fn validate_signup(input: &SignupInput) -> Result<(), UserServiceError> {
    let invalid = |msg: &str| Err(UserServiceError::ValidationError(msg.to_string()));

    let username = input.username.trim();
    if username.is_empty() {
        return invalid("username: This field is required");
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return invalid("username: Ensure this field has no more than 150 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return invalid("username: Letters, digits and @/./+/-/_ only");
    }

    let email = input.email.trim();
    if email.is_empty() {
        return invalid("email: This field is required");
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return invalid("email: Ensure this field has no more than 100 characters");
    }
    if !is_plausible_email(email) {
        return invalid("email: Enter a valid email address");
    }

    let password = &input.password;
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return invalid("password: This password is too short. It must contain at least 8 characters");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return invalid("password: This password is entirely numeric");
    }
    if password.eq_ignore_ascii_case(username) {
        return invalid("password: The password is too similar to the username");
    }
    if input.password_confirm != *password {
        return invalid("password_confirm: The two password fields didn't match");
    }

    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Field descriptions served by `GET /users/signup`
pub fn signup_form() -> Value {
    json!({
        "fields": [
            {
                "name": "username",
                "type": "string",
                "required": true,
                "max_length": USERNAME_MAX_CHARS,
                "help_text": "150 characters or fewer. Letters, digits and @/./+/-/_ only."
            },
            {
                "name": "email",
                "type": "email",
                "required": true,
                "max_length": EMAIL_MAX_CHARS
            },
            {
                "name": "password",
                "type": "password",
                "required": true,
                "min_length": PASSWORD_MIN_CHARS,
                "help_text": "At least 8 characters, not entirely numeric, not similar to the username."
            },
            {
                "name": "password_confirm",
                "type": "password",
                "required": true
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    async fn setup_service() -> (sqlx::SqlitePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    #[tokio::test]
    async fn test_first_user_is_admin_then_members() {
        let (_pool, service) = setup_service().await;

        let first = service.signup(SignupInput::new("first", "first@example.com", "pass-word-1")).await.unwrap();
        let second = service.signup(SignupInput::new("second", "second@example.com", "pass-word-2")).await.unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let (_pool, service) = setup_service().await;
        service.signup(SignupInput::new("taken", "taken@example.com", "pass-word-1")).await.unwrap();

        let same_name = service.signup(SignupInput::new("taken", "other@example.com", "pass-word-1")).await;
        assert!(matches!(same_name, Err(UserServiceError::UserExists(_))));

        let same_email = service.signup(SignupInput::new("other", "TAKEN@example.com", "pass-word-1")).await;
        assert!(matches!(same_email, Err(UserServiceError::UserExists(_))));
    }

    /// Lookups that never see the competing signup
    struct StaleLookups(SqlxUserRepository);

    #[async_trait::async_trait]
    impl UserRepository for StaleLookups {
        async fn create(&self, user: &User) -> anyhow::Result<User> {
            self.0.create(user).await
        }

        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.get_by_id(id).await
        }

        async fn get_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn get_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }
    }

    #[tokio::test]
    async fn test_racing_signup_reports_user_exists() {
        let (pool, _) = setup_service().await;
        let service = UserService::new(
            Arc::new(StaleLookups(SqlxUserRepository::new(pool.clone()))),
            SqlxSessionRepository::boxed(pool),
        );
        service.signup(SignupInput::new("racer", "racer@example.com", "pass-word-1")).await.unwrap();

        let again = service.signup(SignupInput::new("racer", "racer2@example.com", "pass-word-1")).await;
        assert!(matches!(again, Err(UserServiceError::UserExists(_))));
    }

    #[test]
    fn test_signup_validation_rules() {
        let ok = SignupInput::new("jiwoo_92", "jiwoo@example.com", "s3cure-pass");
        assert!(validate_signup(&ok).is_ok());

        let cases = [
            SignupInput::new("", "a@example.com", "s3cure-pass"),
            SignupInput::new("bad name", "a@example.com", "s3cure-pass"),
            SignupInput::new("a".repeat(151), "a@example.com", "s3cure-pass"),
            SignupInput::new("name", "not-an-email", "s3cure-pass"),
            SignupInput::new("name", format!("{}@example.com", "a".repeat(100)), "s3cure-pass"),
            SignupInput::new("name", "a@example.com", "short"),
            SignupInput::new("name", "a@example.com", "12345678"),
            SignupInput::new("sameasname", "a@example.com", "sameasname"),
        ];
        for input in cases {
            assert!(
                matches!(validate_signup(&input), Err(UserServiceError::ValidationError(_))),
                "expected rejection for {:?}",
                input.username
            );
        }

        let mut mismatch = SignupInput::new("name", "a@example.com", "s3cure-pass");
        mismatch.password_confirm = "different".to_string();
        assert!(validate_signup(&mismatch).is_err());
    }

    #[test]
    fn test_korean_username_allowed() {
        assert!(validate_signup(&SignupInput::new("김민지", "minji@example.com", "s3cure-pass")).is_ok());
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let (_pool, service) = setup_service().await;
        let user = service.signup(SignupInput::new("login", "login@example.com", "pass-word-1")).await.unwrap();

        let (logged_in, session) = service.login(LoginInput::new("login", "pass-word-1")).await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.username, "login");

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (_pool, service) = setup_service().await;
        service.signup(SignupInput::new("user", "user@example.com", "pass-word-1")).await.unwrap();

        let wrong = service.login(LoginInput::new("user", "wrong-pass")).await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        let missing = service.login(LoginInput::new("ghost", "pass-word-1")).await;
        assert!(matches!(missing, Err(UserServiceError::AuthenticationError(_))));

        let blank = service.login(LoginInput::new("", "pass-word-1")).await;
        assert!(matches!(blank, Err(UserServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let (pool, service) = setup_service().await;
        let user = service.signup(SignupInput::new("old", "old@example.com", "pass-word-1")).await.unwrap();

        let session_repo = SqlxSessionRepository::new(pool);
        let mut session = Session::issue(user.id, 1);
        session.expires_at = Utc::now() - Duration::minutes(5);
        session_repo.create(&session).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(session_repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[test]
    fn test_signup_form_lists_fields() {
        let form = signup_form();
        let names: Vec<&str> = form["fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["name"].as_str())
            .collect();
        assert_eq!(names, vec!["username", "email", "password", "password_confirm"]);
    }

    proptest! {
        #[test]
        fn all_digit_passwords_rejected(password in "[0-9]{8,20}") {
            let input = SignupInput::new("digits", "d@example.com", password);
            prop_assert!(validate_signup(&input).is_err());
        }

        #[test]
        fn valid_usernames_accepted(username in "[a-zA-Z0-9@.+_-]{1,150}") {
            let input = SignupInput::new(username, "v@example.com", "Valid-pass-1");
            prop_assume!(!"Valid-pass-1".eq_ignore_ascii_case(input.username.trim()));
            prop_assert!(validate_signup(&input).is_ok());
        }
    }
}
