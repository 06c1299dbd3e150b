use std::sync::Arc;

use shared::domain::{UserId, UserProfile};
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    collaborators::{AuthProvider, Credentials, RecordStore, Registration},
    error::ServiceError,
    state::{Operation, OperationState},
};

const MIN_PASSWORD_LEN: usize = 6;

/// Sign-in and registration screen.
pub struct AuthController {
    auth: Arc<dyn AuthProvider>,
    records: Arc<dyn RecordStore>,
    session: Operation<UserId>,
}

impl AuthController {
    pub fn new(auth: Arc<dyn AuthProvider>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            auth,
            records,
            session: Operation::new("session"),
        }
    }

    pub fn session(&self) -> &Operation<UserId> {
        &self.session
    }

    pub fn sign_in(&self, credentials: Credentials) -> JoinHandle<OperationState<UserId>> {
        if let Err(err) = validate_credentials(&credentials.email, &credentials.password) {
            let state = self.session.reject(err);
            return tokio::spawn(async move { state });
        }

        let auth = Arc::clone(&self.auth);
        self.session
            .launch(async move { auth.sign_in(&credentials).await })
    }

    /// Creates the account, then the user's profile document.
    pub fn register(&self, registration: Registration) -> JoinHandle<OperationState<UserId>> {
        let validated = validate_credentials(&registration.email, &registration.password)
            .and_then(|()| validate_password_strength(&registration.password));
        if let Err(err) = validated {
            let state = self.session.reject(err);
            return tokio::spawn(async move { state });
        }

        let auth = Arc::clone(&self.auth);
        let records = Arc::clone(&self.records);
        self.session.launch(async move {
            let user_id = auth.register(&registration).await?;
            let mut profile = UserProfile::new(user_id.clone(), registration.email.trim());
            profile.first_name = registration.first_name.trim().to_string();
            profile.last_name = registration.last_name.trim().to_string();
            records.put_user(&profile).await?;
            info!(user_id = %user_id, "registered new user");
            Ok(user_id)
        })
    }

    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
        self.session.reset();
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ServiceError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::Validation(
            "email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ServiceError::Validation(format!(
            "'{}' is not a valid email address",
            email.trim()
        )));
    }
    Ok(())
}

fn validate_password_strength(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
