use prosody_core::model::UserId;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CloudConfig;
use crate::error::AuthError;

/// A signed-in user.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub access_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Email/password client for the identity provider.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    config: CloudConfig,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: CloudConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Signs in with the password grant.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` for bad credentials and
    /// `AuthError::MissingUser` if the response carries no user.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.config.url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: TokenResponse = ensure_success(response).await?.json().await?;
        let session = body.into_session()?.ok_or(AuthError::MissingUser)?;
        info!(user = %session.user_id, "signed in");
        Ok(session)
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ConfirmationRequired` when the provider created the
    /// account but withholds a session until the email is confirmed.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/signup", self.config.url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: TokenResponse = ensure_success(response).await?.json().await?;
        let session = body
            .into_session()?
            .ok_or(AuthError::ConfirmationRequired)?;
        info!(user = %session.user_id, "signed up");
        Ok(session)
    }

    /// Revokes the session's tokens.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider rejects the call.
    pub async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.config.url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        ensure_success(response).await?;
        info!(user = %session.user_id, "signed out");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::message)
        .unwrap_or(body);
    Err(AuthError::Rejected { status, message })
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Either a full session or, for unconfirmed sign-ups, a bare user.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    user: Option<UserBody>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
}

impl TokenResponse {
    fn into_session(self) -> Result<Option<Session>, AuthError> {
        let Some(access_token) = self.access_token else {
            return Ok(None);
        };
        let raw_id = self.user.map(|user| user.id).or(self.id);
        let user_id = raw_id.and_then(UserId::new).ok_or(AuthError::MissingUser)?;
        Ok(Some(Session {
            user_id,
            access_token,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_yields_session() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"access_token":"jwt","token_type":"bearer","user":{"id":"abc","email":"a@b.c"}}"#,
        )
        .unwrap();
        let session = body.into_session().unwrap().unwrap();
        assert_eq!(session.user_id.as_str(), "abc");
        assert_eq!(session.access_token, "jwt");
    }

    #[test]
    fn unconfirmed_signup_has_no_session() {
        let body: TokenResponse =
            serde_json::from_str(r#"{"id":"abc","email":"a@b.c","confirmation_sent_at":"x"}"#)
                .unwrap();
        assert!(body.into_session().unwrap().is_none());
    }

    #[test]
    fn token_without_user_is_rejected() {
        let body: TokenResponse = serde_json::from_str(r#"{"access_token":"jwt"}"#).unwrap();
        assert!(matches!(body.into_session(), Err(AuthError::MissingUser)));
    }

    #[test]
    fn error_body_prefers_description() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn session_debug_hides_token() {
        let session = Session {
            user_id: UserId::new("abc").unwrap(),
            access_token: "secret".into(),
        };
        assert!(!format!("{session:?}").contains("secret"));
    }
}
