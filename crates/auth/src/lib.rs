//! PowerFlow authentication client
//!
//! Login and registration against the PowerFlow backend, plus the
//! [`SessionContext`] every authenticated client shares.

mod session;
mod storage;

pub use session::*;
pub use storage::*;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown when the backend rejects a request without an `error` message
pub const GENERIC_ERROR_MESSAGE: &str = "No se pudo completar la solicitud";

/// Error type
#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend refused the credentials or the registration
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        field: Option<AuthField>,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Form field a backend authentication error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthField {
    Name,
    Email,
    Password,
}

impl AuthField {
    /// Wire/form name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "nombre",
            Self::Email => "correo",
            Self::Password => "password",
        }
    }

    /// Fields whose values are cleared for re-entry after a rejection
    /// pointing at `field`
    pub fn cleared_by(field: Option<AuthField>) -> &'static [AuthField] {
        match field {
            Some(Self::Email) => &[Self::Email, Self::Password],
            Some(Self::Name) => &[Self::Name],
            Some(Self::Password) | None => &[Self::Password],
        }
    }
}

/// Request that produced an authentication error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Login,
    Register,
}

/// Work out which form field a backend message is about
pub fn classify_error(operation: AuthOperation, message: &str) -> Option<AuthField> {
    let message = message.to_lowercase();

    match operation {
        AuthOperation::Login => {
            if message.contains("correo")
                || message.contains("registrado")
                || message.contains("no existe")
            {
                Some(AuthField::Email)
            } else if message.contains("contraseña") {
                Some(AuthField::Password)
            } else {
                None
            }
        }
        AuthOperation::Register => {
            if message.contains("correo ya está") || message.contains("correo ya esta") {
                Some(AuthField::Email)
            } else if message.contains("contraseña") {
                Some(AuthField::Password)
            } else if message.contains("nombre") {
                Some(AuthField::Name)
            } else {
                None
            }
        }
    }
}

/// Error body the backend sends with non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
}

/// Extract the `error` message from a response body, degrading to
/// [`GENERIC_ERROR_MESSAGE`]
pub fn backend_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "correo")]
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    #[serde(rename = "nombre")]
    name: &'a str,
    #[serde(rename = "correo")]
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
    #[serde(rename = "usuario")]
    user: Option<User>,
}

/// Result of a successful registration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    /// Confirmation text from the backend
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,

    /// The created user, when the backend echoes it
    #[serde(rename = "usuario", default)]
    pub user: Option<User>,
}

/// Auth client
pub struct AuthClient {
    url: String,
    http_client: Client,
    session: SessionContext,
}

impl AuthClient {
    pub fn new(url: &str, http_client: Client, session: SessionContext) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Session shared with the other clients
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    async fn rejection(response: Response, operation: AuthOperation) -> AuthError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = backend_error_message(&body);
        let field = classify_error(operation, &message);

        log::debug!("{:?} rejected with {}: {}", operation, status, message);
        AuthError::Rejected {
            status,
            message,
            field,
        }
    }

    /// Log in with email and password, persisting the new session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = self.get_url("/api/login");

        let response = self
            .http_client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response, AuthOperation::Login).await);
        }

        let body = response.text().await?;
        let login: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(format!("login response: {}", e)))?;

        let token = login
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("no token received".to_string()))?;
        let user = login
            .user
            .ok_or_else(|| AuthError::MalformedResponse("no user received".to_string()))?;

        let session = Session { token, user };
        self.session.establish(session.clone())?;

        log::info!("Logged in as {}", session.user.email);
        Ok(session)
    }

    /// Create a new account; does not log in
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, AuthError> {
        let url = self.get_url("/api/usuarios");

        let response = self
            .http_client
            .post(&url)
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response, AuthOperation::Register).await);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Registration::default());
        }

        serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(format!("registration response: {}", e)))
    }

    /// Register, then log in with the same credentials
    pub async fn register_and_login(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.register(name, email, password).await?;
        self.login(email, password).await
    }

    /// End the session locally; the backend keeps no session state
    pub fn logout(&self) {
        self.session.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_login_errors() {
        assert_eq!(
            classify_error(AuthOperation::Login, "El correo no está registrado"),
            Some(AuthField::Email)
        );
        assert_eq!(
            classify_error(AuthOperation::Login, "El usuario no existe"),
            Some(AuthField::Email)
        );
        assert_eq!(
            classify_error(AuthOperation::Login, "Contraseña incorrecta"),
            Some(AuthField::Password)
        );
        assert_eq!(classify_error(AuthOperation::Login, "Error interno"), None);
    }

    #[test]
    fn test_classify_register_errors() {
        assert_eq!(
            classify_error(AuthOperation::Register, "El correo ya está registrado"),
            Some(AuthField::Email)
        );
        assert_eq!(
            classify_error(
                AuthOperation::Register,
                "La contraseña debe tener al menos 6 caracteres"
            ),
            Some(AuthField::Password)
        );
        assert_eq!(
            classify_error(AuthOperation::Register, "El campo 'nombre' es obligatorio"),
            Some(AuthField::Name)
        );
        // "registrado" alone only points at the email on login
        assert_eq!(classify_error(AuthOperation::Register, "registrado"), None);
    }

    #[test]
    fn test_cleared_fields() {
        assert_eq!(
            AuthField::cleared_by(Some(AuthField::Email)),
            &[AuthField::Email, AuthField::Password]
        );
        assert_eq!(AuthField::cleared_by(None), &[AuthField::Password]);
    }

    #[test]
    fn test_backend_error_message() {
        assert_eq!(backend_error_message("{\"error\":\"boom\"}"), "boom");
        assert_eq!(backend_error_message("{}"), GENERIC_ERROR_MESSAGE);
        assert_eq!(backend_error_message("<html>"), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_login() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/login"))
                .and(body_json(serde_json::json!({
                    "correo": "ana@example.com",
                    "password": "secreto1"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "token": "test_token",
                    "usuario": {"id": 1, "nombre": "Ana", "correo": "ana@example.com"}
                })))
                .mount(&mock_server)
                .await;

            let auth = AuthClient::new(
                &mock_server.uri(),
                Client::new(),
                SessionContext::ephemeral(),
            );

            let session = auth.login("ana@example.com", "secreto1").await.unwrap();
            assert_eq!(session.token, "test_token");
            assert_eq!(session.user.name, "Ana");
            assert_eq!(auth.session().token(), Some("test_token".to_string()));
        });
    }
}
