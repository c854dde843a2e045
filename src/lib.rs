//! PowerFlow Rust Client Library
//!
//! A Rust client for the PowerFlow household energy dashboard: account
//! login and registration, the per-user device registry, monthly
//! consumption estimates and AI-assisted device suggestions.

pub mod config;
pub mod devices;
pub mod error;
pub mod estimator;
pub mod fetch;
pub mod suggestion;
pub mod validation;

pub use powerflow_auth as auth;

use std::sync::Arc;

use reqwest::Client;

use powerflow_auth::{AuthClient, FileStorage, Registration, Session, SessionContext};

use crate::config::ClientOptions;
use crate::devices::{DevicesClient, DeviceCollection};
use crate::error::{Error, Result};
use crate::fetch::Gateway;
use crate::suggestion::{FormMode, SuggestionClient, SuggestionReconciler};
use crate::validation::{LoginForm, RegisterForm};

/// The main entry point for the PowerFlow client
pub struct PowerFlow {
    options: ClientOptions,
    auth: AuthClient,
    gateway: Gateway,
}

impl PowerFlow {
    /// Create a client whose session persists at `options.session_path`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use powerflow_rust::{PowerFlow, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_session_path("/tmp/powerflow.json");
    /// let powerflow = PowerFlow::new(options).unwrap();
    /// assert!(!powerflow.session().is_authenticated());
    /// ```
    pub fn new(options: ClientOptions) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(options.session_path.clone()));
        let session = SessionContext::init(storage);
        Self::with_session(options, session)
    }

    /// Create a client around an existing session context
    pub fn with_session(options: ClientOptions, session: SessionContext) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = AuthClient::new(&options.api_url, http_client.clone(), session.clone());
        let gateway = Gateway::new(&options.api_url, http_client, session);

        Ok(Self {
            options,
            auth,
            gateway,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// The session shared by every client created from this one
    pub fn session(&self) -> &SessionContext {
        self.gateway.session()
    }

    pub fn devices(&self) -> DevicesClient {
        DevicesClient::new(self.gateway.clone())
    }

    /// An empty, not yet loaded device collection
    pub fn collection(&self) -> DeviceCollection {
        DeviceCollection::new()
    }

    pub fn suggestions(&self) -> SuggestionClient {
        SuggestionClient::new(self.gateway.clone())
    }

    /// Suggestion state for a device form opened in `mode`
    pub fn reconciler(&self, mode: FormMode) -> SuggestionReconciler<SuggestionClient> {
        SuggestionReconciler::with_min_chars(
            self.suggestions(),
            mode,
            self.options.suggestion_min_chars,
        )
    }

    /// Validate the form, then log in
    pub async fn login(&self, form: &LoginForm) -> Result<Session> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        Ok(self.auth.login(form.email.trim(), &form.password).await?)
    }

    /// Validate the form, then create the account
    pub async fn register(&self, form: &RegisterForm) -> Result<Registration> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        Ok(self
            .auth
            .register(form.name.trim(), form.email.trim(), &form.password)
            .await?)
    }

    /// [`PowerFlow::register`] followed by a login with the same
    /// credentials
    pub async fn register_and_login(&self, form: &RegisterForm) -> Result<Session> {
        self.register(form).await?;
        self.login(&LoginForm::new(&form.email, &form.password)).await
    }

    /// End the session locally
    pub fn logout(&self) {
        self.auth.logout();
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::devices::{
        Category, CategoryFilter, Device, DeviceCollection, DevicesClient, FilterState,
    };
    pub use crate::error::{Error, Result};
    pub use crate::suggestion::{FormMode, Suggestion, SuggestionReconciler, SuggestionState};
    pub use crate::validation::{DeviceForm, LoginForm, RegisterForm};
    pub use crate::PowerFlow;
    pub use powerflow_auth::{OpaqueId, Session, SessionContext, User};
}
