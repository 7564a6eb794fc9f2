//! Authentication and user management for eLibros

mod session;
mod types;

use std::sync::{Arc, RwLock};

use log::{debug, info, warn};
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::watch;

use crate::admin::AdminApi;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpContext};
use crate::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};

pub use session::*;
pub use types::*;

/// Client for the authentication endpoints
#[derive(Clone)]
pub struct AuthApi {
    ctx: HttpContext,
}

impl AuthApi {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    /// Log in and persist the tokens and the user in the session store
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse> {
        let response: LoginResponse = Fetch::post(&self.ctx, "/auth/login/")
            .json(credentials)?
            .execute()
            .await?;

        Session {
            access_token: response.access.clone(),
            refresh_token: Some(response.refresh.clone()),
            user: Some(response.user.clone()),
        }
        .save(self.ctx.store().as_ref())?;

        info!("logged in as {}", response.user.username);
        Ok(response)
    }

    /// Create an account. No token is sent.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Usuario> {
        Fetch::post(&self.ctx, "/usuarios/")
            .skip_auth()
            .json(request)?
            .execute()
            .await
    }

    /// Invalidate the refresh token on the server, then always drop the
    /// local session. A server failure is only logged.
    pub async fn logout(&self) -> Result<()> {
        let store = self.ctx.store();
        if let Some(refresh) = store.get(REFRESH_TOKEN_KEY) {
            let request = Fetch::post(&self.ctx, "/usuarios/logout/").json(&json!({ "refresh": refresh }));
            let result = match request {
                Ok(request) => request.execute_unit().await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("server logout failed: {}", e);
            }
        }

        self.ctx.set_signed_in(false);
        store.clear_auth()?;
        info!("logged out");
        Ok(())
    }

    /// Trade the stored refresh token for a new access token
    pub async fn refresh_token(&self) -> Result<String> {
        let refresh = self
            .ctx
            .store()
            .get(REFRESH_TOKEN_KEY)
            .ok_or_else(|| Error::general("No refresh token available"))?;

        let response: RefreshResponse = Fetch::post(&self.ctx, "/auth/refresh/")
            .json(&json!({ "refresh": refresh }))?
            .execute()
            .await?;

        self.ctx.store().set(ACCESS_TOKEN_KEY, &response.access)?;
        Ok(response.access)
    }

    /// An access token is stored
    pub fn is_authenticated(&self) -> bool {
        self.ctx.store().get(ACCESS_TOKEN_KEY).is_some()
    }

    /// The user saved at login, if it still parses
    pub fn current_user(&self) -> Option<Usuario> {
        let raw = self.ctx.store().get(USER_KEY)?;
        serde_json::from_str(&raw).ok()
    }
}

/// Authentication state shared by everything that needs to know who is
/// logged in
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<Usuario>,
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub is_loading: bool,
    pub is_initialized: bool,
}

/// Outcome of checking whether a protected page may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Initialisation has not finished
    Loading,
    /// Show the page
    Allowed,
    /// Send the visitor to the login page
    RedirectToLogin,
    /// Logged in but not an administrator
    Forbidden,
}

const MSG_SESSION_REJECTED: &str = "Sessão recusada pelo servidor. Faça login novamente.";

fn clear_user(state: &mut AuthState) {
    state.user = None;
    state.is_authenticated = false;
    state.is_admin = false;
}

/// Process-wide authentication state kept in sync with the session store
#[derive(Clone)]
pub struct AuthContext {
    ctx: HttpContext,
    api: AuthApi,
    admin: AdminApi,
    state: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        let state = AuthState {
            is_loading: true,
            ..Default::default()
        };
        Self {
            api: AuthApi::new(ctx.clone()),
            admin: AdminApi::new(ctx.clone()),
            ctx,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy of the current state. A session the API rejected since the last
    /// look shows up as logged out.
    pub fn state(&self) -> AuthState {
        if !self.ctx.is_signed_in() {
            self.update(|state| {
                if state.is_authenticated {
                    debug!("session ended elsewhere, resetting auth state");
                    clear_user(state);
                }
            });
        }
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn user(&self) -> Option<Usuario> {
        self.state().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    pub fn is_admin(&self) -> bool {
        self.state().is_admin
    }

    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized
    }

    fn update<F: FnOnce(&mut AuthState)>(&self, f: F) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    fn sign_in(&self, user: Usuario, is_admin: bool) {
        self.update(|state| {
            state.user = Some(user);
            state.is_authenticated = true;
            state.is_admin = is_admin;
            state.is_loading = false;
            state.is_initialized = true;
        });
        self.ctx.set_signed_in(true);
    }

    fn reset(&self) {
        self.update(clear_user);
        self.ctx.set_signed_in(false);
    }

    fn discard_session(&self) {
        if let Err(e) = self.ctx.store().clear_auth() {
            warn!("failed to clear session store: {}", e);
        }
        self.reset();
    }

    /// Restore the session saved in the store, checking the token with the
    /// backend. Runs once; later calls are no-ops.
    pub async fn initialize(&self) {
        if self.is_initialized() {
            return;
        }

        let store = self.ctx.store();
        let raw_user = store.get(USER_KEY);
        match Session::load(store.as_ref()) {
            Some(Session {
                user: Some(user),
                access_token,
                ..
            }) => self.restore(&access_token, user).await,
            Some(_) if raw_user.is_some() => {
                warn!("stored user could not be read, clearing session");
                self.discard_session();
            }
            _ => {
                debug!("no stored session");
                self.reset();
            }
        }

        self.update(|state| {
            state.is_loading = false;
            state.is_initialized = true;
        });
    }

    async fn restore(&self, access_token: &str, user: Usuario) {
        if is_token_expired(access_token) || !self.ctx.verify_token().await {
            info!("stored token is no longer valid, clearing session");
            self.discard_session();
            return;
        }

        match self.check_admin().await {
            Some(is_admin) => {
                info!("restored session for {} (admin: {})", user.username, is_admin);
                self.sign_in(user, is_admin);
            }
            None => {
                info!("stored token was rejected during the admin check");
                self.discard_session();
            }
        }
    }

    /// Admin status of the stored session; any failure answers `false`.
    /// `None` when the API rejected the token while answering.
    async fn check_admin(&self) -> Option<bool> {
        let is_admin = self.admin.is_current_user_admin().await;
        self.ctx.store().get(ACCESS_TOKEN_KEY).map(|_| is_admin)
    }

    /// Log in and mark the context authenticated
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Usuario> {
        let response = self.api.login(credentials).await?;
        let user = response.user;

        match self.check_admin().await {
            Some(is_admin) => {
                self.sign_in(user.clone(), is_admin);
                Ok(user)
            }
            None => {
                self.discard_session();
                Err(Error::api(StatusCode::UNAUTHORIZED, MSG_SESSION_REJECTED))
            }
        }
    }

    /// Create the account, then log in with the same credentials
    pub async fn register(&self, request: &RegisterRequest) -> Result<Usuario> {
        self.api.register(request).await?;
        self.login(&LoginRequest::new(&request.email, &request.password))
            .await
    }

    /// Log out. Failures are logged and the state is reset regardless.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("logout failed: {}", e);
        }
        self.reset();
    }

    /// Reload the user from the session store
    pub fn refresh_user(&self) {
        let user = self.api.current_user();
        self.update(|state| state.user = user);
    }

    /// Decide what a protected page should do for the current visitor
    pub fn route_access(&self, admin_only: bool) -> RouteAccess {
        let state = self.state();
        if state.is_loading {
            RouteAccess::Loading
        } else if !state.is_authenticated {
            RouteAccess::RedirectToLogin
        } else if admin_only && !state.is_admin {
            RouteAccess::Forbidden
        } else {
            RouteAccess::Allowed
        }
    }

    /// Receiver that sees every login, logout and rejected session
    pub fn on_session_change(&self) -> watch::Receiver<bool> {
        self.ctx.on_session_change()
    }

    /// The underlying auth client
    pub fn api(&self) -> &AuthApi {
        &self.api
    }
}
