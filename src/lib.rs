//! eLibros Rust Client Library
//!
//! A Rust client for the eLibros bookstore API, providing typed access to the
//! catalogue, customer accounts, coupons, orders, the shopping cart and the
//! session state of the logged in user.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod coupons;
pub mod error;
pub mod fetch;
pub mod format;
pub mod loaders;
pub mod orders;
pub mod search;
pub mod store;

use std::sync::Arc;

use reqwest::Client;

use crate::admin::AdminApi;
use crate::auth::{AuthApi, AuthContext};
use crate::cart::{CarrinhoApi, CartContext};
use crate::catalog::{AutorClient, AvaliacaoClient, CategoriaClient, GeneroClient, LivroClient};
use crate::clients::ClienteClient;
use crate::config::ClientOptions;
use crate::coupons::CupomClient;
use crate::error::Result;
use crate::fetch::{HttpContext, LogRedirect, Redirect};
use crate::orders::PedidoClient;
use crate::store::{MemoryStore, SessionStore};

/// The main entry point for the eLibros client
#[derive(Clone)]
pub struct Elibros {
    ctx: HttpContext,
}

impl Elibros {
    /// Create a client for `api_url` with default options and an in-memory
    /// session
    ///
    /// # Example
    ///
    /// ```
    /// use elibros_client::Elibros;
    ///
    /// let elibros = Elibros::new("http://localhost:8000/api/v1");
    /// let livros = elibros.livros();
    /// ```
    pub fn new(api_url: &str) -> Self {
        Self::new_with_options(ClientOptions::default().with_api_url(api_url))
    }

    /// Create a client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use elibros_client::{Elibros, config::ClientOptions};
    ///
    /// let options = ClientOptions::default()
    ///     .with_api_url("https://elibros.example.com/api/v1")
    ///     .with_request_timeout(Duration::from_secs(5));
    /// let elibros = Elibros::new_with_options(options);
    /// ```
    pub fn new_with_options(options: ClientOptions) -> Self {
        let ctx = HttpContext::new(
            Client::new(),
            options,
            Arc::new(MemoryStore::new()),
            Arc::new(LogRedirect),
        );
        Self { ctx }
    }

    /// Create a client configured from the `ELIBROS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new_with_options(ClientOptions::from_env()?))
    }

    /// Keep the session in `store` instead of memory
    pub fn with_store(self, store: Arc<dyn SessionStore>) -> Self {
        Self {
            ctx: self.ctx.with_store(store),
        }
    }

    /// Hook called when the API rejects the stored session
    pub fn with_redirect(self, redirect: Arc<dyn Redirect>) -> Self {
        Self {
            ctx: self.ctx.with_redirect(redirect),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        self.ctx.options()
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.ctx.store()
    }

    pub fn livros(&self) -> LivroClient {
        LivroClient::new(self.ctx.clone())
    }

    pub fn categorias(&self) -> CategoriaClient {
        CategoriaClient::new(self.ctx.clone())
    }

    pub fn generos(&self) -> GeneroClient {
        GeneroClient::new(self.ctx.clone())
    }

    pub fn autores(&self) -> AutorClient {
        AutorClient::new(self.ctx.clone())
    }

    pub fn avaliacoes(&self) -> AvaliacaoClient {
        AvaliacaoClient::new(self.ctx.clone())
    }

    pub fn cupons(&self) -> CupomClient {
        CupomClient::new(self.ctx.clone())
    }

    pub fn clientes(&self) -> ClienteClient {
        ClienteClient::new(self.ctx.clone())
    }

    pub fn pedidos(&self) -> PedidoClient {
        PedidoClient::new(self.ctx.clone())
    }

    pub fn carrinho(&self) -> CarrinhoApi {
        CarrinhoApi::new(self.ctx.clone())
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.ctx.clone())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.ctx.clone())
    }

    /// Session state for the logged in user. Call
    /// [`AuthContext::initialize`] once before relying on it.
    pub fn auth_context(&self) -> AuthContext {
        AuthContext::new(self.ctx.clone())
    }

    /// Cart bound to `auth`, backed by the `/carrinhos/` endpoints
    pub fn cart_context(&self, auth: &AuthContext) -> CartContext {
        CartContext::with_backend(auth.clone(), Arc::new(self.carrinho()))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{AuthContext, LoginRequest, RegisterForm, Usuario};
    pub use crate::cart::CartContext;
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::fetch::{Paginated, Upload};
    pub use crate::Elibros;
}
