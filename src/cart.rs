//! Shopping cart: the `/carrinhos/` endpoints and the cart state kept for the
//! logged in user

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthContext;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpContext, Paginated};
use crate::format::parse_decimal;

/// Book summary embedded in a cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivroCarrinho {
    pub id: u64,
    pub titulo: String,
    #[serde(default)]
    pub capa_url: Option<String>,
    /// Unit price as sent by the backend, `.` or `,` as decimal separator
    #[serde(deserialize_with = "crate::format::string_or_number")]
    pub preco: String,
    #[serde(default)]
    pub autores: Vec<String>,
}

/// A cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCarrinho {
    pub id: u64,
    pub livro: LivroCarrinho,
    pub quantidade: u32,
}

impl ItemCarrinho {
    /// Unit price times quantity; an unreadable price counts as zero
    pub fn subtotal(&self) -> Decimal {
        match parse_decimal(&self.livro.preco) {
            Some(preco) => preco * Decimal::from(self.quantidade),
            None => {
                warn!("unreadable price {:?} for cart item {}", self.livro.preco, self.id);
                Decimal::ZERO
            }
        }
    }
}

/// The user's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrinho {
    pub id: u64,
    pub cliente: u64,
    #[serde(default)]
    pub criado_em: String,
    #[serde(default)]
    pub atualizado_em: String,
    #[serde(default)]
    pub itens: Vec<ItemCarrinho>,
}

/// Operation sent to `/carrinhos/atualizar_carrinho/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcaoCarrinho {
    Adicionar,
    Remover,
    Atualizar,
    Limpar,
}

/// Body of `/carrinhos/atualizar_carrinho/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtualizarCarrinho {
    pub acao: AcaoCarrinho,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livro_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantidade: Option<u32>,
}

impl AtualizarCarrinho {
    pub fn adicionar(livro_id: u64, quantidade: u32) -> Self {
        Self {
            acao: AcaoCarrinho::Adicionar,
            livro_id: Some(livro_id),
            item_id: None,
            quantidade: Some(quantidade),
        }
    }

    pub fn remover(item_id: u64) -> Self {
        Self {
            acao: AcaoCarrinho::Remover,
            livro_id: None,
            item_id: Some(item_id),
            quantidade: None,
        }
    }

    pub fn atualizar(item_id: u64, quantidade: u32) -> Self {
        Self {
            acao: AcaoCarrinho::Atualizar,
            livro_id: None,
            item_id: Some(item_id),
            quantidade: Some(quantidade),
        }
    }

    pub fn limpar() -> Self {
        Self {
            acao: AcaoCarrinho::Limpar,
            livro_id: None,
            item_id: None,
            quantidade: None,
        }
    }
}

/// Where the cart state comes from
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Lines of the user's cart, empty when there is none
    async fn fetch_items(&self) -> Result<Vec<ItemCarrinho>>;

    /// Apply one cart operation
    async fn update(&self, request: &AtualizarCarrinho) -> Result<()>;
}

/// Client for the cart endpoints
#[derive(Clone)]
pub struct CarrinhoApi {
    ctx: HttpContext,
}

impl CarrinhoApi {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    /// Raw cart listing
    pub async fn get_carrinho(&self) -> Result<Paginated<Carrinho>> {
        Fetch::get(&self.ctx, "/carrinhos/").execute().await
    }

    /// Send one cart operation and return whatever the backend answers
    pub async fn atualizar_carrinho(&self, request: &AtualizarCarrinho) -> Result<Value> {
        Fetch::post(&self.ctx, "/carrinhos/atualizar_carrinho/")
            .json(request)?
            .execute()
            .await
    }
}

#[async_trait]
impl CartBackend for CarrinhoApi {
    async fn fetch_items(&self) -> Result<Vec<ItemCarrinho>> {
        let page = self.get_carrinho().await?;
        Ok(page
            .results
            .into_iter()
            .next()
            .map(|carrinho| carrinho.itens)
            .unwrap_or_default())
    }

    async fn update(&self, request: &AtualizarCarrinho) -> Result<()> {
        self.atualizar_carrinho(request).await.map(|_| ())
    }
}

/// Total quantity and total price of a list of lines
pub fn compute_totals(items: &[ItemCarrinho]) -> (u64, Decimal) {
    items.iter().fold((0, Decimal::ZERO), |(count, price), item| {
        (count + u64::from(item.quantidade), price + item.subtotal())
    })
}

/// Total price of the selected lines
pub fn selected_subtotal(items: &[ItemCarrinho], selected: &HashSet<u64>) -> Decimal {
    items
        .iter()
        .filter(|item| selected.contains(&item.id))
        .map(ItemCarrinho::subtotal)
        .sum()
}

/// Cart snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub items: Vec<ItemCarrinho>,
    pub total_items: u64,
    pub total_price: Decimal,
    pub is_loading: bool,
}

impl CartState {
    fn replace_items(&mut self, items: Vec<ItemCarrinho>) {
        let (total_items, total_price) = compute_totals(&items);
        self.items = items;
        self.total_items = total_items;
        self.total_price = total_price;
    }
}

const MSG_ADD: &str = "Faça login para adicionar itens ao carrinho";
const MSG_REMOVE: &str = "Usuário deve estar logado para remover itens do carrinho";
const MSG_UPDATE: &str = "Usuário deve estar logado para atualizar o carrinho";
const MSG_CLEAR: &str = "Usuário deve estar logado para limpar o carrinho";

/// Cart state of the logged in user. Only authenticated users can change it.
#[derive(Clone)]
pub struct CartContext {
    auth: AuthContext,
    backend: Arc<dyn CartBackend>,
    state: Arc<RwLock<CartState>>,
}

impl CartContext {
    /// Create a cart context over any backend
    pub fn with_backend(auth: AuthContext, backend: Arc<dyn CartBackend>) -> Self {
        Self {
            auth,
            backend,
            state: Arc::new(RwLock::new(CartState::default())),
        }
    }

    /// Copy of the current state. Lines left over from a session that has
    /// since ended are dropped first.
    pub fn state(&self) -> CartState {
        if !self.auth.is_authenticated() {
            self.update(|state| {
                if !state.items.is_empty() {
                    debug!("session ended, dropping {} cart lines", state.items.len());
                    state.replace_items(Vec::new());
                }
            });
        }
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn items(&self) -> Vec<ItemCarrinho> {
        self.state().items
    }

    pub fn total_items(&self) -> u64 {
        self.state().total_items
    }

    pub fn total_price(&self) -> Decimal {
        self.state().total_price
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    /// Only logged in users have a cart
    pub fn can_use_cart(&self) -> bool {
        self.auth.is_authenticated()
    }

    fn update<F: FnOnce(&mut CartState)>(&self, f: F) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    fn set_loading(&self, loading: bool) {
        self.update(|state| state.is_loading = loading);
    }

    fn empty(&self) {
        self.update(|state| state.replace_items(Vec::new()));
    }

    /// Reload the cart from the backend.
    ///
    /// Does nothing before auth initialisation and empties the cart for
    /// anonymous users or when the backend fails.
    pub async fn refresh(&self) {
        if !self.auth.is_initialized() {
            return;
        }
        if !self.auth.is_authenticated() {
            debug!("not authenticated, emptying cart");
            self.empty();
            return;
        }

        self.set_loading(true);
        match self.backend.fetch_items().await {
            Ok(items) => self.update(|state| state.replace_items(items)),
            Err(e) => {
                warn!("cart refresh failed: {}", e);
                self.empty();
            }
        }
        self.set_loading(false);
    }

    /// Keep the cart in step with the session: reloaded after every login,
    /// emptied on logout or when the API rejects the token. Meant to be
    /// spawned and aborted with the task handle.
    pub fn follow_session(self) -> impl Future<Output = ()> + Send + 'static {
        let mut session = self.auth.on_session_change();
        async move {
            while session.changed().await.is_ok() {
                let signed_in = *session.borrow_and_update();
                if signed_in {
                    self.refresh().await;
                } else {
                    debug!("session ended, emptying cart");
                    self.empty();
                }
            }
        }
    }

    async fn mutate(&self, denied: &str, request: AtualizarCarrinho) -> Result<()> {
        if !self.auth.is_authenticated() {
            return Err(Error::not_logged_in(denied));
        }

        self.set_loading(true);
        let result = self.backend.update(&request).await;
        match &result {
            Ok(()) => self.refresh().await,
            Err(e) => warn!("cart {:?} failed: {}", request.acao, e),
        }
        self.set_loading(false);
        result
    }

    /// Add `quantidade` copies of a book
    pub async fn add_to_cart(&self, livro_id: u64, quantidade: u32) -> Result<()> {
        self.mutate(MSG_ADD, AtualizarCarrinho::adicionar(livro_id, quantidade))
            .await
    }

    /// Drop a line
    pub async fn remove_from_cart(&self, item_id: u64) -> Result<()> {
        self.mutate(MSG_REMOVE, AtualizarCarrinho::remover(item_id))
            .await
    }

    /// Set the quantity of a line; zero or less removes it
    pub async fn update_quantity(&self, item_id: u64, quantidade: i64) -> Result<()> {
        let request = if quantidade <= 0 {
            AtualizarCarrinho::remover(item_id)
        } else {
            let quantidade = u32::try_from(quantidade).unwrap_or(u32::MAX);
            AtualizarCarrinho::atualizar(item_id, quantidade)
        };
        self.mutate(MSG_UPDATE, request).await
    }

    /// Remove every line
    pub async fn clear_cart(&self) -> Result<()> {
        self.mutate(MSG_CLEAR, AtualizarCarrinho::limpar()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, preco: &str, quantidade: u32) -> ItemCarrinho {
        ItemCarrinho {
            id,
            livro: LivroCarrinho {
                id: id * 10,
                titulo: format!("Livro {}", id),
                capa_url: None,
                preco: preco.to_string(),
                autores: vec![],
            },
            quantidade,
        }
    }

    #[test]
    fn test_totals_accept_comma_prices() {
        let items = vec![item(1, "49,90", 2), item(2, "10.05", 1)];
        let (count, price) = compute_totals(&items);
        assert_eq!(count, 3);
        assert_eq!(price, Decimal::new(10985, 2));
    }

    #[test]
    fn test_unreadable_price_counts_as_zero() {
        let items = vec![item(1, "grátis", 4), item(2, "5", 1)];
        assert_eq!(compute_totals(&items), (5, Decimal::new(5, 0)));
    }

    #[test]
    fn test_selected_subtotal() {
        let items = vec![item(1, "20.00", 1), item(2, "7.50", 2), item(3, "1", 1)];
        let selected: HashSet<u64> = [2, 3].into_iter().collect();
        assert_eq!(selected_subtotal(&items, &selected), Decimal::new(16, 0));
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(AtualizarCarrinho::adicionar(5, 2)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"acao": "adicionar", "livro_id": 5, "quantidade": 2})
        );
        let body = serde_json::to_value(AtualizarCarrinho::limpar()).unwrap();
        assert_eq!(body, serde_json::json!({"acao": "limpar"}));
    }
}
