//! Orders placed by customers

use std::fmt;

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::ItemCarrinho;
use crate::clients::Endereco;
use crate::error::Result;
use crate::fetch::{Fetch, HttpContext, Paginated};
use crate::format::{parse_decimal, string_or_number};
use crate::loaders::Identified;

/// Lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusPedido {
    #[serde(rename = "PRO")]
    EmProcessamento,
    #[serde(rename = "CAN")]
    Cancelado,
    #[serde(rename = "CON")]
    Confirmado,
    #[serde(rename = "ENV")]
    Enviado,
    #[serde(rename = "ENT")]
    Entregue,
}

impl StatusPedido {
    pub const ALL: [StatusPedido; 5] = [
        Self::EmProcessamento,
        Self::Confirmado,
        Self::Enviado,
        Self::Entregue,
        Self::Cancelado,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::EmProcessamento => "PRO",
            Self::Cancelado => "CAN",
            Self::Confirmado => "CON",
            Self::Enviado => "ENV",
            Self::Entregue => "ENT",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EmProcessamento => "Em processamento",
            Self::Cancelado => "Cancelado",
            Self::Confirmado => "Confirmado",
            Self::Enviado => "Enviado",
            Self::Entregue => "Entregue",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl fmt::Display for StatusPedido {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Customer summary embedded in an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientePedido {
    pub id: u64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pedido {
    pub id: u64,
    pub numero_pedido: String,
    #[serde(default)]
    pub cliente: Option<ClientePedido>,
    #[serde(default)]
    pub itens: Vec<ItemCarrinho>,
    #[serde(default)]
    pub endereco: Option<Endereco>,
    pub status: StatusPedido,
    #[serde(alias = "data_pedido")]
    pub data_de_pedido: String,
    #[serde(default)]
    pub entrega_estimada: Option<String>,
    #[serde(default)]
    pub data_de_entrega: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub valor_total: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub desconto: String,
    #[serde(default)]
    pub quantia_itens: u32,
    #[serde(default)]
    pub data_de_cancelamento: Option<String>,
}

impl Identified for Pedido {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Pedido {
    /// Order total; missing or unreadable totals count as zero
    pub fn total(&self) -> Decimal {
        parse_decimal(&self.valor_total).unwrap_or_else(|| {
            warn!("order {} has no readable total", self.numero_pedido);
            Decimal::ZERO
        })
    }

    pub fn discount(&self) -> Decimal {
        parse_decimal(&self.desconto).unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPedidoCreate {
    pub livro_id: u64,
    pub quantidade: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedidoCreate {
    pub cliente_id: u64,
    pub endereco_id: u64,
    pub itens: Vec<ItemPedidoCreate>,
}

/// Partial order update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PedidoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endereco_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itens: Option<Vec<ItemPedidoCreate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusPedido>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PedidoStats {
    #[serde(default)]
    pub total_pedidos: u64,
    #[serde(default)]
    pub pedidos_entregues: u64,
    #[serde(default)]
    pub pedidos_cancelados: u64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub valor_total_vendido: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub media_valor_pedido: String,
}

#[derive(Serialize)]
struct StatusBody {
    status: StatusPedido,
}

#[derive(Serialize)]
struct CancelBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    motivo: Option<&'a str>,
}

/// Filters for the order listing
#[derive(Debug, Clone)]
pub struct PedidoFilter {
    pub search: Option<String>,
    pub status: Option<StatusPedido>,
    pub cliente: Option<String>,
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
    pub ordering: String,
    pub page: Option<u32>,
    /// List every customer's orders through the admin endpoint
    pub admin: bool,
}

impl Default for PedidoFilter {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            cliente: None,
            data_inicio: None,
            data_fim: None,
            ordering: "-data_pedido".to_string(),
            page: None,
            admin: false,
        }
    }
}

impl PedidoFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let mut push = |key: &str, value: Option<&str>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                query.push((key.to_string(), value.to_string()));
            }
        };
        push("search", self.search.as_deref());
        push("status", self.status.as_ref().map(StatusPedido::code));
        push("cliente", self.cliente.as_deref());
        push("data_inicio", self.data_inicio.as_deref());
        push("data_fim", self.data_fim.as_deref());
        push("ordering", Some(self.ordering.as_str()));
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        query
    }
}

fn base_path(admin: bool) -> &'static str {
    if admin {
        "/admin/pedidos/"
    } else {
        "/pedidos/"
    }
}

/// Client for `/pedidos/` and its admin counterpart
#[derive(Clone)]
pub struct PedidoClient {
    ctx: HttpContext,
}

impl PedidoClient {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &PedidoFilter) -> Result<Paginated<Pedido>> {
        let page: Paginated<Pedido> = Fetch::get(&self.ctx, base_path(filter.admin))
            .query(filter.to_query())
            .execute()
            .await?;
        debug!("loaded {} of {} orders", page.results.len(), page.count);
        Ok(page)
    }

    pub async fn get(&self, id: u64, admin: bool) -> Result<Pedido> {
        Fetch::get(&self.ctx, &format!("{}{}/", base_path(admin), id))
            .execute()
            .await
    }

    pub async fn create(&self, data: &PedidoCreate) -> Result<Pedido> {
        Fetch::post(&self.ctx, "/pedidos/")
            .json(data)?
            .execute()
            .await
    }

    pub async fn update(&self, id: u64, data: &PedidoUpdate) -> Result<Pedido> {
        Fetch::patch(&self.ctx, &format!("/pedidos/{}/", id))
            .json(data)?
            .execute()
            .await
    }

    pub async fn update_status(&self, id: u64, status: StatusPedido, admin: bool) -> Result<Pedido> {
        let pedido: Pedido = Fetch::patch(&self.ctx, &format!("{}{}/atualizar_status/", base_path(admin), id))
            .json(&StatusBody { status })?
            .execute()
            .await?;
        if pedido.cliente.is_none() {
            warn!("order {} came back without its customer", pedido.numero_pedido);
        }
        Ok(pedido)
    }

    /// Cancel an order, optionally recording why
    pub async fn cancel(&self, id: u64, motivo: Option<&str>, admin: bool) -> Result<Pedido> {
        Fetch::post(&self.ctx, &format!("{}{}/cancelar/", base_path(admin), id))
            .json(&CancelBody { motivo })?
            .execute()
            .await
    }

    pub async fn stats(&self) -> Result<PedidoStats> {
        Fetch::get(&self.ctx, "/pedidos/estatisticas/")
            .execute()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusPedido::from_code("ENV"), Some(StatusPedido::Enviado));
        assert_eq!(StatusPedido::from_code("XYZ"), None);
        assert_eq!(StatusPedido::EmProcessamento.to_string(), "Em processamento");
        assert_eq!(serde_json::to_value(StatusPedido::Cancelado).unwrap(), json!("CAN"));
    }

    #[test]
    fn test_filter_query() {
        let filter = PedidoFilter {
            search: Some(String::new()),
            status: Some(StatusPedido::Entregue),
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(
            filter.to_query(),
            vec![
                ("status".to_string(), "ENT".to_string()),
                ("ordering".to_string(), "-data_pedido".to_string()),
                ("page".to_string(), "3".to_string()),
            ]
        );
        assert_eq!(base_path(true), "/admin/pedidos/");
    }

    #[test]
    fn test_decode_order() {
        let pedido: Pedido = serde_json::from_value(json!({
            "id": 9,
            "numero_pedido": "2024-0009",
            "cliente": {"id": 3, "nome": "Ana"},
            "itens": [],
            "status": "PRO",
            "data_pedido": "2024-05-01T10:00:00Z",
            "valor_total": 99.8,
            "desconto": "10.00",
            "quantia_itens": 2
        }))
        .unwrap();
        assert_eq!(pedido.data_de_pedido, "2024-05-01T10:00:00Z");
        assert_eq!(pedido.total(), Decimal::new(998, 1));
        assert_eq!(pedido.discount(), Decimal::new(10, 0));
        assert_eq!(pedido.data_de_entrega, None);
    }
}
