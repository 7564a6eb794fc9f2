//! Discount coupons

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::{Fetch, HttpContext, Paginated};
use crate::format::{parse_datetime, round_cents};
use crate::loaders::Identified;

/// How a coupon's value is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoValor {
    /// `valor` is a percentage
    #[serde(rename = "1")]
    Porcentagem,
    /// `valor` is an amount in reais
    #[serde(rename = "2")]
    ValorFixo,
}

impl TipoValor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Porcentagem => "Porcentagem",
            Self::ValorFixo => "Valor Fixo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cupom {
    pub id: u64,
    pub codigo: String,
    pub valor: Decimal,
    pub tipo_valor: TipoValor,
    pub ativo: bool,
    pub data_inicio: String,
    pub data_fim: String,
    #[serde(default)]
    pub criado_por: Option<u64>,
}

impl Identified for Cupom {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Cupom {
    /// Enabled and `now` inside `[data_inicio, data_fim]`, both ends
    /// included. Unreadable dates make the coupon inactive.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if !self.ativo {
            return false;
        }
        match (parse_datetime(&self.data_inicio), parse_datetime(&self.data_fim)) {
            (Some(inicio), Some(fim)) => inicio <= now && now <= fim,
            _ => false,
        }
    }

    /// `now` is past `data_fim`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match parse_datetime(&self.data_fim) {
            Some(fim) => now > fim,
            None => false,
        }
    }

    /// `10%` or `R$ 10.00`
    pub fn format_valor(&self) -> String {
        match self.tipo_valor {
            TipoValor::Porcentagem => format!("{}%", self.valor.normalize()),
            TipoValor::ValorFixo => format!("R$ {:.2}", round_cents(self.valor)),
        }
    }

    /// `BEMVINDO - 10% de desconto`
    pub fn format_descricao(&self) -> String {
        format!("{} - {} de desconto", self.codigo, self.format_valor())
    }
}

/// Coupon creation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CupomCreate {
    pub codigo: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor: Decimal,
    pub tipo_valor: TipoValor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ativo: Option<bool>,
    pub data_inicio: String,
    pub data_fim: String,
}

/// Partial coupon update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CupomUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub valor: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_valor: Option<TipoValor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ativo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_inicio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_fim: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CupomStats {
    #[serde(default)]
    pub total_cupons: u64,
    #[serde(default)]
    pub cupons_ativos: u64,
    #[serde(default)]
    pub cupons_inativos: u64,
    #[serde(default)]
    pub cupons_porcentagem: u64,
    #[serde(default)]
    pub cupons_valor_fixo: u64,
}

/// Filters for the coupon listing
#[derive(Debug, Clone, Default)]
pub struct CupomFilter {
    pub search: Option<String>,
    pub ativo: Option<bool>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
}

impl CupomFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search".to_string(), search.to_string()));
        }
        if let Some(ativo) = self.ativo {
            query.push(("ativo".to_string(), ativo.to_string()));
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|s| !s.is_empty()) {
            query.push(("ordering".to_string(), ordering.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        query
    }
}

/// Client for `/cupons/`
#[derive(Clone)]
pub struct CupomClient {
    ctx: HttpContext,
}

impl CupomClient {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &CupomFilter) -> Result<Paginated<Cupom>> {
        Fetch::get(&self.ctx, "/cupons/")
            .query(filter.to_query())
            .execute()
            .await
    }

    pub async fn get(&self, id: u64) -> Result<Cupom> {
        Fetch::get(&self.ctx, &format!("/cupons/{}/", id))
            .execute()
            .await
    }

    pub async fn create(&self, data: &CupomCreate) -> Result<Cupom> {
        Fetch::post(&self.ctx, "/cupons/")
            .json(data)?
            .execute()
            .await
    }

    pub async fn update(&self, id: u64, data: &CupomUpdate) -> Result<Cupom> {
        Fetch::patch(&self.ctx, &format!("/cupons/{}/", id))
            .json(data)?
            .execute()
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        Fetch::delete(&self.ctx, &format!("/cupons/{}/", id))
            .execute_unit()
            .await
    }

    /// Flip `ativo` on the backend and return the updated coupon
    pub async fn toggle_status(&self, id: u64) -> Result<Cupom> {
        Fetch::patch(&self.ctx, &format!("/cupons/{}/toggle_status/", id))
            .execute()
            .await
    }

    pub async fn stats(&self) -> Result<CupomStats> {
        Fetch::get(&self.ctx, "/cupons/estatisticas/")
            .execute()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cupom(ativo: bool, inicio: &str, fim: &str) -> Cupom {
        Cupom {
            id: 1,
            codigo: "BEMVINDO".into(),
            valor: Decimal::new(10, 0),
            tipo_valor: TipoValor::Porcentagem,
            ativo,
            data_inicio: inicio.into(),
            data_fim: fim.into(),
            criado_por: None,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_active_window_is_inclusive() {
        let c = cupom(true, "2024-01-01T00:00:00Z", "2024-01-31T23:00:00Z");
        assert!(c.is_active(at(2024, 1, 1, 0)));
        assert!(c.is_active(at(2024, 1, 31, 23)));
        assert!(c.is_active(at(2024, 1, 15, 12)));
        assert!(!c.is_active(at(2023, 12, 31, 23)));
        assert!(!c.is_active(at(2024, 2, 1, 0)));
    }

    #[test]
    fn test_disabled_or_unreadable_is_inactive() {
        let now = at(2024, 1, 15, 12);
        assert!(!cupom(false, "2024-01-01", "2024-02-01").is_active(now));
        assert!(!cupom(true, "ontem", "2024-02-01").is_active(now));
        assert!(cupom(true, "2024-01-01", "2024-02-01").is_active(now));
    }

    #[test]
    fn test_expired() {
        let c = cupom(true, "2024-01-01", "2024-01-31");
        assert!(c.is_expired(at(2024, 2, 1, 0)));
        assert!(!c.is_expired(at(2024, 1, 31, 0)));
    }

    #[test]
    fn test_formatting() {
        let mut c = cupom(true, "2024-01-01", "2024-01-31");
        assert_eq!(c.format_valor(), "10%");
        assert_eq!(c.format_descricao(), "BEMVINDO - 10% de desconto");
        assert_eq!(c.tipo_valor.label(), "Porcentagem");

        c.tipo_valor = TipoValor::ValorFixo;
        c.valor = Decimal::new(105, 1);
        assert_eq!(c.format_valor(), "R$ 10.50");
    }

    #[test]
    fn test_decode_backend_shape() {
        let c: Cupom = serde_json::from_value(serde_json::json!({
            "id": 4,
            "codigo": "FRETE",
            "valor": "15.00",
            "tipo_valor": "2",
            "ativo": true,
            "data_inicio": "2024-01-01T00:00:00Z",
            "data_fim": "2024-12-31T23:59:59Z",
            "criado_por": null
        }))
        .unwrap();
        assert_eq!(c.tipo_valor, TipoValor::ValorFixo);
        assert_eq!(c.valor, Decimal::new(15, 0));
    }

    #[test]
    fn test_write_payloads_send_numeric_valor() {
        let create = CupomCreate {
            codigo: "FRETE".into(),
            valor: Decimal::new(1250, 2),
            tipo_valor: TipoValor::ValorFixo,
            ativo: None,
            data_inicio: "2024-01-01".into(),
            data_fim: "2024-12-31".into(),
        };
        let body = serde_json::to_value(&create).unwrap();
        assert_eq!(body["valor"], serde_json::json!(12.5));
        assert!(body.get("ativo").is_none());

        let update = CupomUpdate {
            valor: Some(Decimal::new(15, 0)),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({ "valor": 15.0 }));
        assert_eq!(
            serde_json::to_value(CupomUpdate::default()).unwrap(),
            serde_json::json!({})
        );
    }
}
