//! Book reviews and likes

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::{Fetch, HttpContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avaliacao {
    pub id: u64,
    pub texto: String,
    #[serde(default)]
    pub curtidas: u64,
    #[serde(default)]
    pub data_publicacao: String,
    #[serde(default)]
    pub usuario_nome: String,
    #[serde(default)]
    pub usuario_id: u64,
    #[serde(default)]
    pub usuario_username: String,
    pub livro: u64,
    #[serde(default)]
    pub livro_titulo: String,
    #[serde(default)]
    pub pode_curtir: bool,
    #[serde(default)]
    pub usuario_curtiu: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvaliacaoCreate {
    pub texto: String,
}

/// `{detail}` acknowledgement of the like endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone)]
pub struct AvaliacaoClient {
    ctx: HttpContext,
}

impl AvaliacaoClient {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    /// Reviews of a book
    pub async fn list_for_book(&self, livro_id: u64) -> Result<Vec<Avaliacao>> {
        Fetch::get(&self.ctx, &format!("/avaliacoes/livro/{}/", livro_id))
            .execute()
            .await
    }

    /// Review a book as the logged in user
    pub async fn create(&self, livro_id: u64, texto: &str) -> Result<Avaliacao> {
        Fetch::post(&self.ctx, &format!("/avaliacoes/livro/{}/", livro_id))
            .json(&AvaliacaoCreate {
                texto: texto.to_string(),
            })?
            .execute()
            .await
    }

    pub async fn like(&self, avaliacao_id: u64) -> Result<Detail> {
        Fetch::post(&self.ctx, &format!("/avaliacoes/{}/curtir/", avaliacao_id))
            .execute()
            .await
    }

    pub async fn unlike(&self, avaliacao_id: u64) -> Result<Detail> {
        Fetch::delete(&self.ctx, &format!("/avaliacoes/{}/curtir/", avaliacao_id))
            .execute()
            .await
    }
}
