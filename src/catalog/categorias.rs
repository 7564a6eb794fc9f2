//! Book categories

use log::error;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpContext, Paginated};
use crate::search::Named;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categoria {
    pub id: u64,
    pub nome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descricao: Option<String>,
}

impl Named for Categoria {
    fn name(&self) -> &str {
        &self.nome
    }
}

/// Payload for creating or replacing a category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoriaInput {
    pub nome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao: Option<String>,
}

/// Client for `/categorias/`.
///
/// Failures are logged and replaced by a short Portuguese message; the
/// session side effects of a 401 still happen in the HTTP layer.
#[derive(Clone)]
pub struct CategoriaClient {
    ctx: HttpContext,
}

fn wrap(action: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| {
        error!("category request failed ({}): {}", action, e);
        Error::general(action)
    }
}

impl CategoriaClient {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> Result<Vec<Categoria>> {
        Fetch::get(&self.ctx, "/categorias/")
            .execute::<Paginated<Categoria>>()
            .await
            .map(|page| page.results)
            .map_err(wrap("Falha ao carregar categorias"))
    }

    pub async fn get(&self, id: u64) -> Result<Categoria> {
        Fetch::get(&self.ctx, &format!("/categorias/{}/", id))
            .execute()
            .await
            .map_err(wrap("Falha ao carregar categoria"))
    }

    pub async fn create(&self, data: &CategoriaInput) -> Result<Categoria> {
        let request = Fetch::post(&self.ctx, "/categorias/").json(data)?;
        request
            .execute()
            .await
            .map_err(wrap("Falha ao criar categoria"))
    }

    pub async fn update(&self, id: u64, data: &CategoriaInput) -> Result<Categoria> {
        let request = Fetch::put(&self.ctx, &format!("/categorias/{}/", id)).json(data)?;
        request
            .execute()
            .await
            .map_err(wrap("Falha ao atualizar categoria"))
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        Fetch::delete(&self.ctx, &format!("/categorias/{}/", id))
            .execute_unit()
            .await
            .map_err(wrap("Falha ao deletar categoria"))
    }
}
