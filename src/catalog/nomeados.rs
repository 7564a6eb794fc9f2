//! Literary genres and authors: both are a plain `{id, nome}` resource

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::{Fetch, HttpContext, Paginated};
use crate::search::Named;

/// Literary genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genero {
    pub id: u64,
    pub nome: String,
}

/// Book author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autor {
    pub id: u64,
    pub nome: String,
}

impl Named for Genero {
    fn name(&self) -> &str {
        &self.nome
    }
}

impl Named for Autor {
    fn name(&self) -> &str {
        &self.nome
    }
}

/// Body for creating or renaming a genre or author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomeInput {
    pub nome: String,
}

impl NomeInput {
    pub fn new(nome: &str) -> Self {
        Self {
            nome: nome.to_string(),
        }
    }
}

/// Records served by a [`NamedClient`]
pub trait NamedResource: DeserializeOwned + Send {
    /// Collection path, e.g. `/generos/`
    const ENDPOINT: &'static str;
}

impl NamedResource for Genero {
    const ENDPOINT: &'static str = "/generos/";
}

impl NamedResource for Autor {
    const ENDPOINT: &'static str = "/autores/";
}

/// CRUD client for a `{id, nome}` collection
#[derive(Clone)]
pub struct NamedClient<T> {
    ctx: HttpContext,
    _marker: PhantomData<fn() -> T>,
}

/// Client for `/generos/`
pub type GeneroClient = NamedClient<Genero>;

/// Client for `/autores/`
pub type AutorClient = NamedClient<Autor>;

impl<T: NamedResource> NamedClient<T> {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self {
            ctx,
            _marker: PhantomData,
        }
    }

    fn item_path(id: u64) -> String {
        format!("{}{}/", T::ENDPOINT, id)
    }

    /// First page of the collection
    pub async fn list(&self) -> Result<Vec<T>> {
        let page: Paginated<T> = Fetch::get(&self.ctx, T::ENDPOINT).execute().await?;
        Ok(page.results)
    }

    pub async fn get(&self, id: u64) -> Result<T> {
        Fetch::get(&self.ctx, &Self::item_path(id)).execute().await
    }

    pub async fn create(&self, data: &NomeInput) -> Result<T> {
        Fetch::post(&self.ctx, T::ENDPOINT)
            .json(data)?
            .execute()
            .await
    }

    pub async fn update(&self, id: u64, data: &NomeInput) -> Result<T> {
        Fetch::put(&self.ctx, &Self::item_path(id))
            .json(data)?
            .execute()
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        Fetch::delete(&self.ctx, &Self::item_path(id))
            .execute_unit()
            .await
    }

    /// Backend-side search and ordering
    pub async fn search(&self, search: Option<&str>, ordering: Option<&str>) -> Result<Paginated<T>> {
        let mut request = Fetch::get(&self.ctx, T::ENDPOINT);
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            request = request.query_pair("search", search);
        }
        if let Some(ordering) = ordering.filter(|s| !s.is_empty()) {
            request = request.query_pair("ordering", ordering);
        }
        request.execute().await
    }
}
