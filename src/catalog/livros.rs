//! Books: `/livros/` and the storefront listings

use std::cmp::Ordering;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Autor, Genero};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::{multipart_form, Fetch, HttpContext, Paginated, Upload};
use crate::format::{format_brl, parse_decimal};

/// A book as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Livro {
    pub id: u64,
    pub titulo: String,
    #[serde(default)]
    pub subtitulo: Option<String>,
    #[serde(default)]
    pub sinopse: Option<String>,
    #[serde(default)]
    pub editora: String,
    #[serde(rename = "ISBN", default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub capa_url: Option<String>,
    #[serde(default)]
    pub data_de_publicacao: Option<String>,
    #[serde(default)]
    pub ano_de_publicacao: Option<i32>,
    #[serde(deserialize_with = "crate::format::string_or_number")]
    pub preco: String,
    #[serde(default)]
    pub desconto: Option<String>,
    #[serde(default)]
    pub quantidade: i64,
    #[serde(default)]
    pub qtd_vendidos: Option<u64>,
    #[serde(default)]
    pub autores: Vec<String>,
    #[serde(default)]
    pub categorias: Vec<String>,
    #[serde(default)]
    pub generos: Vec<String>,
}

impl Livro {
    /// In stock
    pub fn is_disponivel(&self) -> bool {
        self.quantidade > 0
    }

    /// Price after the discount percentage
    pub fn preco_com_desconto(&self) -> Decimal {
        preco_com_desconto(&self.preco, self.desconto.as_deref())
    }

    /// Cover URL ready for display
    pub fn capa(&self, options: &ClientOptions) -> String {
        normalize_image_url(self.capa_url.as_deref(), options)
    }
}

/// Book creation payload. Relations are sent as id lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LivroCreate {
    pub titulo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitulo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sinopse: Option<String>,
    pub editora: String,
    #[serde(rename = "ISBN", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_de_publicacao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ano_de_publicacao: Option<i32>,
    pub preco: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desconto: Option<String>,
    pub quantidade: i64,
    pub autor: Vec<u64>,
    pub categoria: Vec<u64>,
    pub genero: Vec<u64>,
}

/// Partial book update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LivroUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitulo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sinopse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editora: Option<String>,
    #[serde(rename = "ISBN", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_de_publicacao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ano_de_publicacao: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preco: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desconto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantidade: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autor: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoria: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genero: Option<Vec<u64>>,
}

/// Filters for the book listing
#[derive(Debug, Clone, Default)]
pub struct LivroFilter {
    pub search: Option<String>,
    pub categoria: Option<String>,
    pub genero: Option<String>,
    pub autor: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
}

impl LivroFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let text = [
            ("search", &self.search),
            ("categoria", &self.categoria),
            ("genero", &self.genero),
            ("autor", &self.autor),
            ("ordering", &self.ordering),
        ];
        for (key, value) in text {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.push((key.to_string(), value.to_string()));
            }
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        query
    }
}

/// Filters for `/livros/explorar/`
#[derive(Debug, Clone, Default)]
pub struct ExplorarFilter {
    pub pesquisa: Option<String>,
    pub genero: Option<String>,
    pub autor: Option<String>,
    pub data: Option<String>,
}

impl ExplorarFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        [
            ("pesquisa", &self.pesquisa),
            ("genero", &self.genero),
            ("autor", &self.autor),
            ("data", &self.data),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), v.to_string()))
        })
        .collect()
    }
}

/// Answer of `/livros/explorar/`: matches plus the filter options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explorar {
    #[serde(default)]
    pub livros: Vec<Livro>,
    #[serde(default)]
    pub generos: Vec<Genero>,
    #[serde(default)]
    pub autores: Vec<Autor>,
    #[serde(default)]
    pub termo_pesquisa: Option<String>,
}

/// Category reference inside the catalogue listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriaRef {
    pub id: u64,
    pub nome: String,
}

/// One shelf of the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prateleira {
    pub categoria: CategoriaRef,
    #[serde(default)]
    pub livros: Vec<Livro>,
}

/// Answer of `/livros/acervo/`: books grouped by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acervo {
    #[serde(default)]
    pub lista_livros: Vec<Prateleira>,
    #[serde(default)]
    pub generos: Vec<Genero>,
    #[serde(default)]
    pub autores: Vec<Autor>,
}

/// Client for the book endpoints. Reads go out without a token.
#[derive(Clone)]
pub struct LivroClient {
    ctx: HttpContext,
}

impl LivroClient {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &LivroFilter) -> Result<Paginated<Livro>> {
        Fetch::get(&self.ctx, "/livros/")
            .skip_auth()
            .query(filter.to_query())
            .execute()
            .await
    }

    pub async fn get(&self, id: u64) -> Result<Livro> {
        Fetch::get(&self.ctx, &format!("/livros/{}/", id))
            .skip_auth()
            .execute()
            .await
    }

    pub async fn create(&self, data: &LivroCreate) -> Result<Livro> {
        Fetch::post(&self.ctx, "/livros/")
            .json(data)?
            .execute()
            .await
    }

    /// Create a book uploading its cover as `capa`
    pub async fn create_with_cover(&self, data: &LivroCreate, capa: Upload) -> Result<Livro> {
        Fetch::post(&self.ctx, "/livros/")
            .multipart(multipart_form(data, "capa", Some(capa))?)
            .execute()
            .await
    }

    pub async fn update(&self, id: u64, data: &LivroUpdate) -> Result<Livro> {
        Fetch::patch(&self.ctx, &format!("/livros/{}/", id))
            .json(data)?
            .execute()
            .await
    }

    /// Update a book, replacing its cover
    pub async fn update_with_cover(&self, id: u64, data: &LivroUpdate, capa: Upload) -> Result<Livro> {
        Fetch::patch(&self.ctx, &format!("/livros/{}/", id))
            .multipart(multipart_form(data, "capa", Some(capa))?)
            .execute()
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        Fetch::delete(&self.ctx, &format!("/livros/{}/", id))
            .execute_unit()
            .await
    }

    /// One page of the listing, optionally searched
    pub async fn page(&self, page: u32, search: Option<&str>) -> Result<Paginated<Livro>> {
        let mut request = Fetch::get(&self.ctx, "/livros/")
            .skip_auth()
            .query_pair("page", &page.to_string());
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            request = request.query_pair("search", search);
        }
        request.execute().await
    }

    /// Search with the storefront filters
    pub async fn explore(&self, filter: &ExplorarFilter) -> Result<Explorar> {
        Fetch::get(&self.ctx, "/livros/explorar/")
            .skip_auth()
            .query(filter.to_query())
            .execute()
            .await
    }

    /// Books grouped by category
    pub async fn acervo(&self) -> Result<Acervo> {
        Fetch::get(&self.ctx, "/livros/acervo/")
            .skip_auth()
            .execute()
            .await
    }

    pub async fn destaque(&self) -> Result<Vec<Livro>> {
        Fetch::get(&self.ctx, "/livros/destaque/")
            .skip_auth()
            .execute()
            .await
    }

    pub async fn lancamentos(&self) -> Result<Vec<Livro>> {
        Fetch::get(&self.ctx, "/livros/lancamentos/")
            .skip_auth()
            .execute()
            .await
    }
}

/// `R$ 49,90`; unreadable prices show as zero
pub fn format_preco(preco: &str) -> String {
    format_brl(parse_decimal(preco).unwrap_or(Decimal::ZERO))
}

/// `15% OFF`, or an empty string without a discount
pub fn format_desconto(desconto: Option<&str>) -> String {
    match desconto.and_then(parse_decimal) {
        Some(value) => format!("{}% OFF", value.normalize()),
        None => String::new(),
    }
}

/// Price minus the discount percentage
pub fn preco_com_desconto(preco: &str, desconto: Option<&str>) -> Decimal {
    let preco = parse_decimal(preco).unwrap_or(Decimal::ZERO);
    match desconto.and_then(parse_decimal) {
        Some(desconto) => preco * (Decimal::ONE - desconto / Decimal::ONE_HUNDRED),
        None => preco,
    }
}

/// Local ordering for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOrder {
    TitleAsc,
    TitleDesc,
    BestSellers,
}

impl FromStr for BookOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(Self::TitleAsc),
            "desc" => Ok(Self::TitleDesc),
            "mais-vendidos" => Ok(Self::BestSellers),
            other => Err(Error::general(format!("unknown book ordering {:?}", other))),
        }
    }
}

fn compare_titles(a: &Livro, b: &Livro) -> Ordering {
    a.titulo
        .to_lowercase()
        .cmp(&b.titulo.to_lowercase())
        .then_with(|| a.titulo.cmp(&b.titulo))
}

/// Sort in place; best sellers first counts missing sales as zero
pub fn sort_books(livros: &mut [Livro], order: BookOrder) {
    match order {
        BookOrder::TitleAsc => livros.sort_by(compare_titles),
        BookOrder::TitleDesc => livros.sort_by(|a, b| compare_titles(b, a)),
        BookOrder::BestSellers => {
            livros.sort_by(|a, b| b.qtd_vendidos.unwrap_or(0).cmp(&a.qtd_vendidos.unwrap_or(0)))
        }
    }
}

/// Random order for the home page carousels
pub fn shuffle_books<T>(items: &mut [T]) {
    shuffle_books_with(items, &mut rand::thread_rng());
}

pub fn shuffle_books_with<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// DOM-safe identifier for a carousel titled `title`
pub fn carousel_id(title: &str) -> String {
    let mut slug = String::new();
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    format!("carousel-{}", slug.trim_matches('-'))
}

/// Absolute URL for an image path sent by the backend, or the placeholder
pub fn normalize_image_url(url: Option<&str>, options: &ClientOptions) -> String {
    let url = match url.filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => return options.placeholder_image.clone(),
    };
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    let base = options.media_base_url();
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn livro(id: u64, titulo: &str, vendidos: Option<u64>) -> Livro {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "titulo": titulo,
            "editora": "Companhia",
            "preco": "10.00",
            "quantidade": 1,
            "qtd_vendidos": vendidos,
        }))
        .unwrap()
    }

    #[test]
    fn test_price_helpers() {
        assert_eq!(format_preco("49.9"), "R$ 49,90");
        assert_eq!(format_desconto(Some("15.00")), "15% OFF");
        assert_eq!(format_desconto(None), "");
        assert_eq!(preco_com_desconto("100.00", Some("15")), Decimal::new(85, 0));
        assert_eq!(preco_com_desconto("100.00", None), Decimal::new(100, 0));
    }

    #[test]
    fn test_sort_books() {
        let mut livros = vec![
            livro(1, "memórias póstumas", Some(3)),
            livro(2, "Capitães da Areia", None),
            livro(3, "O Cortiço", Some(10)),
        ];

        sort_books(&mut livros, BookOrder::TitleAsc);
        assert_eq!(livros.iter().map(|l| l.id).collect::<Vec<_>>(), vec![2, 1, 3]);

        sort_books(&mut livros, BookOrder::TitleDesc);
        assert_eq!(livros.iter().map(|l| l.id).collect::<Vec<_>>(), vec![3, 1, 2]);

        sort_books(&mut livros, BookOrder::BestSellers);
        assert_eq!(livros.iter().map(|l| l.id).collect::<Vec<_>>(), vec![3, 1, 2]);

        assert_eq!("mais-vendidos".parse::<BookOrder>().unwrap(), BookOrder::BestSellers);
        assert!("preco".parse::<BookOrder>().is_err());
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut items: Vec<u32> = (0..20).collect();
        shuffle_books_with(&mut items, &mut StdRng::seed_from_u64(7));
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_carousel_id() {
        assert_eq!(carousel_id("Mais Vendidos!"), "carousel-mais-vendidos");
        assert_eq!(carousel_id("  Lançamentos 2024 "), "carousel-lan-amentos-2024");
    }

    #[test]
    fn test_normalize_image_url() {
        let options = ClientOptions::default().with_api_url("https://api.loja.com/api/v1");
        assert_eq!(
            normalize_image_url(Some("/media/capas/a.jpg"), &options),
            "https://api.loja.com/media/capas/a.jpg"
        );
        assert_eq!(
            normalize_image_url(Some("media/b.jpg"), &options),
            "https://api.loja.com/media/b.jpg"
        );
        assert_eq!(
            normalize_image_url(Some("https://cdn.x/c.jpg"), &options),
            "https://cdn.x/c.jpg"
        );
        assert_eq!(normalize_image_url(None, &options), options.placeholder_image);
    }

    #[test]
    fn test_filter_query_skips_empty() {
        let filter = LivroFilter {
            search: Some("machado".into()),
            genero: Some(String::new()),
            page: Some(2),
            ..Default::default()
        };
        assert_eq!(
            filter.to_query(),
            vec![
                ("search".to_string(), "machado".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }
}
