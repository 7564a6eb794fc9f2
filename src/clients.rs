//! Customer accounts: the admin client list and the logged in customer's
//! own profile

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{GeneroUsuario, Usuario};
use crate::config::ClientOptions;
use crate::error::Result;
use crate::fetch::{Fetch, HttpContext, Paginated, Upload};
use crate::format::{digits, parse_datetime, string_or_number};
use crate::loaders::Identified;
use crate::search::{compare_names, rank_by, NameOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endereco {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub cep: String,
    #[serde(default)]
    pub rua: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub numero: String,
    #[serde(default)]
    pub complemento: Option<String>,
    #[serde(default)]
    pub bairro: String,
    #[serde(default)]
    pub cidade: String,
    #[serde(default)]
    pub uf: String,
}

impl Endereco {
    fn first_line(&self) -> String {
        match self.complemento.as_deref().filter(|c| !c.is_empty()) {
            Some(complemento) => format!("{}, {} - {}", self.rua, self.numero, complemento),
            None => format!("{}, {}", self.rua, self.numero),
        }
    }
}

/// A customer as the admin endpoints return it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cliente {
    pub id: u64,
    #[serde(default)]
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub data_nascimento: Option<String>,
    #[serde(default)]
    pub genero: Option<String>,
    #[serde(default)]
    pub data_cadastro: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub foto_de_perfil: Option<String>,
    #[serde(default)]
    pub endereco: Option<Endereco>,
}

fn default_true() -> bool {
    true
}

impl Identified for Cliente {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Cliente {
    /// Rewrite the photo path into an absolute URL
    fn resolve_media(mut self, options: &ClientOptions) -> Self {
        self.foto_de_perfil = self
            .foto_de_perfil
            .as_deref()
            .and_then(|path| media_url(path, options));
        self
    }

    /// The same customer seen as a user account
    pub fn as_usuario(&self) -> Usuario {
        Usuario {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            nome: self.nome.clone(),
            cpf: self.cpf.clone().unwrap_or_default(),
            telefone: self.telefone.clone().unwrap_or_default(),
            genero: GeneroUsuario::from_code(self.genero.as_deref().unwrap_or("NI")),
            dt_nasc: self.data_nascimento.clone(),
            date_joined: self.data_cadastro.clone(),
            is_active: self.is_active,
            email_is_verified: true,
            is_staff: Some(false),
            is_superuser: Some(false),
            foto_de_perfil: self.foto_de_perfil.clone(),
        }
    }
}

/// Absolute URL of an uploaded file. Bare paths are assumed to live under
/// `/media/`.
pub fn media_url(path: &str, options: &ClientOptions) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    if path.starts_with("http") {
        return Some(path.to_string());
    }

    let base = options.media_base_url();
    if path.starts_with("/media/") {
        return Some(format!("{}{}", base, path));
    }
    Some(format!("{}/media/{}", base, path.trim_start_matches('/')))
}

/// User fields editable on a customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClienteUserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(rename = "CPF", skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genero: Option<GeneroUsuario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dt_nasc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Address fields that survived [`EnderecoForm::sanitized`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnderecoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rua: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complemento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uf: Option<String>,
}

/// Body of the customer update endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClienteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ClienteUserUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endereco: Option<EnderecoUpdate>,
}

impl ClienteUpdate {
    /// Multipart rendition: `user[nome]`, `endereco[rua]`, ... plus the photo
    /// as `foto_de_perfil`
    fn into_form(self, foto: Upload) -> Result<Form> {
        let mut form = Form::new();
        if let Value::Object(sections) = serde_json::to_value(&self)? {
            for (section, fields) in sections {
                if let Value::Object(fields) = fields {
                    for (key, value) in fields {
                        let text = match value {
                            Value::String(s) => s,
                            Value::Null => continue,
                            other => other.to_string(),
                        };
                        form = form.text(format!("{}[{}]", section, key), text);
                    }
                }
            }
        }
        Ok(form.part("foto_de_perfil", foto.into_part()?))
    }
}

/// Raw address form input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnderecoForm {
    pub cep: String,
    pub rua: String,
    pub numero: String,
    pub complemento: String,
    pub bairro: String,
    pub cidade: String,
    pub uf: String,
}

impl EnderecoForm {
    /// Trimmed fields with blanks dropped; `numero` is only kept when it
    /// reads as a positive integer
    pub fn sanitized(&self) -> EnderecoUpdate {
        let text = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        let leading: String = self
            .numero
            .trim()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();

        EnderecoUpdate {
            cep: text(&self.cep),
            rua: text(&self.rua),
            numero: leading.parse::<u32>().ok().filter(|n| *n > 0),
            complemento: text(&self.complemento),
            bairro: text(&self.bairro),
            cidade: text(&self.cidade),
            uf: text(&self.uf),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClienteStats {
    #[serde(default)]
    pub total_clientes: u64,
    #[serde(default)]
    pub clientes_ativos: u64,
    #[serde(default)]
    pub clientes_inativos: u64,
    #[serde(default)]
    pub clientes_com_endereco: u64,
    #[serde(default)]
    pub clientes_sem_endereco: u64,
}

/// Filters applied locally to the admin client list
#[derive(Debug, Clone, Default)]
pub struct ClienteFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// `nome`, `email`, `data_cadastro` or anything else for id; `-` prefix
    /// for descending
    pub ordering: Option<String>,
}

impl ClienteFilter {
    /// Apply the filter to an already loaded list
    pub fn apply(&self, clientes: Vec<Cliente>) -> Vec<Cliente> {
        let search = self
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());

        let mut result: Vec<Cliente> = clientes
            .into_iter()
            .filter(|c| match &search {
                Some(term) => {
                    c.nome.to_lowercase().contains(term)
                        || c.email.to_lowercase().contains(term)
                        || c.username.to_lowercase().contains(term)
                }
                None => true,
            })
            .filter(|c| self.is_active.map_or(true, |active| c.is_active == active))
            .collect();

        if let Some(ordering) = self.ordering.as_deref().filter(|o| !o.is_empty()) {
            let (field, descending) = match ordering.strip_prefix('-') {
                Some(field) => (field, true),
                None => (ordering, false),
            };
            result.sort_by(|a, b| {
                let ord = compare_by_field(a, b, field);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        result
    }
}

fn compare_by_field(a: &Cliente, b: &Cliente, field: &str) -> Ordering {
    match field {
        "nome" => a.nome.cmp(&b.nome),
        "email" => a.email.cmp(&b.email),
        "data_cadastro" => parse_datetime(&a.data_cadastro).cmp(&parse_datetime(&b.data_cadastro)),
        _ => a.id.cmp(&b.id),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClienteListing {
    Plain(Vec<Cliente>),
    Page(Paginated<Cliente>),
}

/// Client for the customer endpoints
#[derive(Clone)]
pub struct ClienteClient {
    ctx: HttpContext,
}

impl ClienteClient {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    fn resolve(&self, cliente: Cliente) -> Cliente {
        cliente.resolve_media(self.ctx.options())
    }

    /// Every customer, filtered and ordered locally
    pub async fn list(&self, filter: &ClienteFilter) -> Result<Paginated<Cliente>> {
        let listing: ClienteListing = Fetch::get(&self.ctx, "/admin/clientes/").execute().await?;
        let clientes = match listing {
            ClienteListing::Plain(clientes) => clientes,
            ClienteListing::Page(page) => page.results,
        };
        debug!("loaded {} customers", clientes.len());

        let clientes = clientes.into_iter().map(|c| self.resolve(c)).collect();
        Ok(Paginated::single_page(filter.apply(clientes)))
    }

    pub async fn get(&self, id: u64) -> Result<Cliente> {
        let cliente = Fetch::get(&self.ctx, &format!("/admin/{}/get_cliente/", id))
            .execute()
            .await?;
        Ok(self.resolve(cliente))
    }

    /// Profile of the logged in customer
    pub async fn perfil(&self) -> Result<Cliente> {
        let cliente = Fetch::get(&self.ctx, "/cliente/perfil/").execute().await?;
        Ok(self.resolve(cliente))
    }

    pub async fn update_perfil(&self, data: &ClienteUpdate) -> Result<Cliente> {
        let cliente = Fetch::put(&self.ctx, "/cliente/editar_perfil/")
            .json(data)?
            .execute()
            .await?;
        Ok(self.resolve(cliente))
    }

    /// Admin edit of a customer. With a photo the body goes out as multipart.
    pub async fn update(&self, id: u64, data: &ClienteUpdate, foto: Option<Upload>) -> Result<Cliente> {
        let path = format!("/admin/{}/editar_cliente/", id);
        let request = match foto {
            Some(foto) => Fetch::put(&self.ctx, &path).multipart(data.clone().into_form(foto)?),
            None => Fetch::put(&self.ctx, &path).json(data)?,
        };
        let cliente = request.execute().await?;
        Ok(self.resolve(cliente))
    }

    async fn toggle_status(&self, id: u64) -> Result<Cliente> {
        Fetch::post(&self.ctx, &format!("/admin/{}/toggle_cliente_status/", id))
            .execute_unit()
            .await?;
        self.get(id).await
    }

    /// Deactivate a customer as admin, or the logged in customer's own account
    /// when `id` is `None`
    pub async fn deactivate(&self, id: Option<u64>) -> Result<Cliente> {
        match id {
            Some(id) => self.toggle_status(id).await,
            None => {
                let update = ClienteUpdate {
                    user: Some(ClienteUserUpdate {
                        is_active: Some(false),
                        ..Default::default()
                    }),
                    endereco: None,
                };
                self.update_perfil(&update).await
            }
        }
    }

    pub async fn reactivate(&self, id: u64) -> Result<Cliente> {
        self.toggle_status(id).await
    }

    /// Permanent removal
    pub async fn delete(&self, id: u64) -> Result<()> {
        Fetch::delete(&self.ctx, &format!("/admin/{}/delete_cliente/", id))
            .execute_unit()
            .await
    }

    pub async fn stats(&self) -> Result<ClienteStats> {
        Fetch::get(&self.ctx, "/cliente/estatisticas/").execute().await
    }
}

/// Display name: `nome`, falling back to the username
pub fn format_nome(cliente: &Cliente) -> &str {
    if cliente.nome.is_empty() {
        &cliente.username
    } else {
        &cliente.nome
    }
}

/// `(11) 98765-4321` or `(11) 3456-7890`; anything else is returned as is
pub fn format_telefone(telefone: &str) -> String {
    let d = digits(telefone);
    match d.len() {
        11 => format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..]),
        10 => format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..]),
        _ => telefone.to_string(),
    }
}

/// `000.000.000-00` when the input has eleven digits
pub fn format_cpf(cpf: &str) -> String {
    let d = digits(cpf);
    if d.len() == 11 {
        format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..])
    } else {
        cpf.to_string()
    }
}

pub fn format_genero(genero: Option<&str>) -> &'static str {
    GeneroUsuario::from_code(genero.unwrap_or("NI")).label()
}

/// One-line address
pub fn format_endereco(cliente: &Cliente) -> String {
    match &cliente.endereco {
        Some(e) => format!("{}, {}, {}/{}", e.first_line(), e.bairro, e.cidade, e.uf),
        None => "Endereço não informado".to_string(),
    }
}

/// Three-line address with the CEP
pub fn format_endereco_completo(cliente: &Cliente) -> Option<String> {
    cliente.endereco.as_ref().map(|e| {
        format!(
            "{}\n{}, {}/{}\nCEP: {}",
            e.first_line(),
            e.bairro,
            e.cidade,
            e.uf,
            e.cep
        )
    })
}

pub fn has_address(cliente: &Cliente) -> bool {
    cliente.endereco.is_some()
}

/// Whole days since the account was created, rounded up
pub fn account_age_days(cliente: &Cliente, now: DateTime<Utc>) -> Option<i64> {
    let joined = parse_datetime(&cliente.data_cadastro)?;
    let seconds = (now - joined).num_seconds().abs();
    Some((seconds + 86_399) / 86_400)
}

/// Rank customers by display name; email and username only count as
/// substring matches
pub fn rank_clientes(clientes: &[Cliente], term: &str, order: NameOrder) -> Vec<Cliente> {
    rank_by(
        clientes,
        term,
        order,
        |c| format_nome(c).to_string(),
        |c| vec![c.email.clone(), c.username.clone()],
    )
}

/// Alphabetical order by display name
pub fn sort_clientes(clientes: &mut [Cliente], order: NameOrder) {
    clientes.sort_by(|a, b| {
        let ord = compare_names(format_nome(a), format_nome(b));
        match order {
            NameOrder::Ascending => ord,
            NameOrder::Descending => ord.reverse(),
        }
    });
}
