//! Administrative dashboard endpoints

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::{Fetch, HttpContext};

/// Dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub total_livros: u64,
    #[serde(default)]
    pub total_clientes: u64,
    #[serde(default)]
    pub total_pedidos: u64,
    #[serde(default)]
    pub total_generos: u64,
    #[serde(default)]
    pub total_categorias: u64,
    #[serde(default)]
    pub total_administradores: u64,
}

/// Administrator row linked to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub id: u64,
    #[serde(default)]
    pub rg: String,
}

/// What the backend knows about the logged in user's privileges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUserInfo {
    pub id: u64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub date_joined: String,
    #[serde(default)]
    pub admin_record: Option<AdminRecord>,
}

impl AdminUserInfo {
    /// Staff, superuser or holder of an admin record
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser || self.admin_record.is_some()
    }
}

/// Client for the admin dashboard
#[derive(Clone)]
pub struct AdminApi {
    ctx: HttpContext,
}

impl AdminApi {
    pub(crate) fn new(ctx: HttpContext) -> Self {
        Self { ctx }
    }

    /// Dashboard counters
    pub async fn stats(&self) -> Result<AdminStats> {
        Fetch::get(&self.ctx, "/admin/dashboard_stats/").execute().await
    }

    /// Privileges of the logged in user
    pub async fn user_info(&self) -> Result<AdminUserInfo> {
        Fetch::get(&self.ctx, "/admin/user_info/").execute().await
    }

    /// Whether the logged in user may use the admin area. Any failure
    /// answers `false`.
    pub async fn is_current_user_admin(&self) -> bool {
        match self.user_info().await {
            Ok(info) => info.is_admin(),
            Err(e) => {
                warn!("could not check admin status: {}", e);
                false
            }
        }
    }
}
