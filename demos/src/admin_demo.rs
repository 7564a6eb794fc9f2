use std::env;

use chrono::Utc;
use dotenv::dotenv;
use elibros_client::auth::LoginRequest;
use elibros_client::clients::{format_endereco, format_nome, ClienteFilter};
use elibros_client::coupons::CupomFilter;
use elibros_client::loaders::ListState;
use elibros_client::orders::PedidoFilter;
use elibros_client::Elibros;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let email = env::var("ELIBROS_ADMIN_EMAIL").expect("ELIBROS_ADMIN_EMAIL must be set");
    let password = env::var("ELIBROS_ADMIN_PASSWORD").expect("ELIBROS_ADMIN_PASSWORD must be set");

    let elibros = Elibros::from_env()?;
    let auth = elibros.auth_context();
    auth.login(&LoginRequest::new(&email, &password)).await?;

    if !auth.is_admin() {
        println!("{} is not an administrator", email);
        return Ok(());
    }

    let stats = elibros.admin().stats().await?;
    println!("Dashboard: {:?}", stats);

    let cupons = elibros.cupons();
    let mut lista = ListState::new();
    lista
        .load(1, |page| {
            let filter = CupomFilter {
                page: Some(page),
                ..Default::default()
            };
            let cupons = cupons.clone();
            async move { cupons.list(&filter).await }
        })
        .await;
    let now = Utc::now();
    println!("\n{} cupons", lista.total_count);
    for cupom in &lista.items {
        println!("  {} ativo={}", cupom.format_descricao(), cupom.is_active(now));
    }

    let filter = ClienteFilter {
        is_active: Some(true),
        ordering: Some("-data_cadastro".to_string()),
        ..Default::default()
    };
    let clientes = elibros.clientes().list(&filter).await?;
    println!("\n{} clientes ativos", clientes.count);
    for cliente in clientes.results.iter().take(10) {
        println!("  {} - {}", format_nome(cliente), format_endereco(cliente));
    }

    let pedidos = elibros
        .pedidos()
        .list(&PedidoFilter {
            admin: true,
            ..Default::default()
        })
        .await?;
    println!("\n{} pedidos", pedidos.count);
    for pedido in pedidos.results.iter().take(10) {
        println!("  {} {} {}", pedido.numero_pedido, pedido.status, pedido.total());
    }

    auth.logout().await;
    Ok(())
}
