use std::env;

use dotenv::dotenv;
use elibros_client::auth::LoginRequest;
use elibros_client::catalog::LivroFilter;
use elibros_client::format::format_brl;
use elibros_client::Elibros;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let email = env::var("ELIBROS_EMAIL").expect("ELIBROS_EMAIL must be set");
    let password = env::var("ELIBROS_PASSWORD").expect("ELIBROS_PASSWORD must be set");

    let elibros = Elibros::from_env()?;
    let auth = elibros.auth_context();
    auth.initialize().await;
    let cart = elibros.cart_context(&auth);

    println!("Adding to the cart while logged out");
    if let Err(e) = cart.add_to_cart(1, 1).await {
        println!("  refused: {}", e);
    }

    auth.login(&LoginRequest::new(&email, &password)).await?;
    cart.refresh().await;
    println!("Cart has {} items", cart.total_items());

    let livros = elibros.livros().list(&LivroFilter::default()).await?;
    if let Some(livro) = livros.results.iter().find(|l| l.is_disponivel()) {
        println!("Adding two copies of {}", livro.titulo);
        cart.add_to_cart(livro.id, 2).await?;
    }

    let state = cart.state();
    for item in &state.items {
        println!("  {} x{} = {}", item.livro.titulo, item.quantidade, format_brl(item.subtotal()));
    }
    println!("Total: {} ({} itens)", format_brl(state.total_price), state.total_items);

    if let Some(item) = state.items.first() {
        println!("Setting the first line to one copy");
        cart.update_quantity(item.id, 1).await?;
        println!("Total: {}", format_brl(cart.total_price()));
    }

    auth.logout().await;
    cart.refresh().await;
    println!("After logout the cart shows {} items", cart.total_items());

    Ok(())
}
