use dotenv::dotenv;
use elibros_client::catalog::{carousel_id, format_preco, shuffle_books, sort_books, BookOrder, LivroFilter};
use elibros_client::search::{rank_by_name, NameOrder};
use elibros_client::Elibros;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let elibros = Elibros::from_env()?;
    let livros = elibros.livros();

    println!("Featured books");
    let mut destaque = livros.destaque().await?;
    shuffle_books(&mut destaque);
    for livro in destaque.iter().take(5) {
        println!("  {} - {}", livro.titulo, format_preco(&livro.preco));
    }

    println!("\nCatalogue by category");
    let acervo = livros.acervo().await?;
    for prateleira in &acervo.lista_livros {
        let mut books = prateleira.livros.clone();
        sort_books(&mut books, BookOrder::BestSellers);
        println!(
            "  [{}] {} ({} livros)",
            carousel_id(&prateleira.categoria.nome),
            prateleira.categoria.nome,
            books.len()
        );
    }

    println!("\nFirst page sorted by title");
    let filter = LivroFilter {
        ordering: Some("titulo".to_string()),
        ..Default::default()
    };
    let page = livros.list(&filter).await?;
    for livro in page.results {
        println!("  {:>4} {} ({})", livro.id, livro.titulo, livro.capa(elibros.options()));
    }

    println!("\nCategories matching \"rom\"");
    let categorias = elibros.categorias().list().await?;
    for categoria in rank_by_name(&categorias, "rom", NameOrder::Ascending) {
        println!("  {}", categoria.nome);
    }

    if let Some(livro) = acervo.lista_livros.iter().flat_map(|p| p.livros.iter()).next() {
        let avaliacoes = elibros.avaliacoes().list_for_book(livro.id).await?;
        println!("\n{} avaliações para {}", avaliacoes.len(), livro.titulo);
    }

    Ok(())
}
