use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use elibros_client::auth::LoginRequest;
use elibros_client::catalog::{format_preco, ExplorarFilter, LivroFilter};
use elibros_client::coupons::CupomFilter;
use elibros_client::error::{Error, Result};
use elibros_client::format::format_brl;
use elibros_client::search::{rank_by_name, NameOrder};
use elibros_client::store::FileStore;
use elibros_client::Elibros;

#[derive(Parser, Debug)]
#[command(name = "elibros", version)]
#[command(about = "Command line client for the eLibros bookstore API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL. Defaults to ELIBROS_API_URL or the local development server.
    #[arg(long)]
    api_url: Option<String>,

    /// File the session tokens are kept in
    #[arg(long, default_value = ".elibros-session.json")]
    session: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List books
    Livros {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        ordering: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Search the catalogue the way the explore page does
    Buscar {
        termo: String,
        #[arg(long)]
        genero: Option<String>,
    },
    /// List categories, optionally ranked against a search term
    Categorias {
        #[arg(default_value = "")]
        termo: String,
        /// Sort Z to A
        #[arg(long)]
        desc: bool,
    },
    /// Log in and keep the session in the session file
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show or change the cart of the logged in user
    Carrinho {
        #[command(subcommand)]
        acao: Option<CarrinhoCmd>,
    },
    /// List coupons
    Cupons {
        /// Only coupons enabled on the backend
        #[arg(long)]
        ativos: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CarrinhoCmd {
    /// Add a book
    Adicionar {
        livro_id: u64,
        #[arg(long, default_value_t = 1)]
        quantidade: u32,
    },
    /// Set the quantity of a cart line; zero removes it
    Atualizar { item_id: u64, quantidade: i64 },
    /// Remove a cart line
    Remover { item_id: u64 },
    /// Empty the cart
    Limpar,
}

async fn run(cli: Cli) -> Result<()> {
    let elibros = match &cli.api_url {
        Some(url) => Elibros::new(url),
        None => Elibros::from_env()?,
    };
    let elibros = elibros.with_store(Arc::new(FileStore::open(&cli.session)?));

    match cli.command {
        Commands::Livros {
            search,
            ordering,
            page,
        } => {
            let filter = LivroFilter {
                search,
                ordering,
                page,
                ..Default::default()
            };
            let result = elibros.livros().list(&filter).await?;
            println!("{} livros", result.count);
            for livro in result.results {
                println!(
                    "{:>5}  {:<50}  {}",
                    livro.id,
                    livro.titulo,
                    format_preco(&livro.preco)
                );
            }
        }
        Commands::Buscar { termo, genero } => {
            let filter = ExplorarFilter {
                pesquisa: Some(termo),
                genero,
                ..Default::default()
            };
            let result = elibros.livros().explore(&filter).await?;
            for livro in result.livros {
                println!("{:>5}  {}  ({})", livro.id, livro.titulo, livro.autores.join(", "));
            }
        }
        Commands::Categorias { termo, desc } => {
            let order = if desc {
                NameOrder::Descending
            } else {
                NameOrder::Ascending
            };
            let categorias = elibros.categorias().list().await?;
            for categoria in rank_by_name(&categorias, &termo, order) {
                println!("{:>5}  {}", categoria.id, categoria.nome);
            }
        }
        Commands::Login { email, password } => {
            let auth = elibros.auth_context();
            let user = auth.login(&LoginRequest::new(&email, &password)).await?;
            println!("Logado como {} <{}>", user.username, user.email);
        }
        Commands::Logout => {
            let auth = elibros.auth_context();
            auth.initialize().await;
            auth.logout().await;
            println!("Sessão encerrada");
        }
        Commands::Carrinho { acao } => {
            let auth = elibros.auth_context();
            auth.initialize().await;
            let cart = elibros.cart_context(&auth);
            cart.refresh().await;

            match acao {
                Some(CarrinhoCmd::Adicionar {
                    livro_id,
                    quantidade,
                }) => cart.add_to_cart(livro_id, quantidade).await?,
                Some(CarrinhoCmd::Atualizar {
                    item_id,
                    quantidade,
                }) => cart.update_quantity(item_id, quantidade).await?,
                Some(CarrinhoCmd::Remover { item_id }) => cart.remove_from_cart(item_id).await?,
                Some(CarrinhoCmd::Limpar) => cart.clear_cart().await?,
                None if !auth.is_authenticated() => {
                    return Err(Error::not_logged_in("Faça login para ver seu carrinho"));
                }
                None => {}
            }

            let state = cart.state();
            for item in &state.items {
                println!(
                    "{:>5}  {:<40} x{:<3} {}",
                    item.id,
                    item.livro.titulo,
                    item.quantidade,
                    format_brl(item.subtotal())
                );
            }
            println!("{} itens, total {}", state.total_items, format_brl(state.total_price));
        }
        Commands::Cupons { ativos } => {
            let filter = CupomFilter {
                ativo: ativos.then_some(true),
                ..Default::default()
            };
            let now = Utc::now();
            for cupom in elibros.cupons().list(&filter).await?.results {
                let estado = if cupom.is_active(now) {
                    "ativo"
                } else if cupom.is_expired(now) {
                    "expirado"
                } else {
                    "inativo"
                };
                println!("{:>5}  {:<40}  {}", cupom.id, cupom.format_descricao(), estado);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{}", e.user_message());
        process::exit(1);
    }
}
