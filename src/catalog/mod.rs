//! Catalogue resources: books, categories, genres, authors and reviews

mod avaliacoes;
mod categorias;
mod livros;
mod nomeados;

pub use avaliacoes::*;
pub use categorias::*;
pub use livros::*;
pub use nomeados::*;
