//! Pokedex data: the type chart, fuzzy name lookup and the catalog itself.

pub mod catalog;
pub mod fuzzy;
pub mod similarity;
pub mod types;

pub use catalog::{Catalog, CatalogEntry};
pub use types::{Effectiveness, PokemonType, TypeChart};
