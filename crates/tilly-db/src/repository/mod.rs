//! # Repositories
//!
//! One repository per table. Read methods work against the pool; mutating
//! methods take a `SqliteConnection` so the SaleManager can compose them
//! inside a single transaction per lifecycle operation.

pub mod ledger;
pub mod movement;
pub mod product;
pub mod sale;

pub use ledger::LedgerRepository;
pub use movement::MovementRepository;
pub use product::ProductRepository;
pub use sale::{SaleItemDetail, SaleRepository, SaleWithItems};
