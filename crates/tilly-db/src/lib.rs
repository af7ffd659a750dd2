//! # tilly-db: Database Layer for Tilly
//!
//! SQLite persistence and the sale transaction manager.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         tilly-db                                        │
//! │                                                                         │
//! │  ┌────────────┐      ┌─────────────────────────────────────────────┐   │
//! │  │  Database  │─────►│              SaleManager                    │   │
//! │  │  (pool)    │      │  create / edit / delete, one transaction    │   │
//! │  └─────┬──────┘      │  per operation                              │   │
//! │        │             └───────────────┬─────────────────────────────┘   │
//! │        │                             │                                 │
//! │        ▼                             ▼                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐ │
//! │  │                       Repositories                               │ │
//! │  │   products (stock delta) • sales • movements • ledger            │ │
//! │  └──────────────────────────────────────────────────────────────────┘ │
//! │        │                                                               │
//! │        ▼                                                               │
//! │  SQLite (WAL, foreign keys, embedded migrations)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tilly_db::{Database, DbConfig, SaleMeta};
//!
//! let db = Database::new(DbConfig::new("./tilly.db")).await?;
//! let mut cart = tilly_core::Cart::new();
//! // ... stage products ...
//! let sale = db.sale_manager().create(&cart, SaleMeta::default()).await?;
//! ```

pub mod error;
pub mod manager;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult, SaleError, SaleResult};
pub use manager::{SaleManager, SaleMeta};
pub use pool::{Database, DbConfig};
pub use repository::{
    LedgerRepository, MovementRepository, ProductRepository, SaleItemDetail, SaleRepository,
    SaleWithItems,
};
