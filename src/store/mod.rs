//! The boundary between the session engine and whatever persistence layer
//! backs accounts/positions/orders/contracts. The session engine only ever
//! sees `dyn StoreAdapter`; the concrete tabular store is treated as an
//! external collaborator, so this crate carries only the trait plus an
//! in-memory reference implementation (`MemoryStore`).

pub mod memory;
pub mod models;

pub use memory::{AccountSeed, MemoryStore};

use models::{AccountSummary, Execution, MarketDataUpdate, NewOrder, OpenOrder, Position, StoreContract};

/// Synchronous, thread-safe query/mutation interface consumed by the
/// session engine. Implementations must not block across an `.await` point
/// of their own internally -- callers invoke these from async handlers via
/// `tokio::task::block_in_place`-free, cheap, in-memory operations (or, for
/// a real external store, behind whatever async bridge that store needs).
pub trait StoreAdapter: Send + Sync {
    fn get_account_summary(&self, account_id: &str) -> Option<AccountSummary>;
    fn get_positions(&self, account_id: &str) -> Vec<Position>;
    fn get_open_orders(&self, account_id: &str) -> Vec<OpenOrder>;
    fn get_contract_by_symbol(&self, symbol: &str, security_type: &str) -> Option<StoreContract>;

    /// Present for extension; not invoked by the session engine's
    /// currently implemented dispatch table.
    fn create_order(&self, order: NewOrder) -> i32;
    fn update_order_status(&self, order_id: i32, status: &str);
    fn record_execution(&self, execution: Execution);
    fn update_market_data(&self, con_id: i32, symbol: &str, update: MarketDataUpdate);
    fn update_position(&self, account_id: &str, position: Position);
}
