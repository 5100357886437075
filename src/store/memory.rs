//! `MemoryStore`: an in-process stand-in for the external relational store,
//! seeded from configuration. Not a database -- it exists so the gateway is
//! runnable end to end without external services, and so tests can assert
//! against known seed data.

use std::collections::HashMap;
use std::sync::RwLock;

use bigdecimal::BigDecimal;

use super::models::{
    AccountSummary, Execution, MarketDataUpdate, NewOrder, OpenOrder, Position, StoreContract,
};
use super::StoreAdapter;

/// Seed data for one simulated account, taken from `config.authentication.accounts`.
#[derive(Debug, Clone)]
pub struct AccountSeed {
    pub account_id: String,
    pub initial_balance: f64,
    pub base_currency: String,
}

struct AccountRow {
    summary: AccountSummary,
    positions: Vec<Position>,
    open_orders: Vec<OpenOrder>,
}

pub struct MemoryStore {
    accounts: RwLock<HashMap<String, AccountRow>>,
    contracts: RwLock<HashMap<(String, String), StoreContract>>,
    next_order_id: RwLock<i32>,
}

impl MemoryStore {
    pub fn new(accounts: &[AccountSeed], symbols: &[String]) -> Self {
        let mut account_rows = HashMap::new();
        for seed in accounts {
            let balance = BigDecimal::try_from(seed.initial_balance).unwrap_or_default();
            account_rows.insert(
                seed.account_id.clone(),
                AccountRow {
                    summary: AccountSummary {
                        net_liquidation: balance.clone(),
                        cash_balance: balance,
                        unrealized_pnl: BigDecimal::from(0),
                        realized_pnl: BigDecimal::from(0),
                        base_currency: seed.base_currency.clone(),
                    },
                    positions: Vec::new(),
                    open_orders: Vec::new(),
                },
            );
        }

        let mut contract_rows = HashMap::new();
        for (offset, symbol) in symbols.iter().enumerate() {
            let con_id = 1000 + offset as i32;
            contract_rows.insert(
                (symbol.clone(), "STK".to_string()),
                StoreContract {
                    con_id,
                    symbol: symbol.clone(),
                    security_type: "STK".to_string(),
                    exchange: "SMART".to_string(),
                    currency: "USD".to_string(),
                    local_symbol: symbol.clone(),
                    trading_class: symbol.clone(),
                    multiplier: 1,
                },
            );
        }

        MemoryStore {
            accounts: RwLock::new(account_rows),
            contracts: RwLock::new(contract_rows),
            next_order_id: RwLock::new(1),
        }
    }
}

impl StoreAdapter for MemoryStore {
    fn get_account_summary(&self, account_id: &str) -> Option<AccountSummary> {
        self.accounts
            .read()
            .unwrap()
            .get(account_id)
            .map(|row| row.summary.clone())
    }

    fn get_positions(&self, account_id: &str) -> Vec<Position> {
        self.accounts
            .read()
            .unwrap()
            .get(account_id)
            .map(|row| row.positions.clone())
            .unwrap_or_default()
    }

    fn get_open_orders(&self, account_id: &str) -> Vec<OpenOrder> {
        self.accounts
            .read()
            .unwrap()
            .get(account_id)
            .map(|row| row.open_orders.clone())
            .unwrap_or_default()
    }

    fn get_contract_by_symbol(&self, symbol: &str, security_type: &str) -> Option<StoreContract> {
        self.contracts
            .read()
            .unwrap()
            .get(&(symbol.to_string(), security_type.to_string()))
            .cloned()
    }

    fn create_order(&self, order: NewOrder) -> i32 {
        let mut next_id = self.next_order_id.write().unwrap();
        let order_id = *next_id;
        *next_id += 1;

        let mut accounts = self.accounts.write().unwrap();
        if let Some(row) = accounts.get_mut(&order.account_id) {
            row.open_orders.push(OpenOrder {
                order_id,
                con_id: order.con_id,
                symbol: order.symbol,
                security_type: order.security_type,
                exchange: order.exchange,
                currency: String::new(),
                local_symbol: String::new(),
                trading_class: String::new(),
                action: order.action,
                order_type: order.order_type,
                total_quantity: order.quantity,
                limit_price: order.limit_price,
                aux_price: order.aux_price,
                tif: order.time_in_force,
                account: order.account_id,
            });
        }
        order_id
    }

    fn update_order_status(&self, order_id: i32, status: &str) {
        log::debug!("order {order_id} status -> {status} (not persisted by MemoryStore)");
    }

    fn record_execution(&self, execution: Execution) {
        log::debug!("execution recorded: {} (not persisted by MemoryStore)", execution.exec_id);
    }

    fn update_market_data(&self, con_id: i32, symbol: &str, _update: MarketDataUpdate) {
        log::trace!("market data update for {symbol} (con_id {con_id}) not persisted by MemoryStore");
    }

    fn update_position(&self, account_id: &str, position: Position) {
        let mut accounts = self.accounts.write().unwrap();
        if let Some(row) = accounts.get_mut(account_id) {
            if let Some(existing) = row
                .positions
                .iter_mut()
                .find(|p| p.con_id == position.con_id)
            {
                *existing = position;
            } else {
                row.positions.push(position);
            }
        }
    }
}
