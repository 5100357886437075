//! Record shapes exchanged with the store adapter. Money fields use
//! `BigDecimal` to avoid silently losing precision inside the store; they
//! are converted to `f64` only at the wire-encoding boundary.

use bigdecimal::BigDecimal;

#[derive(Debug, Clone)]
pub struct AccountSummary {
    pub net_liquidation: BigDecimal,
    pub cash_balance: BigDecimal,
    pub unrealized_pnl: BigDecimal,
    pub realized_pnl: BigDecimal,
    pub base_currency: String,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub con_id: i32,
    pub symbol: String,
    pub security_type: String,
    pub currency: String,
    pub position: BigDecimal,
    pub avg_cost: BigDecimal,
    pub market_price: BigDecimal,
    pub market_value: BigDecimal,
    pub unrealized_pnl: BigDecimal,
    pub realized_pnl: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub order_id: i32,
    pub con_id: i32,
    pub symbol: String,
    pub security_type: String,
    pub exchange: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
    pub action: String,
    pub order_type: String,
    pub total_quantity: BigDecimal,
    pub limit_price: Option<BigDecimal>,
    pub aux_price: Option<BigDecimal>,
    pub tif: String,
    pub account: String,
}

#[derive(Debug, Clone)]
pub struct StoreContract {
    pub con_id: i32,
    pub symbol: String,
    pub security_type: String,
    pub exchange: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
    pub multiplier: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub account_id: String,
    pub client_id: i32,
    pub con_id: i32,
    pub symbol: String,
    pub security_type: String,
    pub exchange: String,
    pub action: String,
    pub order_type: String,
    pub quantity: BigDecimal,
    pub limit_price: Option<BigDecimal>,
    pub aux_price: Option<BigDecimal>,
    pub time_in_force: String,
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub exec_id: String,
    pub order_id: i32,
    pub account_id: String,
    pub con_id: i32,
    pub symbol: String,
    pub side: String,
    pub shares: BigDecimal,
    pub price: BigDecimal,
    pub commission: BigDecimal,
    pub realized_pnl: BigDecimal,
}

#[derive(Debug, Clone, Default)]
pub struct MarketDataUpdate {
    pub bid: Option<f64>,
    pub bid_size: Option<i64>,
    pub ask: Option<f64>,
    pub ask_size: Option<i64>,
    pub last: Option<f64>,
    pub last_size: Option<i64>,
    pub volume: Option<i64>,
}
