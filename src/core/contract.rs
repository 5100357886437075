//! Shared `Contract` and `Order` subrecords, reused across requests,
//! subscription descriptors, and the store adapter boundary.

use serde::{Deserialize, Serialize};

/// A contract as carried on the wire: mirrors the field set used by
/// `REQ_MKT_DATA`, `PLACE_ORDER`, `REQ_CONTRACT_DATA`, and friends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contract {
    pub con_id: Option<i32>,
    pub symbol: String,
    pub sec_type: String,
    pub expiry: String,
    pub strike: Option<f64>,
    pub right: String,
    pub multiplier: Option<i32>,
    pub exchange: String,
    pub primary_exchange: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
}

/// The order-specific fields of a `PLACE_ORDER` request.
#[derive(Debug, Clone, Default)]
pub struct Order {
    pub action: String,
    pub total_quantity: Option<f64>,
    pub order_type: String,
    pub limit_price: Option<f64>,
    pub aux_price: Option<f64>,
    pub tif: String,
    pub oca_group: String,
    pub account: String,
    pub open_close: String,
    pub origin: Option<i32>,
    pub order_ref: String,
    pub transmit: bool,
    pub parent_id: Option<i32>,
}
