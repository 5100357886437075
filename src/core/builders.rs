//! Per-outbound-kind encoders: each assembles a fixed field order for its
//! kind and hands it to the frame codec. Field orders here are the wire
//! contract and must not be reordered independent of the catalogue.

use crate::core::codec::{frame, Field};
use crate::core::message_ids::{ErrorCode, OutgoingMessageId as Out};
use crate::store::models::{AccountSummary, OpenOrder, Position, StoreContract};

pub fn tick_price(req_id: i32, tick_type: i32, price: f64) -> Vec<u8> {
    frame(
        Out::TickPrice.code(),
        &[
            Field::Int(req_id as i64),
            Field::Int(tick_type as i64),
            Field::Float(price),
            Field::Int(0),
            Field::Int(0),
        ],
    )
}

pub fn tick_size(req_id: i32, tick_type: i32, size: i64) -> Vec<u8> {
    frame(
        Out::TickSize.code(),
        &[
            Field::Int(req_id as i64),
            Field::Int(tick_type as i64),
            Field::Int(size),
        ],
    )
}

#[allow(clippy::too_many_arguments)]
pub fn order_status(
    order_id: i32,
    status: &str,
    filled: f64,
    remaining: f64,
    avg_fill_price: f64,
    perm_id: i32,
    parent_id: i32,
    client_id: i32,
) -> Vec<u8> {
    frame(
        Out::OrderStatus.code(),
        &[
            Field::Int(order_id as i64),
            Field::Str(status),
            Field::Float(filled),
            Field::Float(remaining),
            Field::Float(avg_fill_price),
            Field::Int(perm_id as i64),
            Field::Int(parent_id as i64),
            Field::Float(0.0), // last_fill_price
            Field::Int(client_id as i64),
            Field::Str(""), // why_held
            Field::Float(0.0), // mkt_cap_price
        ],
    )
}

pub fn err_msg(req_id: i32, code: ErrorCode, detail: &str) -> Vec<u8> {
    frame(
        Out::ErrMsg.code(),
        &[
            Field::Int(req_id as i64),
            Field::Int(code.code() as i64),
            Field::Str(detail),
        ],
    )
}

/// Prefix-only `OPEN_ORDER`, sharing `PLACE_ORDER`'s field layout. Trailing
/// vendor order-state fields are not reconstructed from the store record.
pub fn open_order(order: &OpenOrder, client_id: i32) -> Vec<u8> {
    frame(
        Out::OpenOrder.code(),
        &[
            Field::Int(order.order_id as i64),
            Field::Int(order.con_id as i64),
            Field::Str(&order.symbol),
            Field::Str(&order.security_type),
            Field::Str(""), // expiry
            Field::Empty,   // strike
            Field::Str(""), // right
            Field::Empty,   // multiplier
            Field::Str(&order.exchange),
            Field::Str(&order.currency),
            Field::Str(&order.local_symbol),
            Field::Str(&order.trading_class),
            Field::Str(&order.action),
            Field::Owned(order.total_quantity.to_string()),
            Field::Str(&order.order_type),
            Field::Owned(
                order
                    .limit_price
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ),
            Field::Owned(
                order
                    .aux_price
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ),
            Field::Str(&order.tif),
            Field::Str(""), // oca_group
            Field::Str(&order.account),
            Field::Str(""), // open_close
            Field::Empty,   // origin
            Field::Str(""), // order_ref
            Field::Int(client_id as i64),
            Field::Int(order.order_id as i64), // perm_id
        ],
    )
}

pub fn acct_value(key: &str, value: &str, currency: &str, account: &str) -> Vec<u8> {
    frame(
        Out::AcctValue.code(),
        &[
            Field::Str(key),
            Field::Str(value),
            Field::Str(currency),
            Field::Str(account),
        ],
    )
}

pub fn acct_value_from_summary(summary: &AccountSummary, account: &str, key: &str) -> Vec<u8> {
    let value = match key {
        "NetLiquidation" => summary.net_liquidation.to_string(),
        "TotalCashValue" => summary.cash_balance.to_string(),
        "UnrealizedPnL" => summary.unrealized_pnl.to_string(),
        "RealizedPnL" => summary.realized_pnl.to_string(),
        _ => String::new(),
    };
    acct_value(key, &value, &summary.base_currency, account)
}

pub fn acct_update_time(timestamp: &str) -> Vec<u8> {
    frame(Out::AcctUpdateTime.code(), &[Field::Str(timestamp)])
}

#[allow(clippy::too_many_arguments)]
pub fn portfolio_value(position: &Position, account: &str) -> Vec<u8> {
    frame(
        Out::PortfolioValue.code(),
        &[
            Field::Int(position.con_id as i64),
            Field::Str(&position.symbol),
            Field::Str(&position.security_type),
            Field::Str(""), // expiry
            Field::Empty,   // strike
            Field::Str(""), // right
            Field::Empty,   // multiplier
            Field::Str(""), // primary_exch
            Field::Str(&position.currency),
            Field::Str(""), // local_symbol
            Field::Str(""), // trading_class
            Field::Owned(position.position.to_string()),
            Field::Owned(position.market_price.to_string()),
            Field::Owned(position.market_value.to_string()),
            Field::Owned(position.avg_cost.to_string()),
            Field::Owned(position.unrealized_pnl.to_string()),
            Field::Owned(position.realized_pnl.to_string()),
            Field::Str(account),
        ],
    )
}

pub fn acct_download_end(account: &str) -> Vec<u8> {
    frame(Out::AcctDownloadEnd.code(), &[Field::Str(account)])
}

pub fn position_data(account: &str, position: &Position) -> Vec<u8> {
    frame(
        Out::PositionData.code(),
        &[
            Field::Str(account),
            Field::Int(position.con_id as i64),
            Field::Str(&position.symbol),
            Field::Str(&position.security_type),
            Field::Str(""), // expiry
            Field::Empty,   // strike
            Field::Str(""), // right
            Field::Empty,   // multiplier
            Field::Str(""), // exchange
            Field::Str(&position.currency),
            Field::Str(""), // local_symbol
            Field::Str(""), // trading_class
            Field::Owned(position.position.to_string()),
            Field::Owned(position.avg_cost.to_string()),
        ],
    )
}

pub fn position_end() -> Vec<u8> {
    frame(Out::PositionEnd.code(), &[])
}

pub fn managed_accts(accounts: &str) -> Vec<u8> {
    frame(Out::ManagedAccts.code(), &[Field::Str(accounts)])
}

pub fn next_valid_id(order_id: i32) -> Vec<u8> {
    frame(Out::NextValidId.code(), &[Field::Int(order_id as i64)])
}

pub fn current_time(unix_seconds: i64) -> Vec<u8> {
    frame(Out::CurrentTime.code(), &[Field::Int(unix_seconds)])
}

pub fn historical_data(req_id: i32) -> Vec<u8> {
    frame(
        Out::HistoricalData.code(),
        &[
            Field::Int(req_id as i64),
            Field::Str(""), // start_date
            Field::Str(""), // end_date
            Field::Int(0),  // bar count
        ],
    )
}

pub fn contract_data(req_id: i32, contract: &StoreContract) -> Vec<u8> {
    frame(
        Out::ContractData.code(),
        &[
            Field::Int(req_id as i64),
            Field::Str(&contract.symbol),
            Field::Str(&contract.security_type),
            Field::Str(""), // expiry
            Field::Empty,   // strike
            Field::Str(""), // right
            Field::Str(&contract.exchange),
            Field::Str(&contract.currency),
            Field::Str(&contract.local_symbol),
            Field::Str(&contract.trading_class),
            Field::Int(contract.con_id as i64),
            Field::Str("0.01"), // min_tick
            Field::Str("100"),  // md_size_multiplier
            Field::Int(contract.multiplier as i64),
            Field::Str(""), // order_types
            Field::Str(&contract.exchange), // valid_exchanges
            Field::Int(1),  // price_magnifier
            Field::Int(0),  // under_con_id
            Field::Str(&contract.symbol), // long_name
            Field::Str(&contract.exchange), // primary_exchange
            Field::Str(""), // contract_month
            Field::Str(""), // industry
            Field::Str(""), // category
            Field::Str(""), // subcategory
            Field::Str("EST"), // time_zone
            Field::Str("09:30-16:00"), // trading_hours
            Field::Str("09:30-16:00"), // liquid_hours
            Field::Str(""), // ev_rule
            Field::Int(0),  // ev_multiplier
            Field::Int(0),  // sec_id_list_count
        ],
    )
}

pub fn contract_data_end(req_id: i32) -> Vec<u8> {
    frame(Out::ContractDataEnd.code(), &[Field::Int(req_id as i64)])
}

pub fn open_order_end() -> Vec<u8> {
    frame(Out::OpenOrderEnd.code(), &[])
}

pub fn execution_data_end(req_id: i32) -> Vec<u8> {
    frame(Out::ExecutionDataEnd.code(), &[Field::Int(req_id as i64)])
}

pub fn security_definition_option_parameter_end(req_id: i32) -> Vec<u8> {
    frame(
        Out::SecurityDefinitionOptionParameterEnd.code(),
        &[Field::Int(req_id as i64)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::unframe;
    use crate::core::codec::UnframeResult;

    fn decode(bytes: Vec<u8>) -> (i32, Vec<String>) {
        match unframe(&bytes) {
            UnframeResult::Complete { kind, fields, .. } => (kind, fields),
            UnframeResult::Incomplete => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn tick_price_field_order() {
        let (kind, fields) = decode(tick_price(100, 1, 99.99));
        assert_eq!(kind, Out::TickPrice.code());
        assert_eq!(fields[0], "100");
        assert_eq!(fields[1], "1");
        assert_eq!(fields[2], "99.99");
    }

    #[test]
    fn order_status_field_order() {
        let (kind, fields) = decode(order_status(42, "PendingSubmit", 0.0, 0.0, 0.0, 42, 0, 7));
        assert_eq!(kind, Out::OrderStatus.code());
        assert_eq!(fields[0], "42");
        assert_eq!(fields[1], "PendingSubmit");
    }

    #[test]
    fn position_end_has_no_fields_but_kind() {
        let (kind, fields) = decode(position_end());
        assert_eq!(kind, Out::PositionEnd.code());
        assert!(fields.is_empty());
    }

    #[test]
    fn err_msg_carries_code_and_detail() {
        let (kind, fields) = decode(err_msg(-1, ErrorCode::UnknownId, "Unknown message ID: 9999"));
        assert_eq!(kind, Out::ErrMsg.code());
        assert_eq!(fields[0], "-1");
        assert_eq!(fields[1], "504");
        assert_eq!(fields[2], "Unknown message ID: 9999");
    }
}
