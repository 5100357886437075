//! Per-inbound-kind decoders: each converts a field vector into a typed
//! `Request` variant. Parsers tolerate over-long messages (trailing fields
//! are ignored) but reject messages missing a field required for their
//! kind with `ProtocolError::MissingField`.

use crate::core::codec::FieldReader;
use crate::core::contract::{Contract, Order};
use crate::core::message_ids::IncomingMessageId;
use crate::error::ProtocolError;

#[derive(Debug, Clone)]
pub enum Request {
    ReqMktData {
        req_id: i32,
        contract: Contract,
        generic_tick_list: String,
        snapshot: bool,
        regulatory_snapshot: bool,
    },
    CancelMktData {
        req_id: i32,
    },
    PlaceOrder {
        order_id: i32,
        contract: Contract,
        order: Order,
    },
    CancelOrder {
        order_id: i32,
    },
    ReqOpenOrders,
    ReqAcctData {
        subscribe: bool,
        account_code: String,
    },
    ReqPositions,
    ReqContractData {
        req_id: i32,
        contract: Contract,
    },
    ReqSecDefOptParams {
        req_id: i32,
        underlying_symbol: String,
    },
    ReqExecutions {
        req_id: i32,
    },
    ReqIds,
    ReqManagedAccts,
    ReqCurrentTime,
    ReqHistoricalData {
        req_id: i32,
        contract: Contract,
    },
    StartApi {
        client_id: Option<i32>,
        optional_capabilities: String,
    },
}

fn read_contract(reader: &mut FieldReader) -> Contract {
    Contract {
        con_id: reader.read_opt_i32(),
        symbol: reader.read_str(),
        sec_type: reader.read_str(),
        expiry: reader.read_str(),
        strike: reader.read_opt_f64(),
        right: reader.read_str(),
        multiplier: reader.read_opt_i32(),
        exchange: reader.read_str(),
        primary_exchange: reader.read_str(),
        currency: reader.read_str(),
        local_symbol: reader.read_str(),
        trading_class: reader.read_str(),
    }
}

fn parse_req_mkt_data(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let req_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "req_id",
    })?;
    let contract = read_contract(&mut reader);
    if contract.symbol.is_empty() {
        return Err(ProtocolError::MissingField { kind, field: "symbol" });
    }
    let generic_tick_list = reader.read_str();
    let snapshot = reader.read_bool();
    let regulatory_snapshot = reader.read_bool();
    Ok(Request::ReqMktData {
        req_id,
        contract,
        generic_tick_list,
        snapshot,
        regulatory_snapshot,
    })
}

fn parse_cancel_mkt_data(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let req_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "req_id",
    })?;
    Ok(Request::CancelMktData { req_id })
}

fn parse_place_order(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let order_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "order_id",
    })?;
    let contract = read_contract(&mut reader);
    if contract.symbol.is_empty() {
        return Err(ProtocolError::MissingField { kind, field: "symbol" });
    }
    // sec_id_type / sec_id (unused by this gateway, consumed to keep position)
    let _sec_id_type = reader.read_str();
    let _sec_id = reader.read_str();

    let action = reader.read_str();
    if action.is_empty() {
        return Err(ProtocolError::MissingField { kind, field: "action" });
    }
    let order = Order {
        action,
        total_quantity: reader.read_opt_f64(),
        order_type: reader.read_str(),
        limit_price: reader.read_opt_f64(),
        aux_price: reader.read_opt_f64(),
        tif: reader.read_str(),
        oca_group: reader.read_str(),
        account: reader.read_str(),
        open_close: reader.read_str(),
        origin: reader.read_opt_i32(),
        order_ref: reader.read_str(),
        transmit: reader.read_bool(),
        parent_id: reader.read_opt_i32(),
    };
    Ok(Request::PlaceOrder {
        order_id,
        contract,
        order,
    })
}

fn parse_cancel_order(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let order_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "order_id",
    })?;
    Ok(Request::CancelOrder { order_id })
}

fn parse_req_acct_data(_kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let subscribe = reader.read_bool();
    let account_code = reader.read_str();
    Ok(Request::ReqAcctData {
        subscribe,
        account_code,
    })
}

fn parse_req_contract_details(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let req_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "req_id",
    })?;
    let contract = read_contract(&mut reader);
    Ok(Request::ReqContractData { req_id, contract })
}

fn parse_req_sec_def_opt_params(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let req_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "req_id",
    })?;
    let underlying_symbol = reader.read_str();
    Ok(Request::ReqSecDefOptParams {
        req_id,
        underlying_symbol,
    })
}

fn parse_req_executions(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let req_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "req_id",
    })?;
    Ok(Request::ReqExecutions { req_id })
}

fn parse_req_historical_data(kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let req_id = reader.read_opt_i32().ok_or(ProtocolError::MissingField {
        kind,
        field: "req_id",
    })?;
    let contract = read_contract(&mut reader);
    Ok(Request::ReqHistoricalData { req_id, contract })
}

fn parse_start_api(_kind: i32, fields: &[String]) -> Result<Request, ProtocolError> {
    let mut reader = FieldReader::new(fields);
    let client_id = reader.read_opt_i32();
    let optional_capabilities = reader.read_str();
    Ok(Request::StartApi {
        client_id,
        optional_capabilities,
    })
}

/// Parse a message body given its already-decoded kind.
pub fn parse_message(kind: IncomingMessageId, fields: &[String]) -> Result<Request, ProtocolError> {
    let kind_code = kind as i32;
    match kind {
        IncomingMessageId::ReqMktData => parse_req_mkt_data(kind_code, fields),
        IncomingMessageId::CancelMktData => parse_cancel_mkt_data(kind_code, fields),
        IncomingMessageId::PlaceOrder => parse_place_order(kind_code, fields),
        IncomingMessageId::CancelOrder => parse_cancel_order(kind_code, fields),
        IncomingMessageId::ReqOpenOrders => Ok(Request::ReqOpenOrders),
        IncomingMessageId::ReqAcctData => parse_req_acct_data(kind_code, fields),
        IncomingMessageId::ReqPositions => Ok(Request::ReqPositions),
        IncomingMessageId::ReqContractData => parse_req_contract_details(kind_code, fields),
        IncomingMessageId::ReqSecDefOptParams => parse_req_sec_def_opt_params(kind_code, fields),
        IncomingMessageId::ReqExecutions => parse_req_executions(kind_code, fields),
        IncomingMessageId::ReqIds => Ok(Request::ReqIds),
        IncomingMessageId::ReqManagedAccts => Ok(Request::ReqManagedAccts),
        IncomingMessageId::ReqCurrentTime => Ok(Request::ReqCurrentTime),
        IncomingMessageId::ReqHistoricalData => parse_req_historical_data(kind_code, fields),
        IncomingMessageId::StartApi => parse_start_api(kind_code, fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cancel_mkt_data() {
        let fields = vec!["100".to_string()];
        let req = parse_message(IncomingMessageId::CancelMktData, &fields).unwrap();
        match req {
            Request::CancelMktData { req_id } => assert_eq!(req_id, 100),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn missing_req_id_is_an_error() {
        let fields: Vec<String> = vec![];
        let err = parse_message(IncomingMessageId::CancelMktData, &fields).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { .. }));
    }

    #[test]
    fn parses_req_mkt_data_contract() {
        let fields = vec![
            "100".to_string(),
            "".to_string(),
            "NVDA".to_string(),
            "STK".to_string(),
        ];
        let req = parse_message(IncomingMessageId::ReqMktData, &fields).unwrap();
        match req {
            Request::ReqMktData { req_id, contract, .. } => {
                assert_eq!(req_id, 100);
                assert_eq!(contract.symbol, "NVDA");
                assert_eq!(contract.sec_type, "STK");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn tolerates_trailing_fields() {
        let fields = vec!["100".to_string(), "extra".to_string(), "more".to_string()];
        let req = parse_message(IncomingMessageId::CancelMktData, &fields).unwrap();
        assert!(matches!(req, Request::CancelMktData { req_id: 100 }));
    }

    #[test]
    fn start_api_defaults_client_id_to_absent() {
        let fields: Vec<String> = vec![];
        let req = parse_message(IncomingMessageId::StartApi, &fields).unwrap();
        match req {
            Request::StartApi { client_id, .. } => assert_eq!(client_id, None),
            _ => panic!("wrong variant"),
        }
    }
}
