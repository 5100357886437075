//! The numeric identifiers of inbound/outbound message kinds and error codes.
//!
//! Identifiers are part of the wire contract and are inherited from the
//! vendor's public numbering; only the subset this gateway implements is
//! listed here.

use num_derive::FromPrimitive;

/// Inbound message kinds this gateway dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum IncomingMessageId {
    ReqMktData = 1,
    CancelMktData = 2,
    PlaceOrder = 3,
    CancelOrder = 4,
    ReqOpenOrders = 5,
    ReqAcctData = 6,
    ReqExecutions = 7,
    ReqIds = 8,
    ReqContractData = 9,
    ReqManagedAccts = 17,
    ReqHistoricalData = 20,
    ReqCurrentTime = 49,
    ReqPositions = 61,
    ReqSecDefOptParams = 78,
    StartApi = 71,
}

/// Outbound message kinds this gateway emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum OutgoingMessageId {
    TickPrice = 1,
    TickSize = 2,
    OrderStatus = 3,
    ErrMsg = 4,
    OpenOrder = 5,
    AcctValue = 6,
    PortfolioValue = 7,
    AcctUpdateTime = 8,
    NextValidId = 9,
    ContractData = 10,
    ExecutionData = 11,
    MarketDepth = 12,
    ManagedAccts = 15,
    HistoricalData = 17,
    TickGeneric = 45,
    TickString = 46,
    CurrentTime = 49,
    ContractDataEnd = 52,
    OpenOrderEnd = 53,
    AcctDownloadEnd = 54,
    ExecutionDataEnd = 55,
    MarketDataType = 58,
    CommissionReport = 59,
    PositionData = 61,
    PositionEnd = 62,
    AccountSummary = 63,
    SecurityDefinitionOptionParameter = 75,
    SecurityDefinitionOptionParameterEnd = 76,
}

impl OutgoingMessageId {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Error codes surfaced in `ERR_MSG` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ServerError,
    UnknownId,
    MaxRateExceeded,
    Vendor(i32),
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ServerError => 500,
            ErrorCode::UnknownId => 504,
            ErrorCode::MaxRateExceeded => 501,
            ErrorCode::Vendor(code) => code,
        }
    }
}
