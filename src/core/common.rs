//! Small shared constants mirrored from the vendor API.

/// Tick type codes used in the initial market-data burst and in broadcasts.
pub mod tick_type {
    pub const BID_SIZE: i32 = 0;
    pub const BID_PRICE: i32 = 1;
    pub const ASK_PRICE: i32 = 2;
    pub const ASK_SIZE: i32 = 3;
    pub const LAST_PRICE: i32 = 4;
    pub const LAST_SIZE: i32 = 5;
    pub const VOLUME: i32 = 8;
}

/// The client-visible duration of the scripted order lifecycle transition.
pub const ORDER_STATUS_DELAY_MS: u64 = 100;
