pub mod builders;
pub mod codec;
pub mod common;
pub mod contract;
pub mod listener;
pub mod message_ids;
pub mod parsers;
pub mod session;
