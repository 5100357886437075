//! Per-client lifecycle: handshake, ingress loop, dispatch, subscription
//! tables, rate limiter, and egress serialization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use num_traits::FromPrimitive;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};

use crate::core::builders;
use crate::core::codec::IngressBuffer;
use crate::core::common::{tick_type, ORDER_STATUS_DELAY_MS};
use crate::core::contract::Contract;
use crate::core::message_ids::{ErrorCode, IncomingMessageId};
use crate::core::parsers::{self, Request};
use crate::error::ProtocolError;
use crate::store::StoreAdapter;

/// A client's market-data subscription, keyed by `req_id` within the session.
#[derive(Debug, Clone)]
pub struct SubscriptionDescriptor {
    pub contract: Contract,
    pub generic_ticks: String,
    pub snapshot: bool,
    pub regulatory_snapshot: bool,
}

/// Bid/ask/last and their sizes for one broadcast event. Any field left
/// `None` is skipped rather than sent as a zero value.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSet {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub bid_size: Option<i64>,
    pub ask_size: Option<i64>,
    pub last_size: Option<i64>,
    pub volume: Option<i64>,
}

/// State shared between a session's own ingress task and the listener's
/// broadcaster. The write half is mutex-guarded so a broadcast delivery can
/// never splice into the middle of a burst the session is still emitting.
pub struct SessionShared {
    pub write_half: Mutex<OwnedWriteHalf>,
    pub market_data_subs: RwLock<HashMap<i32, SubscriptionDescriptor>>,
}

impl SessionShared {
    pub fn new(write_half: OwnedWriteHalf) -> Self {
        SessionShared {
            write_half: Mutex::new(write_half),
            market_data_subs: RwLock::new(HashMap::new()),
        }
    }

    async fn send_burst(&self, frames: Vec<Vec<u8>>) -> std::io::Result<()> {
        let mut guard = self.write_half.lock().await;
        for frame in frames {
            guard.write_all(&frame).await?;
        }
        Ok(())
    }

    async fn send_one(&self, frame: Vec<u8>) -> std::io::Result<()> {
        self.send_burst(vec![frame]).await
    }

    pub async fn is_subscribed_to_symbol(&self, symbol: &str) -> bool {
        self.market_data_subs
            .read()
            .await
            .values()
            .any(|d| d.contract.symbol == symbol)
    }

    /// The broadcast sink: emits `TICK_PRICE`/`TICK_SIZE` frames to every
    /// subscription whose contract symbol matches, for whichever fields of
    /// `ticks` are present, in the fixed order bid/ask/last/size-bid/
    /// size-ask/size-volume.
    pub async fn send_market_data(&self, symbol: &str, ticks: TickSet) {
        let matches: Vec<i32> = {
            let subs = self.market_data_subs.read().await;
            subs.iter()
                .filter(|(_, d)| d.contract.symbol == symbol)
                .map(|(req_id, _)| *req_id)
                .collect()
        };
        if matches.is_empty() {
            return;
        }
        let mut frames = Vec::new();
        for req_id in matches {
            if let Some(bid) = ticks.bid {
                frames.push(builders::tick_price(req_id, tick_type::BID_PRICE, bid));
            }
            if let Some(ask) = ticks.ask {
                frames.push(builders::tick_price(req_id, tick_type::ASK_PRICE, ask));
            }
            if let Some(last) = ticks.last {
                frames.push(builders::tick_price(req_id, tick_type::LAST_PRICE, last));
            }
            if let Some(size) = ticks.bid_size {
                frames.push(builders::tick_size(req_id, tick_type::BID_SIZE, size));
            }
            if let Some(size) = ticks.ask_size {
                frames.push(builders::tick_size(req_id, tick_type::ASK_SIZE, size));
            }
            if let Some(size) = ticks.volume {
                frames.push(builders::tick_size(req_id, tick_type::VOLUME, size));
            }
        }
        if let Err(err) = self.send_burst(frames).await {
            log::debug!("broadcast write to a closed session dropped: {err}");
        }
    }
}

/// Configuration a session needs that does not change over its lifetime.
pub struct SessionConfig {
    pub server_version: i32,
    pub max_rate: u32,
    pub accounts: Vec<String>,
    pub next_order_id: Arc<AtomicI64>,
}

pub struct Session {
    client_id: i64,
    client_version: i32,
    config: Arc<SessionConfig>,
    shared: Arc<SessionShared>,
    store: Arc<dyn StoreAdapter>,
    account_subs: std::collections::HashSet<String>,
    rate_window_start: Instant,
    rate_count: u32,
}

fn parse_handshake_version(raw: &str) -> i32 {
    let token = raw.trim_start_matches('v');
    if let Some((_, max)) = token.split_once("..") {
        return max.trim().parse().unwrap_or(100);
    }
    token.trim().parse().unwrap_or(100)
}

impl Session {
    pub fn new(
        client_id: i64,
        config: Arc<SessionConfig>,
        shared: Arc<SessionShared>,
        store: Arc<dyn StoreAdapter>,
    ) -> Self {
        Session {
            client_id,
            client_version: 100,
            config,
            shared,
            store,
            account_subs: std::collections::HashSet::new(),
            rate_window_start: Instant::now(),
            rate_count: 0,
        }
    }

    fn first_account(&self) -> Option<&str> {
        self.config.accounts.first().map(|s| s.as_str())
    }

    fn next_order_id(&self) -> i32 {
        self.config.next_order_id.fetch_add(1, Ordering::SeqCst) as i32
    }

    /// Consume the handshake off `read_half`, reply, and return once the
    /// session is Connected. A malformed prefix is a fatal handshake error.
    pub async fn handshake<R: AsyncReadExt + Unpin>(
        &mut self,
        read_half: &mut R,
    ) -> Result<(), ProtocolError> {
        let mut buf = [0u8; 128];
        let n = read_half
            .read(&mut buf)
            .await
            .map_err(|e| ProtocolError::HandshakeFailed(e.to_string()))?;
        if n == 0 {
            return Err(ProtocolError::HandshakeFailed("connection closed during handshake".into()));
        }
        let text = String::from_utf8_lossy(&buf[..n]);
        let body = text
            .strip_prefix("API\0")
            .ok_or_else(|| ProtocolError::HandshakeFailed("missing API prefix".into()))?;
        let version_token = body.split('\0').next().unwrap_or("");
        self.client_version = parse_handshake_version(version_token);

        let connection_time = Local::now().format("%Y%m%d %H:%M:%S").to_string();
        let reply = crate::core::codec::frame_handshake_reply(
            self.config.server_version,
            &connection_time,
        );
        self.shared
            .send_one(reply)
            .await
            .map_err(|e| ProtocolError::HandshakeFailed(e.to_string()))?;
        log::debug!(
            "client {} connected, client_version={}",
            self.client_id,
            self.client_version
        );
        Ok(())
    }

    /// Run the post-handshake ingress loop until EOF or a fatal socket error.
    pub async fn run_ingress<R: AsyncReadExt + Unpin>(&mut self, read_half: &mut R) {
        let mut ingress = IngressBuffer::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match read_half.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    log::debug!("client {} socket error: {err}", self.client_id);
                    break;
                }
            };
            ingress.extend(&buf[..n]);
            while let Some((kind, fields)) = ingress.next_frame() {
                if self.check_rate_limit() {
                    self.dispatch(kind, &fields).await;
                } else {
                    let _ = self
                        .shared
                        .send_one(builders::err_msg(
                            -1,
                            ErrorCode::MaxRateExceeded,
                            "Max message rate exceeded",
                        ))
                        .await;
                }
            }
        }
    }

    /// One-second sliding window; returns `true` if the frame may proceed.
    fn check_rate_limit(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.rate_window_start) > Duration::from_secs(1) {
            self.rate_window_start = now;
            self.rate_count = 0;
        }
        self.rate_count += 1;
        self.rate_count <= self.config.max_rate
    }

    async fn dispatch(&mut self, kind: i32, fields: &[String]) {
        let Some(message_id) = IncomingMessageId::from_i32(kind) else {
            let _ = self
                .shared
                .send_one(builders::err_msg(
                    -1,
                    ErrorCode::UnknownId,
                    &format!("Unknown message ID: {kind}"),
                ))
                .await;
            return;
        };

        let request = match parsers::parse_message(message_id, fields) {
            Ok(request) => request,
            Err(err) => {
                let _ = self
                    .shared
                    .send_one(builders::err_msg(-1, err.error_code(), &err.to_string()))
                    .await;
                return;
            }
        };

        if let Err(io_err) = self.handle(request).await {
            log::debug!("client {} write failed: {io_err}", self.client_id);
        }
    }

    async fn handle(&mut self, request: Request) -> std::io::Result<()> {
        match request {
            Request::StartApi { client_id, .. } => {
                if let Some(client_id) = client_id {
                    self.client_id = client_id as i64;
                }
                let next_id = self.next_order_id();
                self.shared
                    .send_burst(vec![
                        builders::next_valid_id(next_id),
                        builders::managed_accts(&self.config.accounts.join(",")),
                    ])
                    .await
            }
            Request::ReqIds => {
                let next_id = self.next_order_id();
                self.shared.send_one(builders::next_valid_id(next_id)).await
            }
            Request::ReqManagedAccts => {
                self.shared
                    .send_one(builders::managed_accts(&self.config.accounts.join(",")))
                    .await
            }
            Request::ReqAcctData {
                subscribe,
                account_code,
            } => self.handle_req_acct_data(subscribe, account_code).await,
            Request::ReqPositions => self.handle_req_positions().await,
            Request::ReqMktData {
                req_id,
                contract,
                generic_tick_list,
                snapshot,
                regulatory_snapshot,
            } => {
                self.handle_req_mkt_data(
                    req_id,
                    contract,
                    generic_tick_list,
                    snapshot,
                    regulatory_snapshot,
                )
                .await
            }
            Request::CancelMktData { req_id } => {
                self.shared.market_data_subs.write().await.remove(&req_id);
                Ok(())
            }
            Request::PlaceOrder { order_id, .. } => self.handle_place_order(order_id).await,
            Request::CancelOrder { order_id } => self.handle_cancel_order(order_id).await,
            Request::ReqOpenOrders => self.handle_req_open_orders().await,
            Request::ReqContractData { req_id, contract } => {
                self.handle_req_contract_data(req_id, contract).await
            }
            Request::ReqSecDefOptParams { req_id, .. } => {
                self.shared
                    .send_one(builders::security_definition_option_parameter_end(req_id))
                    .await
            }
            Request::ReqCurrentTime => {
                let now = chrono::Utc::now().timestamp();
                self.shared.send_one(builders::current_time(now)).await
            }
            Request::ReqExecutions { req_id } => {
                self.shared.send_one(builders::execution_data_end(req_id)).await
            }
            Request::ReqHistoricalData { req_id, .. } => {
                self.shared.send_one(builders::historical_data(req_id)).await
            }
        }
    }

    async fn handle_req_acct_data(
        &mut self,
        subscribe: bool,
        account_code: String,
    ) -> std::io::Result<()> {
        let account = if account_code.is_empty() {
            self.first_account().map(|s| s.to_string())
        } else {
            Some(account_code)
        };
        let Some(account) = account else {
            return self.shared.send_one(builders::acct_download_end("")).await;
        };

        if subscribe {
            self.account_subs.insert(account.clone());
            let mut frames = Vec::new();
            if let Some(summary) = self.store.get_account_summary(&account) {
                for key in ["NetLiquidation", "TotalCashValue", "UnrealizedPnL", "RealizedPnL"] {
                    frames.push(builders::acct_value_from_summary(&summary, &account, key));
                }
            }
            let now = Local::now().format("%Y%m%d %H:%M:%S").to_string();
            frames.push(builders::acct_update_time(&now));
            for position in self.store.get_positions(&account) {
                frames.push(builders::portfolio_value(&position, &account));
            }
            frames.push(builders::acct_download_end(&account));
            self.shared.send_burst(frames).await
        } else {
            self.account_subs.remove(&account);
            self.shared.send_one(builders::acct_download_end(&account)).await
        }
    }

    async fn handle_req_positions(&mut self) -> std::io::Result<()> {
        let account = self.first_account().map(|s| s.to_string());
        let mut frames = Vec::new();
        if let Some(account) = &account {
            for position in self.store.get_positions(account) {
                frames.push(builders::position_data(account, &position));
            }
        }
        frames.push(builders::position_end());
        self.shared.send_burst(frames).await
    }

    async fn handle_req_mkt_data(
        &mut self,
        req_id: i32,
        contract: Contract,
        generic_ticks: String,
        snapshot: bool,
        regulatory_snapshot: bool,
    ) -> std::io::Result<()> {
        let symbol = contract.symbol.clone();
        self.shared.market_data_subs.write().await.insert(
            req_id,
            SubscriptionDescriptor {
                contract,
                generic_ticks,
                snapshot,
                regulatory_snapshot,
            },
        );

        let (bid, ask, last) = (99.99, 100.01, 100.00);
        let (bid_size, ask_size, last_size, volume) = (100_i64, 100_i64, 50_i64, 1_000_000_i64);
        log::trace!("initial market data burst for {symbol} (req_id {req_id})");

        self.shared
            .send_burst(vec![
                builders::tick_price(req_id, tick_type::BID_PRICE, bid),
                builders::tick_price(req_id, tick_type::ASK_PRICE, ask),
                builders::tick_price(req_id, tick_type::LAST_PRICE, last),
                builders::tick_size(req_id, tick_type::BID_SIZE, bid_size),
                builders::tick_size(req_id, tick_type::ASK_SIZE, ask_size),
                builders::tick_size(req_id, tick_type::LAST_SIZE, last_size),
                builders::tick_size(req_id, tick_type::VOLUME, volume),
            ])
            .await
    }

    async fn handle_place_order(&mut self, order_id: i32) -> std::io::Result<()> {
        self.shared
            .send_one(builders::order_status(
                order_id,
                "PendingSubmit",
                0.0,
                0.0,
                0.0,
                order_id,
                0,
                self.client_id as i32,
            ))
            .await?;
        tokio::time::sleep(Duration::from_millis(ORDER_STATUS_DELAY_MS)).await;
        self.shared
            .send_one(builders::order_status(
                order_id,
                "Submitted",
                0.0,
                0.0,
                0.0,
                order_id,
                0,
                self.client_id as i32,
            ))
            .await
    }

    async fn handle_cancel_order(&mut self, order_id: i32) -> std::io::Result<()> {
        self.shared
            .send_one(builders::order_status(
                order_id,
                "PendingCancel",
                0.0,
                0.0,
                0.0,
                order_id,
                0,
                self.client_id as i32,
            ))
            .await?;
        tokio::time::sleep(Duration::from_millis(ORDER_STATUS_DELAY_MS)).await;
        self.shared
            .send_one(builders::order_status(
                order_id,
                "Cancelled",
                0.0,
                0.0,
                0.0,
                order_id,
                0,
                self.client_id as i32,
            ))
            .await
    }

    async fn handle_req_open_orders(&mut self) -> std::io::Result<()> {
        let mut frames = Vec::new();
        if let Some(account) = self.first_account() {
            for order in self.store.get_open_orders(account) {
                frames.push(builders::open_order(&order, self.client_id as i32));
            }
        }
        frames.push(builders::open_order_end());
        self.shared.send_burst(frames).await
    }

    async fn handle_req_contract_data(
        &mut self,
        req_id: i32,
        contract: Contract,
    ) -> std::io::Result<()> {
        let mut frames = Vec::new();
        if let Some(found) = self
            .store
            .get_contract_by_symbol(&contract.symbol, &contract.sec_type)
        {
            frames.push(builders::contract_data(req_id, &found));
        }
        frames.push(builders::contract_data_end(req_id));
        self.shared.send_burst(frames).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_version_with_v_prefix() {
        assert_eq!(parse_handshake_version("v176"), 176);
    }

    #[test]
    fn handshake_version_range_takes_max() {
        assert_eq!(parse_handshake_version("100..176"), 176);
    }

    #[test]
    fn unparseable_version_defaults_to_100() {
        assert_eq!(parse_handshake_version("not-a-number"), 100);
    }

    #[test]
    fn bare_integer_version() {
        assert_eq!(parse_handshake_version("151"), 151);
    }
}
