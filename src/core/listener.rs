//! Accept loop, client registry, max-client cap, and broadcast fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::session::{Session, SessionConfig, SessionShared, TickSet};
use crate::store::StoreAdapter;

struct ClientEntry {
    shared: Arc<SessionShared>,
    task: JoinHandle<()>,
}

/// Owns the listening socket and the table of connected sessions.
pub struct Listener {
    registry: Arc<Mutex<HashMap<i64, ClientEntry>>>,
    next_client_id: Arc<AtomicI64>,
    next_order_id: Arc<AtomicI64>,
    max_clients: usize,
    server_version: i32,
    max_rate: u32,
    accounts: Vec<String>,
    store: Arc<dyn StoreAdapter>,
}

impl Listener {
    pub fn new(
        max_clients: usize,
        server_version: i32,
        max_rate: u32,
        accounts: Vec<String>,
        store: Arc<dyn StoreAdapter>,
    ) -> Self {
        Listener {
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_client_id: Arc::new(AtomicI64::new(1)),
            next_order_id: Arc::new(AtomicI64::new(1)),
            max_clients,
            server_version,
            max_rate,
            accounts,
            store,
        }
    }

    /// Bind `addr` and run the accept loop until cancelled. Each accepted
    /// connection gets its own session task; accept-level OS errors are
    /// logged and retried, never fatal to the loop.
    pub async fn serve(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("listening on {addr}");
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    self.accept_one(stream, peer.to_string()).await;
                }
                Err(err) => {
                    log::warn!("accept error: {err}");
                }
            }
        }
    }

    async fn accept_one(&self, stream: TcpStream, peer: String) {
        let mut registry = self.registry.lock().await;
        if registry.len() >= self.max_clients {
            log::warn!("rejecting {peer}: at max_clients ({})", self.max_clients);
            drop(registry);
            drop(stream);
            return;
        }
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(SessionShared::new(write_half));
        let config = Arc::new(SessionConfig {
            server_version: self.server_version,
            max_rate: self.max_rate,
            accounts: self.accounts.clone(),
            next_order_id: self.next_order_id.clone(),
        });
        let store = self.store.clone();
        let registry_handle = self.registry.clone();
        let task_shared = shared.clone();

        let task = tokio::spawn(async move {
            let mut session = Session::new(client_id, config, task_shared.clone(), store);
            let mut read_half = read_half;
            if let Err(err) = session.handshake(&mut read_half).await {
                log::debug!("client {client_id} ({peer}) handshake failed: {err}");
            } else {
                session.run_ingress(&mut read_half).await;
            }
            registry_handle.lock().await.remove(&client_id);
            log::debug!("client {client_id} ({peer}) disconnected");
        });

        registry.insert(client_id, ClientEntry { shared, task });
    }

    /// Deliver `ticks` for `symbol` to every registered session subscribed
    /// to it, without waiting for any one delivery to complete.
    pub async fn broadcast(&self, symbol: &str, ticks: TickSet) {
        let targets: Vec<Arc<SessionShared>> = {
            let registry = self.registry.lock().await;
            let mut targets = Vec::new();
            for entry in registry.values() {
                if entry.shared.is_subscribed_to_symbol(symbol).await {
                    targets.push(entry.shared.clone());
                }
            }
            targets
        };
        for target in targets {
            let symbol = symbol.to_string();
            tokio::spawn(async move {
                target.send_market_data(&symbol, ticks).await;
            });
        }
    }

    pub fn next_order_id(&self) -> i32 {
        self.next_order_id.fetch_add(1, Ordering::SeqCst) as i32
    }

    /// Cancel every session task and drop the registry. No graceful drain.
    pub async fn stop(&self) {
        let mut registry = self.registry.lock().await;
        for (_, entry) in registry.drain() {
            entry.task.abort();
        }
    }
}
