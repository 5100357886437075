//! Process entry point: parse a handful of CLI flags, load configuration,
//! seed the in-memory store, and run the listener until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use ibsim::config::Config;
use ibsim::core::listener::Listener;
use ibsim::store::{AccountSeed, MemoryStore};

struct Args {
    config_path: PathBuf,
    env: Option<String>,
    host: Option<String>,
    port: Option<u16>,
}

fn parse_args() -> Args {
    let mut config_path = PathBuf::from("config.yaml");
    let mut env = None;
    let mut host = None;
    let mut port = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(value) = args.next() {
                    config_path = PathBuf::from(value);
                }
            }
            "--env" => env = args.next(),
            "--host" => host = args.next(),
            "--port" => port = args.next().and_then(|v| v.parse().ok()),
            other => log::warn!("ignoring unrecognized argument: {other}"),
        }
    }

    Args {
        config_path,
        env,
        host,
        port,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args();

    let mut config = Config::load(&args.config_path, args.env.as_deref())
        .with_context(|| "loading configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let seeds: Vec<AccountSeed> = config
        .authentication
        .accounts
        .iter()
        .map(|account| AccountSeed {
            account_id: account.account_id.clone(),
            initial_balance: account.initial_balance,
            base_currency: account.base_currency.clone(),
        })
        .collect();
    let store = Arc::new(MemoryStore::new(&seeds, &config.market.symbols));

    let accounts: Vec<String> = config
        .authentication
        .accounts
        .iter()
        .map(|a| a.account_id.clone())
        .collect();

    let listener = Listener::new(
        config.server.max_clients,
        config.protocol.version,
        config.protocol.message_rate_limit,
        accounts,
        store,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    listener.serve(&addr).await.with_context(|| format!("serving on {addr}"))
}
