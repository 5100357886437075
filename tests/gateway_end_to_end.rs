//! End-to-end TCP scenarios against a real `Listener` bound to an ephemeral
//! port. Each test opens its own loopback connection(s).

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use ibsim::core::listener::Listener;
use ibsim::core::session::TickSet;
use ibsim::store::{AccountSeed, MemoryStore};

async fn spawn_listener(max_clients: usize) -> (Arc<Listener>, std::net::SocketAddr) {
    let store = Arc::new(MemoryStore::new(
        &[AccountSeed {
            account_id: "DU000001".to_string(),
            initial_balance: 1_000_000.0,
            base_currency: "USD".to_string(),
        }],
        &["NVDA".to_string()],
    ));
    let listener = Arc::new(Listener::new(
        max_clients,
        176,
        50,
        vec!["DU000001".to_string()],
        store,
    ));

    let bind = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = bind.local_addr().unwrap();
    drop(bind);

    let serve_listener = listener.clone();
    let addr_string = addr.to_string();
    tokio::spawn(async move {
        let _ = serve_listener.serve(&addr_string).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (listener, addr)
}

fn frame_fields(kind: i32, fields: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(kind.to_string().as_bytes());
    body.push(0);
    for field in fields {
        body.extend_from_slice(field.as_bytes());
        body.push(0);
    }
    let mut out = Vec::new();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

async fn read_frame(stream: &mut TcpStream) -> (i32, Vec<String>) {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.unwrap();
    let mut fields: Vec<String> = body
        .split(|&b| b == 0)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    if fields.last().map(|s| s.is_empty()).unwrap_or(false) {
        fields.pop();
    }
    let kind: i32 = fields.remove(0).parse().unwrap_or(-1);
    (kind, fields)
}

async fn handshake(stream: &mut TcpStream) -> (i32, String) {
    stream.write_all(b"API\0v176\0").await.unwrap();
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.unwrap();
    let mut fields: Vec<String> = body
        .split(|&b| b == 0)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    if fields.last().map(|s| s.is_empty()).unwrap_or(false) {
        fields.pop();
    }
    (fields[0].parse().unwrap(), fields[1].clone())
}

#[tokio::test]
async fn s1_handshake_and_start_api() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let (server_version, _connection_time) = handshake(&mut stream).await;
    assert_eq!(server_version, 176);

    stream
        .write_all(&frame_fields(71, &["7", ""]))
        .await
        .unwrap();

    let (kind, _fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 9); // NEXT_VALID_ID
    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 15); // MANAGED_ACCTS
    assert_eq!(fields[0], "DU000001");
}

#[tokio::test]
async fn s2_account_subscribe_burst() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    handshake(&mut stream).await;

    stream
        .write_all(&frame_fields(6, &["1", ""]))
        .await
        .unwrap();

    let mut keys = Vec::new();
    for _ in 0..4 {
        let (kind, fields) = read_frame(&mut stream).await;
        assert_eq!(kind, 6); // ACCT_VALUE
        keys.push(fields[0].clone());
    }
    assert_eq!(
        keys,
        vec!["NetLiquidation", "TotalCashValue", "UnrealizedPnL", "RealizedPnL"]
    );

    let (kind, _) = read_frame(&mut stream).await;
    assert_eq!(kind, 8); // ACCT_UPDATE_TIME

    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 54); // ACCT_DOWNLOAD_END
    assert_eq!(fields[0], "DU000001");
}

#[tokio::test]
async fn s3_market_data_initial_burst() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    handshake(&mut stream).await;

    stream
        .write_all(&frame_fields(
            1,
            &["100", "", "NVDA", "STK", "", "", "", "", "", "", "", "", "", "0", "0"],
        ))
        .await
        .unwrap();

    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 1);
    assert_eq!(fields[1], "1"); // bid
    let (_, fields) = read_frame(&mut stream).await;
    assert_eq!(fields[1], "2"); // ask
    let (_, fields) = read_frame(&mut stream).await;
    assert_eq!(fields[1], "4"); // last

    for expected_tick in ["0", "3", "5", "8"] {
        let (kind, fields) = read_frame(&mut stream).await;
        assert_eq!(kind, 2);
        assert_eq!(fields[1], expected_tick);
    }
}

#[tokio::test]
async fn s4_place_order_transitions_through_submitted() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    handshake(&mut stream).await;

    stream
        .write_all(&frame_fields(
            3,
            &[
                "42", "", "NVDA", "STK", "", "", "", "", "", "", "", "", "", "", "BUY", "10",
                "MKT", "", "", "", "", "", "", "", "",
            ],
        ))
        .await
        .unwrap();

    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 3);
    assert_eq!(fields[0], "42");
    assert_eq!(fields[1], "PendingSubmit");

    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 3);
    assert_eq!(fields[1], "Submitted");
}

#[tokio::test]
async fn s5_unknown_kind_emits_one_error() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    handshake(&mut stream).await;

    stream.write_all(&frame_fields(9999, &[])).await.unwrap();

    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 4); // ERR_MSG
    assert_eq!(fields[0], "-1");
    assert_eq!(fields[1], "504");
    assert!(fields[2].contains("9999"));

    // Session stays open: REQ_CURRENT_TIME should still get a reply.
    stream.write_all(&frame_fields(49, &[])).await.unwrap();
    let (kind, _) = read_frame(&mut stream).await;
    assert_eq!(kind, 49);
}

#[tokio::test]
async fn s6_current_time() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    handshake(&mut stream).await;

    let before = chrono::Utc::now().timestamp();
    stream.write_all(&frame_fields(49, &[])).await.unwrap();
    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 49);
    let t: i64 = fields[0].parse().unwrap();
    assert!(t >= before);
}

#[tokio::test]
async fn max_clients_cap_closes_extra_connection_without_bytes() {
    let (_listener, addr) = spawn_listener(1).await;
    let mut first = TcpStream::connect(addr).await.unwrap();
    handshake(&mut first).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 8];
    let result = tokio::time::timeout(Duration::from_millis(300), second.read(&mut buf)).await;
    match result {
        Ok(Ok(0)) => {} // closed immediately
        Err(_) => {}    // no bytes arrived before timeout
        Ok(Ok(n)) => panic!("expected no bytes for the rejected client, got {n}"),
        Ok(Err(_)) => {}
    }
}

#[tokio::test]
async fn subscription_fan_out_and_cancel() {
    let (listener, addr) = spawn_listener(32).await;

    let mut a = TcpStream::connect(addr).await.unwrap();
    handshake(&mut a).await;
    let mut b = TcpStream::connect(addr).await.unwrap();
    handshake(&mut b).await;
    let mut c = TcpStream::connect(addr).await.unwrap();
    handshake(&mut c).await;

    a.write_all(&frame_fields(
        1,
        &["10", "", "NVDA", "STK", "", "", "", "", "", "", "", "", "", "0", "0"],
    ))
    .await
    .unwrap();
    for _ in 0..7 {
        read_frame(&mut a).await;
    }

    b.write_all(&frame_fields(
        1,
        &["20", "", "NVDA", "STK", "", "", "", "", "", "", "", "", "", "0", "0"],
    ))
    .await
    .unwrap();
    for _ in 0..7 {
        read_frame(&mut b).await;
    }

    c.write_all(&frame_fields(
        1,
        &["30", "", "AAPL", "STK", "", "", "", "", "", "", "", "", "", "0", "0"],
    ))
    .await
    .unwrap();
    for _ in 0..7 {
        read_frame(&mut c).await;
    }

    listener
        .broadcast(
            "NVDA",
            TickSet {
                bid: Some(1.00),
                ..Default::default()
            },
        )
        .await;

    let (kind, fields) = read_frame(&mut a).await;
    assert_eq!(kind, 1);
    assert_eq!(fields[0], "10");
    assert_eq!(fields[2], "1");

    let (kind, fields) = read_frame(&mut b).await;
    assert_eq!(kind, 1);
    assert_eq!(fields[0], "20");

    let no_frame_for_c = tokio::time::timeout(Duration::from_millis(200), async {
        let mut buf = [0u8; 8];
        c.read(&mut buf).await
    })
    .await;
    assert!(no_frame_for_c.is_err(), "C should not receive NVDA ticks");

    a.write_all(&frame_fields(2, &["10"])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    listener
        .broadcast(
            "NVDA",
            TickSet {
                bid: Some(2.00),
                ..Default::default()
            },
        )
        .await;

    let (kind, fields) = read_frame(&mut b).await;
    assert_eq!(kind, 1);
    assert_eq!(fields[0], "20");

    let no_frame_for_a = tokio::time::timeout(Duration::from_millis(200), async {
        let mut buf = [0u8; 8];
        a.read(&mut buf).await
    })
    .await;
    assert!(no_frame_for_a.is_err(), "A cancelled its subscription");
}

#[tokio::test]
async fn rate_limiter_drops_excess_and_resets() {
    let (_listener, addr) = spawn_listener(32).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    handshake(&mut stream).await;

    for _ in 0..50 {
        stream.write_all(&frame_fields(49, &[])).await.unwrap();
        read_frame(&mut stream).await;
    }

    stream.write_all(&frame_fields(49, &[])).await.unwrap();
    let (kind, fields) = read_frame(&mut stream).await;
    assert_eq!(kind, 4); // ERR_MSG
    assert_eq!(fields[1], "501"); // MAX_RATE_EXCEEDED

    tokio::time::sleep(Duration::from_millis(1050)).await;
    stream.write_all(&frame_fields(49, &[])).await.unwrap();
    let (kind, _) = read_frame(&mut stream).await;
    assert_eq!(kind, 49);
}
