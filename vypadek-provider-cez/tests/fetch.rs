//! Lookups against a local HTTP server speaking just enough HTTP/1.1.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use vypadek_core::{
    AddressQuery, FetchError, HttpMethod, OutageAggregator, OutageConfig, OutagePort,
    RequestTemplate, SignalAdapter,
};
use vypadek_provider_cez::{self as cez, CezOutagePort, build_client};

const OUTAGE: &str = r#"{"outages":[{"opened_at":"2024-01-01T10:00","fix_expected_at":"2024-01-01T14:00","id":1}],"outages_in_town":[]}"#;

type Responder = fn(&str) -> (&'static str, &'static str);

/// Serve every connection with `respond(request_line)` and report raw requests on the channel.
async fn spawn_server(respond: Responder) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _peer)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                handle(socket, respond, tx).await;
            });
        }
    });

    (addr, rx)
}

async fn handle(mut socket: TcpStream, respond: Responder, tx: mpsc::UnboundedSender<String>) {
    let request = read_request(&mut socket).await;
    let request_line = request.lines().next().unwrap_or_default().to_owned();
    let (status, body) = respond(&request_line);

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket
        .write_all(response.as_bytes())
        .await
        .expect("write response");
    socket.shutdown().await.ok();
    tx.send(request).ok();
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let read = socket.read(&mut chunk).await.expect("read request");
        if read == 0 {
            break;
        }
        buf.extend_from_slice(chunk.get(..read).expect("read within chunk"));

        let text = String::from_utf8_lossy(&buf).into_owned();
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let length = head
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|value| value.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            if body.len() >= length {
                return text;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn local_template(addr: SocketAddr) -> RequestTemplate {
    RequestTemplate {
        resource: format!("http://{addr}/inspectaddress/%s"),
        timeout: 2,
        ..RequestTemplate::default()
    }
}

/// Value of the first header called `name`, matched case-insensitively.
fn header(request: &str, name: &str) -> Option<String> {
    request
        .lines()
        .skip(1)
        .take_while(|line| !line.is_empty())
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name)
                .then(|| value.trim().to_owned())
        })
}

fn port_for(template: &RequestTemplate, street: &str) -> CezOutagePort {
    let client = build_client(template).expect("client builds");
    CezOutagePort::new(client, template, AddressQuery::new(street))
}

#[tokio::test]
async fn sends_templated_request_with_default_body() {
    let (addr, mut requests) = spawn_server(|_| ("200 OK", OUTAGE)).await;
    let template = local_template(addr);
    let port = port_for(&template, "Main St");

    let payload = port.fetch().await.expect("lookup succeeds");

    assert_eq!(payload.outages.len(), 1, "outage decoded");
    let request = requests.recv().await.expect("request captured");
    assert!(
        request.starts_with("GET /inspectaddress/Main%20St HTTP/1.1"),
        "street interpolated into the path: {request}"
    );
    assert!(
        request.ends_with(r#"{"ulice":"","mesto":"Statenice","psc":""}"#),
        "default body sent: {request}"
    );
    assert!(
        port.describe().starts_with("GET http://"),
        "request described for logs"
    );
}

#[tokio::test]
async fn configured_method_is_sent() {
    let (addr, mut requests) = spawn_server(|_| ("200 OK", OUTAGE)).await;
    let template = RequestTemplate {
        method: HttpMethod::Post,
        ..local_template(addr)
    };
    let port = port_for(&template, "Main St");

    port.fetch().await.expect("lookup succeeds");

    let request = requests.recv().await.expect("request captured");
    assert!(
        request.starts_with("POST /inspectaddress/Main%20St HTTP/1.1"),
        "method in the request line: {request}"
    );
    assert_eq!(
        header(&request, "content-type").as_deref(),
        Some("application/json"),
        "json body is labelled"
    );
    assert!(port.describe().starts_with("POST http://"), "method described");
}

#[tokio::test]
async fn empty_payload_sends_no_body() {
    let (addr, mut requests) = spawn_server(|_| ("200 OK", OUTAGE)).await;
    let template = RequestTemplate {
        payload: String::new(),
        ..local_template(addr)
    };

    port_for(&template, "Main St")
        .fetch()
        .await
        .expect("lookup succeeds");

    let request = requests.recv().await.expect("request captured");
    assert_eq!(header(&request, "content-type"), None, "no content type: {request}");
    assert!(
        header(&request, "content-length").is_none_or(|length| length == "0"),
        "no body length: {request}"
    );
    assert!(request.ends_with("\r\n\r\n"), "nothing after the headers: {request}");
}

#[tokio::test]
async fn credentials_use_basic_auth() {
    let (addr, mut requests) = spawn_server(|_| ("200 OK", OUTAGE)).await;
    let template = RequestTemplate {
        username: Some("user".to_owned()),
        password: Some("secret".to_owned()),
        ..local_template(addr)
    };

    port_for(&template, "Main St")
        .fetch()
        .await
        .expect("lookup succeeds");

    let request = requests.recv().await.expect("request captured");
    assert_eq!(
        header(&request, "authorization").as_deref(),
        Some("Basic dXNlcjpzZWNyZXQ="),
        "user:secret encoded: {request}"
    );
}

#[tokio::test]
async fn no_credentials_no_authorization() {
    let (addr, mut requests) = spawn_server(|_| ("200 OK", OUTAGE)).await;
    let template = local_template(addr);

    port_for(&template, "Main St")
        .fetch()
        .await
        .expect("lookup succeeds");

    let request = requests.recv().await.expect("request captured");
    assert_eq!(header(&request, "authorization"), None, "anonymous lookup");
}

#[tokio::test]
async fn error_status_with_json_body_still_decodes() {
    let (addr, _requests) =
        spawn_server(|_| ("503 Service Unavailable", r#"{"outages":null}"#)).await;
    let template = local_template(addr);

    let payload = port_for(&template, "Main St")
        .fetch()
        .await
        .expect("json body decodes");

    assert!(payload.outages.is_empty(), "null list is empty");
}

#[tokio::test]
async fn html_body_is_malformed() {
    let (addr, _requests) =
        spawn_server(|_| ("502 Bad Gateway", "<html>bad gateway</html>")).await;
    let template = local_template(addr);

    let result = port_for(&template, "Main St").fetch().await;

    assert!(
        matches!(result, Err(FetchError::Malformed(_))),
        "non-json body is a malformed response"
    );
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let template = local_template(addr);

    let result = port_for(&template, "Main St").fetch().await;

    assert!(
        matches!(result, Err(FetchError::Network(_))),
        "refused connection is a transport failure"
    );
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _peer)) = listener.accept().await {
            held.push(socket);
        }
    });
    let template = RequestTemplate {
        timeout: 1,
        ..local_template(addr)
    };

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        port_for(&template, "Main St").fetch(),
    )
    .await
    .expect("client timeout fires first");

    assert!(
        matches!(result, Err(FetchError::Network(ref err)) if err.is_timeout()),
        "timeout is a transport failure"
    );
}

#[tokio::test]
async fn pool_from_config_survives_a_failing_address() {
    let (addr, _requests) = spawn_server(|request_line| {
        if request_line.contains("/Main%20St") {
            ("200 OK", OUTAGE)
        } else {
            ("500 Internal Server Error", "Internal Server Error")
        }
    })
    .await;
    let config = OutageConfig::from_toml_str(&format!(
        r#"
        name = "Home"
        streets = ["Side St ", " Main St"]
        refresh_rate = 300

        [request]
        resource = "http://{addr}/inspectaddress/%s"
        method = "POST"
        timeout = 2
        "#
    ))
    .expect("config parses");
    let client = build_client(&config.request).expect("client builds");
    let pool = cez::pool(&client, &config).expect("pool builds");
    let adapter = SignalAdapter::for_pool(config.name.clone(), &pool);
    let aggregator = Arc::new(OutageAggregator::new(pool, config.refresh_interval()));

    let signal = adapter.update(&aggregator).await;

    assert_eq!(
        signal.unique_id, "Side St,Main St",
        "identifier from trimmed streets"
    );
    assert!(signal.is_on, "working address reports its outage");
    assert_eq!(signal.attributes.times.len(), 1, "one window");
    let last_values: Vec<_> = aggregator
        .pool()
        .fetchers()
        .iter()
        .map(|fetcher| fetcher.last_value().is_some())
        .collect();
    assert_eq!(last_values, [false, true], "failing address is unknown");
}
