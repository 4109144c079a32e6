use corio::net::{
    Address, ClientOptions, ClientState, ConnectStatus, Domain, Hostname, PollOp, PollStatus,
    Resolver, Socket, TcpClient, connect, poll,
};
use corio::task;
use corio::time::{sleep, timeout};
use corio::Error;
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Scheduling slack allowed on top of a deadline.
const SLACK: Duration = Duration::from_millis(500);

fn local_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A listener whose accept queue is full, so the kernel drops further SYNs
/// and handshakes towards it stall.
fn saturated_listener() -> (Socket, SocketAddr, Vec<TcpStream>) {
    let listener = Socket::new(Domain::Ipv4).unwrap();
    listener
        .bind(&SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .unwrap();
    listener.listen(0).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut queued = Vec::new();
    while let Ok(stream) = TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
        queued.push(stream);
        assert!(queued.len() < 16, "accept queue never filled up");
    }

    (listener, addr, queued)
}

fn options(port: u16) -> ClientOptions {
    ClientOptions {
        address: Address::Ip(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        port,
        ..ClientOptions::default()
    }
}

#[test]
fn test_hostname_without_resolver_is_rejected() {
    let options = ClientOptions {
        address: Address::from(Hostname::new("localhost")),
        ..ClientOptions::default()
    };

    let err = TcpClient::new(options).unwrap_err();
    assert!(matches!(err, Error::MissingResolver { ref hostname } if hostname.as_str() == "localhost"));
}

#[test]
fn test_new_client_is_unconnected() {
    let client = TcpClient::new(ClientOptions::default()).unwrap();

    assert_eq!(client.state(), ClientState::Unconnected);
    assert_eq!(client.status(), None);
    assert_eq!(client.options().port, 8080);
}

#[corio::test]
async fn test_connect_status_is_cached() {
    let (listener, port) = local_listener();
    listener.set_nonblocking(true).unwrap();

    let mut client = TcpClient::new(options(port)).unwrap();

    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::Connected);
    assert_eq!(client.state(), ClientState::Connected);
    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::Connected);

    let _first = listener.accept().unwrap();
    let second = listener.accept();
    assert_eq!(second.unwrap_err().kind(), io::ErrorKind::WouldBlock);
}

#[corio::test]
async fn test_connect_refused() {
    let (listener, port) = local_listener();
    drop(listener);

    let mut client = TcpClient::new(options(port)).unwrap();

    let start = Instant::now();
    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::Refused);
    assert!(start.elapsed() < SLACK);
    assert_eq!(client.state(), ClientState::Failed(ConnectStatus::Refused));

    // A failed outcome is cached as well.
    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::Refused);
}

#[corio::test]
async fn test_connect_gives_up_at_the_deadline() {
    let (_listener, addr, _queued) = saturated_listener();
    let socket = Socket::new(Domain::Ipv4).unwrap();
    let deadline = Duration::from_millis(50);

    let start = Instant::now();
    assert_eq!(connect(&socket, addr, deadline).await, ConnectStatus::Timeout);

    let elapsed = start.elapsed();
    assert!(elapsed >= deadline);
    assert!(elapsed < deadline + SLACK, "connect took {elapsed:?}");
}

#[corio::test(worker_threads = 2)]
async fn test_displaced_connect_is_not_reported_connected() {
    let (_listener, addr, _queued) = saturated_listener();
    let socket = Arc::new(Socket::new(Domain::Ipv4).unwrap());

    let connecting = {
        let socket = socket.clone();
        task::spawn(async move { connect(&socket, addr, Duration::from_secs(3)).await })
    };

    sleep(Duration::from_millis(20)).await;

    // A second write waiter takes over the registration of the handshake.
    let status = poll(&*socket, PollOp::Write, Duration::from_millis(50)).await;
    assert_eq!(status, PollStatus::Timeout);

    assert_eq!(connecting.await, ConnectStatus::Error);
    assert!(socket.peer_addr().is_err());
}

#[corio::test]
async fn test_abandoned_connect_resumes_same_handshake() {
    let (_listener, addr, _queued) = saturated_listener();
    let resolver = Resolver::new(Duration::from_secs(5));

    let mut client = TcpClient::new(ClientOptions {
        address: Address::from(Hostname::new("localhost")),
        port: addr.port(),
        domain: Domain::Ipv4,
        resolver: Some(resolver.clone()),
    })
    .unwrap();

    let abandoned = timeout(Duration::from_millis(200), client.connect(Duration::ZERO)).await;
    assert!(abandoned.is_err());
    assert_eq!(client.state(), ClientState::Connecting);

    let status = client.connect(Duration::from_millis(100)).await;
    assert_eq!(status, ConnectStatus::Timeout);
    assert_eq!(client.state(), ClientState::Failed(ConnectStatus::Timeout));
    assert_eq!(resolver.lookups(), 1);
}

#[corio::test]
async fn test_connect_rejects_port_zero() {
    let mut client = TcpClient::new(options(0)).unwrap();

    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::InvalidPort);
}

#[corio::test]
async fn test_connect_rejects_family_mismatch() {
    let (_listener, port) = local_listener();
    let mut client = TcpClient::new(ClientOptions {
        domain: Domain::Ipv6,
        ..options(port)
    })
    .unwrap();

    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::InvalidIpAddress);
}

#[corio::test]
async fn test_connect_rejects_unspecified_address() {
    let (_listener, port) = local_listener();
    let mut client = TcpClient::new(ClientOptions {
        address: Address::Ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        ..options(port)
    })
    .unwrap();

    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::InvalidIpAddress);
}

#[corio::test]
async fn test_transfer_requires_connection() {
    let client = TcpClient::new(options(1)).unwrap();

    let mut buffer = [0u8; 4];
    assert_eq!(client.send(b"ping", TIMEOUT).await, (PollStatus::Error, 0));
    assert_eq!(client.recv(&mut buffer, TIMEOUT).await, (PollStatus::Error, 0));
}

#[corio::test]
async fn test_hostname_is_resolved_once() {
    let (listener, port) = local_listener();
    let resolver = Resolver::new(Duration::from_secs(5));

    let mut client = TcpClient::new(ClientOptions {
        address: Address::from(Hostname::new("localhost")),
        port,
        domain: Domain::Ipv4,
        resolver: Some(resolver.clone()),
    })
    .unwrap();

    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::Connected);
    assert_eq!(client.connect(TIMEOUT).await, ConnectStatus::Connected);
    assert_eq!(resolver.lookups(), 1);

    drop(listener);
}

#[corio::test]
async fn test_unknown_hostname_fails_to_resolve() {
    let resolver = Resolver::default();

    let mut client = TcpClient::new(ClientOptions {
        address: Address::from(Hostname::new("corio-test.invalid")),
        resolver: Some(resolver),
        ..ClientOptions::default()
    })
    .unwrap();

    let status = client.connect(TIMEOUT).await;
    assert!(
        matches!(status, ConnectStatus::ResolveFailed | ConnectStatus::Timeout),
        "unexpected status {status}"
    );
}

#[corio::test(worker_threads = 2)]
async fn test_send_and_receive() {
    let (listener, port) = local_listener();

    let peer = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buffer = [0u8; 4];
        stream.read_exact(&mut buffer).unwrap();
        stream.write_all(b"pong").unwrap();
        buffer
    });

    let mut client = TcpClient::new(options(port)).unwrap();
    assert!(client.connect(TIMEOUT).await.is_connected());

    assert_eq!(client.send(b"ping", TIMEOUT).await, (PollStatus::Event, 4));

    let mut buffer = [0u8; 4];
    let mut received = 0;
    while received < buffer.len() {
        let (status, n) = client.recv(&mut buffer[received..], TIMEOUT).await;
        assert_eq!(status, PollStatus::Event);
        received += n;
    }
    assert_eq!(&buffer, b"pong");

    assert_eq!(&peer.join().unwrap(), b"ping");

    // The peer's stream is closed once its thread returned.
    let (status, n) = client.recv(&mut buffer, TIMEOUT).await;
    assert_eq!((status, n), (PollStatus::Closed, 0));
}

#[corio::test]
async fn test_recv_times_out() {
    let (listener, port) = local_listener();

    let mut client = TcpClient::new(options(port)).unwrap();
    assert!(client.connect(TIMEOUT).await.is_connected());

    let mut buffer = [0u8; 4];
    let (status, n) = client.recv(&mut buffer, Duration::from_millis(20)).await;
    assert_eq!((status, n), (PollStatus::Timeout, 0));

    drop(listener);
}
