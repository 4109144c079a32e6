//! Example: TCP client with Corio
//!
//! Talks to the `echo_server` example on localhost:8080.

use corio::net::{Address, ClientOptions, Hostname, PollStatus, Resolver, TcpClient};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

#[corio::main]
async fn main() {
    let options = ClientOptions {
        address: Address::from(Hostname::new("localhost")),
        resolver: Some(Resolver::default()),
        ..ClientOptions::default()
    };

    let mut client = match TcpClient::new(options) {
        Ok(client) => client,
        Err(e) => {
            println!("Invalid client options: {e}");
            return;
        }
    };

    let status = client.connect(TIMEOUT).await;
    if !status.is_connected() {
        println!("Failed to connect: {status}");
        return;
    }

    let msg = b"Hello from client!";
    let (status, sent) = client.send(msg, TIMEOUT).await;
    println!("Sent {sent} bytes ({status}): {}", String::from_utf8_lossy(msg));

    let mut buf = [0u8; 1024];
    match client.recv(&mut buf, TIMEOUT).await {
        (PollStatus::Event, n) => println!("Received: {}", String::from_utf8_lossy(&buf[..n])),
        (status, _) => println!("No reply: {status}"),
    }
}
