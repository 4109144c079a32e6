//! Example: TCP echo server with Corio
//!
//! Run it, then `cargo run --example client` in another terminal.

use corio::net::{PollStatus, ServerOptions, Socket, TcpServer};
use corio::Handle;
use std::time::Duration;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> corio::Result<()> {
    let server = TcpServer::new(ServerOptions::default().on_connection(handle_client))?;
    println!("Echo server listening on {}", server.local_addr());

    // The server runs on its own threads; keep the process alive.
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}

// Echo handler: reads data and writes it back until the peer goes away
async fn handle_client(_handle: Handle, socket: Socket) {
    if let Ok(peer) = socket.peer_addr() {
        println!("Accepted connection from {peer}");
    }

    let mut buf = [0u8; 1024];
    loop {
        let (status, n) = socket.recv(&mut buf, IDLE_TIMEOUT).await;
        if status != PollStatus::Event {
            println!("Connection ended: {status}");
            break;
        }

        let mut sent = 0;
        while sent < n {
            let (status, written) = socket.send(&buf[sent..n], IDLE_TIMEOUT).await;
            if status != PollStatus::Event {
                return;
            }
            sent += written;
        }
    }
}
