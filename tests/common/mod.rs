use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

pub async fn bind_socket() -> (Arc<UdpSocket>, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("Failed to bind UDP socket");
    let addr = socket.local_addr().expect("Socket has no local address");
    (Arc::new(socket), addr)
}
