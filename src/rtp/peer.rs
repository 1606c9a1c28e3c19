use std::net::SocketAddr;

/// A remote endpoint known by its SSRC and transport address.
///
/// Peers are shared as `Arc<RtpPeer>`; the strong count is the peer's
/// reference count, so unlisting a peer from a directory never destroys it
/// while some other owner still holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPeer {
    ssrc: u32,
    address: SocketAddr,
}

impl RtpPeer {
    pub fn new(ssrc: u32, address: SocketAddr) -> Self {
        RtpPeer { ssrc, address }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}
