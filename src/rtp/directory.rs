use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rtp::peer::RtpPeer;

/// Insertion-ordered set of peers, unique by SSRC.
///
/// The directory holds one reference to each listed peer; removing a peer
/// unlinks it without destroying it.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: Vec<Arc<RtpPeer>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists a peer. Fails with [`Error::DuplicateSsrc`] when a peer with
    /// the same SSRC is already listed, so lookups stay single-valued.
    pub fn add(&mut self, peer: Arc<RtpPeer>) -> Result<()> {
        if self.peers.iter().any(|p| p.ssrc() == peer.ssrc()) {
            return Err(Error::DuplicateSsrc(peer.ssrc()));
        }
        self.peers.push(peer);
        Ok(())
    }

    /// Unlinks the peer with the given SSRC and returns it, still alive.
    pub fn remove(&mut self, ssrc: u32) -> Result<Arc<RtpPeer>> {
        match self.peers.iter().position(|p| p.ssrc() == ssrc) {
            Some(index) => Ok(self.peers.remove(index)),
            None => Err(Error::NotFound),
        }
    }

    pub fn find_by_ssrc(&self, ssrc: u32) -> Result<&Arc<RtpPeer>> {
        self.peers.iter().find(|p| p.ssrc() == ssrc).ok_or(Error::NotFound)
    }

    pub fn find_by_address(&self, address: &SocketAddr) -> Result<&Arc<RtpPeer>> {
        self.peers
            .iter()
            .find(|p| p.address() == *address)
            .ok_or(Error::NotFound)
    }

    /// Peers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RtpPeer>> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(ssrc: u32, port: u16) -> Arc<RtpPeer> {
        Arc::new(RtpPeer::new(ssrc, format!("127.0.0.1:{port}").parse().unwrap()))
    }

    #[test]
    fn test_add_find_remove() {
        let mut directory = PeerDirectory::new();
        let p = peer(123456789, 5204);
        directory.add(p.clone()).unwrap();

        assert_eq!(directory.find_by_ssrc(123456789).unwrap(), &p);
        assert_eq!(directory.find_by_address(&p.address()).unwrap(), &p);

        let removed = directory.remove(123456789).unwrap();
        assert_eq!(removed, p);
        assert!(matches!(directory.find_by_ssrc(123456789), Err(Error::NotFound)));
        assert!(matches!(directory.find_by_address(&p.address()), Err(Error::NotFound)));
        assert!(directory.iter().next().is_none());
    }

    #[test]
    fn test_duplicate_ssrc_rejected() {
        let mut directory = PeerDirectory::new();
        directory.add(peer(7, 6000)).unwrap();
        assert!(matches!(directory.add(peer(7, 6001)), Err(Error::DuplicateSsrc(7))));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let mut directory = PeerDirectory::new();
        for ssrc in [3u32, 1, 2] {
            directory.add(peer(ssrc, 6000 + ssrc as u16)).unwrap();
        }
        let ssrcs: Vec<u32> = directory.iter().map(|p| p.ssrc()).collect();
        assert_eq!(ssrcs, [3, 1, 2]);
    }

    #[test]
    fn test_remove_keeps_peer_alive() {
        let mut directory = PeerDirectory::new();
        let p = peer(42, 6100);
        directory.add(p.clone()).unwrap();
        let unlinked = directory.remove(42).unwrap();
        drop(directory);
        assert_eq!(unlinked.ssrc(), p.ssrc());
    }

    #[test]
    fn test_remove_missing() {
        let mut directory = PeerDirectory::new();
        assert!(matches!(directory.remove(9), Err(Error::NotFound)));
    }
}
