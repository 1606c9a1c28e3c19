use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tracing::{Level, event, instrument};

use crate::error::{Error, Result};
use crate::rtp::MAX_UDP_PACKET_SIZE;
use crate::rtp::directory::PeerDirectory;
use crate::rtp::packet::{self, RtpPacketInfo};
use crate::rtp::peer::RtpPeer;

/// One end of an RTP stream: a caller-supplied datagram socket, the local
/// SSRC, an outbound sequence counter and the directory of known peers.
///
/// All calls are synchronous. The socket is consumed, never bound or closed
/// here; callers drive `receive` with a poll-then-read discipline — await
/// the socket's readiness, then read. A `receive` without a pending
/// datagram surfaces the `WouldBlock` as [`Error::Io`].
pub struct RtpSession {
    socket: Arc<UdpSocket>,
    ssrc: u32,
    sequence_number: u16,
    start_time: Instant,
    peers: PeerDirectory,
}

impl RtpSession {
    pub fn new(socket: Arc<UdpSocket>, ssrc: u32) -> Self {
        RtpSession {
            socket,
            ssrc,
            sequence_number: 0,
            start_time: Instant::now(),
            peers: PeerDirectory::new(),
        }
    }

    pub fn with_random_ssrc(socket: Arc<UdpSocket>) -> Self {
        Self::new(socket, rand::random::<u32>())
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    pub fn add_peer(&mut self, peer: Arc<RtpPeer>) -> Result<()> {
        self.peers.add(peer)
    }

    pub fn remove_peer(&mut self, peer: &RtpPeer) -> Result<Arc<RtpPeer>> {
        self.peers.remove(peer.ssrc())
    }

    pub fn find_peer_by_ssrc(&self, ssrc: u32) -> Result<&Arc<RtpPeer>> {
        self.peers.find_by_ssrc(ssrc)
    }

    pub fn find_peer_by_address(&self, address: &SocketAddr) -> Result<&Arc<RtpPeer>> {
        self.peers.find_by_address(address)
    }

    pub fn peers(&self) -> impl Iterator<Item = &Arc<RtpPeer>> {
        self.peers.iter()
    }

    /// Encodes and sends one packet with every header field taken verbatim
    /// from `info`, addressed to `info.peer`'s stored transport address.
    ///
    /// The session's own sequence counter is not touched; callers that want
    /// it maintained use [`RtpSession::send`].
    #[instrument(skip_all, fields(ssrc = self.ssrc, seq = info.sequence_number))]
    pub fn send_packet(&self, info: &RtpPacketInfo, payload: &[&[u8]]) -> Result<usize> {
        let peer = info
            .peer
            .as_ref()
            .ok_or(Error::InvalidArgument("packet info carries no peer"))?;
        let payload_len: usize = payload.iter().map(|part| part.len()).sum();
        let mut buf = vec![0u8; packet::encoded_size(info, payload_len)];
        let written = packet::encode(info, payload, &mut buf)?;
        let sent = self.socket.try_send_to(&buf[..written], peer.address())?;
        event!(Level::TRACE, bytes = sent, peer = %peer.address(), "sent packet");
        Ok(sent)
    }

    /// Sends `payload` to `peer` with the header filled from session state,
    /// then advances the outbound sequence counter (wrapping).
    pub fn send(&mut self, peer: &Arc<RtpPeer>, payload_type: u8, marker: bool, payload: &[&[u8]]) -> Result<usize> {
        let info = RtpPacketInfo {
            peer: Some(peer.clone()),
            marker,
            payload_type,
            sequence_number: self.sequence_number,
            timestamp: current_timestamp(self.start_time),
            ssrc: self.ssrc,
            ..Default::default()
        };
        let sent = self.send_packet(&info, payload)?;
        self.sequence_number = self.sequence_number.wrapping_add(1);
        Ok(sent)
    }

    /// Reads one datagram, decodes it and matches the sender against the
    /// peer directory. Up to `buf.len()` payload bytes are copied out; the
    /// returned info reports the full after-padding payload size and the
    /// resolved peer.
    ///
    /// Malformed input and unknown senders are rejected before anything is
    /// touched — the directory and the sequence counter are unchanged on
    /// every failure path.
    #[instrument(skip_all, fields(ssrc = self.ssrc, src))]
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<RtpPacketInfo> {
        let mut datagram = [0u8; MAX_UDP_PACKET_SIZE];
        let (amt, src) = self.socket.try_recv_from(&mut datagram)?;
        tracing::Span::current().record("src", src.to_string());
        event!(Level::TRACE, "received {} bytes", amt);

        let (mut info, payload) = packet::decode(&datagram[..amt])?;
        let peer = self
            .peers
            .find_by_ssrc(info.ssrc)
            .or_else(|_| self.peers.find_by_address(&src))?;
        info.peer = Some(peer.clone());

        let copied = payload.len().min(buf.len());
        buf[..copied].copy_from_slice(&payload[..copied]);
        Ok(info)
    }
}

/// Elapsed time since `start_time` in 100-microsecond units, truncated to
/// the 32-bit RTP timestamp.
pub(crate) fn current_timestamp(start_time: Instant) -> u32 {
    ((Instant::now() - start_time).as_micros() / 100) as u32
}
