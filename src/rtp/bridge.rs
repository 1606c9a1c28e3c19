use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use midi_types::MidiMessage;
use tracing::{Level, event, instrument};

use crate::connector::{Connector, SourceDelegate, TargetDelegate};
use crate::error::{Error, Result};
use crate::midi;
use crate::rtp::MAX_UDP_PACKET_SIZE;
use crate::rtp::peer::RtpPeer;
use crate::rtp::session::RtpSession;
use crate::varlen;

/// Payload type carried by this crate's MIDI packets.
pub const PAYLOAD_TYPE_MIDI: u8 = 97;

/// Endpoint that plugs an [`RtpSession`] into connectors, both directions.
///
/// Attached as a **target**, the bridge encodes each relayed message and
/// broadcasts it to every listed peer. Attached as a **source**, it keeps
/// the connector as its upward pipe and [`dispatch`] relays each decoded
/// inbound message through it.
///
/// The payload framing is a sequence of `[delta-time][message]` events,
/// the delta-time a variable-length quantity; outbound events carry a
/// delta-time of zero.
///
/// [`dispatch`]: RtpBridge::dispatch
pub struct RtpBridge {
    session: RefCell<RtpSession>,
    inbound: RefCell<Option<Connector>>,
}

impl RtpBridge {
    pub fn new(session: RtpSession) -> Rc<Self> {
        Rc::new(RtpBridge {
            session: RefCell::new(session),
            inbound: RefCell::new(None),
        })
    }

    pub fn session(&self) -> Ref<'_, RtpSession> {
        self.session.borrow()
    }

    /// Mutable access to the underlying session, e.g. for peer management.
    pub fn session_mut(&self) -> RefMut<'_, RtpSession> {
        self.session.borrow_mut()
    }

    /// Receives one packet and relays every framed MIDI event through the
    /// connector connected to this bridge's source side.
    ///
    /// Fails with [`Error::NoSource`] when no connector is connected; a
    /// malformed packet or framing is rejected as a whole — the payload is
    /// decoded completely before the first relay call, so a bad tail never
    /// leaves half a packet delivered.
    #[instrument(skip_all, fields(ssrc = self.session.borrow().ssrc()))]
    pub fn dispatch(&self) -> Result<()> {
        let mut payload = [0u8; MAX_UDP_PACKET_SIZE];
        let info = self.session.borrow_mut().receive(&mut payload)?;
        let connector = self.inbound.borrow().clone().ok_or(Error::NoSource)?;

        let framed = &payload[..info.payload_size.min(payload.len())];
        let mut events = Vec::new();
        let mut at = 0;
        while at < framed.len() {
            let (_delta_time, consumed) = varlen::read(&framed[at..])?;
            at += consumed;
            let (message, consumed) = midi::parse(&framed[at..])?;
            at += consumed;
            events.push(message);
        }

        event!(Level::DEBUG, count = events.len(), "relaying inbound events");
        for message in &events {
            connector.relay(message)?;
        }
        Ok(())
    }
}

impl TargetDelegate for RtpBridge {
    /// Encodes `message` and sends it to every listed peer; no peers is a
    /// successful no-op.
    #[instrument(skip_all, fields(ssrc = self.session.borrow().ssrc()))]
    fn relay(&self, message: &MidiMessage) -> Result<()> {
        let mut framed = BytesMut::with_capacity(4);
        let mut delta_time = [0u8; 4];
        let written = varlen::write(0, &mut delta_time)?;
        framed.put_slice(&delta_time[..written]);
        midi::write(message, &mut framed);

        let mut session = self.session.borrow_mut();
        let peers: Vec<Arc<RtpPeer>> = session.peers().cloned().collect();
        event!(Level::DEBUG, count = peers.len(), "broadcasting message");
        for peer in peers {
            session.send(&peer, PAYLOAD_TYPE_MIDI, false, &[&framed[..]])?;
        }
        Ok(())
    }
}

impl SourceDelegate for RtpBridge {
    /// Keeps the connector as the upward pipe for inbound messages,
    /// holding one reference on it for as long as it stays registered.
    fn connect(&self, connector: &Connector) -> Result<()> {
        connector.retain();
        let previous = self.inbound.borrow_mut().replace(connector.clone());
        if let Some(previous) = previous {
            previous.release();
        }
        Ok(())
    }

    fn invalidate(&self, _connector: &Connector) {
        let stored = self.inbound.borrow_mut().take();
        if let Some(stored) = stored {
            stored.release();
        }
    }
}
