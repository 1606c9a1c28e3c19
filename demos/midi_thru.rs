//! Two RTP sessions on localhost, wired through connectors: notes relayed
//! into one end come out of the other, transposed down an octave.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use midi_types::{Channel, MidiMessage, Note, Value7};
use midilink::connector::{Connector, TargetDelegate};
use midilink::rtp::bridge::RtpBridge;
use midilink::rtp::peer::RtpPeer;
use midilink::rtp::session::RtpSession;
use tokio::net::UdpSocket;
use tracing::{Level, event};

struct OctaveDown {
    received: RefCell<Vec<MidiMessage>>,
}

impl TargetDelegate for OctaveDown {
    fn relay(&self, message: &MidiMessage) -> midilink::Result<()> {
        let transposed = match *message {
            MidiMessage::NoteOn(channel, note, velocity) => {
                let key: u8 = note.into();
                MidiMessage::NoteOn(channel, Note::from(key.saturating_sub(12)), velocity)
            }
            other => other,
        };
        event!(Level::INFO, ?message, ?transposed, "note arrived");
        self.received.borrow_mut().push(transposed);
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let socket_a = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);
    let socket_b = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);
    let addr_a = socket_a.local_addr()?;
    let addr_b = socket_b.local_addr()?;

    let bridge_a = RtpBridge::new(RtpSession::with_random_ssrc(socket_a));
    let bridge_b = RtpBridge::new(RtpSession::with_random_ssrc(socket_b));
    let ssrc_a = bridge_a.session().ssrc();
    let ssrc_b = bridge_b.session().ssrc();
    bridge_a.session_mut().add_peer(Arc::new(RtpPeer::new(ssrc_b, addr_b)))?;
    bridge_b.session_mut().add_peer(Arc::new(RtpPeer::new(ssrc_a, addr_a)))?;

    // keyboard -> connector -> bridge A -> network
    let outbound = Connector::create();
    outbound.attach_target(bridge_a.clone())?;

    // network -> bridge B -> connector -> transposer
    let transposer = Rc::new(OctaveDown {
        received: RefCell::new(Vec::new()),
    });
    let inbound = Connector::create();
    inbound.attach_target(transposer.clone())?;
    inbound.attach_source(bridge_b.clone())?;

    for key in [60u8, 64, 67] {
        let note_on = MidiMessage::NoteOn(Channel::C1, Note::from(key), Value7::from(100));
        outbound.relay(&note_on)?;

        bridge_b.session().socket().readable().await?;
        bridge_b.dispatch()?;
    }

    println!("transposed notes: {:?}", transposer.received.borrow());
    Ok(())
}
