//! RTP packet codec.
//!
//! Wire format (network byte order): a 12-byte fixed header
//! `V|P|X|CC | M|PT | sequence | timestamp | SSRC`, followed by up to 15
//! CSRC identifiers and the payload. When the padding flag is set, the last
//! byte of the packet holds the total pad length, inclusive of itself.

use std::sync::Arc;

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    network_endian::{U16, U32},
};

use crate::error::{Error, Result};
use crate::rtp::peer::RtpPeer;

/// The only RTP version in the wild.
pub const RTP_VERSION: u8 = 2;

/// CSRC count is a 4-bit field.
pub const MAX_CSRC_COUNT: usize = 15;

const HEADER_SIZE: usize = std::mem::size_of::<RawHeader>();

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawHeader {
    flags: U16, // 2 bits version, 1 bit padding, 1 bit extension, 4 bits cc, 1 bit marker, 7 bits pt
    sequence_number: U16,
    timestamp: U32,
    ssrc: U32,
}

#[repr(u16)]
enum FlagMasks {
    Version = 0b1100_0000_0000_0000,
    P = 0b0010_0000_0000_0000,
    X = 0b0001_0000_0000_0000,
    CC = 0b0000_1111_0000_0000,
    M = 0b0000_0000_1000_0000,
    PT = 0b0000_0000_0111_1111,
}

struct HeaderFlags {
    flags: u16,
}

impl HeaderFlags {
    fn new(version: u8, p: bool, x: bool, cc: u8, m: bool, pt: u8) -> Self {
        let mut flags = HeaderFlags { flags: 0 };
        flags.set_version(version);
        flags.set_flag(FlagMasks::P, p);
        flags.set_flag(FlagMasks::X, x);
        flags.set_cc(cc);
        flags.set_flag(FlagMasks::M, m);
        flags.set_pt(pt);
        flags
    }

    fn get_flag(&self, flag: FlagMasks) -> bool {
        self.flags & flag as u16 != 0
    }

    fn set_flag(&mut self, flag: FlagMasks, value: bool) {
        if value {
            self.flags |= flag as u16;
        } else {
            self.flags &= !(flag as u16);
        }
    }

    fn version(&self) -> u8 {
        ((self.flags & FlagMasks::Version as u16) >> 14) as u8
    }

    fn set_version(&mut self, version: u8) {
        self.flags = (self.flags & !(FlagMasks::Version as u16)) | ((version as u16) << 14);
    }

    fn cc(&self) -> u8 {
        ((self.flags & FlagMasks::CC as u16) >> 8) as u8
    }

    fn set_cc(&mut self, cc: u8) {
        self.flags = (self.flags & !(FlagMasks::CC as u16)) | ((cc as u16) << 8);
    }

    fn pt(&self) -> u8 {
        (self.flags & FlagMasks::PT as u16) as u8
    }

    fn set_pt(&mut self, pt: u8) {
        self.flags = (self.flags & !(FlagMasks::PT as u16)) | (pt as u16);
    }
}

impl From<u16> for HeaderFlags {
    fn from(flags: u16) -> Self {
        HeaderFlags { flags }
    }
}

/// Header fields of one packet, together with the peer it came from or goes
/// to. Lives only for the duration of a single send or receive call.
#[derive(Debug, Clone, PartialEq)]
pub struct RtpPacketInfo {
    pub peer: Option<Arc<RtpPeer>>,
    /// Total pad length in bytes; 0 means no padding.
    pub padding: u8,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    /// Payload size after padding removal.
    pub payload_size: usize,
}

impl Default for RtpPacketInfo {
    fn default() -> Self {
        Self {
            peer: None,
            padding: 0,
            extension: false,
            marker: false,
            payload_type: 0,
            sequence_number: 0,
            timestamp: 0,
            ssrc: 0,
            csrc: Vec::new(),
            payload_size: 0,
        }
    }
}

/// Size of the encoded packet for `info` with `payload_len` payload bytes.
pub fn encoded_size(info: &RtpPacketInfo, payload_len: usize) -> usize {
    HEADER_SIZE + 4 * info.csrc.len() + payload_len + info.padding as usize
}

/// Encodes `info` and the scattered `payload` parts into `buf`, returning
/// the number of bytes written.
///
/// The sequence number is written verbatim from `info`; any counter the
/// caller keeps is its own business. Fails with [`Error::InvalidArgument`]
/// when the CSRC list exceeds 15 entries and [`Error::BufferTooSmall`] when
/// the assembled packet does not fit.
pub fn encode(info: &RtpPacketInfo, payload: &[&[u8]], buf: &mut [u8]) -> Result<usize> {
    if info.csrc.len() > MAX_CSRC_COUNT {
        return Err(Error::InvalidArgument("csrc list exceeds 15 entries"));
    }
    let payload_len: usize = payload.iter().map(|part| part.len()).sum();
    let required = encoded_size(info, payload_len);
    if buf.len() < required {
        return Err(Error::BufferTooSmall {
            required,
            available: buf.len(),
        });
    }

    let flags = HeaderFlags::new(
        RTP_VERSION,
        info.padding > 0,
        info.extension,
        info.csrc.len() as u8,
        info.marker,
        info.payload_type,
    );
    let header = RawHeader {
        flags: U16::new(flags.flags),
        sequence_number: U16::new(info.sequence_number),
        timestamp: U32::new(info.timestamp),
        ssrc: U32::new(info.ssrc),
    };
    buf[..HEADER_SIZE].copy_from_slice(header.as_bytes());

    let mut at = HEADER_SIZE;
    for csrc in &info.csrc {
        buf[at..at + 4].copy_from_slice(&csrc.to_be_bytes());
        at += 4;
    }
    for part in payload {
        buf[at..at + part.len()].copy_from_slice(part);
        at += part.len();
    }
    if info.padding > 0 {
        let pad = info.padding as usize;
        buf[at..at + pad].fill(0);
        buf[at + pad - 1] = info.padding;
        at += pad;
    }
    Ok(at)
}

/// Decodes one packet, returning its header info and the payload slice
/// after padding removal.
///
/// `info.peer` is left unresolved; matching the packet against a peer
/// directory is the session's job. Fails with [`Error::MalformedPacket`]
/// when the version is not 2, the buffer is shorter than the header plus
/// CSRC list, or the pad byte exceeds the remaining payload.
pub fn decode(buf: &[u8]) -> Result<(RtpPacketInfo, &[u8])> {
    let (header, rest) =
        RawHeader::ref_from_prefix(buf).map_err(|_| Error::MalformedPacket("shorter than the fixed header"))?;
    let flags = HeaderFlags::from(header.flags.get());
    if flags.version() != RTP_VERSION {
        return Err(Error::MalformedPacket("version field is not 2"));
    }

    let cc = flags.cc() as usize;
    if rest.len() < cc * 4 {
        return Err(Error::MalformedPacket("csrc list exceeds packet"));
    }
    let mut csrc = Vec::with_capacity(cc);
    for chunk in rest[..cc * 4].chunks_exact(4) {
        csrc.push(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    let mut payload = &rest[cc * 4..];
    let mut padding = 0u8;
    if flags.get_flag(FlagMasks::P) {
        let Some(&pad) = payload.last() else {
            return Err(Error::MalformedPacket("padding flag on an empty payload"));
        };
        if pad as usize > payload.len() {
            return Err(Error::MalformedPacket("padding exceeds payload"));
        }
        padding = pad;
        payload = &payload[..payload.len() - pad as usize];
    }

    let info = RtpPacketInfo {
        peer: None,
        padding,
        extension: flags.get_flag(FlagMasks::X),
        marker: flags.get_flag(FlagMasks::M),
        payload_type: flags.pt(),
        sequence_number: header.sequence_number.get(),
        timestamp: header.timestamp.get(),
        ssrc: header.ssrc.get(),
        csrc,
        payload_size: payload.len(),
    };
    Ok((info, payload))
}
