//! Byte-level encoding of [`MidiMessage`] values.
//!
//! Channel voice and system common/real-time messages only; SysEx has no
//! counterpart in this crate's relay path.

use bytes::{BufMut, BytesMut};
use midi_types::{Channel, Control, MidiMessage, Note, Program, QuarterFrame, Value7, Value14, status};

use crate::error::{Error, Result};

pub(crate) fn status(message: &MidiMessage) -> u8 {
    match message {
        MidiMessage::NoteOn(channel, _, _) => status::NOTE_ON | u8::from(*channel),
        MidiMessage::NoteOff(channel, _, _) => status::NOTE_OFF | u8::from(*channel),
        MidiMessage::ChannelPressure(channel, _) => status::CHANNEL_PRESSURE | u8::from(*channel),
        MidiMessage::ControlChange(channel, _, _) => status::CONTROL_CHANGE | u8::from(*channel),
        MidiMessage::ProgramChange(channel, _) => status::PROGRAM_CHANGE | u8::from(*channel),
        MidiMessage::KeyPressure(channel, _, _) => status::KEY_PRESSURE | u8::from(*channel),
        MidiMessage::PitchBendChange(channel, _) => status::PITCH_BEND_CHANGE | u8::from(*channel),
        MidiMessage::QuarterFrame(_) => status::QUARTER_FRAME,
        MidiMessage::SongPositionPointer(_) => status::SONG_POSITION_POINTER,
        MidiMessage::SongSelect(_) => status::SONG_SELECT,
        MidiMessage::TuneRequest => status::TUNE_REQUEST,
        MidiMessage::TimingClock => status::TIMING_CLOCK,
        MidiMessage::Start => status::START,
        MidiMessage::Continue => status::CONTINUE,
        MidiMessage::Stop => status::STOP,
        MidiMessage::ActiveSensing => status::ACTIVE_SENSING,
        MidiMessage::Reset => status::RESET,
    }
}

pub(crate) fn write(message: &MidiMessage, bytes: &mut BytesMut) {
    bytes.put_u8(status(message));

    match message {
        MidiMessage::NoteOn(_channel, key, velocity) | MidiMessage::NoteOff(_channel, key, velocity) => {
            bytes.put_u8(Into::into(*key));
            bytes.put_u8(Into::into(*velocity));
        }
        MidiMessage::KeyPressure(_channel, key, pressure) => {
            bytes.put_u8(Into::into(*key));
            bytes.put_u8(Into::into(*pressure));
        }
        MidiMessage::ControlChange(_channel, controller, value) => {
            bytes.put_u8(Into::into(*controller));
            bytes.put_u8(Into::into(*value));
        }
        MidiMessage::ProgramChange(_channel, program) => {
            bytes.put_u8(Into::into(*program));
        }
        MidiMessage::ChannelPressure(_channel, pressure) => {
            bytes.put_u8(Into::into(*pressure));
        }
        MidiMessage::PitchBendChange(_channel, value) => {
            let raw: u16 = Into::into(*value);
            bytes.put_u8((raw >> 7) as u8);
            bytes.put_u8((raw & 0x7F) as u8);
        }
        MidiMessage::QuarterFrame(data) => {
            bytes.put_u8(Into::into(*data));
        }
        MidiMessage::SongPositionPointer(position) => {
            let raw: u16 = Into::into(*position);
            bytes.put_u8((raw >> 7) as u8);
            bytes.put_u8((raw & 0x7F) as u8);
        }
        MidiMessage::SongSelect(song) => {
            bytes.put_u8(Into::into(*song));
        }
        MidiMessage::TuneRequest
        | MidiMessage::TimingClock
        | MidiMessage::Start
        | MidiMessage::Continue
        | MidiMessage::Stop
        | MidiMessage::ActiveSensing
        | MidiMessage::Reset => {}
    }
}

fn data_len(status_byte: u8) -> Result<usize> {
    match status_byte {
        0x80..0xC0 => Ok(2),
        0xC0..0xE0 => Ok(1),
        0xE0..0xF0 => Ok(2),
        0xF1 => Ok(1),
        0xF2 => Ok(2),
        0xF3 => Ok(1),
        0xF6 | 0xF8 | 0xFA..=0xFC | 0xFE | 0xFF => Ok(0),
        _ => Err(Error::MalformedPacket("unsupported midi status byte")),
    }
}

/// Parses one message from the front of `bytes`, returning it and the
/// number of bytes consumed.
pub(crate) fn parse(bytes: &[u8]) -> Result<(MidiMessage, usize)> {
    let Some(&status_byte) = bytes.first() else {
        return Err(Error::Truncated);
    };
    if status_byte & 0x80 == 0 {
        return Err(Error::MalformedPacket("data byte where a status byte was expected"));
    }
    let len = data_len(status_byte)?;
    let data = &bytes[1..];
    if data.len() < len {
        return Err(Error::Truncated);
    }

    let channel = Channel::from(status_byte & 0x0F);
    let message = match status_byte {
        0x80..0x90 => MidiMessage::NoteOff(channel, Note::from(data[0]), Value7::from(data[1])),
        0x90..0xA0 => MidiMessage::NoteOn(channel, Note::from(data[0]), Value7::from(data[1])),
        0xA0..0xB0 => MidiMessage::KeyPressure(channel, Note::from(data[0]), Value7::from(data[1])),
        0xB0..0xC0 => MidiMessage::ControlChange(channel, Control::from(data[0]), Value7::from(data[1])),
        0xC0..0xD0 => MidiMessage::ProgramChange(channel, Program::from(data[0])),
        0xD0..0xE0 => MidiMessage::ChannelPressure(channel, Value7::from(data[0])),
        0xE0..0xF0 => MidiMessage::PitchBendChange(channel, Value14::from((data[0], data[1]))),
        0xF1 => MidiMessage::QuarterFrame(QuarterFrame::from(data[0])),
        0xF2 => MidiMessage::SongPositionPointer(Value14::from((data[0], data[1]))),
        0xF3 => MidiMessage::SongSelect(Value7::from(data[0])),
        0xF6 => MidiMessage::TuneRequest,
        0xF8 => MidiMessage::TimingClock,
        0xFA => MidiMessage::Start,
        0xFB => MidiMessage::Continue,
        0xFC => MidiMessage::Stop,
        0xFE => MidiMessage::ActiveSensing,
        0xFF => MidiMessage::Reset,
        _ => return Err(Error::MalformedPacket("unsupported midi status byte")),
    };
    Ok((message, 1 + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_message_rw(message: MidiMessage, expected_bytes: &[u8]) {
        let mut bytes = BytesMut::new();
        write(&message, &mut bytes);
        assert_eq!(&bytes[..], expected_bytes);

        let (parsed, consumed) = parse(&bytes).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(consumed, expected_bytes.len());
    }

    #[test]
    fn test_note_on() {
        test_message_rw(
            MidiMessage::NoteOn(From::from(4), From::from(0x40), From::from(0x7F)),
            &[0x94, 0x40, 0x7F],
        );
    }

    #[test]
    fn test_note_off() {
        test_message_rw(
            MidiMessage::NoteOff(From::from(4), From::from(0x40), From::from(0x7F)),
            &[0x84, 0x40, 0x7F],
        );
    }

    #[test]
    fn test_key_pressure() {
        test_message_rw(
            MidiMessage::KeyPressure(From::from(4), From::from(0x40), From::from(0x7F)),
            &[0xA4, 0x40, 0x7F],
        );
    }

    #[test]
    fn test_control_change() {
        test_message_rw(
            MidiMessage::ControlChange(From::from(4), From::from(0x40), From::from(0x7F)),
            &[0xB4, 0x40, 0x7F],
        );
    }

    #[test]
    fn test_program_change() {
        test_message_rw(MidiMessage::ProgramChange(From::from(4), From::from(0x40)), &[0xC4, 0x40]);
    }

    #[test]
    fn test_channel_pressure() {
        test_message_rw(MidiMessage::ChannelPressure(From::from(4), From::from(0x40)), &[0xD4, 0x40]);
    }

    #[test]
    fn test_pitch_bend() {
        test_message_rw(
            MidiMessage::PitchBendChange(From::from(4), From::from((0x40, 0x7F))),
            &[0xE4, 0x40, 0x7F],
        );
    }

    #[test]
    fn test_system_realtime() {
        test_message_rw(MidiMessage::TimingClock, &[0xF8]);
        test_message_rw(MidiMessage::Start, &[0xFA]);
        test_message_rw(MidiMessage::Stop, &[0xFC]);
    }

    #[test]
    fn test_parse_truncated_data() {
        assert!(matches!(parse(&[0x94, 0x40]), Err(Error::Truncated)));
        assert!(matches!(parse(&[]), Err(Error::Truncated)));
    }

    #[test]
    fn test_parse_rejects_data_byte_status() {
        assert!(matches!(parse(&[0x40, 0x40]), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_parse_rejects_sysex() {
        assert!(matches!(parse(&[0xF0, 0x01, 0xF7]), Err(Error::MalformedPacket(_))));
    }
}
