//! Batched register read/write lists
//!
//! Request body: a count word, one `(command, data)` pair per register
//! operation, then the `0xFFFF, 0xFFFF` sentinel. The command word packs
//! `op << 10 | dev << 5 | reg`. The response carries the same pairs with read
//! results in the data word, again closed by the sentinel.

use bytes::BufMut;
use msd_core::{BitField, CommandOp, Error, RegisterCommand, Result, WordReader};
use tracing::trace;

use crate::frame::PACKET_PREFIX_SIZE;

/// Register operations per batch
pub const MAX_REGCMDS: usize = 121;

/// End-of-list marker word
pub const SENTINEL: u16 = 0xFFFF;

/// Largest device or register address
pub const MAX_REG_ADDRESS: u8 = 0x1F;

const OP: BitField = BitField::new(10, 2);
const DEV: BitField = BitField::new(5, 5);
const REG: BitField = BitField::new(0, 5);

const OP_WRITE: u16 = 0b01;
const OP_READ: u16 = 0b10;

/// Pack one command into its wire word
pub fn command_word(command: &RegisterCommand) -> Result<u16> {
    let op = match command.opcode {
        CommandOp::Read => OP_READ,
        CommandOp::Write => OP_WRITE,
        other => {
            return Err(Error::bad_param(
                "opcode",
                format!("{} is not allowed in a register batch", other),
            ))
        }
    };
    if command.dev_address > MAX_REG_ADDRESS {
        return Err(Error::bad_param(
            "dev_address",
            format!("{:#x} exceeds {:#x}", command.dev_address, MAX_REG_ADDRESS),
        ));
    }
    if command.entry_id > MAX_REG_ADDRESS as u16 {
        return Err(Error::bad_param(
            "reg_address",
            format!("{:#x} exceeds {:#x}", command.entry_id, MAX_REG_ADDRESS),
        ));
    }
    Ok(OP.pack_u16(op)? | DEV.pack_u16(command.dev_address as u16)? | REG.pack_u16(command.entry_id)?)
}

fn command_from_word(word: u16, data: u16) -> Result<RegisterCommand> {
    let dev = DEV.extract_u16(word) as u8;
    let reg = REG.extract_u16(word) as u8;
    match OP.extract_u16(word) {
        OP_READ => Ok(RegisterCommand::read(dev, reg)),
        OP_WRITE => Ok(RegisterCommand::write(dev, reg, data)),
        other => Err(Error::parsing(format!(
            "unknown register batch op {:#b} in {:#06x}",
            other, word
        ))),
    }
}

/// Encode a request body
pub fn encode(commands: &[RegisterCommand]) -> Result<Vec<u8>> {
    if commands.is_empty() {
        return Err(Error::bad_param("commands", "empty register batch"));
    }
    if commands.len() > MAX_REGCMDS {
        return Err(Error::bad_param(
            "commands",
            format!("{} exceeds {} per batch", commands.len(), MAX_REGCMDS),
        ));
    }

    let mut body = Vec::with_capacity(2 + (commands.len() + 1) * 4);
    body.put_u16(commands.len() as u16);
    for command in commands {
        body.put_u16(command_word(command)?);
        // read data slots go out zeroed
        body.put_u16(if command.opcode == CommandOp::Write {
            command.data
        } else {
            0
        });
    }
    body.put_u16(SENTINEL);
    body.put_u16(SENTINEL);
    Ok(body)
}

/// Decode a request body back into commands
pub fn decode_commands(body: &[u8]) -> Result<Vec<RegisterCommand>> {
    let words = WordReader::new(body);
    let count = words.word(0)? as usize;
    if count == 0 || count > MAX_REGCMDS {
        return Err(Error::parsing(format!("register batch count {}", count)));
    }

    let mut commands = Vec::with_capacity(count);
    for i in 0..count {
        let word = words.word(1 + 2 * i)?;
        let data = words.word(2 + 2 * i)?;
        commands.push(command_from_word(word, data)?);
    }

    let end = 1 + 2 * count;
    if words.word(end)? != SENTINEL || words.word(end + 1)? != SENTINEL {
        return Err(Error::parsing("register batch request without sentinel"));
    }
    Ok(commands)
}

/// Scan `(echo, data)` pairs up to the sentinel
fn scan_pairs(buffer: &[u8], delta: usize) -> Result<Vec<(u16, u16)>> {
    let start = PACKET_PREFIX_SIZE.saturating_sub(delta);
    let body = buffer.get(start..).ok_or_else(|| {
        Error::parsing(format!(
            "register batch response of {} bytes shorter than prefix",
            buffer.len()
        ))
    })?;
    let words = WordReader::new(body);

    let mut pairs = Vec::new();
    let mut index = 0;
    while index + 1 < words.len_words() {
        let echo = words.word(index)?;
        let data = words.word(index + 1)?;
        if echo == SENTINEL && data == SENTINEL {
            trace!(pairs = pairs.len(), "register batch sentinel found");
            return Ok(pairs);
        }
        pairs.push((echo, data));
        index += 2;
    }
    Err(Error::protocol(
        "register batch response truncated: no end-of-list sentinel",
    ))
}

/// Decode the data words of a response holding `count` pairs
pub fn decode(buffer: &[u8], delta: usize, count: usize) -> Result<Vec<u16>> {
    let pairs = scan_pairs(buffer, delta)?;
    if pairs.len() != count {
        return Err(Error::protocol(format!(
            "register batch response has {} pairs, expected {}",
            pairs.len(),
            count
        )));
    }
    Ok(pairs.into_iter().map(|(_, data)| data).collect())
}

/// Decode a response and check every echo against the request
pub fn decode_checked(
    buffer: &[u8],
    delta: usize,
    commands: &[RegisterCommand],
) -> Result<Vec<u16>> {
    let pairs = scan_pairs(buffer, delta)?;
    if pairs.len() != commands.len() {
        return Err(Error::protocol(format!(
            "register batch response has {} pairs, expected {}",
            pairs.len(),
            commands.len()
        )));
    }
    for (i, (command, (echo, _))) in commands.iter().zip(&pairs).enumerate() {
        let expected = command_word(command)?;
        if *echo != expected {
            return Err(Error::protocol(format!(
                "register batch pair {} echoes {:#06x}, expected {:#06x}",
                i, echo, expected
            )));
        }
    }
    Ok(pairs.into_iter().map(|(_, data)| data).collect())
}

/// Encode a response body, used by responders and tests
pub fn encode_response(commands: &[RegisterCommand], data: &[u16]) -> Result<Vec<u8>> {
    if commands.len() != data.len() {
        return Err(Error::bad_param("data", "one data word per command"));
    }
    let mut body = Vec::with_capacity((commands.len() + 1) * 4);
    for (command, value) in commands.iter().zip(data) {
        body.put_u16(command_word(command)?);
        body.put_u16(*value);
    }
    body.put_u16(SENTINEL);
    body.put_u16(SENTINEL);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msd_core::ErrorKind;

    fn response_frame(body: &[u8], delta: usize) -> Vec<u8> {
        let mut frame = vec![0u8; PACKET_PREFIX_SIZE - delta];
        frame.extend_from_slice(body);
        frame
    }

    #[test]
    fn test_command_word() {
        assert_eq!(command_word(&RegisterCommand::read(0x1B, 0x01)).unwrap(), 0x0B61);
        assert_eq!(
            command_word(&RegisterCommand::write(0x02, 0x1F, 0xABCD)).unwrap(),
            0x045F
        );
    }

    #[test]
    fn test_encode_layout() {
        let commands = [
            RegisterCommand::read(0x10, 3),
            RegisterCommand::write(0x11, 4, 0xBEEF),
        ];
        let body = encode(&commands).unwrap();
        assert_eq!(body.len(), 2 + 3 * 4);
        assert_eq!(&body[0..2], &[0x00, 0x02]);
        assert_eq!(&body[4..6], &[0x00, 0x00]);
        assert_eq!(&body[8..10], &[0xBE, 0xEF]);
        assert_eq!(&body[10..], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_commands(&body).unwrap(), commands.to_vec());
    }

    #[test]
    fn test_encode_rejects_bad_params() {
        let too_many = vec![RegisterCommand::read(0, 0); MAX_REGCMDS + 1];
        assert_eq!(encode(&too_many).unwrap_err().kind(), ErrorKind::BadParam);
        assert!(encode(&vec![RegisterCommand::read(0, 0); MAX_REGCMDS]).is_ok());

        assert_eq!(encode(&[]).unwrap_err().kind(), ErrorKind::BadParam);
        assert_eq!(
            encode(&[RegisterCommand::read(0x20, 0)]).unwrap_err().kind(),
            ErrorKind::BadParam
        );
        assert_eq!(
            encode(&[RegisterCommand::read(0, 0x20)]).unwrap_err().kind(),
            ErrorKind::BadParam
        );
        assert_eq!(
            encode(&[RegisterCommand::new(CommandOp::FlushAll, 0, 0)])
                .unwrap_err()
                .kind(),
            ErrorKind::BadParam
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let commands: Vec<_> = (0..5u8).map(|i| RegisterCommand::read(0x1C, i)).collect();
        let data = [1, 2, 3, 4, 0xFFFE];
        let body = encode_response(&commands, &data).unwrap();

        for delta in [0, 4] {
            let frame = response_frame(&body, delta);
            assert_eq!(decode(&frame, delta, 5).unwrap(), data.to_vec());
            assert_eq!(decode_checked(&frame, delta, &commands).unwrap(), data.to_vec());
        }
    }

    #[test]
    fn test_missing_sentinel_fails() {
        let commands = [RegisterCommand::read(1, 1)];
        let mut body = encode_response(&commands, &[7]).unwrap();
        body.truncate(body.len() - 4);
        let err = decode(&response_frame(&body, 0), 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fail);
    }

    #[test]
    fn test_pair_count_mismatch_fails() {
        let commands = [RegisterCommand::read(1, 1), RegisterCommand::read(1, 2)];
        let body = encode_response(&commands, &[7, 8]).unwrap();
        let frame = response_frame(&body, 0);
        assert_eq!(decode(&frame, 0, 3).unwrap_err().kind(), ErrorKind::Fail);
    }

    #[test]
    fn test_echo_mismatch_fails() {
        let sent = [RegisterCommand::read(1, 1)];
        let answered = [RegisterCommand::read(1, 2)];
        let frame = response_frame(&encode_response(&answered, &[0]).unwrap(), 0);
        assert!(decode_checked(&frame, 0, &sent).is_err());
    }
}
