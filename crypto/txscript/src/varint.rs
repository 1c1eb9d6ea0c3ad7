//! Bitcoin `CompactSize` integers, used as the length prefix of serialized scripts.

use std::io::{self, Read};

const U16_MARKER: u8 = 0xfd;
const U32_MARKER: u8 = 0xfe;
const U64_MARKER: u8 = 0xff;

pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut marker = [0u8; 1];
    reader.read_exact(&mut marker)?;
    Ok(match marker[0] {
        U16_MARKER => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            u16::from_le_bytes(buf) as u64
        }
        U32_MARKER => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            u32::from_le_bytes(buf) as u64
        }
        U64_MARKER => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            u64::from_le_bytes(buf)
        }
        value => value as u64,
    })
}

pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < U16_MARKER as u64 {
        vec![value as u8]
    } else if value <= u16::MAX as u64 {
        [&[U16_MARKER][..], &(value as u16).to_le_bytes()].concat()
    } else if value <= u32::MAX as u64 {
        [&[U32_MARKER][..], &(value as u32).to_le_bytes()].concat()
    } else {
        [&[U64_MARKER][..], &value.to_le_bytes()].concat()
    }
}
