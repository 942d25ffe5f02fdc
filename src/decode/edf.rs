//! Native ESRF Data Format (EDF) parser.
//!
//! EDF is the workhorse container of synchrotron beamlines: an ASCII header
//! block followed by raw binary pixel data.
//!
//! ```text
//! {
//! HeaderID       = EH:000001:000000:000000 ;
//! ByteOrder      = LowByteFirst ;
//! DataType       = UnsignedShort ;
//! Dim_1          = 2048 ;
//! Dim_2          = 2048 ;
//! ...padding (spaces)...
//! }
//! <binary pixel data>
//! ```
//!
//! Conforming writers pad the header block, including the closing `}` and
//! its newline, to a multiple of 512 bytes. Parsing tolerates unpadded files
//! by taking the data to start right after `}` and any whitespace up to the
//! next 512-byte boundary.
//!
//! Only the first image block of a file is read; multi-frame EDFs expose
//! their remaining frames through further header blocks this parser does not
//! walk.

use super::{DecodeError, DecodedFrame, FrameDecoder};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header blocks beyond this are rejected rather than searched further.
const MAX_HEADER_BYTES: usize = 1 << 20;

const BLOCK: usize = 512;

/// Pixel representations EDF headers can declare, with the aliases beamline
/// writers actually emit (`SignedLong` is the historic 32-bit long).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl DataType {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "unsignedbyte" | "unsigned8" => Some(Self::U8),
            "signedbyte" | "signed8" => Some(Self::I8),
            "unsignedshort" | "unsigned16" | "unsignedshortinteger" => Some(Self::U16),
            "signedshort" | "signed16" => Some(Self::I16),
            "unsignedinteger" | "unsigned32" | "unsignedlong" => Some(Self::U32),
            "signedinteger" | "signed32" | "signedlong" => Some(Self::I32),
            "unsigned64" => Some(Self::U64),
            "signed64" => Some(Self::I64),
            "floatvalue" | "float" | "floatieee32" | "real" => Some(Self::F32),
            "doublevalue" | "double" | "doubleieee64" => Some(Self::F64),
            _ => None,
        }
    }

    fn bytes(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Widen one pixel to `f32`. `chunk` is exactly `self.bytes()` long.
    fn widen(self, chunk: &[u8], little_endian: bool) -> f32 {
        match self {
            Self::U8 => f32::from(chunk[0]),
            Self::I8 => f32::from(chunk[0] as i8),
            Self::U16 => {
                let raw = [chunk[0], chunk[1]];
                if little_endian {
                    f32::from(u16::from_le_bytes(raw))
                } else {
                    f32::from(u16::from_be_bytes(raw))
                }
            }
            Self::I16 => {
                let raw = [chunk[0], chunk[1]];
                if little_endian {
                    f32::from(i16::from_le_bytes(raw))
                } else {
                    f32::from(i16::from_be_bytes(raw))
                }
            }
            Self::U32 => {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                if little_endian {
                    u32::from_le_bytes(raw) as f32
                } else {
                    u32::from_be_bytes(raw) as f32
                }
            }
            Self::I32 => {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                if little_endian {
                    i32::from_le_bytes(raw) as f32
                } else {
                    i32::from_be_bytes(raw) as f32
                }
            }
            Self::U64 => {
                let raw = [
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ];
                if little_endian {
                    u64::from_le_bytes(raw) as f32
                } else {
                    u64::from_be_bytes(raw) as f32
                }
            }
            Self::I64 => {
                let raw = [
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ];
                if little_endian {
                    i64::from_le_bytes(raw) as f32
                } else {
                    i64::from_be_bytes(raw) as f32
                }
            }
            Self::F32 => {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                if little_endian {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                }
            }
            Self::F64 => {
                let raw = [
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ];
                if little_endian {
                    f64::from_le_bytes(raw) as f32
                } else {
                    f64::from_be_bytes(raw) as f32
                }
            }
        }
    }
}

/// Parsed header block: pairs in file order plus the payload offset.
struct HeaderBlock {
    pairs: Vec<(String, String)>,
    data_offset: usize,
}

/// EDF decode session.
#[derive(Debug, Default)]
pub struct EdfDecoder;

impl EdfDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for EdfDecoder {
    fn read_header(&mut self, path: &Path) -> Result<Vec<(String, String)>, DecodeError> {
        let bytes = read_header_blocks(path)?;
        let block = parse_header(&bytes, path)?;
        Ok(block.pairs)
    }

    fn read_image(&mut self, path: &Path) -> Result<DecodedFrame, DecodeError> {
        let bytes = std::fs::read(path)?;
        let block = parse_header(&bytes, path)?;

        let width = dimension(&block.pairs, "Dim_1", path)?;
        let height = dimension(&block.pairs, "Dim_2", path)?;
        let data_type = required(&block.pairs, "DataType", path).and_then(|v| {
            DataType::parse(v).ok_or_else(|| {
                DecodeError::Malformed(format!("{}: unknown DataType '{v}'", path.display()))
            })
        })?;
        let little_endian = match lookup(&block.pairs, "ByteOrder") {
            None => true, // LowByteFirst is the de-facto default
            Some(v) if v.eq_ignore_ascii_case("LowByteFirst") => true,
            Some(v) if v.eq_ignore_ascii_case("HighByteFirst") => false,
            Some(v) => {
                return Err(DecodeError::Malformed(format!(
                    "{}: unknown ByteOrder '{v}'",
                    path.display()
                )));
            }
        };

        let count = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| frame_too_large(path, width, height))?;
        let need = count
            .checked_mul(data_type.bytes())
            .ok_or_else(|| frame_too_large(path, width, height))?;
        let payload = block
            .data_offset
            .checked_add(need)
            .and_then(|end| bytes.get(block.data_offset..end))
            .ok_or_else(|| {
                DecodeError::Malformed(format!(
                    "{}: payload truncated ({} bytes needed, {} present)",
                    path.display(),
                    need,
                    bytes.len().saturating_sub(block.data_offset)
                ))
            })?;

        let mut pixels = Vec::with_capacity(count);
        for chunk in payload.chunks_exact(data_type.bytes()) {
            pixels.push(data_type.widen(chunk, little_endian));
        }

        Ok(DecodedFrame {
            pixels,
            width,
            height,
        })
    }
}

/// Read 512-byte blocks until the closing brace shows up, so grabbing a
/// header never pulls a multi-megabyte frame into memory.
fn read_header_blocks(path: &Path) -> Result<Vec<u8>, DecodeError> {
    let mut file = File::open(path)?;
    let mut buf = Vec::with_capacity(BLOCK);
    let mut block = [0u8; BLOCK];
    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            return Err(DecodeError::Malformed(format!(
                "{}: header never closed",
                path.display()
            )));
        }
        buf.extend_from_slice(&block[..n]);
        if block[..n].contains(&b'}') {
            return Ok(buf);
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(DecodeError::Malformed(format!(
                "{}: header exceeds {} bytes",
                path.display(),
                MAX_HEADER_BYTES
            )));
        }
    }
}

fn parse_header(bytes: &[u8], path: &Path) -> Result<HeaderBlock, DecodeError> {
    let open = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .filter(|&i| bytes[i] == b'{')
        .ok_or_else(|| {
            DecodeError::Malformed(format!("{}: missing opening brace", path.display()))
        })?;
    let close = bytes[open..]
        .iter()
        .position(|&b| b == b'}')
        .map(|i| open + i)
        .ok_or_else(|| DecodeError::Malformed(format!("{}: header never closed", path.display())))?;

    let text = String::from_utf8_lossy(&bytes[open + 1..close]);
    let mut pairs = Vec::new();
    for line in text.lines() {
        let line = line.trim().trim_end_matches(';').trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    // The block is padded to the next 512-byte boundary; skip that padding
    // but stop early if real (non-whitespace) bytes begin sooner.
    let boundary = (close / BLOCK + 1) * BLOCK;
    let mut data_offset = close + 1;
    while data_offset < boundary
        && data_offset < bytes.len()
        && bytes[data_offset].is_ascii_whitespace()
    {
        data_offset += 1;
    }

    Ok(HeaderBlock { pairs, data_offset })
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn required<'a>(
    pairs: &'a [(String, String)],
    key: &str,
    path: &Path,
) -> Result<&'a str, DecodeError> {
    lookup(pairs, key)
        .ok_or_else(|| DecodeError::Malformed(format!("{}: missing {key}", path.display())))
}

fn dimension(pairs: &[(String, String)], key: &str, path: &Path) -> Result<u32, DecodeError> {
    let value = required(pairs, key, path)?;
    value.parse::<u32>().map_err(|_| {
        DecodeError::Malformed(format!("{}: {key} '{value}' is not a size", path.display()))
    })
}

fn frame_too_large(path: &Path, width: u32, height: u32) -> DecodeError {
    DecodeError::Malformed(format!(
        "{}: {width}x{height} frame too large to decode",
        path.display()
    ))
}
