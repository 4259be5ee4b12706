//! GBX container framing: header, user-data chunks, reference table, body.

use super::cursor::ByteCursor;
use super::lzo;
use crate::domain::Error;

pub(crate) const MAGIC: &[u8; 3] = b"GBX";
pub(crate) const CLASS_REPLAY: u32 = 0x0309_3000;
pub(crate) const CLASS_GHOST: u32 = 0x0309_2000;

const MIN_VERSION: u16 = 3;
const MAX_VERSION: u16 = 6;
const HEAVY_CHUNK_FLAG: u32 = 0x8000_0000;
const HEADER_XML_CHUNK: u32 = 0x0309_3001;

/// Decoded container with its body decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Container {
    pub(crate) class_id: u32,
    /// Payload of the XML header chunk, when the file has one.
    pub(crate) header_xml: Option<Vec<u8>>,
    pub(crate) body: Vec<u8>,
}

impl Container {
    /// Decode the framing of a binary GBX file.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = ByteCursor::new(bytes);
        if cursor.take(MAGIC.len())? != MAGIC {
            return Err(Error::input_format("missing GBX magic"));
        }

        let version = cursor.read_u16()?;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(Error::input_format(format!(
                "unsupported GBX version {version}"
            )));
        }

        let body_compressed = read_format(&mut cursor, version)?;
        let class_id = cursor.read_u32()?;
        if class_id != CLASS_REPLAY && class_id != CLASS_GHOST {
            return Err(Error::input_format(format!(
                "main class {class_id:#010x} is neither a replay nor a ghost"
            )));
        }

        let header_xml = if version >= 6 {
            let size = cursor.read_len()?;
            read_header_xml(cursor.take(size)?)?
        } else {
            None
        };

        let _node_count = cursor.read_u32()?;
        let external_nodes = cursor.read_u32()?;
        if external_nodes != 0 {
            return Err(Error::input_format(
                "replays with external node references are not supported",
            ));
        }

        let body = if body_compressed {
            let uncompressed = cursor.read_len()?;
            let compressed = cursor.read_len()?;
            lzo::decompress(cursor.take(compressed)?, uncompressed)?
        } else {
            cursor.rest().to_vec()
        };

        Ok(Self {
            class_id,
            header_xml,
            body,
        })
    }
}

/// Returns whether the body is compressed.
fn read_format(cursor: &mut ByteCursor<'_>, version: u16) -> Result<bool, Error> {
    match cursor.read_u8()? {
        b'B' => {}
        b'T' => return Err(Error::input_format("text GBX files are not supported")),
        other => {
            return Err(Error::input_format(format!(
                "unknown GBX format byte {other:#04x}"
            )));
        }
    }
    let _ref_table_compression = read_compression_flag(cursor)?;
    let body_compressed = read_compression_flag(cursor)?;
    if version >= 4 {
        let _unknown = cursor.read_u8()?;
    }
    Ok(body_compressed)
}

fn read_compression_flag(cursor: &mut ByteCursor<'_>) -> Result<bool, Error> {
    match cursor.read_u8()? {
        b'C' => Ok(true),
        b'U' => Ok(false),
        other => Err(Error::input_format(format!(
            "unknown GBX compression flag {other:#04x}"
        ))),
    }
}

fn read_header_xml(user_data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    if user_data.is_empty() {
        return Ok(None);
    }
    let mut cursor = ByteCursor::new(user_data);
    let count = cursor.read_u32()?;
    let mut table = Vec::new();
    for _ in 0..count {
        let id = cursor.read_u32()?;
        let size = cursor.read_u32()? & !HEAVY_CHUNK_FLAG;
        table.push((id, size));
    }
    let mut header_xml = None;
    for (id, size) in table {
        let len = usize::try_from(size)
            .map_err(|_| Error::input_format("header chunk size exceeds address space"))?;
        let data = cursor.take(len)?;
        if id == HEADER_XML_CHUNK && header_xml.is_none() {
            header_xml = Some(data.to_vec());
        }
    }
    Ok(header_xml)
}
