//! Ghost chunk stream decoding.

use super::container::{CLASS_GHOST, Container};
use super::cursor::ByteCursor;
use crate::domain::Error;

const CHUNK_FAMILY_MASK: u32 = 0xFFFF_F000;
const CLASS_GHOST_SAMPLES: u32 = 0x0303_F000;
const END_OF_NODE: u32 = 0xFACA_DE01;
const SKIPPABLE_MARKER: u32 = u32::from_le_bytes(*b"PIKS");

/// Fields read from a ghost's chunk stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GhostFields {
    pub(crate) race_time: Option<u32>,
    pub(crate) login: Option<String>,
    pub(crate) game_version: Option<String>,
    pub(crate) checkpoint_times: Vec<u32>,
}

/// Slice of the container body holding the first ghost's chunk stream.
pub(crate) fn ghost_stream(container: &Container) -> Result<&[u8], Error> {
    if container.class_id == CLASS_GHOST {
        return Ok(&container.body);
    }
    let marker = CLASS_GHOST.to_le_bytes();
    container
        .body
        .windows(8)
        .position(|window| {
            let (class, chunk) = window.split_at(4);
            class == marker && read_id(chunk).is_some_and(is_ghost_chunk)
        })
        .map(|offset| &container.body[offset + 4..])
        .ok_or_else(|| Error::input_format("no ghost found"))
}

/// Decode chunks until the end-of-node marker.
pub(crate) fn decode(stream: &[u8]) -> Result<GhostFields, Error> {
    let mut cursor = ByteCursor::new(stream);
    let mut fields = GhostFields::default();

    while !cursor.is_exhausted() {
        let id = cursor.read_u32()?;
        if id == END_OF_NODE {
            break;
        }

        if cursor.peek_u32() == Some(SKIPPABLE_MARKER) {
            cursor.skip(4)?;
            let size = cursor.read_len()?;
            let start = cursor.position();
            if !fields.read_chunk(&mut cursor, id)? {
                cursor.skip(size)?;
                continue;
            }
            let consumed = cursor.position() - start;
            let rest = size.checked_sub(consumed).ok_or_else(|| {
                Error::input_format(format!(
                    "chunk {id:#010x} overran its declared size of {size} bytes"
                ))
            })?;
            cursor.skip(rest)?;
        } else if !fields.read_chunk(&mut cursor, id)? {
            tracing::debug!(chunk_id = id, "stopping at unknown ghost chunk");
            break;
        }
    }

    Ok(fields)
}

impl GhostFields {
    /// Returns `false` without consuming input when `id` is not recognised.
    fn read_chunk(&mut self, cursor: &mut ByteCursor<'_>, id: u32) -> Result<bool, Error> {
        match id {
            0x0309_2005 => self.race_time = Some(cursor.read_u32()?),
            // respawns, stunt score, unknown flag, unknown id
            0x0309_2008 | 0x0309_200A | 0x0309_200C | 0x0309_2014 => cursor.skip(4)?,
            0x0309_2009 => cursor.skip(12)?,
            0x0309_200B => self.checkpoint_times = read_checkpoints(cursor)?,
            0x0309_200E | 0x0309_2010 | 0x0309_2015 => {
                cursor.read_lookback_string()?;
            }
            0x0309_200F => self.login = Some(cursor.read_string()?),
            0x0309_2012 => cursor.skip(20)?,
            0x0309_2013 => cursor.skip(8)?,
            0x0309_2018 => {
                for _ in 0..3 {
                    cursor.read_lookback_string()?;
                }
            }
            0x0309_2019 => self.game_version = read_validation(cursor)?,
            0x0309_2025 => {
                self.game_version = read_validation(cursor)?;
                cursor.skip(4)?;
            }
            0x0303_F005 => skip_sample_data(cursor)?,
            0x0303_F006 => {
                cursor.skip(4)?;
                skip_sample_data(cursor)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn read_checkpoints(cursor: &mut ByteCursor<'_>) -> Result<Vec<u32>, Error> {
    let count = cursor.read_u32()?;
    let mut times = Vec::new();
    for _ in 0..count {
        times.push(cursor.read_u32()?);
        let _stunts = cursor.read_u32()?;
    }
    Ok(times)
}

/// Input-event validation block; yields the game version when events exist.
fn read_validation(cursor: &mut ByteCursor<'_>) -> Result<Option<String>, Error> {
    let events_duration = cursor.read_u32()?;
    if events_duration == 0 {
        return Ok(None);
    }
    cursor.skip(4)?;
    let control_names = cursor.read_u32()?;
    for _ in 0..control_names {
        cursor.read_lookback_string()?;
    }
    let entries = cursor.read_len()?;
    cursor.skip(4)?;
    let entries_len = entries
        .checked_mul(8)
        .ok_or_else(|| Error::input_format("control entry table is too large"))?;
    cursor.skip(entries_len)?;

    let game_version = cursor.read_string()?;
    cursor.skip(12)?;
    let _validation_checksum = cursor.read_string()?;
    Ok(Some(game_version))
}

fn skip_sample_data(cursor: &mut ByteCursor<'_>) -> Result<(), Error> {
    let size = cursor.read_len()?;
    cursor.skip(size)
}

fn read_id(bytes: &[u8]) -> Option<u32> {
    bytes.try_into().ok().map(u32::from_le_bytes)
}

fn is_ghost_chunk(id: u32) -> bool {
    let family = id & CHUNK_FAMILY_MASK;
    family == CLASS_GHOST || family == CLASS_GHOST_SAMPLES
}
