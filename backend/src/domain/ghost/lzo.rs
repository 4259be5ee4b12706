//! LZO1X decompression for GBX bodies.
//!
//! Only decompression is needed; replay files are produced by the game.

use crate::domain::Error;

const M2_MAX_OFFSET: usize = 0x0800;
const M4_BASE_OFFSET: usize = 0x4000;
// Each zero byte of a length extension adds 255 output bytes.
const MAX_EXPANSION: usize = 255;

/// Decompress an LZO1X stream that must expand to exactly `expected_len`.
pub(crate) fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>, Error> {
    let mut decoder = Decoder {
        src,
        ip: 0,
        limit: expected_len,
        out: Vec::with_capacity(expected_len.min(src.len().saturating_mul(MAX_EXPANSION))),
    };
    decoder.run()?;
    if decoder.out.len() != expected_len {
        return Err(Error::input_format(format!(
            "compressed body expanded to {} bytes, header declared {expected_len}",
            decoder.out.len()
        )));
    }
    Ok(decoder.out)
}

struct Decoder<'a> {
    src: &'a [u8],
    ip: usize,
    limit: usize,
    out: Vec<u8>,
}

impl Decoder<'_> {
    fn run(&mut self) -> Result<(), Error> {
        // Trailing-literal count from the previous instruction; 4 marks a
        // preceding literal run of four or more bytes.
        let mut state = 0_usize;

        if self.peek()? > 17 {
            let count = usize::from(self.next()? - 17);
            self.copy_literals(count)?;
            state = count.min(4);
        }

        loop {
            let inst = self.next()?;
            let (length, distance, next_state) = if inst >= 0x40 {
                let high = usize::from(self.next()?);
                let distance = (high << 3) + usize::from((inst >> 2) & 0x07) + 1;
                (usize::from(inst >> 5) + 1, distance, usize::from(inst & 0x03))
            } else if inst >= 0x20 {
                let length = self.extended_length(usize::from(inst & 0x1F), 0x1F)? + 2;
                let tail = self.next_u16()?;
                (length, usize::from(tail >> 2) + 1, usize::from(tail & 0x03))
            } else if inst >= 0x10 {
                let length = self.extended_length(usize::from(inst & 0x07), 0x07)? + 2;
                let tail = self.next_u16()?;
                let offset = (usize::from(inst & 0x08) << 11) + usize::from(tail >> 2);
                if offset == 0 {
                    return Ok(());
                }
                (length, offset + M4_BASE_OFFSET, usize::from(tail & 0x03))
            } else if state == 0 {
                let count = self.extended_length(usize::from(inst), 0x0F)? + 3;
                self.copy_literals(count)?;
                state = 4;
                continue;
            } else if state < 4 {
                let high = usize::from(self.next()?);
                let distance = (high << 2) + usize::from(inst >> 2) + 1;
                (2, distance, usize::from(inst & 0x03))
            } else {
                let high = usize::from(self.next()?);
                let distance = (high << 2) + usize::from(inst >> 2) + M2_MAX_OFFSET + 1;
                (3, distance, usize::from(inst & 0x03))
            };

            self.copy_match(distance, length)?;
            self.copy_literals(next_state)?;
            state = next_state;
        }
    }

    /// Zero-run length extension shared by literal runs and M3/M4 matches.
    fn extended_length(&mut self, base: usize, mask: usize) -> Result<usize, Error> {
        if base != 0 {
            return Ok(base);
        }
        let mut length = mask;
        loop {
            let byte = self.next()?;
            if byte != 0 {
                return Ok(length + usize::from(byte));
            }
            length += 255;
        }
    }

    fn copy_literals(&mut self, count: usize) -> Result<(), Error> {
        let end = self
            .ip
            .checked_add(count)
            .filter(|end| *end <= self.src.len())
            .ok_or_else(|| Error::input_format("compressed body literal run overruns input"))?;
        self.reserve(count)?;
        self.out.extend_from_slice(&self.src[self.ip..end]);
        self.ip = end;
        Ok(())
    }

    fn copy_match(&mut self, distance: usize, length: usize) -> Result<(), Error> {
        let start = self
            .out
            .len()
            .checked_sub(distance)
            .ok_or_else(|| Error::input_format("compressed body references data before start"))?;
        self.reserve(length)?;
        // Matches may overlap their own output.
        for offset in 0..length {
            let byte = self.out[start + offset];
            self.out.push(byte);
        }
        Ok(())
    }

    fn reserve(&self, count: usize) -> Result<(), Error> {
        if self.out.len().saturating_add(count) > self.limit {
            return Err(Error::input_format(format!(
                "compressed body overruns its declared size of {} bytes",
                self.limit
            )));
        }
        Ok(())
    }

    fn peek(&self) -> Result<u8, Error> {
        self.src
            .get(self.ip)
            .copied()
            .ok_or_else(|| Error::input_format("compressed body ends before end marker"))
    }

    fn next(&mut self) -> Result<u8, Error> {
        let byte = self.peek()?;
        self.ip += 1;
        Ok(byte)
    }

    fn next_u16(&mut self) -> Result<u16, Error> {
        let low = self.next()?;
        let high = self.next()?;
        Ok(u16::from_le_bytes([low, high]))
    }
}
