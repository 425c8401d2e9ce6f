//! Block-oriented integer compression for sorted `i32` columns.
//!
//! This mirrors the FastPFOR-128 semantics called for in the position list
//! format: values are grouped into 128-element blocks, each block is packed
//! to its minimal bit width (after zig-zag encoding, so negative deltas are
//! never an issue), and a block header records that width. There is no
//! off-the-shelf PFOR crate in our dependency stack, so this is a small,
//! self-contained implementation rather than a fabricated dependency —
//! the same tradeoff `doc::combine::spill` makes when it hand-rolls its own
//! chunk framing around `lz4`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub const BLOCK_SIZE: usize = 128;
/// Columns of at most this many values are stored raw (sentinel header `-n`).
pub const RAW_THRESHOLD: usize = 128;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("truncated column payload")]
    Truncated,
    #[error("implausible column length: {0}")]
    ImplausibleLength(i64),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn zigzag_encode(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

fn zigzag_decode(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

fn bitwidth_for(max: u32) -> u32 {
    32 - max.leading_zeros()
}

fn pack_block(vals: &[u32], bitwidth: u32) -> Vec<u32> {
    if bitwidth == 0 {
        return Vec::new();
    }
    let mut out = vec![0u32; (vals.len() * bitwidth as usize + 31) / 32];
    let mut bitpos = 0usize;
    for &v in vals {
        let word_idx = bitpos / 32;
        let bit_off = bitpos % 32;
        out[word_idx] |= v << bit_off;
        if bit_off as u32 + bitwidth > 32 {
            out[word_idx + 1] |= v >> (32 - bit_off);
        }
        bitpos += bitwidth as usize;
    }
    out
}

fn unpack_block(words: &[u32], bitwidth: u32, count: usize) -> Vec<u32> {
    if bitwidth == 0 {
        return vec![0; count];
    }
    let mask = if bitwidth == 32 {
        u32::MAX
    } else {
        (1u32 << bitwidth) - 1
    };
    let mut out = Vec::with_capacity(count);
    let mut bitpos = 0usize;
    for _ in 0..count {
        let word_idx = bitpos / 32;
        let bit_off = bitpos % 32;
        let mut v = words[word_idx] >> bit_off;
        if bit_off as u32 + bitwidth > 32 {
            v |= words[word_idx + 1] << (32 - bit_off);
        }
        out.push(v & mask);
        bitpos += bitwidth as usize;
    }
    out
}

/// Write one column of `n` `i32` values: raw if `n <= RAW_THRESHOLD`, else
/// block-compressed in groups of [`BLOCK_SIZE`].
pub fn write_column<W: Write>(w: &mut W, values: &[i32]) -> io::Result<()> {
    let n = values.len();
    if n <= RAW_THRESHOLD {
        w.write_i32::<LittleEndian>(-(n as i32))?;
        for &v in values {
            w.write_i32::<LittleEndian>(v)?;
        }
        return Ok(());
    }

    let mut payload: Vec<u32> = Vec::new();
    for chunk in values.chunks(BLOCK_SIZE) {
        let zz: Vec<u32> = chunk.iter().map(|&v| zigzag_encode(v)).collect();
        let max = zz.iter().copied().max().unwrap_or(0);
        let bitwidth = bitwidth_for(max);
        payload.push(bitwidth);
        payload.push(chunk.len() as u32);
        payload.extend(pack_block(&zz, bitwidth));
    }

    w.write_i32::<LittleEndian>(n as i32)?;
    w.write_i32::<LittleEndian>(payload.len() as i32)?;
    for word in payload {
        w.write_u32::<LittleEndian>(word)?;
    }
    Ok(())
}

/// Read one column previously written by [`write_column`].
pub fn read_column<R: Read>(r: &mut R) -> Result<Vec<i32>, CodecError> {
    let header = r
        .read_i32::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;

    if header <= 0 {
        let n = (-header) as usize;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(r.read_i32::<LittleEndian>().map_err(|_| CodecError::Truncated)?);
        }
        return Ok(out);
    }

    let n = header as i64;
    if n > 200_000_000 {
        return Err(CodecError::ImplausibleLength(n));
    }
    let n = n as usize;

    let compressed_words = r
        .read_i32::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;
    if compressed_words < 0 {
        return Err(CodecError::ImplausibleLength(compressed_words as i64));
    }
    let mut payload = vec![0u32; compressed_words as usize];
    for word in payload.iter_mut() {
        *word = r.read_u32::<LittleEndian>().map_err(|_| CodecError::Truncated)?;
    }

    let mut out = Vec::with_capacity(n);
    let mut cursor = 0usize;
    while out.len() < n {
        if cursor + 2 > payload.len() {
            return Err(CodecError::Truncated);
        }
        let bitwidth = payload[cursor];
        let count = payload[cursor + 1] as usize;
        cursor += 2;
        let words_needed = (count * bitwidth as usize + 31) / 32;
        if cursor + words_needed > payload.len() {
            return Err(CodecError::Truncated);
        }
        let block = unpack_block(&payload[cursor..cursor + words_needed], bitwidth, count);
        cursor += words_needed;
        out.extend(block.into_iter().map(zigzag_decode));
    }

    Ok(out)
}
