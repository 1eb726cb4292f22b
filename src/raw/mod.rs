//! Decoder for the MotionCam bit-plane frame codec.
//!
//! A compressed frame starts with a 16-byte header of four little-endian
//! `u32`s: encoded width, encoded height and the offsets of the two metadata
//! streams (per-block bit widths and per-block references). The image is
//! stored as 4-row x 64-column tiles, each tile as four 64-sample blocks
//! whose columns interleave into the four rows. The encoded width is padded
//! up to a multiple of 64; the excess columns are trimmed on output.

mod block;

pub use block::{ENCODING_BLOCK, HEADER_LENGTH};

use crate::{McrawError, Result};
use block::{decode_block, decode_block_stream};

/// Offset of the first block payload in a compressed frame.
pub const METADATA_OFFSET: usize = 16;

struct FrameHeader {
    encoded_width: usize,
    encoded_height: usize,
    bits_offset: usize,
    refs_offset: usize,
}

fn read_frame_header(input: &[u8]) -> Result<FrameHeader> {
    if input.len() < METADATA_OFFSET {
        return Err(McrawError::format("compressed frame shorter than header"));
    }
    let word = |at: usize| {
        u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]) as usize
    };
    Ok(FrameHeader {
        encoded_width: word(0),
        encoded_height: word(4),
        bits_offset: word(8),
        refs_offset: word(12),
    })
}

/// Decodes a compressed frame into a `width * height` Bayer mosaic.
///
/// All structural problems (header preconditions, truncated payloads,
/// undersized metadata streams) surface as a decode failure; the input is
/// never read out of bounds.
pub fn decode(input: &[u8], width: usize, height: usize) -> Result<Vec<u16>> {
    let header = read_frame_header(input)?;

    if header.bits_offset > input.len() || header.refs_offset > input.len() {
        return Err(McrawError::format("metadata stream offset out of range"));
    }
    if header.encoded_width % ENCODING_BLOCK != 0 {
        return Err(McrawError::format(format!(
            "encoded width {} is not a multiple of {ENCODING_BLOCK}",
            header.encoded_width
        )));
    }
    if header.encoded_width < width {
        return Err(McrawError::format(format!(
            "encoded width {} below logical width {width}",
            header.encoded_width
        )));
    }

    let (bits, _) = decode_block_stream(input, header.bits_offset)?;
    let (refs, _) = decode_block_stream(input, header.refs_offset)?;

    let blocks_per_row = header.encoded_width / ENCODING_BLOCK;
    let num_blocks = (header.encoded_height / 4) * blocks_per_row * 4;
    if bits.len() < num_blocks || refs.len() < num_blocks {
        return Err(McrawError::format("metadata streams shorter than tile count"));
    }

    let mut output = vec![0u16; width * height];
    let mut rows = vec![vec![0u16; header.encoded_width]; 4];
    let mut planes = [[0u16; ENCODING_BLOCK]; 4];

    let mut offset = METADATA_OFFSET;
    let mut metadata_idx = 0;
    let mut rows_done = 0usize;

    for _ in 0..header.encoded_height / 4 {
        for x in (0..header.encoded_width).step_by(ENCODING_BLOCK) {
            let block_bits = &bits[metadata_idx..metadata_idx + 4];
            let block_refs = &refs[metadata_idx..metadata_idx + 4];

            for (plane, &b) in planes.iter_mut().zip(block_bits) {
                let decoded = decode_block(plane, b, input, offset);
                if !decoded.complete {
                    return Err(McrawError::format("compressed frame truncated"));
                }
                offset += decoded.consumed;
            }

            // Each plane holds two half-rows of 32 columns; even and odd
            // columns of a row come from alternating planes.
            let [p0, p1, p2, p3] = &planes;
            for i in (0..ENCODING_BLOCK).step_by(2) {
                rows[0][x + i] = p0[i / 2].wrapping_add(block_refs[0]);
                rows[0][x + i + 1] = p1[i / 2].wrapping_add(block_refs[1]);

                rows[1][x + i] = p2[i / 2].wrapping_add(block_refs[2]);
                rows[1][x + i + 1] = p3[i / 2].wrapping_add(block_refs[3]);

                rows[2][x + i] = p0[ENCODING_BLOCK / 2 + i / 2].wrapping_add(block_refs[0]);
                rows[2][x + i + 1] = p1[ENCODING_BLOCK / 2 + i / 2].wrapping_add(block_refs[1]);

                rows[3][x + i] = p2[ENCODING_BLOCK / 2 + i / 2].wrapping_add(block_refs[2]);
                rows[3][x + i + 1] = p3[ENCODING_BLOCK / 2 + i / 2].wrapping_add(block_refs[3]);
            }

            metadata_idx += 4;
        }

        for row in &rows {
            if rows_done == height {
                break;
            }
            output[rows_done * width..(rows_done + 1) * width].copy_from_slice(&row[..width]);
            rows_done += 1;
        }
    }

    if rows_done < height {
        return Err(McrawError::format(format!(
            "decoded {rows_done} of {height} rows"
        )));
    }

    Ok(output)
}
