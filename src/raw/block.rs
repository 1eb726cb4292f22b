//! Bit-plane block codec.
//!
//! Each block packs 64 unsigned samples at a fixed bit width from
//! {0,1,2,3,4,5,6,8,10,16}. A two-byte header precedes the payload: the high
//! nibble of byte 0 is the width, the low nibble concatenated with byte 1 is
//! a 12-bit reference added to every decoded sample. Widths 7 and 9 alias 8
//! and 10; any other nibble decodes as 16.

use crate::{McrawError, Result};

/// Samples per block.
pub const ENCODING_BLOCK: usize = 64;

/// Bytes of the per-block header.
pub const HEADER_LENGTH: usize = 2;

/// Payload bytes consumed by a block of the given width.
pub(crate) fn payload_len(bits: u16) -> usize {
    match bits {
        0 => 0,
        1 => 8,
        2 => 16,
        3 => 24,
        4 => 32,
        5 => 40,
        6 => 48,
        7 | 8 => 64,
        9 | 10 => 80,
        _ => 128,
    }
}

/// Result of [`decode_block`]: how many input bytes were consumed, and
/// whether a full block was actually produced.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockDecode {
    pub consumed: usize,
    pub complete: bool,
}

/// Decodes one 64-sample block at `bits` from `input[offset..]`.
///
/// If the payload would read past the end of `input`, nothing is decoded and
/// the remaining byte count is reported as consumed; callers treat this as
/// end-of-stream.
pub(crate) fn decode_block(
    output: &mut [u16; ENCODING_BLOCK],
    bits: u16,
    input: &[u8],
    offset: usize,
) -> BlockDecode {
    let len = payload_len(bits);
    if offset + len > input.len() {
        return BlockDecode {
            consumed: input.len().saturating_sub(offset),
            complete: false,
        };
    }
    let payload = &input[offset..offset + len];

    match bits {
        0 => output.fill(0),
        1 => decode1(output, payload),
        2 => {
            decode2_run(&mut output[..32], &payload[..8]);
            decode2_run(&mut output[32..], &payload[8..]);
        }
        3 => decode3(output, payload),
        4 => {
            for (run, chunk) in output.chunks_exact_mut(16).zip(payload.chunks_exact(8)) {
                decode4_run(run, chunk);
            }
        }
        5 => decode5(output, payload),
        6 => decode6(output, payload),
        7 | 8 => {
            for (out, byte) in output.iter_mut().zip(payload) {
                *out = u16::from(*byte);
            }
        }
        9 | 10 => {
            decode10_run(&mut output[..32], &payload[..40]);
            decode10_run(&mut output[32..], &payload[40..]);
        }
        _ => {
            for (out, pair) in output.iter_mut().zip(payload.chunks_exact(2)) {
                *out = u16::from_le_bytes([pair[0], pair[1]]);
            }
        }
    }

    BlockDecode {
        consumed: len,
        complete: true,
    }
}

// One bit per sample: bit j of byte i feeds sample j*8+i.
fn decode1(output: &mut [u16], p: &[u8]) {
    for i in 0..8 {
        for j in 0..8 {
            output[j * 8 + i] = u16::from((p[i] >> j) & 0x01);
        }
    }
}

// 32 samples from 8 bytes, 2 bits each.
fn decode2_run(output: &mut [u16], p: &[u8]) {
    for i in 0..8 {
        for j in 0..4 {
            output[j * 8 + i] = u16::from((p[i] >> (2 * j)) & 0x03);
        }
    }
}

// Rows 2 and 5 borrow their top bit from the high bits of the third chunk.
fn decode3(output: &mut [u16], p: &[u8]) {
    let (p0, rest) = p.split_at(8);
    let (p1, p2) = rest.split_at(8);
    for i in 0..8 {
        let r0 = u16::from(p0[i] & 0x07);
        let r1 = u16::from((p0[i] >> 3) & 0x07);
        let r2 = u16::from((p0[i] >> 6) & 0x03) | (u16::from((p2[i] >> 6) & 0x01) << 2);
        let r3 = u16::from(p1[i] & 0x07);
        let r4 = u16::from((p1[i] >> 3) & 0x07);
        let r5 = u16::from((p1[i] >> 6) & 0x03) | (u16::from((p2[i] >> 7) & 0x01) << 2);
        let r6 = u16::from(p2[i] & 0x07);
        let r7 = u16::from((p2[i] >> 3) & 0x07);

        output[i] = r0;
        output[8 + i] = r1;
        output[16 + i] = r2;
        output[24 + i] = r3;
        output[32 + i] = r4;
        output[40 + i] = r5;
        output[48 + i] = r6;
        output[56 + i] = r7;
    }
}

// 16 samples from 8 bytes: low nibbles then high nibbles.
fn decode4_run(output: &mut [u16], p: &[u8]) {
    for i in 0..8 {
        output[i] = u16::from(p[i] & 0x0F);
        output[8 + i] = u16::from((p[i] >> 4) & 0x0F);
    }
}

// Rows 5..7 are reassembled from the top three bits of the five chunks.
fn decode5(output: &mut [u16], p: &[u8]) {
    for i in 0..8 {
        let p0 = p[i];
        let p1 = p[8 + i];
        let p2 = p[16 + i];
        let p3 = p[24 + i];
        let p4 = p[32 + i];

        let r5 = u16::from((p0 >> 5) & 0x07) | (u16::from((p3 >> 5) & 0x03) << 3);
        let r6 = u16::from((p1 >> 5) & 0x07) | (u16::from((p4 >> 5) & 0x03) << 3);
        let r7 = u16::from((p2 >> 5) & 0x07)
            | (u16::from((p3 >> 7) & 0x01) << 3)
            | (u16::from((p4 >> 7) & 0x01) << 4);

        output[i] = u16::from(p0 & 0x1F);
        output[8 + i] = u16::from(p1 & 0x1F);
        output[16 + i] = u16::from(p2 & 0x1F);
        output[24 + i] = u16::from(p3 & 0x1F);
        output[32 + i] = u16::from(p4 & 0x1F);
        output[40 + i] = r5;
        output[48 + i] = r6;
        output[56 + i] = r7;
    }
}

// Rows 6 and 7 are reassembled from the top two bits of the six chunks.
fn decode6(output: &mut [u16], p: &[u8]) {
    for i in 0..8 {
        let top = |byte: u8| u16::from((byte >> 6) & 0x03);

        let r6 = top(p[i]) | (top(p[8 + i]) << 2) | (top(p[16 + i]) << 4);
        let r7 = top(p[24 + i]) | (top(p[32 + i]) << 2) | (top(p[40 + i]) << 4);

        output[i] = u16::from(p[i] & 0x3F);
        output[8 + i] = u16::from(p[8 + i] & 0x3F);
        output[16 + i] = u16::from(p[16 + i] & 0x3F);
        output[24 + i] = u16::from(p[24 + i] & 0x3F);
        output[32 + i] = u16::from(p[32 + i] & 0x3F);
        output[40 + i] = u16::from(p[40 + i] & 0x3F);
        output[48 + i] = r6;
        output[56 + i] = r7;
    }
}

// 32 samples from 40 bytes: four low-byte chunks plus one chunk carrying
// bits 8..9 of each sample.
fn decode10_run(output: &mut [u16], p: &[u8]) {
    for i in 0..8 {
        let hi = p[32 + i];
        output[i] = u16::from(p[i]) | (u16::from(hi & 0x03) << 8);
        output[8 + i] = u16::from(p[8 + i]) | (u16::from(hi & 0x0C) << 6);
        output[16 + i] = u16::from(p[16 + i]) | (u16::from(hi & 0x30) << 4);
        output[24 + i] = u16::from(p[24 + i]) | (u16::from(hi & 0xC0) << 2);
    }
}

/// Splits a two-byte block header into `(bits, reference)`.
pub(crate) fn split_header(b0: u8, b1: u8) -> (u16, u16) {
    let bits = u16::from((b0 >> 4) & 0x0F);
    let reference = (u16::from(b0 & 0x0F) << 8) | u16::from(b1);
    (bits, reference)
}

/// Decodes a block stream ("metadata stream"): a little-endian `u32` count
/// followed by enough blocks to cover it, each the usual header + payload
/// with the reference added afterwards.
///
/// Returns the decoded values (exactly `count` of them) and the input offset
/// one past the stream.
pub(crate) fn decode_block_stream(input: &[u8], mut offset: usize) -> Result<(Vec<u16>, usize)> {
    if offset + 4 > input.len() {
        return Err(McrawError::format("metadata stream offset out of range"));
    }
    let count = u32::from_le_bytes([
        input[offset],
        input[offset + 1],
        input[offset + 2],
        input[offset + 3],
    ]) as usize;
    offset += 4;

    let num_blocks = count.div_ceil(ENCODING_BLOCK);
    let mut values = vec![0u16; num_blocks * ENCODING_BLOCK];

    let mut block = [0u16; ENCODING_BLOCK];
    for chunk in values.chunks_exact_mut(ENCODING_BLOCK) {
        if offset + HEADER_LENGTH > input.len() {
            return Err(McrawError::format("metadata stream truncated"));
        }
        let (bits, reference) = split_header(input[offset], input[offset + 1]);
        offset += HEADER_LENGTH;

        block.fill(0);
        offset += decode_block(&mut block, bits, input, offset).consumed;

        for (out, sample) in chunk.iter_mut().zip(&block) {
            *out = sample.wrapping_add(reference);
        }
    }

    values.truncate(count);
    Ok((values, offset))
}
