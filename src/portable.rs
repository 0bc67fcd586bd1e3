use crate::{count_high, count_low, flag_mask, Flags, Word, BLOCKBYTES, IV, SIGMA};
use arrayref::array_refs;

#[inline(always)]
fn words_from_block(bytes: &[u8; BLOCKBYTES]) -> [Word; 16] {
    let refs = array_refs!(bytes, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8);
    [
        Word::from_le_bytes(*refs.0),
        Word::from_le_bytes(*refs.1),
        Word::from_le_bytes(*refs.2),
        Word::from_le_bytes(*refs.3),
        Word::from_le_bytes(*refs.4),
        Word::from_le_bytes(*refs.5),
        Word::from_le_bytes(*refs.6),
        Word::from_le_bytes(*refs.7),
        Word::from_le_bytes(*refs.8),
        Word::from_le_bytes(*refs.9),
        Word::from_le_bytes(*refs.10),
        Word::from_le_bytes(*refs.11),
        Word::from_le_bytes(*refs.12),
        Word::from_le_bytes(*refs.13),
        Word::from_le_bytes(*refs.14),
        Word::from_le_bytes(*refs.15),
    ]
}

#[inline(always)]
pub(crate) fn g(v: &mut [Word; 16], a: usize, b: usize, c: usize, d: usize, x: Word, y: Word) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

#[inline(always)]
fn round(v: &mut [Word; 16], msg: &[Word; 16], round: usize) {
    // Rounds 10 and 11 wrap around to the first two permutations.
    let s = &SIGMA[round % 10];

    // Mix the columns.
    g(v, 0, 4, 8, 12, msg[s[0]], msg[s[1]]);
    g(v, 1, 5, 9, 13, msg[s[2]], msg[s[3]]);
    g(v, 2, 6, 10, 14, msg[s[4]], msg[s[5]]);
    g(v, 3, 7, 11, 15, msg[s[6]], msg[s[7]]);

    // Mix the diagonals.
    g(v, 0, 5, 10, 15, msg[s[8]], msg[s[9]]);
    g(v, 1, 6, 11, 12, msg[s[10]], msg[s[11]]);
    g(v, 2, 7, 8, 13, msg[s[12]], msg[s[13]]);
    g(v, 3, 4, 9, 14, msg[s[14]], msg[s[15]]);
}

/// The BLAKE2b compression function F. `count` is the total number of bytes
/// hashed *including* this block, and `flags` is a combination of the
/// `LAST_BLOCK` and `LAST_NODE` bits.
pub fn compress(h: &mut [Word; 8], block: &[u8; BLOCKBYTES], count: u128, flags: u8) {
    let m = words_from_block(block);
    let mut v = [
        h[0],
        h[1],
        h[2],
        h[3],
        h[4],
        h[5],
        h[6],
        h[7],
        IV[0],
        IV[1],
        IV[2],
        IV[3],
        IV[4] ^ count_low(count),
        IV[5] ^ count_high(count),
        IV[6] ^ flag_mask(flags, Flags::LAST_BLOCK),
        IV[7] ^ flag_mask(flags, Flags::LAST_NODE),
    ];

    round(&mut v, &m, 0);
    round(&mut v, &m, 1);
    round(&mut v, &m, 2);
    round(&mut v, &m, 3);
    round(&mut v, &m, 4);
    round(&mut v, &m, 5);
    round(&mut v, &m, 6);
    round(&mut v, &m, 7);
    round(&mut v, &m, 8);
    round(&mut v, &m, 9);
    round(&mut v, &m, 10);
    round(&mut v, &m, 11);

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}
