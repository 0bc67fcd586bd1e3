//! A portable, incremental implementation of the BLAKE2b hash function, as
//! specified in [RFC 7693](https://tools.ietf.org/html/rfc7693).
//!
//! # Examples
//!
//! ```
//! // One-shot hashing with the default 64-byte output.
//! let hash = b2lite::blake2b(b"abc");
//! assert_eq!(hash.len(), 64);
//!
//! // Incremental, keyed hashing with a shorter output.
//! let mut state = b2lite::Params::new()
//!     .hash_length(32)
//!     .key(b"my secret key")
//!     .to_state()?;
//! state.update(b"foo")?.update(b"bar")?;
//! let mac = state.finalize()?;
//! assert_eq!(mac.len(), 32);
//! # Ok::<(), b2lite::Error>(())
//! ```

use arrayref::{array_ref, array_refs, mut_array_refs};
use arrayvec::{ArrayString, ArrayVec};
use core::cmp;
use core::fmt;
use std::io;

pub mod copy;
mod portable;

#[doc(hidden)]
pub mod benchmarks;


type Word = u64;

const WORD_BYTES: usize = core::mem::size_of::<Word>();
const PARAM_BYTES: usize = 8 * WORD_BYTES;

/// The size of a compression block, in bytes.
pub const BLOCKBYTES: usize = 16 * WORD_BYTES;
/// The maximum (and default) digest length.
pub const OUTBYTES: usize = 8 * WORD_BYTES;
/// The maximum key length.
pub const KEYBYTES: usize = 8 * WORD_BYTES;
/// The maximum salt length. Shorter salts are padded with zeros.
pub const SALTBYTES: usize = 2 * WORD_BYTES;
/// The maximum personalization length. Shorter values are padded with zeros.
pub const PERSONALBYTES: usize = 2 * WORD_BYTES;

const IV: [Word; 8] = [
    0x6A09E667F3BCC908,
    0xBB67AE8584CAA73B,
    0x3C6EF372FE94F82B,
    0xA54FF53A5F1D36F1,
    0x510E527FADE682D1,
    0x9B05688C2B3E6C1F,
    0x1F83D9ABFB41BD6B,
    0x5BE0CD19137E2179,
];

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

bitflags::bitflags! {
    struct Flags: u8 {
        const LAST_BLOCK = 1;
        // Only meaningful in tree mode. Sequential hashing never sets it.
        const LAST_NODE = 2;
    }
}

fn count_low(count: u128) -> Word {
    count as Word
}

fn count_high(count: u128) -> Word {
    (count >> (8 * WORD_BYTES)) as Word
}

// All ones if `flag` is set in `flags`, otherwise zero, without branching.
fn flag_mask(flags: u8, flag: Flags) -> Word {
    ((flags & flag.bits()) != 0) as Word * Word::max_value()
}

fn words_from_param_block(bytes: &[u8; PARAM_BYTES]) -> [Word; 8] {
    // Parse the parameter bytes as little endian words.
    let refs = array_refs!(bytes, 8, 8, 8, 8, 8, 8, 8, 8);
    [
        Word::from_le_bytes(*refs.0),
        Word::from_le_bytes(*refs.1),
        Word::from_le_bytes(*refs.2),
        Word::from_le_bytes(*refs.3),
        Word::from_le_bytes(*refs.4),
        Word::from_le_bytes(*refs.5),
        Word::from_le_bytes(*refs.6),
        Word::from_le_bytes(*refs.7),
    ]
}

fn bytes_from_state_words(words: &[Word; 8]) -> [u8; OUTBYTES] {
    let mut bytes = [0; OUTBYTES];
    {
        let refs = mut_array_refs!(&mut bytes, 8, 8, 8, 8, 8, 8, 8, 8);
        *refs.0 = words[0].to_le_bytes();
        *refs.1 = words[1].to_le_bytes();
        *refs.2 = words[2].to_le_bytes();
        *refs.3 = words[3].to_le_bytes();
        *refs.4 = words[4].to_le_bytes();
        *refs.5 = words[5].to_le_bytes();
        *refs.6 = words[6].to_le_bytes();
        *refs.7 = words[7].to_le_bytes();
    }
    bytes
}

fn iv(params: &[Word; 8]) -> [Word; 8] {
    [
        IV[0] ^ params[0],
        IV[1] ^ params[1],
        IV[2] ^ params[2],
        IV[3] ^ params[3],
        IV[4] ^ params[4],
        IV[5] ^ params[5],
        IV[6] ^ params[6],
        IV[7] ^ params[7],
    ]
}

/// The errors this crate can return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A parameter was out of range. Reported before any `State` exists.
    #[error("invalid {what} length {len} (must be between {min} and {max})")]
    InvalidParameter {
        what: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },
    /// `update` or `finalize` was called on a finalized `State`.
    #[error("BLAKE2b state already finalized")]
    StateError,
}

/// A BLAKE2b digest of 1 to 64 bytes. Equality checks are constant time.
#[derive(Clone, Copy)]
pub struct Hash {
    bytes: [u8; OUTBYTES],
    len: u8,
}

impl Hash {
    fn new(bytes: &[u8; OUTBYTES], len: u8) -> Self {
        debug_assert!(len as usize >= 1 && len as usize <= OUTBYTES);
        // Zero the unused tail so that copies never carry extra state bytes.
        let mut truncated = [0; OUTBYTES];
        truncated[..len as usize].copy_from_slice(&bytes[..len as usize]);
        Self {
            bytes: truncated,
            len,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// The digest length in bytes, always the `hash_length` it was
    /// configured with.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn to_hex(&self) -> ArrayString<[u8; 2 * OUTBYTES]> {
        let mut s = ArrayString::new();
        let table = b"0123456789abcdef";
        for &b in self.as_bytes() {
            s.push(table[(b >> 4) as usize] as char);
            s.push(table[(b & 0xf) as usize] as char);
        }
        s
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for Hash {
    fn eq(&self, other: &Hash) -> bool {
        constant_time_eq::constant_time_eq(self.as_bytes(), other.as_bytes())
    }
}

impl PartialEq<[u8]> for Hash {
    fn eq(&self, other: &[u8]) -> bool {
        constant_time_eq::constant_time_eq(self.as_bytes(), other)
    }
}

impl Eq for Hash {}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash(0x{})", self.to_hex())
    }
}

/// A parameter builder for BLAKE2b. Setters that receive an out-of-range
/// value remember the first such error, and `to_state` or `hash` report it
/// as [`Error::InvalidParameter`](enum.Error.html).
#[derive(Clone)]
pub struct Params {
    hash_length: u8,
    key: ArrayVec<[u8; KEYBYTES]>,
    salt: [u8; SALTBYTES],
    personal: [u8; PERSONALBYTES],
    error: Option<Error>,
}

impl Params {
    pub fn new() -> Self {
        Self {
            hash_length: OUTBYTES as u8,
            key: ArrayVec::new(),
            salt: [0; SALTBYTES],
            personal: [0; PERSONALBYTES],
            error: None,
        }
    }

    fn reject(&mut self, what: &'static str, len: usize, min: usize, max: usize) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidParameter {
                what,
                len,
                min,
                max,
            });
        }
    }

    pub fn hash_length(&mut self, length: usize) -> &mut Self {
        if length < 1 || length > OUTBYTES {
            self.reject("hash", length, 1, OUTBYTES);
        } else {
            self.hash_length = length as u8;
        }
        self
    }

    /// An empty key means unkeyed hashing.
    pub fn key(&mut self, key: &[u8]) -> &mut Self {
        if key.len() > KEYBYTES {
            self.reject("key", key.len(), 0, KEYBYTES);
        } else {
            self.key.clear();
            self.key.extend(key.iter().copied());
        }
        self
    }

    pub fn salt(&mut self, salt: &[u8]) -> &mut Self {
        if salt.len() > SALTBYTES {
            self.reject("salt", salt.len(), 0, SALTBYTES);
        } else {
            self.salt = [0; SALTBYTES];
            self.salt[..salt.len()].copy_from_slice(salt);
        }
        self
    }

    pub fn personal(&mut self, personal: &[u8]) -> &mut Self {
        if personal.len() > PERSONALBYTES {
            self.reject("personal", personal.len(), 0, PERSONALBYTES);
        } else {
            self.personal = [0; PERSONALBYTES];
            self.personal[..personal.len()].copy_from_slice(personal);
        }
        self
    }

    // Sequential mode: fanout and depth are 1, every other tree field is 0.
    fn param_block(&self) -> [u8; PARAM_BYTES] {
        let mut block = [0; PARAM_BYTES];
        {
            let (head, _tree, _reserved, salt, personal) =
                mut_array_refs!(&mut block, 4, 14, 14, SALTBYTES, PERSONALBYTES);
            *head = [self.hash_length, self.key.len() as u8, 1, 1];
            *salt = self.salt;
            *personal = self.personal;
        }
        block
    }

    fn initial_words(&self) -> [Word; 8] {
        iv(&words_from_param_block(&self.param_block()))
    }

    pub fn to_state(&self) -> Result<State, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(State::with_params(self)),
        }
    }

    pub fn hash(&self, input: &[u8]) -> Result<Hash, Error> {
        let mut state = self.to_state()?;
        state.absorb(input);
        Ok(state.finish())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

// Omit the key, because it's secret.
impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Params {{ hash_length: {}, key_length: {}, .. }}",
            self.hash_length,
            self.key.len()
        )
    }
}

/// An incremental BLAKE2b state.
///
/// A `State` accepts input through [`update`](#method.update) until
/// [`finalize`](#method.finalize) is called once, after which both methods
/// return [`Error::StateError`](enum.Error.html) until the state is
/// [`reset`](#method.reset).
#[derive(Clone)]
pub struct State {
    h: [Word; 8],
    buf: [u8; BLOCKBYTES],
    buf_len: usize,
    // Bytes compressed so far, not including the buffer.
    count: u128,
    finalized: bool,
    params: Params,
}

impl State {
    /// An unkeyed state with the default 64-byte output.
    pub fn new() -> Self {
        Self::with_params(&Params::new())
    }

    fn with_params(params: &Params) -> Self {
        debug_assert!(params.error.is_none());
        let mut state = Self {
            h: [0; 8],
            buf: [0; BLOCKBYTES],
            buf_len: 0,
            count: 0,
            finalized: false,
            params: params.clone(),
        };
        state.reset();
        state
    }

    /// Return to the freshly initialized state, with the same parameters and
    /// key this state was created with.
    pub fn reset(&mut self) {
        self.h = self.params.initial_words();
        self.buf = [0; BLOCKBYTES];
        self.buf_len = 0;
        self.count = 0;
        self.finalized = false;
        // The key block is buffered like ordinary input, so it's compressed
        // as soon as data follows it, or as the last block if none does.
        if !self.params.key.is_empty() {
            self.buf[..self.params.key.len()].copy_from_slice(&self.params.key);
            self.buf_len = BLOCKBYTES;
        }
    }

    fn fill_buf(&mut self, input: &mut &[u8]) {
        let take = cmp::min(BLOCKBYTES - self.buf_len, input.len());
        self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&input[..take]);
        self.buf_len += take;
        *input = &input[take..];
    }

    fn absorb(&mut self, mut input: &[u8]) {
        // If we have a partial buffer, try to complete it. If we complete it
        // and there's more input waiting (so we know it isn't the last
        // block), compress it.
        if self.buf_len > 0 {
            self.fill_buf(&mut input);
            if !input.is_empty() {
                debug_assert_eq!(self.buf_len, BLOCKBYTES);
                self.count += BLOCKBYTES as u128;
                portable::compress(&mut self.h, &self.buf, self.count, Flags::empty().bits());
                self.buf_len = 0;
            }
        }

        // While there's more than a block of input left, compress it directly
        // instead of buffering it. An exact final block stays behind.
        while input.len() > BLOCKBYTES {
            debug_assert_eq!(self.buf_len, 0);
            self.count += BLOCKBYTES as u128;
            portable::compress(
                &mut self.h,
                array_ref!(input, 0, BLOCKBYTES),
                self.count,
                Flags::empty().bits(),
            );
            input = &input[BLOCKBYTES..];
        }

        self.fill_buf(&mut input);
        debug_assert!(input.is_empty());
    }

    fn finish(&mut self) -> Hash {
        for b in self.buf[self.buf_len..].iter_mut() {
            *b = 0;
        }
        // The counter advances by the real byte count, not the padding.
        self.count += self.buf_len as u128;
        portable::compress(
            &mut self.h,
            &self.buf,
            self.count,
            Flags::LAST_BLOCK.bits(),
        );
        self.finalized = true;
        Hash::new(&bytes_from_state_words(&self.h), self.params.hash_length)
    }

    /// Add input to the hash. Any chunking of the same input gives the same
    /// result.
    pub fn update(&mut self, input: &[u8]) -> Result<&mut Self, Error> {
        if self.finalized {
            return Err(Error::StateError);
        }
        self.absorb(input);
        Ok(self)
    }

    /// Compress the final block and return the digest. This can only happen
    /// once per [`reset`](#method.reset).
    pub fn finalize(&mut self) -> Result<Hash, Error> {
        if self.finalized {
            return Err(Error::StateError);
        }
        Ok(self.finish())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn hash_length(&self) -> usize {
        self.params.hash_length as usize
    }

    pub fn block_size(&self) -> usize {
        BLOCKBYTES
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

// Derive an empty Debug impl, because the contents might be secret.
impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "State {{ ... }}")
    }
}

impl io::Write for State {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash `input` with the default parameters: no key, 64 bytes of output.
pub fn blake2b(input: &[u8]) -> Hash {
    let mut state = State::new();
    state.absorb(input);
    state.finish()
}
