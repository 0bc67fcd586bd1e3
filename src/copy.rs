use crate::BLOCKBYTES;
use std::io;

/// An efficient buffer size for [`State`](../struct.State.html).
///
/// `State` compresses whole blocks straight out of the caller's slice, and
/// only buffers a partial block at the end of each write. A buffer that's a
/// whole number of blocks keeps every write after the first one aligned, so
/// nothing gets copied into the internal buffer except the last block, which
/// has to wait until we know whether it's final.
pub const BUF_BYTES: usize = 64 * BLOCKBYTES;

// This is an implementation detail of libstd, and if it changes there we
// should update it here. This is covered in the tests.
#[allow(dead_code)]
const STD_DEFAULT_BUF_BYTES: usize = 8192;

/// Copies the entire contents of a reader into a writer, just like
/// [`std::io::copy`](https://doc.rust-lang.org/std/io/fn.copy.html), using a
/// buffer size that's a multiple of [`BLOCKBYTES`](../constant.BLOCKBYTES.html).
pub fn copy_wide(reader: &mut impl io::Read, writer: &mut impl io::Write) -> io::Result<u64> {
    let mut buffer = [0; BUF_BYTES];
    let mut total = 0;
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                writer.write_all(&buffer[..n])?;
                total += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
