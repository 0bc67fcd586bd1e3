//! Hidden public interfaces that are only intended for benchmarks. These are
//! not stable. If you find yourself needing these in production, please file a
//! GitHub issue.

pub fn compress_portable(
    h: &mut [u64; 8],
    block: &[u8; crate::BLOCKBYTES],
    count: u128,
    last_block: bool,
) {
    let flags = if last_block {
        crate::Flags::LAST_BLOCK
    } else {
        crate::Flags::empty()
    };
    crate::portable::compress(h, block, count, flags.bits())
}
