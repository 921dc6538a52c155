//! Morton (Z-order) indexing of blocks inside a WKW file

/// Interleave the bits of a block coordinate, x in the least significant bit
pub const fn morton_encode(coord: [u64; 3]) -> u64 {
    spread_bits(coord[0]) | (spread_bits(coord[1]) << 1) | (spread_bits(coord[2]) << 2)
}

/// Inverse of [`morton_encode`]
pub const fn morton_decode(code: u64) -> [u64; 3] {
    [
        compact_bits(code),
        compact_bits(code >> 1),
        compact_bits(code >> 2),
    ]
}

// Only the lower 21 bits of each coordinate fit into 63 bits
const fn spread_bits(value: u64) -> u64 {
    let mut x = value & 0x1f_ffff;
    x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x << 2)) & 0x1249_2492_4924_9249;
    x
}

const fn compact_bits(value: u64) -> u64 {
    let mut x = value & 0x1249_2492_4924_9249;
    x = (x | (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x | (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x | (x >> 32)) & 0x1f_ffff;
    x
}
