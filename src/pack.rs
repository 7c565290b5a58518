//! Big-endian integer packing for byte-oriented protocols
//!
//! Widths 1..=4 bytes, most significant byte first. Unpacking a signed
//! value sign-extends from the top bit of the narrowest width.

/// Write the low `dst.len()` bytes of `value` into `dst`, MSB first.
///
/// Panics if `dst` is longer than 4 bytes.
pub fn pack(value: u32, dst: &mut [u8]) {
    let width = dst.len();
    assert!(width <= 4, "pack width {width} exceeds 4 bytes");
    dst.copy_from_slice(&value.to_be_bytes()[4 - width..]);
}

/// Read `src.len()` bytes as an unsigned big-endian value.
///
/// Panics if `src` is longer than 4 bytes.
pub fn unpack(src: &[u8]) -> u32 {
    assert!(src.len() <= 4, "unpack width {} exceeds 4 bytes", src.len());
    src.iter().fold(0, |acc, &byte| (acc << 8) | u32::from(byte))
}

/// Read `src.len()` bytes as a signed big-endian value
pub fn unpack_signed(src: &[u8]) -> i32 {
    let value = unpack(src);
    if src.is_empty() {
        return 0;
    }
    let shift = 32 - 8 * src.len() as u32;
    ((value << shift) as i32) >> shift
}

/// `value` as 2 bytes, MSB first
pub fn pack_u16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// 2 big-endian bytes as unsigned
pub fn unpack_u16(src: [u8; 2]) -> u16 {
    u16::from_be_bytes(src)
}

/// `value` as 2 bytes, two's complement, MSB first
pub fn pack_i16(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

/// 2 big-endian bytes as signed
pub fn unpack_i16(src: [u8; 2]) -> i16 {
    i16::from_be_bytes(src)
}

/// Low 24 bits of `value`
pub fn pack_u24(value: u32) -> [u8; 3] {
    let mut dst = [0; 3];
    pack(value, &mut dst);
    dst
}

/// 3 big-endian bytes as unsigned
pub fn unpack_u24(src: [u8; 3]) -> u32 {
    unpack(&src)
}

/// Low 24 bits of `value`, two's complement
pub fn pack_i24(value: i32) -> [u8; 3] {
    pack_u24(value as u32)
}

/// 3 big-endian bytes, sign-extended from bit 23
pub fn unpack_i24(src: [u8; 3]) -> i32 {
    unpack_signed(&src)
}

/// `value` as 4 bytes, MSB first
pub fn pack_u32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// 4 big-endian bytes as unsigned
pub fn unpack_u32(src: [u8; 4]) -> u32 {
    u32::from_be_bytes(src)
}

/// `value` as 4 bytes, two's complement, MSB first
pub fn pack_i32(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

/// 4 big-endian bytes as signed
pub fn unpack_i32(src: [u8; 4]) -> i32 {
    i32::from_be_bytes(src)
}
