use alloy_primitives::U256;

/// Big-endian encoding of a `u32`.
pub const fn u32_to_be_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Big-endian encoding of a `u64`.
pub const fn u64_to_be_bytes(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Little-endian encoding of a `u64`.
pub const fn u64_to_le_bytes(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Minimal-length little-endian encoding of a big integer. Zero encodes as the
/// empty slice, matching the agglayer signing layout.
pub fn big_int_to_little_endian_bytes(value: U256) -> Vec<u8> {
    let bytes = value.to_le_bytes::<32>();
    let len = 32 - bytes.iter().rev().take_while(|b| **b == 0).count();
    bytes[..len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_int_little_endian_minimal() {
        assert!(big_int_to_little_endian_bytes(U256::ZERO).is_empty());
        assert_eq!(big_int_to_little_endian_bytes(U256::from(1u64)), vec![1]);
        assert_eq!(big_int_to_little_endian_bytes(U256::from(0x0102u64)), vec![0x02, 0x01]);
        let high = U256::from(1u64) << 64;
        assert_eq!(
            big_int_to_little_endian_bytes(high),
            vec![0, 0, 0, 0, 0, 0, 0, 0, 1],
        );
    }
}
