use rand::Rng;

/// XOR `data` with the 4-byte masking key, starting at key index `0`.
///
/// Masking and unmasking are the same operation.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}

/// Fresh masking key, as a client would pick for every frame it sends.
#[inline]
pub fn rand_key() -> [u8; 4] {
    rand::thread_rng().gen()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmask_hello() {
        let mut data = [0x7f, 0x9f, 0x4d, 0x51, 0x58];
        apply_mask(&mut data, [0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(&data, b"Hello");
    }

    #[test]
    fn mask_is_involution() {
        let key = rand_key();
        let mut data = b"and a happy new year!".to_vec();
        apply_mask(&mut data, key);
        apply_mask(&mut data, key);
        assert_eq!(data, b"and a happy new year!");
    }
}
