/// Folds a running one's complement sum down to 16 bits.
fn fold(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// One's complement sum of `data` taken as big-endian 16-bit words. An odd trailing byte is
/// padded with zero.
pub fn ones_complement_sum(data: &[u8]) -> u16 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = chunks.by_ref().fold(0u64, |acc, word| {
        acc + u64::from(u16::from_be_bytes([word[0], word[1]]))
    });
    if let [last] = chunks.remainder() {
        sum += u64::from(*last) << 8;
    }
    fold(sum)
}

/// RFC 1071 internet checksum of `data`.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !ones_complement_sum(data)
}

/// True when `data`, checksum field included, sums to all ones.
pub fn checksum_valid(data: &[u8]) -> bool {
    ones_complement_sum(data) == 0xFFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1071_example() {
        // Sample words from RFC 1071 section 3.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(ones_complement_sum(&data), 0xddf2);
        assert_eq!(internet_checksum(&data), 0x220d);
    }

    #[test]
    fn odd_length_is_padded() {
        assert_eq!(ones_complement_sum(&[0x12]), 0x1200);
        assert_eq!(ones_complement_sum(&[0x12, 0x34, 0x56]), 0x6834);
    }

    #[test]
    fn large_input_does_not_overflow() {
        // Every word is 0xffff, which is negative zero in one's complement.
        let data = vec![0xff; 200_000];
        assert_eq!(ones_complement_sum(&data), 0xffff);
        assert_eq!(internet_checksum(&data), 0);
        assert!(checksum_valid(&data));

        let mut data = vec![0u8; 300_001];
        data[300_000] = 0x01;
        assert_eq!(ones_complement_sum(&data), 0x0100);
    }

    #[test]
    fn known_ipv4_header() {
        let mut header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        let checksum = internet_checksum(&header);
        assert_eq!(checksum, 0xb861);
        header[10..12].copy_from_slice(&checksum.to_be_bytes());
        assert!(checksum_valid(&header));
        header[8] = 0x3f;
        assert!(!checksum_valid(&header));
    }
}
