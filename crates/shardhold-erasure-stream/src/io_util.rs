//! Small read-loop helper shared by every streaming operation.

use std::io::Read;

use shardhold_common::{Error, Result};

/// Fill `buf` completely from `reader`, stopping early only at EOF. Returns
/// the number of bytes actually read — `buf.len()` unless the reader ran
/// out first, which is how the streaming loop detects the final, possibly
/// short, round.
pub fn read_fill<R: Read>(reader: &mut R, buf: &mut [u8], stream: usize) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader
            .read(&mut buf[total..])
            .map_err(|source| Error::StreamRead { stream, source })?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_full_buffer_when_available() {
        let mut data: &[u8] = b"hello world";
        let mut buf = [0u8; 5];
        let n = read_fill(&mut data, &mut buf, 0).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn stops_short_at_eof() {
        let mut data: &[u8] = b"hi";
        let mut buf = [0u8; 5];
        let n = read_fill(&mut data, &mut buf, 0).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..2], b"hi");
    }
}
