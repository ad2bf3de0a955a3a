//! Turns an async byte source into a stream of UTF-8 text chunks.
//!
//! Reads never split a code point across chunks: an incomplete trailing
//! sequence is carried into the next read. Bytes that can never form valid
//! UTF-8 are replaced with U+FFFD.

use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};

struct Reader<R> {
    inner: R,
    buf: Vec<u8>,
    carry: Vec<u8>,
}

/// Streams `reader` as text, reading at most `chunk_size` bytes at a time.
///
/// The stream ends after EOF or after yielding the first read error.
pub fn utf8_chunks<R>(reader: R, chunk_size: usize) -> impl Stream<Item = std::io::Result<String>>
where
    R: AsyncRead + Unpin,
{
    let state = Reader { inner: reader, buf: vec![0; chunk_size.max(1)], carry: Vec::new() };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            match state.inner.read(&mut state.buf).await {
                Ok(0) => {
                    if state.carry.is_empty() {
                        return None;
                    }
                    // Truncated sequence at EOF.
                    let tail = String::from_utf8_lossy(&state.carry).into_owned();
                    return Some((Ok(tail), None));
                }
                Ok(n) => {
                    state.carry.extend_from_slice(&state.buf[..n]);
                    let text = take_decoded(&mut state.carry);
                    if text.is_empty() {
                        continue;
                    }
                    return Some((Ok(text), Some(state)));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
}

/// Removes and returns the decodable prefix of `carry`.
///
/// Leaves behind only an incomplete sequence at the very end, if any.
fn take_decoded(carry: &mut Vec<u8>) -> String {
    let mut out = String::with_capacity(carry.len());
    let mut pos = 0;
    loop {
        match std::str::from_utf8(&carry[pos..]) {
            Ok(valid) => {
                out.push_str(valid);
                pos = carry.len();
                break;
            }
            Err(e) => {
                let valid_end = pos + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&carry[pos..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pos = valid_end + len;
                    }
                    None => {
                        pos = valid_end;
                        break;
                    }
                }
            }
        }
    }
    carry.drain(..pos);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(bytes: &[u8], chunk_size: usize) -> Vec<String> {
        utf8_chunks(bytes, chunk_size)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn multibyte_chars_are_never_split() {
        let text = "aé✓😀b";
        for size in 1..8 {
            let chunks = collect(text.as_bytes(), size).await;
            assert_eq!(chunks.concat(), text, "chunk size {size}");
            assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }

    #[tokio::test]
    async fn invalid_bytes_become_replacement_chars() {
        let chunks = collect(b"ok\xffthen\xc3", 3).await;
        assert_eq!(chunks.concat(), "ok\u{FFFD}then\u{FFFD}");
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        assert!(collect(b"", 16).await.is_empty());
    }

    #[test]
    fn incomplete_sequence_is_carried() {
        let mut carry = vec![b'x', 0xE2, 0x9C];
        assert_eq!(take_decoded(&mut carry), "x");
        assert_eq!(carry, vec![0xE2, 0x9C]);
        carry.push(0x93);
        assert_eq!(take_decoded(&mut carry), "✓");
        assert!(carry.is_empty());
    }
}
