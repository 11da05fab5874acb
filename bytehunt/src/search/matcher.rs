use memchr::memmem::Finder;
use std::io::{self, Read};

use super::cancel::Cancellation;

/// Default number of fresh bytes pulled from the reader per iteration
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Larger block sizes are clamped to this
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Decides whether a literal byte sequence occurs anywhere in a stream.
///
/// The stream is consumed through a window of `needle.len() - 1 + block_size`
/// bytes. After each unsuccessful search the last `needle.len() - 1` bytes of
/// the window are carried to its front before the next block is appended, so
/// a needle straddling two blocks is still seen while memory stays bounded.
/// Needles longer than the block size are fine: the carry grows with the
/// needle, not with the block.
#[derive(Debug, Clone)]
pub struct ByteMatcher {
    finder: Finder<'static>,
    block_size: usize,
}

impl ByteMatcher {
    /// Returns `None` for an empty needle. `block_size` is clamped to
    /// `1..=MAX_BLOCK_SIZE`.
    pub fn new(needle: &[u8], block_size: usize) -> Option<Self> {
        if needle.is_empty() {
            return None;
        }
        Some(Self {
            finder: Finder::new(needle).into_owned(),
            block_size: block_size.clamp(1, MAX_BLOCK_SIZE),
        })
    }

    pub fn needle(&self) -> &[u8] {
        self.finder.needle()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Scans the whole stream
    pub fn contains<R: Read>(&self, reader: R) -> io::Result<bool> {
        self.contains_cancellable(reader, &Cancellation::new())
    }

    /// Scans until a match, end of stream, or cancellation. A cancelled scan
    /// reports `false`; the flag is checked between block reads.
    pub fn contains_cancellable<R: Read>(
        &self,
        mut reader: R,
        cancel: &Cancellation,
    ) -> io::Result<bool> {
        let needle_len = self.needle().len();
        let carry = needle_len - 1;
        let window_len = carry.checked_add(self.block_size).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "needle too long for a block window")
        })?;
        let mut window = vec![0u8; window_len];

        let mut filled = fill(&mut reader, &mut window)?;
        let mut exhausted = filled < window.len();

        loop {
            if filled >= needle_len && self.finder.find(&window[..filled]).is_some() {
                return Ok(true);
            }
            if exhausted || cancel.is_cancelled() {
                return Ok(false);
            }

            let keep = carry.min(filled);
            window.copy_within(filled - keep..filled, 0);
            let read = fill(&mut reader, &mut window[keep..keep + self.block_size])?;
            exhausted = read < self.block_size;
            filled = keep + read;
        }
    }
}

/// Reads until `buf` is full or the reader reports end of stream.
/// Short reads are not end of stream.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
