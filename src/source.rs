//! Positional byte sources the cache can sit in front of.
//!
//! [`ReadAt`] is the only thing the cache asks of a backing source: fill a
//! buffer from an absolute offset. A source returns fewer bytes than asked
//! for only when it ran out of input; any other failure is an error. The
//! cached reader checks that such a short read ends exactly at its logical
//! size and reports [`PageCacheError::NoProgress`](crate::error::PageCacheError::NoProgress)
//! otherwise.
//!
//! Implementations are provided for files, byte slices, vectors, and shared
//! wrappers (`&T`, `Arc<T>`, `Box<T>`).

use std::fs::File;
use std::io;
use std::sync::Arc;

/// Random-access, read-only byte source.
///
/// Implementations must be safe to call from many threads at once; the
/// cache issues page fetches concurrently and without holding any lock.
pub trait ReadAt: Send + Sync {
    /// Reads into `buf` starting at `offset`.
    ///
    /// Returns the number of bytes read. A count smaller than `buf.len()`
    /// means the source ended at `offset + count`.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<const N: usize> ReadAt for [u8; N] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Box<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl ReadAt for File {
    /// Loops over the platform positional read until `buf` is full or the
    /// file ends, so short counts only ever mean end of file.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match positional_read(self, &mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

#[cfg(unix)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(windows)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}
