//! Cached random-access view of one logical object.
//!
//! A [`CachedReader`] translates byte-range reads into page lookups against
//! the shared [`PageCache`]. Misses are fetched from the backing source one
//! whole page at a time, with no bucket lock held, and then published for
//! every other reader of the same object id.

use std::io::{self, SeekFrom};

use tracing::warn;

use crate::error::{PageCacheError, ReadError};
use crate::pagecache::{PageCache, Region};
use crate::source::ReadAt;

/// Cached view of the first `size` bytes of a backing source.
///
/// Created by [`PageCache::wrap`]. Safe to share between threads; every
/// call is independent and carries no position.
#[derive(Debug, Clone)]
pub struct CachedReader<R> {
    cache: PageCache,
    object_id: u32,
    source: R,
    size: i64,
}

impl<R: ReadAt> CachedReader<R> {
    pub(crate) fn new(cache: PageCache, object_id: u32, source: R, size: i64) -> Self {
        Self {
            cache,
            object_id,
            source,
            size,
        }
    }

    pub fn object_id(&self) -> u32 {
        self.object_id
    }

    /// Logical size in bytes.
    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns `Ok(0)` at or past the logical size; a range extending past
    /// the logical size is truncated. On failure the error reports how many
    /// bytes were already copied to the front of `buf`.
    pub fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize, ReadError> {
        if offset < 0 {
            return Err(ReadError::new(
                0,
                PageCacheError::OffsetOutOfRange {
                    offset,
                    size: self.size,
                },
            ));
        }
        if offset >= self.size {
            return Ok(0);
        }

        let remaining = usize::try_from(self.size - offset).unwrap_or(usize::MAX);
        let len = buf.len().min(remaining);
        let buf = &mut buf[..len];

        let shift = self.cache.page_shift();
        let page_size = self.cache.page_size();
        let mut offset = offset as u64;
        let mut copied = 0;
        // Allocated on the first partial-page miss only.
        let mut scratch: Vec<u8> = Vec::new();

        while copied < buf.len() {
            let page_offset = (offset >> shift) << shift;
            let intra = (offset - page_offset) as usize;
            let Ok(page_index) = u32::try_from(offset >> shift) else {
                return Err(ReadError::new(
                    copied,
                    PageCacheError::OffsetOutOfRange {
                        offset: offset as i64,
                        size: self.size,
                    },
                ));
            };

            let key = Region::new(self.object_id, page_index);
            let bucket = self.cache.bucket(key);
            let dest = &mut buf[copied..];
            let want = dest.len().min(page_size - intra);

            if !bucket.read(key, &mut dest[..want], intra) {
                let slot = bucket
                    .acquire_slot()
                    .ok_or_else(|| ReadError::new(copied, PageCacheError::NoFreePages))?;

                // A request covering the whole page is fetched straight into
                // `dest`; partial pages go through `scratch`.
                let whole_page = want == page_size;
                let page: &mut [u8] = if whole_page {
                    &mut dest[..page_size]
                } else {
                    if scratch.is_empty() {
                        scratch.resize(page_size, 0);
                    }
                    &mut scratch
                };
                let fetched = match self.fetch_page(page, page_offset) {
                    Ok(fetched) => fetched,
                    Err(err) => {
                        bucket.release(slot);
                        return Err(ReadError::new(copied, err));
                    },
                };
                bucket.install(key, slot, &page[..fetched]);

                // An accepted short page still reaches the logical end, so it
                // covers everything this request wants from it.
                if !whole_page {
                    dest[..want].copy_from_slice(&scratch[intra..intra + want]);
                }
            }

            copied += want;
            offset += want as u64;
        }

        Ok(copied)
    }

    /// Fills `page` from the source at `page_offset`, accepting a short count
    /// only when it ends at or past the logical size.
    fn fetch_page(&self, page: &mut [u8], page_offset: u64) -> Result<usize, PageCacheError> {
        let read = self.source.read_at(page, page_offset)?;
        if read < page.len() && page_offset + (read as u64) < self.size as u64 {
            warn!(
                object_id = self.object_id,
                offset = page_offset,
                read,
                size = self.size,
                "backing source ended before the logical size"
            );
            return Err(PageCacheError::NoProgress {
                offset: page_offset,
                expected: page.len(),
                read,
            });
        }
        Ok(read)
    }

    /// Returns a seekable stream over this reader, starting at offset 0.
    pub fn cursor(&self) -> CachedCursor<'_, R> {
        CachedCursor {
            reader: self,
            position: 0,
        }
    }
}

impl<R: ReadAt> ReadAt for CachedReader<R> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        match i64::try_from(offset) {
            Ok(offset) => CachedReader::read_at(self, buf, offset).map_err(io::Error::from),
            Err(_) => Ok(0),
        }
    }
}

/// Sequential [`io::Read`] + [`io::Seek`] adapter over a [`CachedReader`].
#[derive(Debug)]
pub struct CachedCursor<'a, R> {
    reader: &'a CachedReader<R>,
    position: u64,
}

impl<R> CachedCursor<'_, R> {
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: ReadAt> io::Read for CachedCursor<'_, R> {
    /// A failure after some bytes were copied is reported as a short read;
    /// the error surfaces on the next call.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(offset) = i64::try_from(self.position) else {
            return Ok(0);
        };
        let n = match self.reader.read_at(buf, offset) {
            Ok(n) => n,
            Err(err) if err.copied() > 0 => err.copied(),
            Err(err) => return Err(err.into()),
        };
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: ReadAt> io::Seek for CachedCursor<'_, R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(position) => {
                self.position = position;
                return Ok(position);
            },
            SeekFrom::End(delta) => (self.reader.size as u64, delta),
            SeekFrom::Current(delta) => (self.position, delta),
        };
        match base.checked_add_signed(delta) {
            Some(position) => {
                self.position = position;
                Ok(position)
            },
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
