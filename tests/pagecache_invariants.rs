// ==============================================
// PAGE CACHE INVARIANT TESTS (integration)
// ==============================================
//
// Behavior observable only through the public cache surface: eviction order
// within a shard, shard routing, read boundaries, and file-backed reads.

use std::io::Write;

use pagecache::{PageCache, PageCacheBuilder, PageCacheError};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PAGE: usize = 16;

fn cache(page_size: usize, page_count: usize) -> PageCache {
    PageCacheBuilder::new()
        .page_size(page_size)
        .page_count(page_count)
        .build()
        .unwrap()
}

/// First `n` page indices of `object_id` that route to the same shard.
fn colliding_pages(cache: &PageCache, object_id: u32, n: usize) -> Vec<u32> {
    let target = cache.shard_of(object_id, 0);
    (0..)
        .filter(|&page| cache.shard_of(object_id, page) == target)
        .take(n)
        .collect()
}

/// Reads one byte from `page` and reports whether it was a hit.
fn touch(cache: &PageCache, file: &pagecache::CachedReader<Vec<u8>>, page: u32) -> bool {
    let before = cache.stats().hits;
    let mut buf = [0u8; 1];
    assert_eq!(file.read_at(&mut buf, page as i64 * PAGE as i64).unwrap(), 1);
    assert_eq!(buf[0], page as u8);
    cache.stats().hits > before
}

fn paged_source(pages: u32) -> Vec<u8> {
    (0..pages).flat_map(|page| [page as u8; PAGE]).collect()
}

// ==============================================
// LRU Law
// ==============================================
//
// Two slots per shard. Keys are picked so they collide in one shard.

mod lru_law {
    use super::*;

    #[test]
    fn full_shard_evicts_least_recently_touched() {
        let cache = cache(PAGE, 128);
        let pages = colliding_pages(&cache, 1, 3);
        let source = paged_source(pages[2] + 1);
        let file = cache.wrap(1, source.clone(), source.len() as i64);
        let (a, b, c) = (pages[0], pages[1], pages[2]);

        assert!(!touch(&cache, &file, a));
        assert!(!touch(&cache, &file, b));
        assert!(!touch(&cache, &file, c)); // evicts a

        assert_eq!(cache.stats().evictions, 1);
        assert!(touch(&cache, &file, c));
        assert!(!touch(&cache, &file, a)); // evicts b
        assert!(!touch(&cache, &file, b));
        cache.debug_validate_invariants();
    }

    #[test]
    fn hit_promotes_over_untouched_entries() {
        let cache = cache(PAGE, 128);
        let pages = colliding_pages(&cache, 2, 3);
        let source = paged_source(pages[2] + 1);
        let file = cache.wrap(2, source.clone(), source.len() as i64);
        let (a, b, c) = (pages[0], pages[1], pages[2]);

        touch(&cache, &file, a);
        touch(&cache, &file, b);
        assert!(touch(&cache, &file, a)); // a is now most recent

        assert!(!touch(&cache, &file, c)); // evicts b, not a
        assert!(touch(&cache, &file, a));
        assert!(!touch(&cache, &file, b));
    }

    #[test]
    fn shards_do_not_share_capacity() {
        let cache = cache(PAGE, 64);
        let pages = colliding_pages(&cache, 3, 2);
        let source = paged_source(pages[1] + 1);
        let file = cache.wrap(3, source.clone(), source.len() as i64);

        touch(&cache, &file, pages[0]);
        touch(&cache, &file, pages[1]);

        // One slot per shard: the second page displaced the first even
        // though 63 other shards are empty.
        assert_eq!(cache.resident_pages(), 1);
        assert_eq!(cache.free_pages(), 63);
        assert!(!touch(&cache, &file, pages[0]));
    }
}

// ==============================================
// Shard Routing
// ==============================================

mod shard_routing {
    use super::*;

    #[test]
    fn routing_is_stable_within_an_instance() {
        let cache = cache(4096, 64);
        let first: Vec<usize> = (0..1000).map(|page| cache.shard_of(9, page)).collect();
        let again: Vec<usize> = (0..1000).map(|page| cache.shard_of(9, page)).collect();
        assert_eq!(first, again);
        assert!(first.iter().all(|&shard| shard < cache.shard_count()));
    }

    #[test]
    fn keys_spread_over_shards() {
        let cache = cache(4096, 64);
        let mut seen = vec![false; cache.shard_count()];
        for page in 0..4096 {
            seen[cache.shard_of(0, page)] = true;
        }
        assert!(seen.iter().filter(|&&hit| hit).count() > cache.shard_count() / 2);
    }
}

// ==============================================
// Boundaries
// ==============================================

mod boundaries {
    use super::*;

    #[test]
    fn end_of_input_and_truncation() {
        let cache = cache(PAGE, 64);
        let source: Vec<u8> = (0..100).collect();
        let file = cache.wrap(1, source.clone(), 100);
        let mut buf = [0u8; 8];

        assert_eq!(file.read_at(&mut buf, 100).unwrap(), 0);
        assert_eq!(file.read_at(&mut buf[..1], 99).unwrap(), 1);
        assert_eq!(buf[0], 99);
        assert_eq!(file.read_at(&mut buf, 96).unwrap(), 4);
        assert_eq!(&buf[..4], &source[96..]);
    }

    #[test]
    fn negative_offset_is_a_range_error() {
        let cache = cache(PAGE, 64);
        let file = cache.wrap(1, vec![0u8; 10], 10);
        let err = file.read_at(&mut [0u8; 4], -5).unwrap_err();
        assert!(matches!(
            err.error(),
            PageCacheError::OffsetOutOfRange { offset: -5, .. }
        ));
        assert_eq!(cache.stats().lookups, 0);
    }

    #[test]
    fn negative_size_wraps_as_empty() {
        let cache = cache(PAGE, 64);
        let file = cache.wrap(1, vec![1u8; 10], -3);
        assert_eq!(file.size(), 0);
        assert_eq!(file.read_at(&mut [0u8; 4], 0).unwrap(), 0);
    }

    #[test]
    fn page_index_beyond_key_range_is_a_range_error() {
        let cache = cache(1, 64);
        let file = cache.wrap(1, vec![0u8; 4], i64::MAX);
        let offset = 1i64 << 33;
        let err = file.read_at(&mut [0u8; 4], offset).unwrap_err();
        assert_eq!(err.copied(), 0);
        assert!(matches!(err.error(), PageCacheError::OffsetOutOfRange { .. }));
    }
}

// ==============================================
// File-backed Scenario
// ==============================================
//
// 8192-byte pages, 1024 pages, a 20 MB file read once from start to end in
// page-aligned chunks: exact contents, and every page access a miss.

mod file_backed {
    use super::*;

    #[test]
    fn cold_sequential_pass_reproduces_file() {
        const SIZE: usize = 20 * 1024 * 1024;
        const CHUNK: usize = 64 * 1024;

        let mut data = vec![0u8; SIZE];
        StdRng::seed_from_u64(20).fill(&mut data[..]);
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&data).unwrap();

        let cache = cache(8192, 1024);
        let reader = cache.wrap(1, file, SIZE as i64);

        let mut out = vec![0u8; CHUNK];
        let mut offset = 0;
        while offset < SIZE {
            let n = reader.read_at(&mut out, offset as i64).unwrap();
            assert_eq!(n, CHUNK.min(SIZE - offset));
            assert!(out[..n] == data[offset..offset + n], "mismatch at {offset}");
            offset += n;
        }
        assert_eq!(reader.read_at(&mut out, offset as i64).unwrap(), 0);

        let stats = cache.stats();
        assert_eq!(stats.lookups, (SIZE / 8192) as u64);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.hit_ratio(), Some(0.0));
        assert_eq!(stats.inserts, stats.lookups);
        cache.debug_validate_invariants();
    }

    #[test]
    fn cursor_streams_whole_file() {
        use std::io::Read;

        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 253) as u8).collect();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&data).unwrap();

        let cache = cache(4096, 64);
        let reader = cache.wrap(1, file, data.len() as i64);
        let mut out = Vec::new();
        reader.cursor().read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}

// ==============================================
// Round-trip Property
// ==============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cached_reads_match_source(
        len in 1usize..4000,
        reads in prop::collection::vec((0usize..4500, 0usize..1500), 1..40),
        seed in any::<u64>(),
    ) {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill(&mut data[..]);
        let cache = cache(PAGE * 4, 64);
        let file = cache.wrap(7, data.clone(), len as i64);

        for (offset, want) in reads {
            let mut buf = vec![0u8; want];
            let n = file.read_at(&mut buf, offset as i64).unwrap();
            let expected = data.get(offset..(offset + want).min(len)).unwrap_or(&[]);
            prop_assert_eq!(&buf[..n], expected);
        }

        let stats = cache.stats();
        prop_assert!(stats.hits <= stats.lookups);
        prop_assert_eq!(stats.slots_in_use(), cache.resident_pages() as u64);
        cache.debug_validate_invariants();
    }
}
