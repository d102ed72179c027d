#![no_main]

use libfuzzer_sys::fuzz_target;
use pagecache::PageCacheBuilder;

// Fuzz cached reads over a fixed source: every read must match the source
// bytes exactly, whatever mix of hits, misses and evictions it produces.
fuzz_target!(|data: &[u8]| {
    let Some((&shape, reads)) = data.split_first() else {
        return;
    };
    let page_size = 1usize << (shape % 8);
    let source: Vec<u8> = (0..3000u32).map(|i| (i * 31 % 251) as u8).collect();

    let Ok(cache) = PageCacheBuilder::new()
        .page_size(page_size)
        .page_count(64 * (usize::from(shape >> 4) + 1))
        .build()
    else {
        return;
    };
    let file = cache.wrap(1, source.clone(), source.len() as i64);

    for chunk in reads.chunks_exact(4) {
        let offset = usize::from(u16::from_le_bytes([chunk[0], chunk[1]])) % 3200;
        let len = usize::from(u16::from_le_bytes([chunk[2], chunk[3]])) % 600;

        let mut buf = vec![0u8; len];
        let n = file.read_at(&mut buf, offset as i64).unwrap();
        let expected = source.get(offset..(offset + len).min(source.len())).unwrap_or(&[]);
        assert_eq!(&buf[..n], expected);
    }

    let stats = cache.stats();
    assert!(stats.hits <= stats.lookups);
    cache.debug_validate_invariants();
});
