#![no_main]

use libfuzzer_sys::fuzz_target;
use pagecache::policy::lru::LruIndex;

// Fuzz LruIndex against a Vec model ordered most recent first, replaying the
// bucket pattern: lookup, and on a miss evict at capacity then insert.
fuzz_target!(|data: &[u8]| {
    let Some((&capacity, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(capacity % 16) + 1;

    let mut index: LruIndex<u8, u32> = LruIndex::new();
    let mut model: Vec<(u8, u32)> = Vec::new();

    for (step, &byte) in ops.iter().enumerate() {
        let key = byte % 32;
        let value = step as u32;

        if byte & 0x80 != 0 {
            let removed = index.delete(&key);
            let pos = model.iter().position(|&(k, _)| k == key);
            assert_eq!(removed, pos.map(|p| model.remove(p).1));
        } else if let Some(&found) = index.lookup(&key) {
            let pos = model.iter().position(|&(k, _)| k == key).unwrap();
            let entry = model.remove(pos);
            assert_eq!(entry.1, found);
            model.insert(0, entry);
        } else {
            assert!(model.iter().all(|&(k, _)| k != key));
            if index.len() == capacity {
                let evicted = index.evict();
                assert_eq!(evicted, model.pop());
            }
            assert_eq!(index.insert(key, value), None);
            model.insert(0, (key, value));
        }

        assert_eq!(index.len(), model.len());
        assert!(index.len() <= capacity);
        assert!(index.iter().map(|(&k, &v)| (k, v)).eq(model.iter().copied()));
        index.debug_validate_invariants();
    }
});
