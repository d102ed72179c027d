#![no_main]

use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;
use pagecache::ds::{IntrusiveList, SlotId};

// Fuzz arbitrary operation sequences on IntrusiveList against a VecDeque
// model holding (id, value) pairs front to back.
fuzz_target!(|data: &[u8]| {
    let mut list: IntrusiveList<u32> = IntrusiveList::new();
    let mut model: VecDeque<(SlotId, u32)> = VecDeque::new();

    for chunk in data.chunks_exact(2) {
        let op = chunk[0] % 8;
        let value = u32::from(chunk[1]);
        let pick = |model: &VecDeque<(SlotId, u32)>| {
            (!model.is_empty()).then(|| (value as usize) % model.len())
        };

        match op {
            0 => {
                let id = list.push_front(value);
                model.push_front((id, value));
            }
            1 => {
                let id = list.push_back(value);
                model.push_back((id, value));
            }
            2 => {
                assert_eq!(list.pop_front(), model.pop_front().map(|(_, v)| v));
            }
            3 => {
                assert_eq!(list.pop_back(), model.pop_back().map(|(_, v)| v));
            }
            4 => {
                if let Some(pos) = pick(&model) {
                    let entry = model.remove(pos).unwrap();
                    assert!(list.move_to_front(entry.0));
                    model.push_front(entry);
                    assert_eq!(list.front_id(), Some(entry.0));
                }
            }
            5 => {
                if let Some(pos) = pick(&model) {
                    let entry = model.remove(pos).unwrap();
                    assert!(list.move_to_back(entry.0));
                    model.push_back(entry);
                    assert_eq!(list.back_id(), Some(entry.0));
                }
            }
            6 => {
                if let Some(pos) = pick(&model) {
                    let (id, v) = model.remove(pos).unwrap();
                    assert_eq!(list.remove(id), Some(v));
                }
            }
            7 => {
                if value == 0 {
                    list.clear();
                    model.clear();
                }
            }
            _ => unreachable!(),
        }

        assert_eq!(list.len(), model.len());
        assert!(list.iter().copied().eq(model.iter().map(|&(_, v)| v)));
        assert!(list.iter_rev().copied().eq(model.iter().rev().map(|&(_, v)| v)));
        list.debug_validate_invariants();
    }
});
