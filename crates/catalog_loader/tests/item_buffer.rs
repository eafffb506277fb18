use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use catalog_loader::ItemBuffer;
use pretty_assertions::assert_eq;

fn deliver_all(buffer: &ItemBuffer<&'static str, u32>) -> Vec<u32> {
    let mut received = Vec::new();
    buffer.deliver(|batch| received = batch);
    received
}

#[test]
fn delivery_hands_over_items_added_since_last_flush() {
    let buffer = ItemBuffer::new();
    buffer.add_item(&"a", 1);
    buffer.add_item(&"b", 2);
    buffer.add_item(&"a", 3);

    assert_eq!(deliver_all(&buffer), vec![1, 2, 3]);
    assert_eq!(buffer.pending_len(), 0);

    buffer.add_item(&"b", 4);
    assert_eq!(deliver_all(&buffer), vec![4]);
    assert_eq!(buffer.pending_len(), 0);
    assert_eq!(buffer.delivered(), 4);
}

#[test]
fn empty_delivery_skips_callback() {
    let buffer: ItemBuffer<&'static str, u32> = ItemBuffer::new();
    let mut called = false;
    let count = buffer.deliver(|_| called = true);
    assert_eq!(count, 0);
    assert!(!called);
    assert!(buffer.wait_drained_timeout(Duration::from_millis(10)));
}

#[test]
fn commit_releases_only_that_source() {
    let buffer = ItemBuffer::new();
    buffer.add_item(&"page-1", 1);
    buffer.add_item(&"page-2", 2);
    buffer.add_item(&"page-1", 3);

    assert_eq!(buffer.commit_items(&"page-1"), 2);
    assert_eq!(buffer.uncommitted_snapshot(), vec![2]);
    // The pending batch still carries committed items.
    assert_eq!(buffer.pending_len(), 3);
}

#[test]
fn commit_of_unknown_source_is_noop() {
    let buffer = ItemBuffer::new();
    buffer.add_item(&"a", 1);
    assert_eq!(buffer.commit_items(&"missing"), 0);
    assert_eq!(buffer.uncommitted_snapshot(), vec![1]);
}

#[test]
fn uncommitted_survive_delivery_and_reopen_after_commit() {
    let buffer = ItemBuffer::new();
    buffer.add_item(&"b", 1);
    buffer.add_item(&"a", 2);
    deliver_all(&buffer);
    assert_eq!(buffer.uncommitted_snapshot(), vec![1, 2]);

    buffer.commit_items(&"b");
    buffer.add_item(&"b", 3);
    // Sources keep first-seen order even after a commit.
    assert_eq!(buffer.uncommitted_snapshot(), vec![3, 2]);
}

#[test]
fn wait_drained_blocks_until_delivery() {
    let buffer = Arc::new(ItemBuffer::new());
    buffer.add_item(&"a", 1);
    assert!(!buffer.wait_drained_timeout(Duration::from_millis(20)));

    let ui = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            buffer.deliver(|_| {})
        })
    };
    buffer.wait_drained();
    assert_eq!(buffer.pending_len(), 0);
    assert_eq!(ui.join().unwrap(), 1);
}

#[test]
fn drained_only_after_callback_returns() {
    let buffer = Arc::new(ItemBuffer::new());
    buffer.add_item(&"a", 1);

    let (started_tx, started_rx) = mpsc::channel();
    let ui = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            buffer.deliver(|_| {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
            });
        })
    };
    started_rx.recv().unwrap();
    assert_eq!(buffer.pending_len(), 0);
    assert!(!buffer.wait_drained_timeout(Duration::from_millis(10)));

    ui.join().unwrap();
    assert!(buffer.wait_drained_timeout(Duration::from_millis(10)));
}

#[test]
fn concurrent_reporters_lose_nothing() {
    let buffer = Arc::new(ItemBuffer::<u32, u32>::new());
    let reporters: Vec<_> = (0..4)
        .map(|source| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for n in 0..250 {
                    buffer.add_item(&source, source * 1000 + n);
                }
            })
        })
        .collect();
    for reporter in reporters {
        reporter.join().unwrap();
    }

    let mut delivered = Vec::new();
    buffer.deliver(|batch| delivered = batch);
    assert_eq!(delivered.len(), 1000);
    assert_eq!(buffer.uncommitted_snapshot().len(), 1000);

    // Per-source discovery order is preserved.
    let from_two: Vec<_> = delivered.iter().filter(|n| **n / 1000 == 2).collect();
    assert!(from_two.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn panicking_delivery_still_counts_as_drained() {
    let buffer = ItemBuffer::new();
    buffer.add_item(&"a", 1);
    buffer.add_item(&"a", 2);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        buffer.deliver(|_| panic!("view rejected the batch"))
    }));
    assert!(outcome.is_err());
    assert!(buffer.wait_drained_timeout(Duration::from_millis(50)));
    assert_eq!(buffer.delivered(), 2);
}

#[test]
fn snapshot_lists_repeated_items_once() {
    let buffer = ItemBuffer::new();
    buffer.add_item(&"a", 1);
    buffer.add_item(&"b", 2);
    buffer.add_item(&"a", 1);
    buffer.add_item(&"b", 1);
    assert_eq!(buffer.uncommitted_snapshot(), vec![1, 2]);
}
