//! Concurrency Tests
//!
//! Stress tests for the reader/writer interaction between the render
//! callback and background publication: blocks must never observe a
//! half-published buffer, and the render path must never block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sonara::engine::buffer::AudioBuffer;
use sonara::neural::{ModelParams, PassthroughModel};
use sonara::render::ModifiedBufferStore;
use sonara::timeline::{AudioSource, Document, ModificationId, PlaybackPosition, PlaybackRegion};

fn constant_buffer(channels: usize, len: usize, value: f32) -> AudioBuffer {
    let _ = env_logger::builder().is_test(true).try_init();
    AudioBuffer::from_channels(vec![vec![value; len]; channels], 48000).unwrap()
}

#[test]
fn test_try_read_never_sees_torn_publish() {
    let store = Arc::new(ModifiedBufferStore::new());
    let id = ModificationId::new();
    store.insert(id);

    let stop = Arc::new(AtomicBool::new(false));
    let writer_store = Arc::clone(&store);
    let writer_stop = Arc::clone(&stop);
    let writer = thread::spawn(move || {
        let mut i = 0u32;
        while !writer_stop.load(Ordering::Relaxed) {
            writer_store.publish(id, constant_buffer(2, 4096, i as f32));
            i += 1;
        }
    });

    // Every successful read must observe one uniform buffer.
    let deadline = Instant::now() + Duration::from_millis(500);
    let mut reads = 0u32;
    while Instant::now() < deadline {
        if let Some(guard) = store.try_lock() {
            let mut dest = AudioBuffer::new(2, 512, 48000);
            store.read_range(&guard, id, 1000, &mut dest, 0, 512);
            for ch in 0..2 {
                let first = dest.channel(ch)[0];
                assert!(
                    dest.channel(ch).iter().all(|&s| s == first),
                    "read mixed samples from two publishes"
                );
            }
            reads += 1;
        }
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
    assert!(reads > 0, "reader never got the lock");
}

#[test]
fn test_render_during_continuous_publishing() {
    let mut document = Document::new();
    let buffer = constant_buffer(1, 48_000, 0.25);
    let source = AudioSource::from_buffer("s", buffer).unwrap();
    document.add_source(Arc::clone(&source));
    let modification = document.create_modification(source.id()).unwrap();
    let id = modification.id();

    let mut renderer = document.create_renderer();
    renderer.add_region(PlaybackRegion::untrimmed(modification, 0, 48_000).unwrap());
    renderer.prepare_to_play(48000.0, 512, 1, true).unwrap();

    let store = Arc::clone(document.store());
    let stop = Arc::new(AtomicBool::new(false));
    let writer_stop = Arc::clone(&stop);
    let writer = thread::spawn(move || {
        let mut i = 1u32;
        while !writer_stop.load(Ordering::Relaxed) {
            store.publish(id, constant_buffer(1, 48_000, i as f32));
            i += 1;
            thread::sleep(Duration::from_micros(200));
        }
    });

    // Whatever each block sees (source, a published version, or lock-miss
    // silence), it must be uniform across the block.
    let mut position = 0i64;
    for _ in 0..2000 {
        let mut output = AudioBuffer::new(1, 512, 48000);
        let ok = renderer.process_block(&mut output, true, PlaybackPosition::playing_at(position));
        assert!(ok);
        let first = output.channel(0)[0];
        assert!(
            output.channel(0).iter().all(|&s| s == first),
            "block mixed two generations of the modification"
        );
        position = (position + 512) % 40_000;
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[test]
fn test_concurrent_jobs_each_publish_once() {
    let mut document = Document::new();
    document.set_model(Arc::new(PassthroughModel::new()));

    let mut ids = Vec::new();
    for i in 0..8 {
        let buffer = constant_buffer(1, 2000, i as f32 * 0.1);
        let source = AudioSource::from_buffer("s", buffer).unwrap();
        document.add_source(Arc::clone(&source));
        let modification = document.create_modification(source.id()).unwrap();
        ids.push((modification.id(), i as f32 * 0.1));
    }

    for (id, _) in &ids {
        document
            .process_modification(*id, 48000.0, ModelParams::new())
            .unwrap();
    }
    document.wait_for_processing();

    for (id, expected) in ids {
        let state = document.store().state_of(id).unwrap();
        assert!(state.is_modified);
        let buffer = state.buffer.unwrap();
        assert!((buffer.channel(0)[0] - expected).abs() < 1e-6);
    }
}

#[test]
fn test_process_block_does_not_wait_for_writer() {
    let mut document = Document::new();
    let buffer = constant_buffer(1, 48_000, 0.5);
    let source = AudioSource::from_buffer("s", buffer).unwrap();
    document.add_source(Arc::clone(&source));
    let modification = document.create_modification(source.id()).unwrap();

    let mut renderer = document.create_renderer();
    renderer.add_region(PlaybackRegion::untrimmed(modification, 0, 48_000).unwrap());
    renderer.prepare_to_play(48000.0, 512, 1, true).unwrap();

    // Hold the write lock for a long time on another thread.
    let store = Arc::clone(document.store());
    let held = Arc::new(AtomicBool::new(false));
    let held_flag = Arc::clone(&held);
    let writer = thread::spawn(move || {
        let _guard = store.write_lock();
        held_flag.store(true, Ordering::Release);
        thread::sleep(Duration::from_millis(300));
    });
    while !held.load(Ordering::Acquire) {
        thread::yield_now();
    }

    let mut output = AudioBuffer::new(1, 512, 48000);
    let start = Instant::now();
    let ok = renderer.process_block(&mut output, true, PlaybackPosition::playing_at(0));
    let elapsed = start.elapsed();

    assert!(ok);
    assert!(output.channel(0).iter().all(|&s| s == 0.0));
    assert!(
        elapsed < Duration::from_millis(100),
        "render callback blocked on the writer for {:?}",
        elapsed
    );
    writer.join().unwrap();
}
