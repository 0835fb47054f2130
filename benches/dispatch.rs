use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use reel_events::{
    events::topic::{BalanceUpdated, ReelSpinStopped},
    verify_session_integrity, EventBus, ReplayRecorder, Topic, VirtualClock,
};

fn publish_benchmark(c: &mut Criterion) {
    let clock = VirtualClock::new(0);
    let bus = EventBus::new(Arc::new(clock));
    for _ in 0..4 {
        bus.subscribe(Topic::BalanceUpdated, |envelope| {
            black_box(envelope.sequence());
            Ok(())
        });
    }

    c.bench_function("publish_4_handlers", |b| {
        b.iter(|| bus.publish(BalanceUpdated { balance: black_box(1_000), delta: -10 }))
    });
}

fn verify_benchmark(c: &mut Criterion) {
    let clock = VirtualClock::new(0);
    let bus = EventBus::new(Arc::new(clock.clone()));
    let recorder = ReplayRecorder::new(bus.clone(), Arc::new(clock));

    recorder.start_recording("bench", 0, 1);
    for i in 0..1_000u32 {
        bus.publish(ReelSpinStopped {
            round_id: format!("r{}", i / 5),
            reel_index: (i % 5) as u8,
            stop_position: i,
            symbols: vec!["A".into(), "K".into(), "Q".into()],
        });
    }
    let session = recorder.stop_recording().expect("recording");

    c.bench_function("verify_1000_events", |b| {
        b.iter(|| verify_session_integrity(black_box(&session)))
    });
}

criterion_group!(benches, publish_benchmark, verify_benchmark);
criterion_main!(benches);
