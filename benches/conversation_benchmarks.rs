use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use voicegate::config::VoiceConfig;
use voicegate::fulfillment::optimize_for_voice;
use voicegate::sessions::{ConversationStore, InMemoryConversationStore, Message};

fn turn(i: usize) -> Vec<Message> {
    (0..i)
        .flat_map(|n| {
            [
                Message::user(format!("question {n}")),
                Message::assistant(format!("answer {n}")),
            ]
        })
        .collect()
}

fn bench_store_round_trip(c: &mut Criterion) {
    let store = InMemoryConversationStore::new(10, Duration::from_secs(1800));
    let history = turn(6);

    c.bench_function("store_update_then_get", |b| {
        b.iter(|| {
            store.update_history("bench-session", black_box(history.clone()));
            black_box(store.get_history("bench-session"));
        });
    });
}

fn bench_store_with_many_sessions(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_get_with_sessions");
    for sessions in [100usize, 1_000, 10_000] {
        let store = InMemoryConversationStore::new(10, Duration::from_secs(1800));
        for i in 0..sessions {
            store.update_history(&format!("s{i}"), turn(2));
        }
        group.bench_with_input(BenchmarkId::from_parameter(sessions), &store, |b, store| {
            b.iter(|| black_box(store.get_history("s0")));
        });
    }
    group.finish();
}

fn bench_concurrent_writers(c: &mut Criterion) {
    let store = Arc::new(InMemoryConversationStore::new(10, Duration::from_secs(1800)));

    c.bench_function("store_4_threads_x_100_writes", |b| {
        b.iter(|| {
            std::thread::scope(|scope| {
                for t in 0..4 {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        for i in 0..100 {
                            let id = format!("t{t}-{}", i % 10);
                            let mut history = store.get_history(&id);
                            history.push(Message::user("hi"));
                            store.update_history(&id, history);
                        }
                    });
                }
            });
        });
    });
}

fn bench_optimize_for_voice(c: &mut Criterion) {
    let config = VoiceConfig::default();
    let text = "**Rust** is a _systems_ language. See https://www.rust-lang.org/learn for more. "
        .repeat(12);

    c.bench_function("optimize_for_voice_long_reply", |b| {
        b.iter(|| black_box(optimize_for_voice(black_box(&text), &config)));
    });
}

criterion_group!(
    benches,
    bench_store_round_trip,
    bench_store_with_many_sessions,
    bench_concurrent_writers,
    bench_optimize_for_voice
);
criterion_main!(benches);
