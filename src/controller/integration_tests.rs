//! Capture-then-replay runs through the real recorder, queue and player,
//! with an in-memory bus standing in for the broker.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::configuration::config::Session;
use crate::configuration::types::{PayloadEncoding, TraceFormat};
use crate::data_capture::{CaptureQueue, CaptureSender, CapturedMessage, Recorder};
use crate::message_bus::test_support::FakeBus;
use crate::replay::Player;
use crate::session_management::Progress;

/// Records whatever `produce` enqueues until `stop_after` elapses.
async fn capture<F, Fut>(session: &Session, stop_after: Duration, produce: F) -> (String, FakeBus)
where
    F: FnOnce(CaptureSender) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let bus = FakeBus::default();
    let (tx, rx) = CaptureQueue::bounded(session.queue_capacity);
    let cancel = CancellationToken::new();

    tokio::spawn(produce(tx));
    let stop = cancel.clone();
    tokio::spawn(async move {
        sleep(stop_after).await;
        stop.cancel();
    });

    let mut recorder = Recorder::new(session, Vec::new(), Progress::hidden());
    recorder.run(&bus, rx, cancel).await.unwrap();
    (String::from_utf8(recorder.into_inner()).unwrap(), bus)
}

async fn replay(session: &Session, trace: &str) -> FakeBus {
    let bus = FakeBus::default();
    let mut player = Player::new(session, Progress::hidden());
    player
        .play(trace.as_bytes(), &bus, CancellationToken::new())
        .await
        .unwrap();
    bus
}

#[tokio::test(start_paused = true)]
async fn replay_reproduces_capture_timing() {
    for format in [TraceFormat::Pipe, TraceFormat::Json] {
        let session = Session {
            topics: vec!["a".to_string()],
            format,
            ..Session::default()
        };
        let (trace, _) = capture(&session, Duration::from_secs(1), |tx| async move {
            tx.enqueue(CapturedMessage::now("a", "hello")).await.unwrap();
            sleep(Duration::from_millis(500)).await;
            tx.enqueue(CapturedMessage::now("a", "hello")).await.unwrap();
        })
        .await;
        assert_eq!(trace.lines().count(), 2);

        let bus = replay(&session, &trace).await;
        let published = bus.published();
        assert_eq!(published.len(), 2);
        let gap = published[1].at - published[0].at;
        assert!(
            gap >= Duration::from_millis(480) && gap <= Duration::from_millis(520),
            "gap was {:?}",
            gap
        );
        assert!(published.iter().all(|p| p.topic == "a" && p.payload == b"hello"));
    }
}

#[tokio::test(start_paused = true)]
async fn binary_payloads_round_trip() {
    let payload: Vec<u8> = (0..=255u8).chain([0x7C, 0x7C, b'\n']).collect();
    for format in [TraceFormat::Pipe, TraceFormat::Json] {
        let session = Session {
            encoding: PayloadEncoding::Base64,
            format,
            ..Session::default()
        };
        let sent = payload.clone();
        let (trace, _) = capture(&session, Duration::from_millis(10), |tx| async move {
            tx.enqueue(CapturedMessage::now("bin", sent)).await.unwrap();
        })
        .await;

        let bus = replay(&session, &trace).await;
        assert_eq!(bus.published()[0].payload, payload);
    }
}

/// `len` random bytes drawn from v4 UUIDs.
fn random_bytes(len: usize) -> Vec<u8> {
    std::iter::repeat_with(|| *uuid::Uuid::new_v4().as_bytes())
        .flatten()
        .take(len)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn random_binary_payloads_round_trip() {
    let payloads: Vec<Vec<u8>> = [0, 1, 2, 3, 17, 255, 4096]
        .into_iter()
        .map(random_bytes)
        .collect();
    for format in [TraceFormat::Pipe, TraceFormat::Json] {
        let session = Session {
            encoding: PayloadEncoding::Base64,
            format,
            ..Session::default()
        };
        let sent = payloads.clone();
        let (trace, _) = capture(&session, Duration::from_millis(10), |tx| async move {
            for payload in sent {
                tx.enqueue(CapturedMessage::now("bin", payload)).await.unwrap();
            }
        })
        .await;

        let bus = replay(&session, &trace).await;
        let replayed: Vec<Vec<u8>> = bus.published().into_iter().map(|p| p.payload).collect();
        assert_eq!(replayed, payloads, "format {:?}", format);
    }
}

#[tokio::test(start_paused = true)]
async fn pipe_text_mode_loses_separator_payloads_json_does_not() {
    let produce = |tx: CaptureSender| async move {
        tx.enqueue(CapturedMessage::now("t", "a|b|c")).await.unwrap();
    };

    let pipe = Session {
        format: TraceFormat::Pipe,
        ..Session::default()
    };
    let (trace, _) = capture(&pipe, Duration::from_millis(10), produce).await;
    let bus = replay(&pipe, &trace).await;
    assert_ne!(bus.published()[0].payload, b"a|b|c");

    let json = Session {
        format: TraceFormat::Json,
        ..Session::default()
    };
    let (trace, _) = capture(&json, Duration::from_millis(10), produce).await;
    let bus = replay(&json, &trace).await;
    assert_eq!(bus.published()[0].payload, b"a|b|c");
}

#[tokio::test(start_paused = true)]
async fn default_capture_covers_every_topic() {
    let session = Session::default();
    let (trace, bus) = capture(&session, Duration::from_millis(100), |tx| async move {
        for topic in ["sensors/temp", "cam/frame", "home/door/state"] {
            tx.enqueue(CapturedMessage::now(topic, "x")).await.unwrap();
        }
    })
    .await;
    assert_eq!(bus.subscriptions(), vec![vec!["#".to_string()]]);

    let replayed = replay(&session, &trace).await;
    let topics: Vec<String> = replayed.published().into_iter().map(|p| p.topic).collect();
    assert_eq!(topics, vec!["sensors/temp", "cam/frame", "home/door/state"]);
}

#[tokio::test(start_paused = true)]
async fn fast_forward_time_is_independent_of_recorded_gaps() {
    let trace: String = (0..20).map(|i| format!("10m0s|t|{}\n", i)).collect();
    let session = Session {
        format: TraceFormat::Pipe,
        fast_forward: true,
        ..Session::default()
    };
    let start = Instant::now();
    let bus = replay(&session, &trace).await;
    assert_eq!(bus.published().len(), 20);
    assert!(Instant::now() - start < Duration::from_secs(1));
}

#[tokio::test]
async fn slow_recorder_applies_backpressure_without_loss() {
    let session = Session {
        format: TraceFormat::Pipe,
        queue_capacity: 2,
        ..Session::default()
    };
    let (tx, rx) = CaptureQueue::bounded(session.queue_capacity);
    let producer = tokio::spawn(async move {
        for i in 0..10 {
            tx.enqueue(CapturedMessage::now("t", i.to_string())).await.unwrap();
        }
    });

    // Recorder not started yet: the producer can only get two messages in.
    sleep(Duration::from_millis(50)).await;
    assert!(!producer.is_finished());
    assert_eq!(rx.len(), 2);

    let bus = FakeBus::default();
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let mut recorder = Recorder::new(&session, Vec::new(), Progress::hidden());
    let run = recorder.run(&bus, rx, cancel);
    let waiter = async {
        producer.await.unwrap();
        sleep(Duration::from_millis(50)).await;
        stop.cancel();
    };
    let (count, ()) = tokio::join!(run, waiter);
    assert_eq!(count.unwrap(), 10);

    let out = String::from_utf8(recorder.into_inner()).unwrap();
    let payloads: Vec<&str> = out.lines().map(|l| l.rsplit('|').next().unwrap()).collect();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(payloads, expected);
}
