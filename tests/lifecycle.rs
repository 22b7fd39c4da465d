//! Model server lifecycle tests

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rexctl::lifecycle::{
    LaunchOptions, PollPolicy, PortRelease, port_in_use, prepare_port, wait_for_port_release,
    wait_for_release,
};

fn quick_policy(attempts: u32) -> PollPolicy {
    PollPolicy {
        attempts,
        interval: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn polling_stops_at_the_attempt_bound() {
    let checks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&checks);

    let outcome = wait_for_release(
        || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { true }
        },
        quick_policy(5),
    )
    .await;

    assert_eq!(outcome, PortRelease::StillBound { checks: 5 });
    assert_eq!(checks.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn polling_returns_as_soon_as_free() {
    let checks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&checks);

    let outcome = wait_for_release(
        || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { n < 3 }
        },
        quick_policy(20),
    )
    .await;

    assert_eq!(outcome, PortRelease::Released { checks: 3 });
    assert!(outcome.is_released());
}

#[tokio::test]
async fn detects_listener_and_its_release() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    assert!(port_in_use(port).await);

    drop(listener);
    let outcome = wait_for_port_release(port, quick_policy(20)).await;
    assert!(outcome.is_released());
}

#[tokio::test]
async fn bound_port_only_warns() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let options = LaunchOptions {
        poll: quick_policy(3),
        skip_stop: true,
        strategies: Vec::new(),
    };

    let started = Instant::now();
    let outcome = prepare_port(port, &options).await;

    assert_eq!(outcome, PortRelease::StillBound { checks: 3 });
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}
