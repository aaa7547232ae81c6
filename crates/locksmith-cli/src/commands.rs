// Subcommand implementations

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use locksmith_core::{LockHandle, Locksmith, ReleaseOutcome};
use tokio::time::Instant;
use tracing::info;

/// Lease used by the demo so that expiry is visible within a few seconds.
pub const DEMO_LEASE_SECONDS: u64 = 2;

pub async fn hold(locksmith: &Locksmith, key: &str, hold_for: u64) -> anyhow::Result<ReleaseOutcome> {
    let handle = locksmith
        .lock(key)
        .await
        .with_context(|| format!("failed to acquire lock '{}'", key))?;
    println!("acquired '{}' (lease expires at {})", key, handle.expires_at());

    if hold_for > 0 {
        info!(key = %key, seconds = hold_for, "holding lock");
        tokio::time::sleep(Duration::from_secs(hold_for)).await;
    }

    let outcome = handle.release_and_wait().await;
    println!("released '{}': {}", key, outcome);
    Ok(outcome)
}

/// What happened during a demo run.
#[derive(Debug)]
pub struct DemoReport {
    /// Request labels in the order they acquired their lock
    pub acquired: Vec<&'static str>,
    /// How the first holder's overdue release was handled
    pub first_release: ReleaseOutcome,
}

/// Request "first" takes `asdf` and holds it past its lease. "second" and
/// "third" queue behind it on `asdf`; "notblocked" takes an unrelated key.
pub async fn demo(locksmith: &Locksmith) -> anyhow::Result<DemoReport> {
    let started = Instant::now();
    let acquired = Mutex::new(Vec::new());

    let first = locksmith
        .lock("asdf")
        .await
        .context("first request for 'asdf' failed")?;
    announce(&acquired, "first", "asdf", started);

    let holder = async {
        let overdue = Duration::from_secs(locksmith.config().lease_timeout_seconds + 1);
        tokio::time::sleep(overdue).await;
        let outcome = first.release_and_wait().await;
        println!(
            "[{:>4.1}s] first released 'asdf': {}",
            started.elapsed().as_secs_f64(),
            outcome
        );
        outcome
    };

    let (first_release, second, notblocked, third) = tokio::join!(
        holder,
        run_request(locksmith, &acquired, "second", "asdf", started),
        run_request(locksmith, &acquired, "notblocked", "notblocked", started),
        run_request(locksmith, &acquired, "third", "asdf", started)
    );
    second?;
    notblocked?;
    third?;

    Ok(DemoReport {
        acquired: acquired.into_inner().unwrap_or_else(|e| e.into_inner()),
        first_release,
    })
}

async fn run_request(
    locksmith: &Locksmith,
    acquired: &Mutex<Vec<&'static str>>,
    label: &'static str,
    key: &str,
    started: Instant,
) -> anyhow::Result<()> {
    let handle: LockHandle = locksmith
        .lock(key)
        .await
        .with_context(|| format!("{} request for '{}' failed", label, key))?;
    announce(acquired, label, key, started);
    handle.release_and_wait().await;
    Ok(())
}

fn announce(acquired: &Mutex<Vec<&'static str>>, label: &'static str, key: &str, started: Instant) {
    println!(
        "[{:>4.1}s] {} acquired '{}'",
        started.elapsed().as_secs_f64(),
        label,
        key
    );
    acquired
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(label);
}
