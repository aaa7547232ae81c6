// Metrics for the lock protocol
// Recorded through the `metrics` facade; the embedding process installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register metric descriptions. Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "locksmith_acquisitions_total",
        "Total number of successful lock acquisitions"
    );
    describe_histogram!(
        "locksmith_acquire_wait_seconds",
        "Time from acquisition request to lock grant in seconds"
    );
    describe_counter!(
        "locksmith_contentions_total",
        "Total number of attempts that found the lock held"
    );
    describe_counter!(
        "locksmith_retries_exhausted_total",
        "Total number of acquisitions that ran out of retries"
    );
    describe_counter!(
        "locksmith_releases_total",
        "Total number of lock releases by outcome"
    );
    describe_counter!(
        "locksmith_store_errors_total",
        "Total number of lease store failures by operation"
    );

    tracing::debug!("Locksmith metrics described");
}

/// Record a granted lock. `path` is `claim` or `takeover`.
pub fn record_acquired(path: &'static str, wait_secs: f64) {
    counter!("locksmith_acquisitions_total", "path" => path).increment(1);
    histogram!("locksmith_acquire_wait_seconds", "path" => path).record(wait_secs);
}

pub fn record_contention() {
    counter!("locksmith_contentions_total").increment(1);
}

pub fn record_retries_exhausted() {
    counter!("locksmith_retries_exhausted_total").increment(1);
}

pub fn record_release(outcome: &'static str) {
    counter!("locksmith_releases_total", "outcome" => outcome).increment(1);
}

pub fn record_store_error(operation: &'static str) {
    counter!("locksmith_store_errors_total", "operation" => operation).increment(1);
}
