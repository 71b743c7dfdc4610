//! # Observability
//!
//! Every primitive in this crate reports through the `tracing` crate with
//! structured fields, so a single subscriber shows the whole life of an
//! orchestrated operation.
//!
//! ## What Gets Traced
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | watch reached its target, transition verified, resource ready |
//! | `warn` | watch timed out, mutation failed, checker rejected a transition |
//! | `debug` | watch started, mutation accepted, retry/confirm verdicts |
//! | `trace` | every poll cycle and every failed attempt |
//!
//! The watched resource is always recorded as the `resource` field, rendered
//! from its coordinates.
//!
//! ## Usage
//!
//! ```bash
//! # Terminal outcomes only
//! RUST_LOG=info cargo run
//!
//! # Every poll cycle of every watch
//! RUST_LOG=readiness_framework=trace cargo run
//! ```
//!
//! A timed-out disk watch shows up as:
//!
//! ```text
//! DEBUG Watch started resource=demo/us-central1-f/data-1 timeout_ms=180000
//! TRACE Not observable yet resource=demo/us-central1-f/data-1 polls=1 error=...
//! WARN Watch timed out resource=demo/us-central1-f/data-1 polls=19 timeout_ms=180000
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Call once, at the start of a binary. Module paths are hidden; the
/// `resource` field identifies what a line is about.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
