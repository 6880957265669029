//! Opt-in `tracing` setup for hosts embedding a [`Composition`](crate::Composition).
//!
//! Frame scheduling, animation ticks and task dispatch log at `trace`;
//! tree edits, bindings and fits at `debug`; skipped renders and worker
//! failures at `warn`.

/// Filter used when `RUST_LOG` is unset: this crate at `info`, everything else at `warn`.
pub const DEFAULT_FILTER: &str = "warn,chart_compose=info";

/// Directive that turns on per-frame logging for this crate only.
#[must_use]
pub fn frame_trace_filter() -> String {
    format!("{DEFAULT_FILTER},chart_compose::api=trace,chart_compose::background=trace")
}

/// Installs a compact fmt subscriber filtered by `RUST_LOG` or [`DEFAULT_FILTER`].
///
/// Returns `false` when the `telemetry` feature is off or the host already
/// installed a global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
