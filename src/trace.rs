//! Span and event macros for the processing pipeline.
//!
//! With the `tracing` feature, `trace_span!` opens an info-level span (used
//! around whole operations such as a conversion path or a histogram pass) and
//! `trace_event!` records a debug-level event. Without it, spans become
//! [`NoopSpan`] and event fields are evaluated and dropped, so call sites need
//! no `cfg` attributes.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!(target: "patchvision", $name $(, $($field)*)?)
    };
}

#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!(name: $name, target: "patchvision", $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Stand-in for `tracing::Span` when the `tracing` feature is off.
#[cfg(not(feature = "tracing"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Mirrors `Span::entered`; the returned guard does nothing.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
