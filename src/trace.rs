//! Stage instrumentation for the decode and NMS pipeline.
//!
//! Every image runs through three stages, each wrapped in a span:
//! `detect` (one per image), `decode_scale` (one per pyramid level, with
//! its stride and grid) and `weighted_nms`. Each stage reports how many
//! boxes it produced via `stage_count!`, so a subscriber filtered on
//! `s3fd=info` shows where candidates are lost. Without the `tracing`
//! feature both macros compile away and the counts are never formatted.

/// Opens the span for one pipeline stage; use as
/// `let _stage = stage_span!("decode_scale", level = 2).entered();`.
#[cfg(feature = "tracing")]
macro_rules! stage_span {
    ($stage:literal $(, $($field:tt)*)?) => {
        tracing::info_span!($stage $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_span {
    ($stage:literal $(, $($field:tt)*)?) => {
        $crate::trace::DisabledStage
    };
}

/// Reports box counts at the end of a stage.
#[cfg(feature = "tracing")]
macro_rules! stage_count {
    ($stage:literal, $($key:ident = $count:expr),+ $(,)?) => {
        tracing::info!(stage = $stage, $($key = $count),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_count {
    ($stage:literal, $($key:ident = $count:expr),+ $(,)?) => {
        let _ = ($($count,)+);
    };
}

pub(crate) use stage_count;
pub(crate) use stage_span;

/// Placeholder returned by `stage_span!` when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct DisabledStage;

#[cfg(not(feature = "tracing"))]
impl DisabledStage {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
