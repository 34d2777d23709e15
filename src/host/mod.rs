//! Host editor seams.
//!
//! The library never talks to an editor directly. Hosts hand it a
//! [`TextSurface`] to insert into and a [`ReportSink`] to show notices.
//! The CLI binds these to [`LineBuffer`] and [`TracingReportSink`].

mod notice;
mod surface;

pub use notice::{CollectingReportSink, Notice, ReportSink, Severity, TracingReportSink};
pub use surface::{LineBuffer, TextSurface};
