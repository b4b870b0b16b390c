//! Status state machines for reports and distress signals.

pub mod distress;
pub mod report;

pub use distress::DistressLifecycle;
pub use report::ReportLifecycle;
