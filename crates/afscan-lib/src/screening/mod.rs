//! Windowed AF screening: interval extraction, threshold classification and
//! the per-subject scanner that ties them together.

pub mod classifier;
pub mod extractor;
pub mod scanner;

pub use classifier::{AfFlags, Classification, Classifier};
pub use extractor::{ExtractionError, IntervalExtractor};
pub use scanner::{
    segments, Detection, ScanOutcome, Scanner, Segment, Segments, SkipReason, WindowOutcome,
    WindowVerdict,
};
