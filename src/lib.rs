// Library surface shared by the binary and the integration tests.
pub mod alignment;
pub mod config;
pub mod coverage;
pub mod edm;
pub mod feedback;
pub mod geometry;
pub mod history;
pub mod progress;
pub mod session;
pub mod trace_index;
pub mod util;

pub use alignment::{Aligner, AlignmentPath, DistanceMatrix};
pub use coverage::CoverageScorer;
pub use feedback::{ratio, FeedbackService, Thresholds};
pub use geometry::{Point, SamplePoint, Stroke, Trace};
pub use trace_index::{ClosestPointResult, SegmentedTrace, TraceIndex};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sections must be processed in order: expected {expected}, got {got}")]
    InvalidSequence { expected: usize, got: usize },

    #[error("unrecognized feature: {0}")]
    UnknownFeature(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("cannot align an empty sequence")]
    EmptySequence,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
