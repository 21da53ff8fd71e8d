//! Pattern recognition engine: FST construction (§4.C), LRLM coverage
//! search (§4.D) and ambiguity detection (§4.E).
//!
//! The pipeline mirrors the reference engine crate's shape — build
//! immutable compiled state once, then run a per-input search over it —
//! even though the domain (category-labeled FST transitions rather than
//! regex/predicate rule matching) is unrelated.

pub mod ambiguity;
pub mod coverage;
pub mod fst;
pub mod metrics;

pub use ambiguity::{AmbiguousSite, ambiguous_sites};
pub use coverage::{Coverage, CoverageFlags, Segment, SegmentRule, lrlm};
pub use fst::{Fst, StateId};
pub use metrics::RecognitionMetrics;
