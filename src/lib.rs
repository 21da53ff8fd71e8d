//! Core of a transfer-rule weight learner for a rule-based machine
//! translation system: recognizes which transfer rule applies to which
//! concrete realization of an ambiguous pattern, estimates per-rule
//! weights from a corpus driven through an external translator+language
//! model oracle, and emits a pruned weighted-rules document.

pub mod aggregator;
pub mod category;
pub mod config;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod estimator;
pub mod lm;
pub mod normalize;
pub mod oracle;
pub mod pruner;
pub mod rules_xml;
pub mod stats;
pub mod token;
pub mod weights_xml;
pub mod xmlwrite;

pub use config::Config;
pub use driver::{learn_from_monolingual, learn_from_parallel, list_rules};
pub use errors::{LearnerError, Result};
