pub mod config;
pub mod error;
pub mod extraction;
pub mod lock;
pub mod matching;
pub mod merge;
pub mod model;
pub mod ooxml;
pub mod parsing;
pub mod pipeline;
pub mod rules;
pub mod slides;
pub mod template;

pub use config::MasterfileConfig;
pub use error::MasterfileError;
pub use merge::{append_equipment, AppendOutcome, MergeContext};
pub use model::{BomItem, DesignMetadata, EquipmentKey};
pub use pipeline::{process_batch, process_drawing, BatchReport, DrawingJob, OutputPaths};
pub use slides::{sync_slides, SyncReport};
