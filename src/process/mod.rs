// src/process/mod.rs
pub mod classify;
pub mod normalize;
pub mod projection;
pub mod raw_table;
pub mod table;
pub mod utils;

pub use classify::{classify, Classified, Section};
pub use normalize::{Identity, NormalizedRecord, Normalizer, KEY_FIELD};
pub use projection::{FieldProjector, ProjectionPolicy};
pub use raw_table::{RawEntity, RawSection};
pub use table::Table;
