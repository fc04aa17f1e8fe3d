mod metadata;
mod options;

pub use metadata::{ExtractionResult, ImageRef, Meta, OpenGraph, PageMetadata};
pub use options::{BasicAuth, RequestOptions};
