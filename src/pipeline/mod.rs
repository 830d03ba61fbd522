// Content processing pipeline — ingest orchestration and the media
// placeholder policy.

pub mod media;
pub mod processor;

pub use processor::{ContentProcessor, ContentView, ModerateRequest};
