pub mod entry;
pub mod streaming_cache;

pub use entry::{ChunkKey, ChunkOrigin, IntensityKey, PresetKey, ProcessedChunk, TrackCacheEntry};
pub use streaming_cache::{CacheTier, ChunkResponse, StreamingCache, TrackMetadata};
