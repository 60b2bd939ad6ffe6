pub mod diff;
pub mod dump;
pub mod list;
pub mod shard;
