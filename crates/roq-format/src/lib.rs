//! # roq-format
//!
//! RoQ 流格式库: 字节源抽象、块读取与格式探测.
//!
//! 本 crate 只负责把字节流切分为块, 不解释码本与帧内容.

pub mod chunk;
pub mod io;
pub mod probe;

// 重导出常用类型
pub use chunk::{ChunkHeader, ChunkId, InfoChunk, next_chunk, read_payload};
pub use io::{ByteSource, IoContext, MemorySource, ReaderSource};
pub use probe::{ProbeScore, RoqProbe};
