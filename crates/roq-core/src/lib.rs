//! # roq-core
//!
//! RoQ 视频解码库核心库, 提供错误类型、字节游标、颜色转换与帧缓冲分配器.

pub mod alloc;
pub mod bytereader;
pub mod color;
pub mod error;

// 重导出常用类型
pub use alloc::{BudgetAllocator, FrameAllocator, SystemAllocator};
pub use color::{Rgba, rgba_to_bytes, ycbcr_to_rgba};
pub use error::{RoqError, RoqResult};
