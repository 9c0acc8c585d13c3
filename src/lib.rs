//! # RoQ
//!
//! 纯 Rust 实现的 RoQ 视频解码库.
//!
//! RoQ 是一种基于运动补偿、四叉树细分与矢量量化的视频流格式.
//! 调用方通过 `ByteSource` 按需提供字节, 通过 `FrameSink` 接收解码后的 RGBA 帧;
//! 解码器本身不持有文件句柄、窗口或音频输出.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use roq::{NullSink, StreamContext};
//!
//! let mut ctx = StreamContext::open_file("intro.roq").unwrap();
//! let frames = ctx.play_to_end(&mut NullSink).unwrap();
//! println!("{}x{}, {frames} 帧", ctx.width(), ctx.height());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `roq-core` | 错误类型、颜色转换、帧缓冲分配器 |
//! | `roq-codec` | 码本、四叉树 VQ 解码、双帧缓冲 |
//! | `roq-format` | 字节源、块读取、格式探测 |

pub mod context;

/// 核心类型与工具
pub use roq_core as core;

/// 视频解码
pub use roq_codec as codec;

/// 流格式与 I/O
pub use roq_format as format;

pub use context::{ContextParameters, FrameSink, NullSink, PlayEvent, StreamContext};
pub use roq_core::{RoqError, RoqResult};

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
