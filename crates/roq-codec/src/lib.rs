//! # roq-codec
//!
//! RoQ 四叉树矢量量化视频解码:
//!
//! - **码本**: YCbCr 2x2 单元表与 4x4 → 2x2 间接索引表, 加载时转为 RGBA
//! - **四叉树解码**: 8x8 顶层块递归细分, 跳过 / 运动补偿 / 矢量量化
//! - **双帧缓冲**: 当前帧可写, 上一帧只读, 每帧交换
//!
//! ## 使用示例
//!
//! ```rust
//! use roq_codec::RoqVideoDecoder;
//!
//! let mut dec = RoqVideoDecoder::new();
//! dec.configure(16, 16).unwrap();
//! // 1 个 2x2 单元, 无 4x4 单元
//! dec.load_codebook(0x10, &[16, 16, 16, 16, 128, 128]).unwrap();
//! // 4 个顶层块全部跳过
//! dec.decode_frame(0, &[0x00, 0x00]).unwrap();
//! assert_eq!(dec.last_frame().unwrap().len(), 256);
//! ```

pub mod codebook;
pub mod decoder;
pub mod framebuffer;
pub mod quadtree;

// 重导出常用类型
pub use codebook::Codebook;
pub use decoder::RoqVideoDecoder;
pub use framebuffer::FrameBuffers;
pub use quadtree::{MotionOffset, VqStats};
