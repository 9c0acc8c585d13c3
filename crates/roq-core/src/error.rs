//! 统一错误类型定义.
//!
//! 所有 RoQ crate 共用的错误类型, 支持跨模块传播.
//! 所有错误均为致命错误: 解码器不做重同步, 也不自动重试.

use thiserror::Error;

/// RoQ 解码统一错误类型
#[derive(Debug, Error)]
pub enum RoqError {
    /// 数据源提供的字节数少于字段或表所需
    #[error("数据截断: 需要 {needed} 字节, 仅读到 {got} 字节")]
    IoTruncated { needed: usize, got: usize },

    /// 在块边界处已到达流末尾 (一个字节都没有)
    #[error("已到达流末尾")]
    Eof,

    /// 无法识别的块 ID
    #[error("未知块 ID: 0x{0:04X}")]
    UnknownChunk(u16),

    /// 码本单元数或载荷大小计算不一致
    #[error("码本损坏: {0}")]
    CorruptCodebook(String),

    /// 码流结构错误 (非法细分、非法尺寸等)
    #[error("码流损坏: {0}")]
    CorruptStream(String),

    /// 码本索引越界
    #[error("码本索引越界: {table} 索引 {index}, 有效数量 {count}")]
    OutOfRangeIndex {
        table: &'static str,
        index: usize,
        count: usize,
    },

    /// 帧缓冲分配失败
    #[error("内存分配失败: {0}")]
    AllocationFailure(String),

    /// 块到达顺序违反协议 (如 INFO 之前出现 VQ)
    #[error("块顺序错误: {0}")]
    ProtocolOrderViolation(String),

    /// 底层数据源 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl RoqError {
    /// 是否为干净的流结束 (而非损坏)
    pub fn is_eof(&self) -> bool {
        matches!(self, RoqError::Eof)
    }
}

/// RoQ 统一 Result 类型
pub type RoqResult<T> = Result<T, RoqError>;
