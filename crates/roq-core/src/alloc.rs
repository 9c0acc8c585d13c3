//! 帧缓冲分配器.
//!
//! 解码上下文通过 `FrameAllocator` 申请帧缓冲; 释放即所有权的 drop.
//! 分配失败作为致命错误向上传播, 不重试.

use log::debug;

use crate::color::{RGBA_ZERO, Rgba};
use crate::{RoqError, RoqResult};

/// 帧缓冲分配器 trait
///
/// 实现此 trait 以控制帧缓冲的内存来源或上限.
pub trait FrameAllocator: Send {
    /// 分配 `len` 个像素的缓冲区, 内容须清零
    fn allocate(&mut self, len: usize) -> RoqResult<Vec<Rgba>>;
}

/// 系统分配器 (可失败的预留, 不会因 OOM 而 abort)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl FrameAllocator for SystemAllocator {
    fn allocate(&mut self, len: usize) -> RoqResult<Vec<Rgba>> {
        zeroed(len)
    }
}

/// 带总量上限的分配器
///
/// 累计分配字节数超过上限时返回 `AllocationFailure`.
#[derive(Debug, Clone)]
pub struct BudgetAllocator {
    /// 上限 (字节)
    limit: usize,
    /// 已分配 (字节)
    used: usize,
}

impl BudgetAllocator {
    /// 创建上限为 `limit` 字节的分配器
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// 已分配的字节数
    pub fn used(&self) -> usize {
        self.used
    }
}

impl FrameAllocator for BudgetAllocator {
    fn allocate(&mut self, len: usize) -> RoqResult<Vec<Rgba>> {
        let bytes = len
            .checked_mul(size_of::<Rgba>())
            .ok_or_else(|| RoqError::AllocationFailure(format!("{len} 像素的字节数溢出")))?;
        let total = self.used.saturating_add(bytes);
        if total > self.limit {
            return Err(RoqError::AllocationFailure(format!(
                "超出内存上限: 已用 {} + 申请 {} > {}",
                self.used, bytes, self.limit
            )));
        }
        let buf = zeroed(len)?;
        self.used = total;
        debug!("分配帧缓冲 {} 字节, 累计 {}/{}", bytes, self.used, self.limit);
        Ok(buf)
    }
}

fn zeroed(len: usize) -> RoqResult<Vec<Rgba>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| RoqError::AllocationFailure(format!("{len} 像素: {e}")))?;
    buf.resize(len, RGBA_ZERO);
    Ok(buf)
}
