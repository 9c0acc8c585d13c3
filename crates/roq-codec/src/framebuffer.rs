//! 双帧缓冲管理.
//!
//! 持有两块等大的 RGBA 缓冲区: "当前" 为解码写入目标,
//! "上一帧" 为运动补偿与跳过块的只读来源. 每解码完成一帧后交换角色.

use roq_core::{FrameAllocator, Rgba, RoqError, RoqResult};

/// 双帧缓冲
#[derive(Debug)]
pub struct FrameBuffers {
    /// 宽度 (像素)
    width: usize,
    /// 高度 (像素)
    height: usize,
    /// 两块缓冲区
    buffers: [Vec<Rgba>; 2],
    /// 当前写入缓冲区的索引 (0 或 1)
    current: usize,
}

impl FrameBuffers {
    /// 通过分配器创建两块清零的缓冲区
    pub fn new(width: usize, height: usize, allocator: &mut dyn FrameAllocator) -> RoqResult<Self> {
        let len = width.checked_mul(height).ok_or_else(|| {
            RoqError::AllocationFailure(format!("帧尺寸 {width}x{height} 溢出"))
        })?;
        let first = allocator.allocate(len)?;
        let second = allocator.allocate(len)?;
        Ok(Self {
            width,
            height,
            buffers: [first, second],
            current: 0,
        })
    }

    /// 宽度 (像素)
    pub fn width(&self) -> usize {
        self.width
    }

    /// 高度 (像素)
    pub fn height(&self) -> usize {
        self.height
    }

    /// 当前写入缓冲区的索引
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// 当前缓冲区 (只读)
    pub fn current(&self) -> &[Rgba] {
        &self.buffers[self.current]
    }

    /// 当前缓冲区 (可写)
    pub fn current_mut(&mut self) -> &mut [Rgba] {
        &mut self.buffers[self.current]
    }

    /// 上一帧缓冲区 (只读)
    pub fn previous(&self) -> &[Rgba] {
        &self.buffers[self.current ^ 1]
    }

    /// 同时借出 (当前可写, 上一帧只读)
    pub fn split(&mut self) -> (&mut [Rgba], &[Rgba]) {
        let [first, second] = &mut self.buffers;
        if self.current == 0 {
            (first.as_mut_slice(), second.as_slice())
        } else {
            (second.as_mut_slice(), first.as_slice())
        }
    }

    /// 交换当前与上一帧的角色
    pub fn swap(&mut self) {
        self.current ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roq_core::SystemAllocator;

    #[test]
    fn test_初始状态_全零_索引0() {
        let fb = FrameBuffers::new(16, 16, &mut SystemAllocator).unwrap();
        assert_eq!(fb.current_index(), 0);
        assert_eq!(fb.current().len(), 256);
        assert!(fb.previous().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_交换_角色互换() {
        let mut fb = FrameBuffers::new(4, 4, &mut SystemAllocator).unwrap();
        fb.current_mut()[0] = 0xDEAD_BEEF;
        fb.swap();
        assert_eq!(fb.current_index(), 1);
        assert_eq!(fb.previous()[0], 0xDEAD_BEEF);
        assert_eq!(fb.current()[0], 0);

        let (cur, prev) = fb.split();
        cur[0] = prev[0] + 1;
        fb.swap();
        assert_eq!(fb.current()[0], 0xDEAD_BEEF);
        assert_eq!(fb.previous()[0], 0xDEAD_BEF0);
    }
}
