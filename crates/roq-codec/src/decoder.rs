//! RoQ 视频解码器状态.
//!
//! 聚合码本与双帧缓冲, 负责块顺序校验:
//! 1. INFO 块确定尺寸并分配帧缓冲 (仅一次)
//! 2. 码本块整体替换码本
//! 3. VQ 块解码到当前帧, 完成后交换, 刚完成的帧成为 "上一帧"
//!
//! 任一步骤失败时码本与帧缓冲的角色保持不变.

use log::{debug, info};
use roq_core::{FrameAllocator, Rgba, RoqError, RoqResult, SystemAllocator};

use crate::codebook::Codebook;
use crate::framebuffer::FrameBuffers;
use crate::quadtree::{self, VqStats};

/// 帧尺寸必须满足的对齐
pub const DIMENSION_ALIGN: u16 = 16;

/// 默认最大像素数 (4096 x 4096)
pub const DEFAULT_MAX_PIXELS: usize = 4096 * 4096;

/// RoQ 视频解码器
pub struct RoqVideoDecoder {
    /// 帧缓冲分配器
    allocator: Box<dyn FrameAllocator>,
    /// 允许的最大像素数
    max_pixels: usize,
    /// 当前码本 (首个码本块之前为 None)
    codebook: Option<Codebook>,
    /// 双帧缓冲 (INFO 块之前为 None)
    frames: Option<FrameBuffers>,
    /// 已成功解码的帧数
    frame_count: u64,
}

impl RoqVideoDecoder {
    /// 使用系统分配器创建
    pub fn new() -> Self {
        Self::with_allocator(Box::new(SystemAllocator))
    }

    /// 使用指定分配器创建
    pub fn with_allocator(allocator: Box<dyn FrameAllocator>) -> Self {
        Self {
            allocator,
            max_pixels: DEFAULT_MAX_PIXELS,
            codebook: None,
            frames: None,
            frame_count: 0,
        }
    }

    /// 设置允许的最大像素数
    pub fn set_max_pixels(&mut self, max_pixels: usize) {
        self.max_pixels = max_pixels;
    }

    /// 处理 INFO 块: 校验尺寸并分配帧缓冲
    ///
    /// 返回 `true` 表示首次配置; 重复的 INFO 块尺寸相同时返回 `false`.
    pub fn configure(&mut self, width: u16, height: u16) -> RoqResult<bool> {
        if let Some(frames) = &self.frames {
            if frames.width() == usize::from(width) && frames.height() == usize::from(height) {
                debug!("重复的 INFO 块, 尺寸 {width}x{height} 未变化");
                return Ok(false);
            }
            return Err(RoqError::CorruptStream(format!(
                "不支持中途改变尺寸: {}x{} → {width}x{height}",
                frames.width(),
                frames.height()
            )));
        }

        if width == 0
            || height == 0
            || width % DIMENSION_ALIGN != 0
            || height % DIMENSION_ALIGN != 0
        {
            return Err(RoqError::CorruptStream(format!(
                "帧尺寸 {width}x{height} 必须是 {DIMENSION_ALIGN} 的非零整数倍"
            )));
        }

        let pixels = usize::from(width) * usize::from(height);
        if pixels > self.max_pixels {
            return Err(RoqError::AllocationFailure(format!(
                "帧尺寸 {width}x{height} 超出像素上限 {}",
                self.max_pixels
            )));
        }

        let frames = FrameBuffers::new(
            usize::from(width),
            usize::from(height),
            self.allocator.as_mut(),
        )?;
        self.frames = Some(frames);
        info!("视频尺寸 {width}x{height}");
        Ok(true)
    }

    /// 处理码本块: 整体替换当前码本
    pub fn load_codebook(&mut self, argument: u16, payload: &[u8]) -> RoqResult<&Codebook> {
        if self.frames.is_none() {
            return Err(RoqError::ProtocolOrderViolation(
                "码本块出现在 INFO 块之前".into(),
            ));
        }
        let codebook = Codebook::decode(argument, payload)?;
        Ok(self.codebook.insert(codebook))
    }

    /// 处理 VQ 块: 解码一帧并交换帧缓冲
    ///
    /// 成功后刚完成的帧可通过 `last_frame()` 取得.
    pub fn decode_frame(&mut self, argument: u16, payload: &[u8]) -> RoqResult<VqStats> {
        let frames = self.frames.as_mut().ok_or_else(|| {
            RoqError::ProtocolOrderViolation("VQ 块出现在 INFO 块之前".into())
        })?;
        let codebook = self.codebook.as_ref().ok_or_else(|| {
            RoqError::ProtocolOrderViolation("VQ 块出现在码本块之前".into())
        })?;

        let stats = quadtree::decode_vq(argument, payload, codebook, frames)?;
        frames.swap();
        self.frame_count += 1;
        Ok(stats)
    }

    /// 最近一次成功解码的帧 (`width * height` 个 RGBA 字, 行优先, 无填充)
    pub fn last_frame(&self) -> Option<&[Rgba]> {
        match &self.frames {
            Some(frames) if self.frame_count > 0 => Some(frames.previous()),
            _ => None,
        }
    }

    /// 视频宽度 (INFO 块之前为 0)
    pub fn width(&self) -> usize {
        self.frames.as_ref().map_or(0, FrameBuffers::width)
    }

    /// 视频高度 (INFO 块之前为 0)
    pub fn height(&self) -> usize {
        self.frames.as_ref().map_or(0, FrameBuffers::height)
    }

    /// 当前码本
    pub fn codebook(&self) -> Option<&Codebook> {
        self.codebook.as_ref()
    }

    /// 帧缓冲
    pub fn frames(&self) -> Option<&FrameBuffers> {
        self.frames.as_ref()
    }

    /// 已解码帧数
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for RoqVideoDecoder {
    fn default() -> Self {
        Self::new()
    }
}
