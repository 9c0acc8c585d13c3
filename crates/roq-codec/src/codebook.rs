//! 码本构建器.
//!
//! 码本块载荷结构:
//! ```text
//! argument: bits[7:4] = 2x2 单元数 (0 表示 256)
//!           bit 2     = 4x4 单元预计数 (0 表示按剩余载荷推断)
//! payload:  count2x2 * {y0, y1, y2, y3, cb, cr}
//!           count4x4 * {idx0, idx1, idx2, idx3}
//! ```
//!
//! 2x2 单元在加载时即转换为 RGBA, 4x4 单元保存为指向 2x2 表的原始索引.

use log::{debug, warn};
use roq_core::bytereader::ByteReader;
use roq_core::{Rgba, RoqError, RoqResult, ycbcr_to_rgba};

/// 每张表的最大单元数
pub const MAX_CELLS: usize = 256;

/// 原始 2x2 单元字节数 (4 个亮度 + 共享的 Cb/Cr)
pub const RAW_2X2_CELL_SIZE: usize = 6;

/// 4x4 单元字节数 (4 个 2x2 索引)
pub const RAW_4X4_CELL_SIZE: usize = 4;

/// 2x2 单元: 按 左上、右上、左下、右下 顺序排列的 4 个像素
pub type Cell2x2 = [Rgba; 4];

/// 4x4 单元: 按 左上、右上、左下、右下 顺序排列的 4 个 2x2 索引
pub type Cell4x4 = [u8; 4];

/// 码本
///
/// 每个码本块到来时整体重建, 在下一个码本块之前供所有 VQ 块使用.
/// 表长度即有效单元数, 不存在超出有效数量的未初始化条目.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebook {
    cells_2x2: Vec<Cell2x2>,
    cells_4x4: Vec<Cell4x4>,
}

impl Codebook {
    /// 从块参数与完整载荷解码码本
    pub fn decode(argument: u16, payload: &[u8]) -> RoqResult<Self> {
        let (num_2x2, num_4x4) = cell_counts(argument, payload.len())?;
        let mut br = ByteReader::new(payload);

        let mut cells_2x2 = Vec::with_capacity(num_2x2);
        for _ in 0..num_2x2 {
            let raw = br.read_slice(RAW_2X2_CELL_SIZE)?;
            let (cb, cr) = (raw[4], raw[5]);
            cells_2x2.push([
                ycbcr_to_rgba(raw[0], cb, cr),
                ycbcr_to_rgba(raw[1], cb, cr),
                ycbcr_to_rgba(raw[2], cb, cr),
                ycbcr_to_rgba(raw[3], cb, cr),
            ]);
        }

        let mut cells_4x4 = Vec::with_capacity(num_4x4);
        for _ in 0..num_4x4 {
            let raw = br.read_slice(RAW_4X4_CELL_SIZE)?;
            cells_4x4.push([raw[0], raw[1], raw[2], raw[3]]);
        }

        if !br.is_eof() {
            warn!("码本载荷末尾有 {} 字节未使用", br.remaining());
        }
        debug!(
            "码本已加载: 2x2 单元 {}, 4x4 单元 {}, 载荷 {} 字节",
            num_2x2,
            num_4x4,
            payload.len()
        );

        Ok(Self {
            cells_2x2,
            cells_4x4,
        })
    }

    /// 有效 2x2 单元数
    pub fn num_2x2_cells(&self) -> usize {
        self.cells_2x2.len()
    }

    /// 有效 4x4 单元数
    pub fn num_4x4_cells(&self) -> usize {
        self.cells_4x4.len()
    }

    /// 查找 2x2 单元
    pub fn cell_2x2(&self, index: u8) -> RoqResult<&Cell2x2> {
        self.cells_2x2
            .get(usize::from(index))
            .ok_or(RoqError::OutOfRangeIndex {
                table: "2x2",
                index: usize::from(index),
                count: self.cells_2x2.len(),
            })
    }

    /// 查找 4x4 单元
    pub fn cell_4x4(&self, index: u8) -> RoqResult<&Cell4x4> {
        self.cells_4x4
            .get(usize::from(index))
            .ok_or(RoqError::OutOfRangeIndex {
                table: "4x4",
                index: usize::from(index),
                count: self.cells_4x4.len(),
            })
    }
}

/// 根据块参数与载荷大小计算两张表的单元数
///
/// 4x4 预计数为 0 时: 若 2x2 表之后的剩余载荷能容纳完整的 256 项 4x4 表则取 256, 否则为 0.
pub fn cell_counts(argument: u16, payload_size: usize) -> RoqResult<(usize, usize)> {
    let num_2x2 = match usize::from((argument >> 4) & 0x0F) {
        0 => MAX_CELLS,
        n => n,
    };

    let bytes_2x2 = num_2x2 * RAW_2X2_CELL_SIZE;
    let remaining = payload_size.checked_sub(bytes_2x2).ok_or_else(|| {
        RoqError::CorruptCodebook(format!(
            "载荷 {payload_size} 字节不足以容纳 {num_2x2} 个 2x2 单元 ({bytes_2x2} 字节)"
        ))
    })?;

    let num_4x4 = match usize::from(argument & 0x04) {
        0 if remaining >= MAX_CELLS * RAW_4X4_CELL_SIZE => MAX_CELLS,
        0 => 0,
        n => n,
    };

    Ok((num_2x2, num_4x4))
}
