//! 四叉树 VQ 帧解码.
//!
//! 画面按 8x8 顶层块从左到右、从上到下扫描. 每个块由一个 2 位类型码决定:
//!
//! | 码 | 含义 |
//! |----|------|
//! | 0 | 跳过: 从上一帧同位置原样拷贝 |
//! | 1 | 运动补偿: 读 1 字节运动向量, 从上一帧偏移位置拷贝 |
//! | 2 | 矢量量化: 读码本索引填充 |
//! | 3 | 细分: 拆为 4 个边长减半的子块, 各自再读类型码 |
//!
//! 类型码打包在 16 位小端码字中, 每个码字含 8 个类型码, 从最高两位开始消费;
//! 码字用尽时才从载荷读取下一个, 因此码字与运动向量字节、索引字节交错排列.

use log::debug;
use roq_core::bytereader::ByteReader;
use roq_core::{Rgba, RoqError, RoqResult};

use crate::codebook::Codebook;
use crate::framebuffer::FrameBuffers;

/// 顶层块边长
pub const BLOCK_SIZE: usize = 8;

/// 最小块边长
pub const MIN_BLOCK_SIZE: usize = 2;

/// 每个码字包含的类型码数
const CODES_PER_WORD: u32 = 8;

/// 块类型码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCode {
    /// 跳过
    Skip,
    /// 运动补偿拷贝
    Motion,
    /// 矢量量化填充
    Vq,
    /// 细分
    Subdivide,
}

impl BlockCode {
    fn from_bits(bits: u16) -> Self {
        match bits & 0x3 {
            0 => Self::Skip,
            1 => Self::Motion,
            2 => Self::Vq,
            _ => Self::Subdivide,
        }
    }
}

/// VQ 块统计 (按类型计数, 含各级子块)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VqStats {
    pub skip: usize,
    pub motion: usize,
    pub vq: usize,
    pub subdivide: usize,
}

/// 块级运动偏移 (来自块参数的 mx/my, 4 位有符号)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionOffset {
    pub mx: i32,
    pub my: i32,
}

impl MotionOffset {
    /// 从 VQ 块参数解析: bits[7:4] = mx, bits[3:0] = my
    pub fn from_argument(argument: u16) -> Self {
        Self {
            mx: sign_extend_nibble((argument >> 4) as u8),
            my: sign_extend_nibble(argument as u8),
        }
    }

    /// 解码单块运动向量字节: 高 4 位水平, 低 4 位垂直
    pub fn vector(&self, byte: u8) -> (i32, i32) {
        let dx = 8 - i32::from(byte >> 4) - self.mx;
        let dy = 8 - i32::from(byte & 0x0F) - self.my;
        (dx, dy)
    }
}

fn sign_extend_nibble(v: u8) -> i32 {
    i32::from(((v & 0x0F) << 4) as i8 >> 4)
}

/// 将一个 VQ 块解码到当前帧缓冲
///
/// 读取 "上一帧" 作为跳过块与运动补偿的来源, 写入 "当前" 帧. 不执行交换.
pub fn decode_vq(
    argument: u16,
    payload: &[u8],
    codebook: &Codebook,
    frames: &mut FrameBuffers,
) -> RoqResult<VqStats> {
    let width = frames.width();
    let height = frames.height();
    if width % BLOCK_SIZE != 0 || height % BLOCK_SIZE != 0 {
        return Err(RoqError::CorruptStream(format!(
            "帧尺寸 {width}x{height} 不是 {BLOCK_SIZE} 的整数倍"
        )));
    }

    let (current, previous) = frames.split();
    let mut dec = QuadTreeDecoder {
        br: ByteReader::new(payload),
        code_word: 0,
        codes_left: 0,
        codebook,
        current,
        previous,
        width,
        height,
        motion: MotionOffset::from_argument(argument),
        stats: VqStats::default(),
    };

    for y in (0..height).step_by(BLOCK_SIZE) {
        for x in (0..width).step_by(BLOCK_SIZE) {
            dec.decode_block(x, y, BLOCK_SIZE)?;
        }
    }

    if !dec.br.is_eof() {
        debug!("VQ 载荷末尾有 {} 字节未使用", dec.br.remaining());
    }
    Ok(dec.stats)
}

/// 单帧解码状态
struct QuadTreeDecoder<'a> {
    /// 载荷游标
    br: ByteReader<'a>,
    /// 当前码字 (已消费的类型码已移出高位)
    code_word: u16,
    /// 当前码字剩余类型码数
    codes_left: u32,
    codebook: &'a Codebook,
    current: &'a mut [Rgba],
    previous: &'a [Rgba],
    width: usize,
    height: usize,
    motion: MotionOffset,
    stats: VqStats,
}

impl QuadTreeDecoder<'_> {
    fn next_code(&mut self) -> RoqResult<BlockCode> {
        if self.codes_left == 0 {
            self.code_word = self.br.read_u16_le()?;
            self.codes_left = CODES_PER_WORD;
        }
        let code = BlockCode::from_bits(self.code_word >> 14);
        self.code_word <<= 2;
        self.codes_left -= 1;
        Ok(code)
    }

    fn decode_block(&mut self, x: usize, y: usize, size: usize) -> RoqResult<()> {
        match self.next_code()? {
            BlockCode::Skip => {
                self.stats.skip += 1;
                self.copy_block(x, y, x, y, size);
            }
            BlockCode::Motion => {
                self.stats.motion += 1;
                let byte = self.br.read_u8()?;
                let (dx, dy) = self.motion.vector(byte);
                let src_x = clamp_origin(x, dx, self.width, size);
                let src_y = clamp_origin(y, dy, self.height, size);
                self.copy_block(x, y, src_x, src_y, size);
            }
            BlockCode::Vq => {
                self.stats.vq += 1;
                match size {
                    8 => {
                        for q in 0..4 {
                            let index = self.br.read_u8()?;
                            self.fill_4x4(x + (q & 1) * 4, y + (q >> 1) * 4, index)?;
                        }
                    }
                    4 => {
                        let index = self.br.read_u8()?;
                        self.fill_4x4(x, y, index)?;
                    }
                    _ => {
                        let index = self.br.read_u8()?;
                        self.fill_2x2(x, y, index)?;
                    }
                }
            }
            BlockCode::Subdivide => {
                if size <= MIN_BLOCK_SIZE {
                    return Err(RoqError::CorruptStream(format!(
                        "({x}, {y}) 处 {size}x{size} 块无法继续细分"
                    )));
                }
                self.stats.subdivide += 1;
                let half = size / 2;
                for q in 0..4 {
                    self.decode_block(x + (q & 1) * half, y + (q >> 1) * half, half)?;
                }
            }
        }
        Ok(())
    }

    /// 从上一帧 (src_x, src_y) 拷贝 size x size 区域到当前帧 (x, y)
    fn copy_block(&mut self, x: usize, y: usize, src_x: usize, src_y: usize, size: usize) {
        for row in 0..size {
            let dst = (y + row) * self.width + x;
            let src = (src_y + row) * self.width + src_x;
            self.current[dst..dst + size].copy_from_slice(&self.previous[src..src + size]);
        }
    }

    fn fill_4x4(&mut self, x: usize, y: usize, index: u8) -> RoqResult<()> {
        let cell = *self.codebook.cell_4x4(index)?;
        for (q, &index_2x2) in cell.iter().enumerate() {
            self.fill_2x2(x + (q & 1) * 2, y + (q >> 1) * 2, index_2x2)?;
        }
        Ok(())
    }

    fn fill_2x2(&mut self, x: usize, y: usize, index: u8) -> RoqResult<()> {
        let texels = *self.codebook.cell_2x2(index)?;
        let top = y * self.width + x;
        let bottom = top + self.width;
        self.current[top..top + 2].copy_from_slice(&texels[..2]);
        self.current[bottom..bottom + 2].copy_from_slice(&texels[2..]);
        Ok(())
    }
}

/// 偏移后的源坐标, 限制在 [0, extent - size] 内
fn clamp_origin(pos: usize, delta: i32, extent: usize, size: usize) -> usize {
    let max = (extent - size) as i64;
    (pos as i64 + i64::from(delta)).clamp(0, max) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use roq_core::{SystemAllocator, ycbcr_to_rgba};

    /// 模拟编码端: 按解码顺序写出码字与参数字节
    struct PayloadBuilder {
        buf: Vec<u8>,
        word_pos: usize,
        used: u32,
    }

    impl PayloadBuilder {
        fn new() -> Self {
            Self {
                buf: Vec::new(),
                word_pos: 0,
                used: CODES_PER_WORD,
            }
        }

        fn code(&mut self, code: u16) -> &mut Self {
            if self.used == CODES_PER_WORD {
                self.word_pos = self.buf.len();
                self.buf.extend_from_slice(&[0, 0]);
                self.used = 0;
            }
            let pos = self.word_pos;
            let mut word = u16::from_le_bytes([self.buf[pos], self.buf[pos + 1]]);
            word |= (code & 0x3) << (14 - 2 * self.used);
            self.buf[pos..pos + 2].copy_from_slice(&word.to_le_bytes());
            self.used += 1;
            self
        }

        fn byte(&mut self, b: u8) -> &mut Self {
            self.buf.push(b);
            self
        }

        fn build(&self) -> Vec<u8> {
            self.buf.clone()
        }
    }

    /// 4 个灰度 2x2 单元 (亮度 = 10/20/30/40 起), 4x4 单元 i 引用 [i, i, i, i]
    fn make_codebook() -> Codebook {
        let mut payload = Vec::new();
        for i in 0..4u8 {
            let base = (i + 1) * 10;
            payload.extend_from_slice(&[base, base + 1, base + 2, base + 3, 128, 128]);
        }
        for i in 0..4u8 {
            payload.extend_from_slice(&[i, 3 - i, i, 3 - i]);
        }
        Codebook::decode(0x44, &payload).unwrap()
    }

    fn gray(y: u8) -> Rgba {
        ycbcr_to_rgba(y, 128, 128)
    }

    /// 16x16 双缓冲, 上一帧填充为坐标编码的图案
    fn make_frames() -> FrameBuffers {
        let mut fb = FrameBuffers::new(16, 16, &mut SystemAllocator).unwrap();
        for (i, p) in fb.current_mut().iter_mut().enumerate() {
            *p = 0x1000_0000 | i as u32;
        }
        fb.swap();
        fb
    }

    #[test]
    fn test_全跳过_与上一帧一致() {
        let mut fb = make_frames();
        let payload = PayloadBuilder::new()
            .code(0)
            .code(0)
            .code(0)
            .code(0)
            .build();
        let stats = decode_vq(0, &payload, &make_codebook(), &mut fb).unwrap();
        assert_eq!(stats.skip, 4);
        assert_eq!(fb.current(), fb.previous());
    }

    #[test]
    fn test_码字_高位优先消费() {
        // 0x8000 = 第一个码为 2 (VQ), 其余为 0
        assert_eq!(BlockCode::from_bits(0x8000 >> 14), BlockCode::Vq);
        let payload = PayloadBuilder::new().code(2).build();
        assert_eq!(payload, vec![0x00, 0x80]);
    }

    #[test]
    fn test_8x8_矢量量化_四个4x4索引() {
        let mut fb = make_frames();
        let payload = PayloadBuilder::new()
            .code(2)
            .byte(0)
            .byte(1)
            .byte(2)
            .byte(3)
            .code(0)
            .code(0)
            .code(0)
            .build();
        let cb = make_codebook();
        decode_vq(0, &payload, &cb, &mut fb).unwrap();

        let cur = fb.current();
        // 左上 4x4 使用 4x4 单元 0 = [0, 3, 0, 3]: 左上 2x2 为单元 0
        assert_eq!(cur[0], gray(10));
        assert_eq!(cur[1], gray(11));
        assert_eq!(cur[16], gray(12));
        assert_eq!(cur[17], gray(13));
        // 其右侧 2x2 为单元 3
        assert_eq!(cur[2], gray(40));
        // 右上 4x4 使用 4x4 单元 1 = [1, 2, 1, 2]
        assert_eq!(cur[4], gray(20));
        assert_eq!(cur[6], gray(30));
        // 右下 4x4 (x=4, y=4) 使用 4x4 单元 3 = [3, 0, 3, 0], 其左下 2x2 (x=4, y=6) 为单元 3
        assert_eq!(cur[6 * 16 + 4], gray(40));
        assert_eq!(cur[7 * 16 + 5], gray(43));
        // 其余顶层块为跳过
        assert_eq!(cur[8], fb.previous()[8]);
    }

    #[test]
    fn test_细分到2x2_直接读取2x2索引() {
        let mut fb = make_frames();
        let mut b = PayloadBuilder::new();
        // 8x8 → 4 个 4x4; 第一个 4x4 → 4 个 2x2 VQ; 其余 4x4 跳过
        b.code(3).code(3);
        for i in 0..4 {
            b.code(2).byte(i);
        }
        b.code(0).code(0).code(0);
        // 剩余 3 个顶层块跳过 (跨越到第二个码字)
        b.code(0).code(0).code(0);
        let payload = b.build();
        let stats = decode_vq(0, &payload, &make_codebook(), &mut fb).unwrap();
        assert_eq!(stats.subdivide, 2);
        assert_eq!(stats.vq, 4);
        assert_eq!(stats.skip, 6);

        let cur = fb.current();
        assert_eq!(cur[0], gray(10));
        assert_eq!(cur[2], gray(20));
        assert_eq!(cur[2 * 16], gray(30));
        assert_eq!(cur[3 * 16 + 3], gray(43));
        assert_eq!(cur[4], fb.previous()[4]);
    }

    #[test]
    fn test_运动补偿_按向量偏移拷贝() {
        let mut fb = make_frames();
        // 第二个顶层块 (8, 0): hi=12 → dx=-4, lo=8 → dy=0
        let payload = PayloadBuilder::new()
            .code(0)
            .code(1)
            .byte(0xC8)
            .code(0)
            .code(0)
            .build();
        let stats = decode_vq(0, &payload, &make_codebook(), &mut fb).unwrap();
        assert_eq!(stats.motion, 1);
        let (cur, prev) = (fb.current(), fb.previous());
        for row in 0..8 {
            for col in 0..8 {
                assert_eq!(cur[row * 16 + 8 + col], prev[row * 16 + 4 + col]);
            }
        }
    }

    #[test]
    fn test_运动补偿_越界时限制在画面内() {
        let mut fb = make_frames();
        // 块参数 mx = my = -1 (0xFF): 字节 0x00 → dx = dy = 9, 从 (8, 8) 出发被限制为 (8, 8)
        let payload = PayloadBuilder::new()
            .code(0)
            .code(0)
            .code(0)
            .code(1)
            .byte(0x00)
            .build();
        decode_vq(0xFF, &payload, &make_codebook(), &mut fb).unwrap();
        assert_eq!(fb.current(), fb.previous());
    }

    #[test]
    fn test_运动偏移_有符号半字节() {
        let m = MotionOffset::from_argument(0x7F);
        assert_eq!((m.mx, m.my), (7, -1));
        assert_eq!(m.vector(0x88), (-7, 1));
        let m = MotionOffset::from_argument(0x80);
        assert_eq!((m.mx, m.my), (-8, 0));
    }

    #[test]
    fn test_2x2_细分_报错() {
        let mut fb = make_frames();
        let payload = PayloadBuilder::new().code(3).code(3).code(3).code(3).build();
        let err = decode_vq(0, &payload, &make_codebook(), &mut fb).unwrap_err();
        assert!(matches!(err, RoqError::CorruptStream(_)), "{err:?}");
    }

    #[test]
    fn test_码本索引越界() {
        let mut fb = make_frames();
        let payload = PayloadBuilder::new().code(3).code(3).code(2).byte(4).build();
        let err = decode_vq(0, &payload, &make_codebook(), &mut fb).unwrap_err();
        assert!(matches!(
            err,
            RoqError::OutOfRangeIndex {
                table: "2x2",
                index: 4,
                count: 4
            }
        ));
    }

    #[test]
    fn test_载荷不足_截断() {
        let mut fb = make_frames();
        let payload = PayloadBuilder::new().code(0).code(2).byte(0).build();
        let err = decode_vq(0, &payload, &make_codebook(), &mut fb).unwrap_err();
        assert!(matches!(err, RoqError::IoTruncated { .. }));
    }
}
