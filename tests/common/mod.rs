//! 集成测试公共工具: 合成 RoQ 码流与帧捕获回调.

#![allow(dead_code)]

use roq::FrameSink;
use roq::core::Rgba;
use roq::format::ChunkId;
use roq::format::chunk::{ChunkHeader, SIGNATURE_SIZE};

/// 按块拼接合成码流
#[derive(Default)]
pub struct StreamBuilder {
    buf: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入块头与载荷, size 字段取载荷长度
    pub fn chunk(mut self, id: ChunkId, argument: u16, payload: &[u8]) -> Self {
        let header = ChunkHeader {
            id,
            size: payload.len() as u32,
            argument,
        };
        self.buf.extend_from_slice(&header.to_bytes());
        self.buf.extend_from_slice(payload);
        self
    }

    /// 签名块: size 为约定值, 不带载荷
    pub fn signature(mut self, playback_rate: u16) -> Self {
        let header = ChunkHeader {
            id: ChunkId::Signature,
            size: SIGNATURE_SIZE,
            argument: playback_rate,
        };
        self.buf.extend_from_slice(&header.to_bytes());
        self
    }

    pub fn info(self, width: u16, height: u16) -> Self {
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&width.to_le_bytes());
        payload.extend_from_slice(&height.to_le_bytes());
        payload.extend_from_slice(&[8, 0, 0, 0]);
        self.chunk(ChunkId::Info, 0, &payload)
    }

    pub fn codebook(self, argument: u16, payload: &[u8]) -> Self {
        self.chunk(ChunkId::QuadCodebook, argument, payload)
    }

    pub fn vq(self, argument: u16, payload: &[u8]) -> Self {
        self.chunk(ChunkId::QuadVq, argument, payload)
    }

    /// 追加任意原始字节 (用于构造截断或非法数据)
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// 满表灰度码本 (参数 0x00): 2x2 单元 i 亮度全为 i, 4x4 单元 i 引用 [i, i, i, i]
pub fn gray_codebook() -> Vec<u8> {
    let mut payload = Vec::with_capacity(256 * 6 + 256 * 4);
    for i in 0..=255u8 {
        payload.extend_from_slice(&[i, i, i, i, 128, 128]);
    }
    for i in 0..=255u8 {
        payload.extend_from_slice(&[i, i, i, i]);
    }
    payload
}

/// 按解码顺序写出类型码与参数字节
pub struct CodeWriter {
    buf: Vec<u8>,
    word_pos: usize,
    used: u32,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            word_pos: 0,
            used: 8,
        }
    }

    pub fn code(&mut self, code: u16) -> &mut Self {
        if self.used == 8 {
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

    pub fn byte(&mut self, b: u8) -> &mut Self {
        self.buf.push(b);
        self
    }

    /// 连续写出 n 个跳过码
    pub fn skips(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.code(0);
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

/// 全跳过的 VQ 载荷
pub fn all_skip_vq(width: usize, height: usize) -> Vec<u8> {
    CodeWriter::new().skips((width / 8) * (height / 8)).build()
}

/// 记录所有回调的帧输出
#[derive(Default)]
pub struct CaptureSink {
    pub infos: Vec<(usize, usize)>,
    pub frames: Vec<Vec<Rgba>>,
}

impl FrameSink for CaptureSink {
    fn on_info(&mut self, width: usize, height: usize) {
        self.infos.push((width, height));
    }

    fn on_display(&mut self, pixels: &[Rgba]) {
        self.frames.push(pixels.to_vec());
    }
}

/// 初始化测试日志 (重复调用无副作用)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
