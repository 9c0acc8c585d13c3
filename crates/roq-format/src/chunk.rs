//! RoQ 块读取器.
//!
//! 每个块以 8 字节小端块头开始:
//! ```text
//! id:       u16   块类型
//! size:     u32   载荷字节数
//! argument: u16   块参数 (含义随块类型而定)
//! ```
//!
//! 块类型:
//! - SIGNATURE (0x1084): 文件签名, argument 为播放帧率, 无载荷
//! - INFO (0x1001): width:u16, height:u16, reserved:u16[2]
//! - QUAD_CODEBOOK (0x1002): 码本
//! - QUAD_VQ (0x1011): 四叉树 VQ 帧
//! - SOUND_MONO / SOUND_STEREO (0x1020 / 0x1021): 音频, 仅跳过载荷

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use log::trace;
use roq_core::{RoqError, RoqResult};

use crate::io::IoContext;

/// 块头字节数
pub const CHUNK_HEADER_SIZE: usize = 8;

/// 签名块约定的 size 字段
pub const SIGNATURE_SIZE: u32 = 0xFFFF_FFFF;

/// INFO 块载荷的最小字节数
pub const INFO_PAYLOAD_SIZE: usize = 8;

/// 块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkId {
    /// 文件签名
    Signature,
    /// 视频信息 (尺寸)
    Info,
    /// 四叉树码本
    QuadCodebook,
    /// 四叉树 VQ 帧
    QuadVq,
    /// 单声道音频
    SoundMono,
    /// 立体声音频
    SoundStereo,
}

impl ChunkId {
    /// 块类型的数值
    pub const fn code(self) -> u16 {
        match self {
            Self::Signature => 0x1084,
            Self::Info => 0x1001,
            Self::QuadCodebook => 0x1002,
            Self::QuadVq => 0x1011,
            Self::SoundMono => 0x1020,
            Self::SoundStereo => 0x1021,
        }
    }

    /// 从数值解析块类型
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x1084 => Some(Self::Signature),
            0x1001 => Some(Self::Info),
            0x1002 => Some(Self::QuadCodebook),
            0x1011 => Some(Self::QuadVq),
            0x1020 => Some(Self::SoundMono),
            0x1021 => Some(Self::SoundStereo),
            _ => None,
        }
    }

    /// 块类型名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Info => "info",
            Self::QuadCodebook => "quad_codebook",
            Self::QuadVq => "quad_vq",
            Self::SoundMono => "sound_mono",
            Self::SoundStereo => "sound_stereo",
        }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), self.code())
    }
}

/// 块头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// 块类型
    pub id: ChunkId,
    /// 载荷字节数
    pub size: u32,
    /// 块参数
    pub argument: u16,
}

impl ChunkHeader {
    /// 从 8 字节块头解析, 未知块 ID 报错
    pub fn parse(raw: &[u8; CHUNK_HEADER_SIZE]) -> RoqResult<Self> {
        let code = LittleEndian::read_u16(&raw[0..2]);
        let id = ChunkId::from_code(code).ok_or(RoqError::UnknownChunk(code))?;
        Ok(Self {
            id,
            size: LittleEndian::read_u32(&raw[2..6]),
            argument: LittleEndian::read_u16(&raw[6..8]),
        })
    }

    /// 序列化为 8 字节块头
    pub fn to_bytes(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut raw = [0u8; CHUNK_HEADER_SIZE];
        LittleEndian::write_u16(&mut raw[0..2], self.id.code());
        LittleEndian::write_u32(&mut raw[2..6], self.size);
        LittleEndian::write_u16(&mut raw[6..8], self.argument);
        raw
    }

    /// 载荷是否需要从流中读取 (签名块的 size 字段不代表载荷)
    pub fn has_payload(&self) -> bool {
        self.id != ChunkId::Signature
    }
}

/// 读取下一个块头
///
/// - 块边界处没有任何字节: `Eof`
/// - 块头不足 8 字节: `IoTruncated`
/// - 未知块 ID: `UnknownChunk` (载荷长度不可信, 不尝试跳过)
pub fn next_chunk(io: &mut IoContext) -> RoqResult<ChunkHeader> {
    let mut raw = [0u8; CHUNK_HEADER_SIZE];
    let offset = io.position();
    match io.read_available(&mut raw)? {
        0 => return Err(RoqError::Eof),
        CHUNK_HEADER_SIZE => {}
        got => {
            return Err(RoqError::IoTruncated {
                needed: CHUNK_HEADER_SIZE,
                got,
            });
        }
    }
    let header = ChunkHeader::parse(&raw)?;
    trace!(
        "块 {} @ {}: size={}, argument=0x{:04X}",
        header.id, offset, header.size, header.argument
    );
    Ok(header)
}

/// 读取块的完整载荷
pub fn read_payload(io: &mut IoContext, header: &ChunkHeader) -> RoqResult<Bytes> {
    if !header.has_payload() {
        return Ok(Bytes::new());
    }
    io.read_bytes(header.size)
}

/// INFO 块内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoChunk {
    pub width: u16,
    pub height: u16,
}

impl InfoChunk {
    /// 从 INFO 载荷解析 (忽略两个保留字段)
    pub fn parse(payload: &[u8]) -> RoqResult<Self> {
        if payload.len() < INFO_PAYLOAD_SIZE {
            return Err(RoqError::CorruptStream(format!(
                "INFO 载荷 {} 字节, 至少需要 {INFO_PAYLOAD_SIZE}",
                payload.len()
            )));
        }
        Ok(Self {
            width: LittleEndian::read_u16(&payload[0..2]),
            height: LittleEndian::read_u16(&payload[2..4]),
        })
    }
}
