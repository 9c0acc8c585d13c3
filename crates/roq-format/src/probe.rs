//! 格式探测.
//!
//! 通过分析文件头部数据和文件扩展名, 判断输入是否为 RoQ 流.

use byteorder::{ByteOrder, LittleEndian};

use crate::chunk::{CHUNK_HEADER_SIZE, ChunkId, SIGNATURE_SIZE};

/// 探测置信度
///
/// 数值越高, 表示对格式判断越有信心.
pub type ProbeScore = u32;

/// 最低探测分数 (仅根据扩展名)
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 中等探测分数 (签名块 ID 匹配, size 字段非约定值)
pub const SCORE_HEADER_ID: ProbeScore = 75;

/// 最高探测分数 (签名块完全匹配)
pub const SCORE_MAX: ProbeScore = 100;

/// RoQ 格式探测器
#[derive(Debug, Default, Clone, Copy)]
pub struct RoqProbe;

impl RoqProbe {
    /// 根据文件头部数据探测格式
    ///
    /// # 参数
    /// - `data`: 文件开头的若干字节
    /// - `filename`: 文件名 (可选, 用于扩展名匹配)
    ///
    /// # 返回
    /// - `Some(score)`: 探测成功, 返回置信度
    /// - `None`: 不是 RoQ 流
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= CHUNK_HEADER_SIZE
            && LittleEndian::read_u16(&data[0..2]) == ChunkId::Signature.code()
        {
            if LittleEndian::read_u32(&data[2..6]) == SIGNATURE_SIZE {
                return Some(SCORE_MAX);
            }
            return Some(SCORE_HEADER_ID);
        }

        let has_extension = filename
            .and_then(|name| name.rsplit_once('.'))
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("roq"));
        has_extension.then_some(SCORE_EXTENSION)
    }
}
