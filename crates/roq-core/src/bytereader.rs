//! 字节游标.
//!
//! 在已完整读入的块载荷上按字节读取小端字段.
//! 载荷先整块读入再解析, 因此解析过程不可能多读或少读底层流.

use byteorder::{ByteOrder, LittleEndian};

use crate::{RoqError, RoqResult};

/// 字节游标
///
/// # 示例
/// ```
/// use roq_core::bytereader::ByteReader;
///
/// let data = [0x34, 0x12, 0xAB];
/// let mut br = ByteReader::new(&data);
/// assert_eq!(br.read_u16_le().unwrap(), 0x1234);
/// assert_eq!(br.read_u8().unwrap(), 0xAB);
/// assert!(br.is_eof());
/// ```
pub struct ByteReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前读取位置
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// 创建新的字节游标
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 已读取的字节数
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余可读字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// 取出接下来的 `count` 个字节
    pub fn read_slice(&mut self, count: usize) -> RoqResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(RoqError::IoTruncated {
                needed: count,
                got: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> RoqResult<u8> {
        Ok(self.read_slice(1)?[0])
    }

    /// 读取 u16 小端
    pub fn read_u16_le(&mut self) -> RoqResult<u16> {
        Ok(LittleEndian::read_u16(self.read_slice(2)?))
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> RoqResult<()> {
        self.read_slice(count).map(|_| ())
    }
}
