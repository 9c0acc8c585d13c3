//! I/O 抽象层.
//!
//! 解码器不持有文件句柄, 字节由调用方通过 `ByteSource` 按需提供.
//! 约定: 只有在真正到达流末尾 (或出错) 时, `read` 才会返回少于请求的字节数;
//! 解码器把任何短读视为致命截断, 从不 "再试一次".

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use log::debug;
use roq_core::{RoqError, RoqResult};

/// 单个块载荷的最大字节数
///
/// 超出视为损坏的块头, 避免按伪造的大小分配内存.
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// 跳过数据时使用的临时缓冲区大小
const SKIP_BUFFER_SIZE: usize = 4096;

/// 字节源 trait
///
/// 实现此 trait 以支持不同的数据来源 (文件、内存、网络等).
pub trait ByteSource: Send {
    /// 读取数据到缓冲区, 返回实际读取的字节数
    ///
    /// 返回值小于 `buf.len()` 表示已到达流末尾.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// 内存字节源
pub struct MemorySource {
    data: Bytes,
    pos: usize,
}

impl MemorySource {
    /// 从内存数据创建
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// 剩余未读字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// 基于 `std::io::Read` 的字节源
///
/// 内部循环读取直到填满请求或遇到流末尾, 以满足 `ByteSource` 的短读约定.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read + Send> ReaderSource<R> {
    /// 包装任意 `Read` 实现
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

/// 以只读方式打开文件作为字节源
pub fn open_file(path: impl AsRef<Path>) -> RoqResult<ReaderSource<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    debug!("打开文件: {}", path.display());
    Ok(ReaderSource::new(BufReader::new(file)))
}

/// I/O 上下文
///
/// 封装字节源, 为块读取器提供按字段读取的接口, 并记录流内绝对位置用于诊断.
pub struct IoContext {
    /// 字节源
    inner: Box<dyn ByteSource>,
    /// 已消费的字节数
    position: u64,
}

impl IoContext {
    /// 从字节源创建上下文
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        Self {
            inner: source,
            position: 0,
        }
    }

    /// 从内存数据创建上下文
    pub fn from_memory(data: impl Into<Bytes>) -> Self {
        Self::new(Box::new(MemorySource::new(data)))
    }

    /// 从文件路径打开 (只读)
    pub fn open_read(path: impl AsRef<Path>) -> RoqResult<Self> {
        Ok(Self::new(Box::new(open_file(path)?)))
    }

    /// 已消费的字节数
    pub fn position(&self) -> u64 {
        self.position
    }

    /// 单次读取, 返回实际读取的字节数 (可能少于请求)
    pub fn read_available(&mut self, buf: &mut [u8]) -> RoqResult<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// 读取指定字节数, 短读即报告截断
    pub fn read_exact(&mut self, buf: &mut [u8]) -> RoqResult<()> {
        let n = self.read_available(buf)?;
        if n < buf.len() {
            return Err(RoqError::IoTruncated {
                needed: buf.len(),
                got: n,
            });
        }
        Ok(())
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: u32) -> RoqResult<Bytes> {
        if count > MAX_PAYLOAD_SIZE {
            return Err(RoqError::CorruptStream(format!(
                "块载荷 {count} 字节超出上限 {MAX_PAYLOAD_SIZE}"
            )));
        }
        let mut buf = vec![0u8; count as usize];
        self.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: u32) -> RoqResult<()> {
        let mut scratch = [0u8; SKIP_BUFFER_SIZE];
        let mut left = count as usize;
        while left > 0 {
            let step = left.min(SKIP_BUFFER_SIZE);
            self.read_exact(&mut scratch[..step])?;
            left -= step;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 每次最多返回 3 字节的读取器, 模拟分段到达的管道
    struct Trickle(Vec<u8>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0.drain(..n);
            Ok(n)
        }
    }

    #[test]
    fn test_内存源_定长读取() {
        let mut io = IoContext::from_memory(vec![0x84, 0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0x1E]);
        let mut buf = [0u8; 6];
        io.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x84, 0x10, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(io.position(), 6);
        match io.read_exact(&mut [0u8; 2]) {
            Err(RoqError::IoTruncated { needed: 2, got: 1 }) => {}
            other => panic!("期望截断, 实际 {other:?}"),
        }
    }

    #[test]
    fn test_读取器源_填满请求() {
        let data: Vec<u8> = (0..10).collect();
        let mut io = IoContext::new(Box::new(ReaderSource::new(Trickle(data))));
        let bytes = io.read_bytes(8).unwrap();
        assert_eq!(&bytes[..], &[0, 1, 2, 3, 4, 5, 6, 7]);
        // 只剩 2 字节
        let mut buf = [0u8; 4];
        assert_eq!(io.read_available(&mut buf).unwrap(), 2);
        assert_eq!(io.read_available(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_跳过与超大载荷() {
        let mut io = IoContext::from_memory(vec![7u8; 10_000]);
        io.skip(9_999).unwrap();
        assert_eq!(io.position(), 9_999);
        assert!(matches!(
            io.skip(2),
            Err(RoqError::IoTruncated { needed: 2, got: 1 })
        ));
        assert!(matches!(
            io.read_bytes(MAX_PAYLOAD_SIZE + 1),
            Err(RoqError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_打开文件() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, &[1, 0, 2, 0]).unwrap();
        let mut io = IoContext::open_read(tmp.path()).unwrap();
        assert_eq!(&io.read_bytes(4).unwrap()[..], &[1, 0, 2, 0]);
        assert!(IoContext::open_read("/nonexistent/clip.roq").is_err());
    }
}
