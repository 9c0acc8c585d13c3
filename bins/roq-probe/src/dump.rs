//! 帧转储.
//!
//! 把解码后的 RGBA 帧写成二进制 PPM (P6) 图像, 便于离线检查.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use roq::FrameSink;
use roq::core::{Rgba, rgba_to_bytes};

/// 写出 PPM 的帧回调
///
/// 回调无法返回错误, 首个写入错误保存下来供调用方检查.
pub struct PpmDumpSink {
    dir: PathBuf,
    width: usize,
    height: usize,
    written: usize,
    error: Option<io::Error>,
}

impl PpmDumpSink {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            width: 0,
            height: 0,
            written: 0,
            error: None,
        })
    }

    /// 已写出的帧数
    pub fn written(&self) -> usize {
        self.written
    }

    /// 取出首个写入错误
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.ppm"))
    }
}

impl FrameSink for PpmDumpSink {
    fn on_info(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    fn on_display(&mut self, pixels: &[Rgba]) {
        if self.error.is_some() {
            return;
        }
        let path = self.frame_path(self.written);
        match write_ppm(&path, self.width, self.height, pixels) {
            Ok(()) => self.written += 1,
            Err(e) => {
                log::error!("写出 {} 失败: {e}", path.display());
                self.error = Some(e);
            }
        }
    }
}

/// 写出一帧 P6 PPM (丢弃 alpha)
pub fn write_ppm(path: &Path, width: usize, height: usize, pixels: &[Rgba]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{width} {height}\n255\n")?;
    for &pixel in pixels {
        let [r, g, b, _] = rgba_to_bytes(pixel);
        out.write_all(&[r, g, b])?;
    }
    out.flush()
}
