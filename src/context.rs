//! 流上下文.
//!
//! 聚合字节源、解码器状态与流元数据, 生命周期覆盖整个播放会话.
//! 每次调用 `play()` 恰好消费一个块后返回; 不做内部挂起或后台工作.
//!
//! 单线程使用: 每个块都会修改码本与帧缓冲, 跨线程共享需要外部同步.

use std::path::Path;

use log::{debug, trace};
use roq_codec::{Codebook, RoqVideoDecoder, VqStats};
use roq_core::{FrameAllocator, Rgba, RoqResult, SystemAllocator};
use roq_format::chunk::{ChunkId, InfoChunk, next_chunk, read_payload};
use roq_format::io::{ByteSource, IoContext, open_file};

/// 帧输出回调
///
/// 呈现层 (窗口、纹理上传等) 通过此 trait 接收解码结果.
pub trait FrameSink {
    /// INFO 块解析后调用一次, 用于按尺寸创建呈现资源
    fn on_info(&mut self, _width: usize, _height: usize) {}

    /// 每解码完成一帧调用一次
    ///
    /// `pixels` 为 `width * height` 个 RGBA 字, 行优先, 无填充.
    /// 借用仅在调用期间有效: 解码器稍后会复用该缓冲区.
    fn on_display(&mut self, pixels: &[Rgba]);
}

/// 丢弃所有输出的回调
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn on_display(&mut self, _pixels: &[Rgba]) {}
}

/// 流上下文创建参数
pub struct ContextParameters {
    /// 字节源
    pub source: Box<dyn ByteSource>,
    /// 帧缓冲分配器
    pub allocator: Box<dyn FrameAllocator>,
    /// 允许的最大像素数 (None 使用解码器默认值)
    pub max_pixels: Option<usize>,
}

impl ContextParameters {
    /// 以默认分配器包装字节源
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            allocator: Box::new(SystemAllocator),
            max_pixels: None,
        }
    }

    /// 指定帧缓冲分配器
    pub fn with_allocator(mut self, allocator: impl FrameAllocator + 'static) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    /// 指定最大像素数
    pub fn with_max_pixels(mut self, max_pixels: usize) -> Self {
        self.max_pixels = Some(max_pixels);
        self
    }
}

/// 单次 `play()` 处理的块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayEvent {
    /// 签名块
    Signature { playback_rate: u16 },
    /// INFO 块 (`first` 为 false 表示尺寸相同的重复块)
    Info {
        width: u16,
        height: u16,
        first: bool,
    },
    /// 码本已替换
    Codebook { cells_2x2: usize, cells_4x4: usize },
    /// 一帧已解码并输出, `index` 从 0 开始
    Frame { index: u64, stats: VqStats },
    /// 音频块, 载荷已跳过
    SkippedAudio { id: ChunkId, size: u32 },
}

/// 流上下文
pub struct StreamContext {
    /// 块读取所用的 I/O 上下文
    io: IoContext,
    /// 视频解码状态
    decoder: RoqVideoDecoder,
    /// 播放帧率 (来自签名块)
    playback_rate: u16,
    /// 是否已读到签名块
    has_signature: bool,
}

impl StreamContext {
    /// 按参数创建上下文
    pub fn new(params: ContextParameters) -> Self {
        let mut decoder = RoqVideoDecoder::with_allocator(params.allocator);
        if let Some(max_pixels) = params.max_pixels {
            decoder.set_max_pixels(max_pixels);
        }
        Self {
            io: IoContext::new(params.source),
            decoder,
            playback_rate: 0,
            has_signature: false,
        }
    }

    /// 打开文件并以默认参数创建上下文
    pub fn open_file(path: impl AsRef<Path>) -> RoqResult<Self> {
        Ok(Self::new(ContextParameters::new(open_file(path)?)))
    }

    /// 读取并处理一个块
    ///
    /// 返回 `Err(RoqError::Eof)` 表示流已正常结束; 其余错误均为致命错误,
    /// 流位置已不可靠, 调用方应停止播放.
    pub fn play(&mut self, sink: &mut dyn FrameSink) -> RoqResult<PlayEvent> {
        let header = next_chunk(&mut self.io)?;

        match header.id {
            ChunkId::Signature => {
                self.playback_rate = header.argument;
                self.has_signature = true;
                debug!("签名块: 帧率 {}", header.argument);
                Ok(PlayEvent::Signature {
                    playback_rate: header.argument,
                })
            }
            ChunkId::Info => {
                let payload = read_payload(&mut self.io, &header)?;
                let info = InfoChunk::parse(&payload)?;
                let first = self.decoder.configure(info.width, info.height)?;
                if first {
                    sink.on_info(usize::from(info.width), usize::from(info.height));
                }
                Ok(PlayEvent::Info {
                    width: info.width,
                    height: info.height,
                    first,
                })
            }
            ChunkId::QuadCodebook => {
                let payload = read_payload(&mut self.io, &header)?;
                let codebook = self.decoder.load_codebook(header.argument, &payload)?;
                Ok(PlayEvent::Codebook {
                    cells_2x2: codebook.num_2x2_cells(),
                    cells_4x4: codebook.num_4x4_cells(),
                })
            }
            ChunkId::QuadVq => {
                let payload = read_payload(&mut self.io, &header)?;
                let stats = self.decoder.decode_frame(header.argument, &payload)?;
                let index = self.decoder.frame_count() - 1;
                if let Some(pixels) = self.decoder.last_frame() {
                    sink.on_display(pixels);
                }
                trace!("帧 {index}: {stats:?}");
                Ok(PlayEvent::Frame { index, stats })
            }
            ChunkId::SoundMono | ChunkId::SoundStereo => {
                self.io.skip(header.size)?;
                trace!("跳过音频块 {} ({} 字节)", header.id, header.size);
                Ok(PlayEvent::SkippedAudio {
                    id: header.id,
                    size: header.size,
                })
            }
        }
    }

    /// 连续处理直到流结束, 返回解码的帧数
    pub fn play_to_end(&mut self, sink: &mut dyn FrameSink) -> RoqResult<u64> {
        loop {
            match self.play(sink) {
                Ok(_) => {}
                Err(e) if e.is_eof() => return Ok(self.decoder.frame_count()),
                Err(e) => return Err(e),
            }
        }
    }

    /// 视频宽度 (INFO 块之前为 0)
    pub fn width(&self) -> usize {
        self.decoder.width()
    }

    /// 视频高度 (INFO 块之前为 0)
    pub fn height(&self) -> usize {
        self.decoder.height()
    }

    /// 播放帧率 (签名块之前为 0)
    pub fn playback_rate(&self) -> u16 {
        self.playback_rate
    }

    /// 是否已读到签名块
    pub fn has_signature(&self) -> bool {
        self.has_signature
    }

    /// 已解码帧数
    pub fn frame_count(&self) -> u64 {
        self.decoder.frame_count()
    }

    /// 当前写入帧缓冲的索引 (INFO 块之前为 None)
    pub fn current_index(&self) -> Option<usize> {
        self.decoder.frames().map(|f| f.current_index())
    }

    /// 当前码本
    pub fn codebook(&self) -> Option<&Codebook> {
        self.decoder.codebook()
    }

    /// 最近一次解码完成的帧
    pub fn last_frame(&self) -> Option<&[Rgba]> {
        self.decoder.last_frame()
    }

    /// 已消费的字节数
    pub fn position(&self) -> u64 {
        self.io.position()
    }
}
