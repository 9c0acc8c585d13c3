//! roq-probe - RoQ 视频信息探测工具
//!
//! 逐块解码 RoQ 文件, 输出流信息、块列表与帧统计, 可选把解码帧转储为 PPM 图像.

mod dump;
mod logging;

use std::io::Read;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use roq::codec::VqStats;
use roq::core::BudgetAllocator;
use roq::format::RoqProbe;
use roq::{ContextParameters, FrameSink, NullSink, PlayEvent, RoqError, StreamContext};

use dump::PpmDumpSink;

/// 探测时读取的文件头字节数
const PROBE_SIZE: usize = 16;

/// RoQ 视频信息探测工具
#[derive(Parser, Debug)]
#[command(name = "roq-probe", version, about = "纯 Rust RoQ 视频探测工具")]
struct Cli {
    /// 输入文件路径
    input: String,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 列出每个块
    #[arg(long)]
    show_chunks: bool,

    /// 把解码帧写为 PPM 图像到指定目录
    #[arg(long)]
    dump_dir: Option<String>,

    /// 最多解码的帧数
    #[arg(long)]
    max_frames: Option<u64>,

    /// 帧缓冲内存上限 (字节)
    #[arg(long)]
    max_memory: Option<usize>,

    /// 日志详细程度 (-v/-vv/-vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    format: FormatInfo,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<Vec<ChunkInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// 格式信息
#[derive(Serialize)]
struct FormatInfo {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    probe_score: Option<u32>,
    has_signature: bool,
    playback_rate: u16,
    width: usize,
    height: usize,
    bytes_read: u64,
}

/// 解码统计
#[derive(Serialize, Default)]
struct Summary {
    frames: u64,
    codebooks: u64,
    audio_chunks: u64,
    audio_bytes: u64,
    skip_blocks: usize,
    motion_blocks: usize,
    vq_blocks: usize,
    subdivisions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames_dumped: Option<usize>,
}

impl Summary {
    fn add_blocks(&mut self, stats: &VqStats) {
        self.skip_blocks += stats.skip;
        self.motion_blocks += stats.motion;
        self.vq_blocks += stats.vq;
        self.subdivisions += stats.subdivide;
    }
}

/// 单个块的描述
#[derive(Serialize)]
struct ChunkInfo {
    index: u64,
    kind: &'static str,
    detail: String,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("roq-probe", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "roq-probe 版本 {} -- 纯 Rust RoQ 探测工具",
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("输入文件: {}", cli.input);
    }

    let probe_score = probe_file(&cli.input)?;
    match probe_score {
        Some(score) => info!("格式探测: roq (置信度 {score})"),
        None => warn!("文件头不像 RoQ 流, 仍尝试解码"),
    }

    let source = roq::format::io::open_file(&cli.input)
        .with_context(|| format!("无法打开文件 '{}'", cli.input))?;
    let mut params = ContextParameters::new(source);
    if let Some(limit) = cli.max_memory {
        params = params.with_allocator(BudgetAllocator::new(limit));
    }
    let mut ctx = StreamContext::new(params);

    let mut dump_sink = match &cli.dump_dir {
        Some(dir) => Some(
            PpmDumpSink::new(dir).with_context(|| format!("无法创建转储目录 '{dir}'"))?,
        ),
        None => None,
    };

    let mut summary = Summary::default();
    let mut chunks = Vec::new();
    let mut error = None;
    let mut index = 0u64;
    let mut null_sink = NullSink;

    loop {
        if cli.max_frames.is_some_and(|max| summary.frames >= max) {
            info!("已达到帧数上限 {}", summary.frames);
            break;
        }

        let sink: &mut dyn FrameSink = match dump_sink.as_mut() {
            Some(sink) => sink,
            None => &mut null_sink,
        };
        let event = match ctx.play(sink) {
            Ok(event) => event,
            Err(RoqError::Eof) => break,
            Err(e) => {
                warn!("块 {index} 解码失败 (偏移 {}): {e}", ctx.position());
                error = Some(e.to_string());
                break;
            }
        };

        let (kind, detail) = describe(&event);
        match event {
            PlayEvent::Codebook { .. } => summary.codebooks += 1,
            PlayEvent::Frame { stats, .. } => {
                summary.frames += 1;
                summary.add_blocks(&stats);
            }
            PlayEvent::SkippedAudio { size, .. } => {
                summary.audio_chunks += 1;
                summary.audio_bytes += u64::from(size);
            }
            PlayEvent::Signature { .. } | PlayEvent::Info { .. } => {}
        }
        if cli.show_chunks {
            chunks.push(ChunkInfo {
                index,
                kind,
                detail,
            });
        }
        index += 1;
    }

    if let Some(sink) = dump_sink.as_mut() {
        if let Some(e) = sink.take_error() {
            return Err(e).context("转储帧失败");
        }
        summary.frames_dumped = Some(sink.written());
    }

    let output = ProbeOutput {
        format: FormatInfo {
            filename: cli.input.clone(),
            probe_score,
            has_signature: ctx.has_signature(),
            playback_rate: ctx.playback_rate(),
            width: ctx.width(),
            height: ctx.height(),
            bytes_read: ctx.position(),
        },
        summary,
        chunks: cli.show_chunks.then_some(chunks),
        error,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&output);
    }

    if let Some(e) = &output.error {
        anyhow::bail!("解码中止: {e}");
    }
    Ok(())
}

/// 读取文件头并探测格式
fn probe_file(path: &str) -> Result<Option<u32>> {
    let file = std::fs::File::open(path).with_context(|| format!("无法打开文件 '{path}'"))?;
    let mut head = Vec::with_capacity(PROBE_SIZE);
    file.take(PROBE_SIZE as u64)
        .read_to_end(&mut head)
        .context("读取文件头失败")?;
    Ok(RoqProbe.probe(&head, Some(path)))
}

fn describe(event: &PlayEvent) -> (&'static str, String) {
    match *event {
        PlayEvent::Signature { playback_rate } => ("signature", format!("帧率 {playback_rate}")),
        PlayEvent::Info {
            width,
            height,
            first,
        } => (
            "info",
            if first {
                format!("{width}x{height}")
            } else {
                format!("{width}x{height} (重复)")
            },
        ),
        PlayEvent::Codebook {
            cells_2x2,
            cells_4x4,
        } => ("quad_codebook", format!("2x2={cells_2x2}, 4x4={cells_4x4}")),
        PlayEvent::Frame { index, stats } => (
            "quad_vq",
            format!(
                "帧 {index}: skip={}, motion={}, vq={}, subdivide={}",
                stats.skip, stats.motion, stats.vq, stats.subdivide
            ),
        ),
        PlayEvent::SkippedAudio { id, size } => (id.name(), format!("{size} 字节 (已跳过)")),
    }
}

fn print_text(output: &ProbeOutput) {
    let f = &output.format;
    println!("文件:     {}", f.filename);
    if let Some(score) = f.probe_score {
        println!("探测分数: {score}");
    }
    println!("签名:     {}", if f.has_signature { "有" } else { "无" });
    println!("帧率:     {}", f.playback_rate);
    println!("尺寸:     {}x{}", f.width, f.height);
    println!("读取字节: {}", f.bytes_read);

    let s = &output.summary;
    println!("帧数:     {}", s.frames);
    println!("码本:     {}", s.codebooks);
    println!("音频块:   {} ({} 字节)", s.audio_chunks, s.audio_bytes);
    println!(
        "块统计:   skip={}, motion={}, vq={}, subdivide={}",
        s.skip_blocks, s.motion_blocks, s.vq_blocks, s.subdivisions
    );
    if let Some(n) = s.frames_dumped {
        println!("已转储:   {n} 帧");
    }

    if let Some(chunks) = &output.chunks {
        println!();
        for c in chunks {
            println!("#{:<6} {:<14} {}", c.index, c.kind, c.detail);
        }
    }
    if let Some(e) = &output.error {
        println!();
        println!("错误: {e}");
    }
}
