//! YCbCr → RGBA 颜色转换.
//!
//! 码本中的颜色以 YCbCr 存储, 在码本加载时一次性转换为 RGBA,
//! 解码热路径不再接触 YCbCr.
//!
//! RGBA 字按内存字节顺序 `[r, g, b, a]` 打包 (小端解释).

/// 不透明 RGBA 像素字
pub type Rgba = u32;

/// 黑色 (帧缓冲初始值为全零, 注意 alpha 亦为 0)
pub const RGBA_ZERO: Rgba = 0;

/// 将一组 YCbCr 采样转换为 RGBA 字
///
/// ```text
/// r = y + 1.402    * (cr - 128)
/// g = y - 0.344136 * (cb - 128) - 0.714136 * (cr - 128)
/// b = y + 1.772    * (cb - 128)
/// ```
///
/// 浮点乘法后向零截断, 再限幅到 [0, 255], alpha 固定为 255.
pub fn ycbcr_to_rgba(y: u8, cb: u8, cr: u8) -> Rgba {
    let y = f32::from(y);
    let cb = f32::from(cb) - 128.0;
    let cr = f32::from(cr) - 128.0;

    let r = (y + 1.402 * cr) as i32;
    let g = (y - 0.344_136 * cb - 0.714_136 * cr) as i32;
    let b = (y + 1.772 * cb) as i32;

    u32::from_le_bytes([
        r.clamp(0, 255) as u8,
        g.clamp(0, 255) as u8,
        b.clamp(0, 255) as u8,
        0xFF,
    ])
}

/// 拆分 RGBA 字为 `[r, g, b, a]`
pub fn rgba_to_bytes(pixel: Rgba) -> [u8; 4] {
    pixel.to_le_bytes()
}
