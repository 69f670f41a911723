//! The two-pass stretch engine.
//!
//! The horizontal pass scales every source row inside the source clip into an
//! intermediate buffer. The vertical pass then combines intermediate rows into
//! destination rows and hands them to a [`ScanlineSink`] one at a time.

use crate::error::{Result, StretchError, bail};
use crate::log::{ldebug, ltrace};
use crate::sink::ScanlineSink;
use crate::weights::{PixelWeight, WeightTable, pixel_from_fixed};
use crate::{ClipRect, ResampleOptions};
use folium_common::bit::{bit_is_set, sample};
use folium_common::pitch::pitch32;
use folium_common::raster::{PauseIndicator, PixelFormat, PixelSource, reborrow};

/// The number of rows processed between two pause checks.
const PAUSE_INTERVAL: u32 = 10;

/// The upper bound for the intermediate buffer.
const MAX_INTERMEDIATE_SIZE: usize = 1 << 29;

/// The result of [`StretchEngine::continue_stretch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchStatus {
    /// The engine yielded and has to be continued.
    NeedsMoreTime,
    /// All destination rows have been delivered.
    Done,
}

/// How source pixels are combined, fixed when the engine is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMethod {
    /// 1-bit source into an 8-bit destination.
    OneBppTo8Bpp,
    /// 1-bit source into a 24 or 32-bit destination.
    OneBppToManyBpp,
    /// 8-bit source into an 8-bit destination.
    EightBppTo8Bpp,
    /// 8-bit source, mapped through its palette, into a 24 or 32-bit
    /// destination.
    EightBppToManyBpp,
    /// 24 or 32-bit source into a 24 or 32-bit destination.
    ManyBppToManyBpp,
    /// 32-bit source with alpha into a 24 or 32-bit destination.
    ManyBppToManyBppWithAlpha,
}

impl TransformMethod {
    /// Pick the method for resampling `source` scanlines into `dest`.
    pub fn select(source: PixelFormat, dest: PixelFormat) -> Result<Self> {
        let unsupported = StretchError::UnsupportedFormat { source, dest };
        let to_8bpp = dest.bpp() == 8;

        if dest.bpp() == 1 {
            bail!(unsupported);
        }

        Ok(match source.bpp() {
            1 if to_8bpp => Self::OneBppTo8Bpp,
            1 => Self::OneBppToManyBpp,
            8 if to_8bpp => Self::EightBppTo8Bpp,
            8 => Self::EightBppToManyBpp,
            _ if to_8bpp => bail!(unsupported),
            _ if source.has_alpha() => Self::ManyBppToManyBppWithAlpha,
            _ => Self::ManyBppToManyBpp,
        })
    }

    /// The number of bytes per pixel in the intermediate buffer.
    fn intermediate_bytes(self) -> usize {
        match self {
            Self::OneBppTo8Bpp | Self::EightBppTo8Bpp => 1,
            Self::ManyBppToManyBppWithAlpha => 4,
            _ => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StretchState {
    Idle,
    Horizontal,
    Done,
}

/// Scales a [`PixelSource`] into a [`ScanlineSink`].
///
/// Call [`StretchEngine::start_stretch_horz`] once, then
/// [`StretchEngine::continue_stretch`] until it reports
/// [`StretchStatus::Done`].
pub struct StretchEngine<'a> {
    source: &'a mut dyn PixelSource,
    sink: &'a mut dyn ScanlineSink,
    dest_format: PixelFormat,
    dest_width: i32,
    dest_height: i32,
    dest_clip: ClipRect,
    src_width: i32,
    src_height: i32,
    src_clip: ClipRect,
    src_bytes: usize,
    options: ResampleOptions,
    method: TransformMethod,
    /// BGR colors of the source indices for the palette methods.
    colors: Vec<[u8; 3]>,
    inter_buf: Vec<u8>,
    inter_pitch: usize,
    dest_scanline: Vec<u8>,
    weights: Option<WeightTable>,
    cur_row: i32,
    state: StretchState,
}

impl<'a> StretchEngine<'a> {
    /// Prepare scaling `source` to `dest_width` x `dest_height` pixels of
    /// `dest_format`. Negative dimensions mirror the respective axis.
    ///
    /// Only the part of the destination inside `clip` is produced; the sink
    /// receives its rows numbered from the top of the clip.
    pub fn new(
        sink: &'a mut dyn ScanlineSink,
        dest_format: PixelFormat,
        dest_width: i32,
        dest_height: i32,
        clip: ClipRect,
        source: &'a mut dyn PixelSource,
        options: ResampleOptions,
    ) -> Result<Self> {
        let src_width = i32::try_from(source.width()).map_err(|_| StretchError::Overflow)?;
        let src_height = i32::try_from(source.height()).map_err(|_| StretchError::Overflow)?;

        if dest_width == 0 || dest_height == 0 || clip.is_empty() || src_width == 0 || src_height == 0
        {
            bail!(StretchError::EmptySize);
        }

        let method = TransformMethod::select(source.format(), dest_format)?;
        let clip_width = clip.width() as u32;
        let dest_pitch = pitch32(dest_format.bpp(), clip_width).ok_or(StretchError::Overflow)?;
        let inter_pitch = pitch32(method.intermediate_bytes() as u32 * 8, clip_width)
            .ok_or(StretchError::Overflow)?;

        let options = if options.contains(ResampleOptions::NO_SMOOTH) {
            ResampleOptions::NO_SMOOTH
        } else if !options.contains(ResampleOptions::BILINEAR)
            && u64::from(dest_height.unsigned_abs()) / 8
                < u64::from(source.width()) * u64::from(source.height())
                    / u64::from(dest_width.unsigned_abs())
        {
            options | ResampleOptions::BILINEAR
        } else {
            options
        };

        let src_clip = source_clip(clip, dest_width, dest_height, src_width, src_height);

        let mut dest_scanline = vec![0; dest_pitch as usize];
        if dest_format.bpp() == 32 {
            dest_scanline.fill(0xFF);
        }

        let colors = match method {
            TransformMethod::OneBppToManyBpp => palette_colors(source.palette(), 2),
            TransformMethod::EightBppToManyBpp => palette_colors(source.palette(), 256),
            _ => Vec::new(),
        };

        ldebug!(
            "stretching {}x{} {:?} to {}x{} {:?} using {:?}",
            src_width,
            src_height,
            source.format(),
            dest_width,
            dest_height,
            dest_format,
            method
        );

        Ok(Self {
            src_bytes: (source.format().bpp() / 8) as usize,
            source,
            sink,
            dest_format,
            dest_width,
            dest_height,
            dest_clip: clip,
            src_width,
            src_height,
            src_clip,
            options,
            method,
            colors,
            inter_buf: Vec::new(),
            inter_pitch: inter_pitch as usize,
            dest_scanline,
            weights: None,
            cur_row: 0,
            state: StretchState::Idle,
        })
    }

    /// The pixel-copy specialization in use.
    pub fn transform_method(&self) -> TransformMethod {
        self.method
    }

    /// The effective options after mode selection.
    pub fn options(&self) -> ResampleOptions {
        self.options
    }

    /// The part of the source that contributes to the clip.
    pub fn src_clip(&self) -> ClipRect {
        self.src_clip
    }

    /// Allocate the intermediate buffer and compute the horizontal weights.
    ///
    /// Returns `false` if the source clip is empty or the buffers would get
    /// too large.
    pub fn start_stretch_horz(&mut self) -> bool {
        let rows = self.src_clip.height() as usize;

        if rows == 0 || self.inter_pitch == 0 || rows > MAX_INTERMEDIATE_SIZE / self.inter_pitch {
            return false;
        }

        let Some(weights) = WeightTable::new(
            self.dest_width,
            self.dest_clip.left,
            self.dest_clip.right,
            self.src_width,
            self.src_clip.left,
            self.src_clip.right,
            self.options,
        ) else {
            return false;
        };

        self.inter_buf = vec![0; rows * self.inter_pitch];
        self.weights = Some(weights);
        self.cur_row = self.src_clip.top;
        self.state = StretchState::Horizontal;

        true
    }

    /// Run the horizontal pass until it finishes or `pause` asks to yield,
    /// followed by the vertical pass.
    pub fn continue_stretch(&mut self, pause: Option<&mut dyn PauseIndicator>) -> StretchStatus {
        if self.state != StretchState::Horizontal {
            return StretchStatus::Done;
        }

        if self.continue_stretch_horz(pause) {
            return StretchStatus::NeedsMoreTime;
        }

        self.state = StretchState::Done;
        self.stretch_vert();

        StretchStatus::Done
    }

    /// Returns `true` if the pass yielded.
    fn continue_stretch_horz(&mut self, mut pause: Option<&mut dyn PauseIndicator>) -> bool {
        if self.source.skip_to_scanline(self.cur_row as u32, reborrow(&mut pause)) {
            return true;
        }

        let Some(weights) = self.weights.as_ref() else {
            return false;
        };

        let mut rows_to_go = PAUSE_INTERVAL;

        while self.cur_row < self.src_clip.bottom {
            if rows_to_go == 0 {
                if pause.as_mut().is_some_and(|p| p.need_to_pause_now()) {
                    ltrace!("horizontal pass paused at row {}", self.cur_row);

                    return true;
                }

                rows_to_go = PAUSE_INTERVAL;
            }

            let offset = (self.cur_row - self.src_clip.top) as usize * self.inter_pitch;
            let src = self.source.scanline(self.cur_row as u32);
            let dst = &mut self.inter_buf[offset..offset + self.inter_pitch];

            let row = HorizontalRow {
                method: self.method,
                weights,
                colors: &self.colors,
                src_bytes: self.src_bytes,
            };
            row.stretch(self.dest_clip.left..self.dest_clip.right, src, dst);

            self.cur_row += 1;
            rows_to_go -= 1;
        }

        false
    }

    fn stretch_vert(&mut self) {
        let Some(table) = WeightTable::new(
            self.dest_height,
            self.dest_clip.top,
            self.dest_clip.bottom,
            self.src_height,
            self.src_clip.top,
            self.src_clip.bottom,
            self.options,
        ) else {
            ldebug!("failed to compute vertical weights");

            return;
        };

        let inter_bytes = self.method.intermediate_bytes();
        let dest_bytes = (self.dest_format.bpp() / 8) as usize;
        let width = self.dest_clip.width() as usize;

        for row in self.dest_clip.top..self.dest_clip.bottom {
            let Some(pw) = table.get(row) else {
                return;
            };

            let columns = self.dest_scanline.chunks_exact_mut(dest_bytes).take(width);

            for (col, out) in columns.enumerate() {
                let column = Column {
                    buf: &self.inter_buf,
                    pitch: self.inter_pitch,
                    offset: col * inter_bytes,
                    top: self.src_clip.top,
                };

                match self.method {
                    TransformMethod::OneBppTo8Bpp | TransformMethod::EightBppTo8Bpp => {
                        out[0] = pixel_from_fixed(column.accumulate::<1>(pw)[0]);
                    }
                    TransformMethod::OneBppToManyBpp
                    | TransformMethod::EightBppToManyBpp
                    | TransformMethod::ManyBppToManyBpp => {
                        let acc = column.accumulate::<3>(pw);
                        out[..3].copy_from_slice(&acc.map(pixel_from_fixed));
                    }
                    TransformMethod::ManyBppToManyBppWithAlpha => {
                        let [b, g, r, a] = column.accumulate::<4>(pw);
                        let unpremultiply = |c: u32| {
                            if a == 0 {
                                0
                            } else {
                                (u64::from(c) * 255 / u64::from(a)).min(255) as u8
                            }
                        };

                        out[..3].copy_from_slice(&[unpremultiply(b), unpremultiply(g), unpremultiply(r)]);

                        if dest_bytes == 4 {
                            out[3] = pixel_from_fixed(a);
                        }
                    }
                }
            }

            self.sink
                .compose_scanline((row - self.dest_clip.top) as u32, &self.dest_scanline);
        }
    }
}

/// Map the source clip back from the destination clip.
fn source_clip(
    clip: ClipRect,
    dest_width: i32,
    dest_height: i32,
    src_width: i32,
    src_height: i32,
) -> ClipRect {
    let scale_x = f64::from(src_width) / f64::from(dest_width);
    let scale_y = f64::from(src_height) / f64::from(dest_height);
    let base_x = if dest_width > 0 { 0.0 } else { f64::from(dest_width) };
    let base_y = if dest_height > 0 { 0.0 } else { f64::from(dest_height) };

    let ordered = |a: f64, b: f64| if a > b { (b, a) } else { (a, b) };
    let (left, right) = ordered(
        scale_x * (f64::from(clip.left) + base_x),
        scale_x * (f64::from(clip.right) + base_x),
    );
    let (top, bottom) = ordered(
        scale_y * (f64::from(clip.top) + base_y),
        scale_y * (f64::from(clip.bottom) + base_y),
    );

    ClipRect::new(
        left.floor() as i32,
        top.floor() as i32,
        right.ceil() as i32,
        bottom.ceil() as i32,
    )
    .intersect(&ClipRect::from_size(src_width, src_height))
}

/// BGR colors for the first `count` indices, gray ramps without a palette.
fn palette_colors(palette: Option<&[u32]>, count: usize) -> Vec<[u8; 3]> {
    (0..count)
        .map(|i| match palette.and_then(|p| p.get(i)) {
            Some(argb) => {
                let [b, g, r, _] = argb.to_le_bytes();
                [b, g, r]
            }
            None => [(i * 255 / (count - 1)) as u8; 3],
        })
        .collect()
}

struct HorizontalRow<'b> {
    method: TransformMethod,
    weights: &'b WeightTable,
    colors: &'b [[u8; 3]],
    src_bytes: usize,
}

impl HorizontalRow<'_> {
    fn stretch(&self, cols: core::ops::Range<i32>, src: &[u8], dst: &mut [u8]) {
        let inter_bytes = self.method.intermediate_bytes();

        for (col, out) in cols.zip(dst.chunks_exact_mut(inter_bytes)) {
            let Some(pw) = self.weights.get(col) else {
                return;
            };

            match self.method {
                TransformMethod::OneBppTo8Bpp => {
                    let a: u32 = pw
                        .iter()
                        .filter(|(j, _)| bit_is_set(src, *j))
                        .map(|(_, w)| w * 255)
                        .sum();
                    out[0] = pixel_from_fixed(a);
                }
                TransformMethod::EightBppTo8Bpp => {
                    let a: u32 = pw.iter().map(|(j, w)| w * sample(src, j, 8)).sum();
                    out[0] = pixel_from_fixed(a);
                }
                TransformMethod::OneBppToManyBpp => {
                    let acc = self.mix(pw, |j| usize::from(bit_is_set(src, j)));
                    out.copy_from_slice(&acc.map(pixel_from_fixed));
                }
                TransformMethod::EightBppToManyBpp => {
                    let acc = self.mix(pw, |j| sample(src, j, 8) as usize);
                    out.copy_from_slice(&acc.map(pixel_from_fixed));
                }
                TransformMethod::ManyBppToManyBpp => {
                    let mut acc = [0_u32; 3];

                    for (j, w) in pw.iter() {
                        for (c, value) in acc.iter_mut().enumerate() {
                            *value += w * sample(src, j * self.src_bytes + c, 8);
                        }
                    }

                    out.copy_from_slice(&acc.map(pixel_from_fixed));
                }
                TransformMethod::ManyBppToManyBppWithAlpha => {
                    let mut acc = [0_u32; 3];
                    let mut alpha = 0;

                    for (j, w) in pw.iter() {
                        let px = j * self.src_bytes;
                        let w = w * sample(src, px + 3, 8) / 255;

                        for (c, value) in acc.iter_mut().enumerate() {
                            *value += w * sample(src, px + c, 8);
                        }

                        alpha += w;
                    }

                    let [b, g, r] = acc.map(pixel_from_fixed);
                    out.copy_from_slice(&[b, g, r, pixel_from_fixed(255 * alpha)]);
                }
            }
        }
    }

    /// Accumulate the palette colors of the indices returned by `index`.
    fn mix(&self, pw: PixelWeight<'_>, index: impl Fn(usize) -> usize) -> [u32; 3] {
        let mut acc = [0_u32; 3];

        for (j, w) in pw.iter() {
            let color = self.colors.get(index(j)).copied().unwrap_or_default();

            for (value, c) in acc.iter_mut().zip(color) {
                *value += w * u32::from(c);
            }
        }

        acc
    }
}

/// One column of the intermediate buffer.
struct Column<'b> {
    buf: &'b [u8],
    pitch: usize,
    offset: usize,
    top: i32,
}

impl Column<'_> {
    /// The weighted sums of the first `N` channels.
    fn accumulate<const N: usize>(&self, pw: PixelWeight<'_>) -> [u32; N] {
        let mut acc = [0_u32; N];

        for (j, w) in pw.iter() {
            let start = (j - self.top as usize) * self.pitch + self.offset;
            let Some(px) = self.buf.get(start..start + N) else {
                break;
            };

            for (value, c) in acc.iter_mut().zip(px) {
                *value += w * u32::from(*c);
            }
        }

        acc
    }
}
