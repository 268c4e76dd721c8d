//! Nearest-neighbour resizing fused with BGRA → RGB conversion.
//!
//! Both strategies build a column and a row lookup table once per source
//! geometry and then walk the destination in a single pass, sampling and
//! reordering channels in place. Output orientation is folded into the same
//! tables by reversing them, so it costs nothing per pixel.

use serde::{Deserialize, Serialize};

use super::convert::{self, write_pixel, DST_BYTES_PER_PIXEL, SRC_BYTES_PER_PIXEL};
use crate::device::types::TargetGeometry;

/// Orientation applied to delivered frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Normal,
    /// Mirror left-to-right.
    Mirror,
    /// Flip top-to-bottom.
    Flip,
    /// Mirror and flip.
    Rotate180,
}

impl Orientation {
    fn mirrors(self) -> bool {
        matches!(self, Self::Mirror | Self::Rotate180)
    }

    fn flips(self) -> bool {
        matches!(self, Self::Flip | Self::Rotate180)
    }
}

/// How a source frame is mapped onto the output geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStrategy {
    /// Source already has the output geometry.
    ConvertOnly,
    /// Independent X/Y stretch; used when aspect ratios match.
    Direct,
    /// Uniform scale of a centred crop; used when aspect ratios differ.
    AspectPreserving,
}

/// Rectangle of the source frame that is scaled onto the whole output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SamplingWindow {
    /// The entire source frame.
    pub fn full(src_width: u32, src_height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: src_width,
            height: src_height,
        }
    }

    /// Centred crop of the source with the output's aspect ratio.
    ///
    /// Its size is `target * min(src_w / dst_w, src_h / dst_h)`, computed in
    /// integers so the window never extends past the source.
    pub fn aspect_crop(src_width: u32, src_height: u32, target: TargetGeometry) -> Self {
        let (sw, sh) = (u64::from(src_width), u64::from(src_height));
        let (tw, th) = (u64::from(target.width), u64::from(target.height));

        // sw/tw <= sh/th: width limits the scale.
        let (width, height) = if sw * th <= sh * tw {
            (sw, (th * sw / tw).max(1))
        } else {
            ((tw * sh / th).max(1), sh)
        };
        let width = width.min(sw) as u32;
        let height = height.min(sh) as u32;

        Self {
            x: (src_width - width) / 2,
            y: (src_height - height) / 2,
            width,
            height,
        }
    }
}

/// Whether two aspect ratios are equal within `tolerance`.
pub fn aspect_ratios_match(
    src_width: u32,
    src_height: u32,
    target: TargetGeometry,
    tolerance: f32,
) -> bool {
    let source = src_width as f32 / src_height as f32;
    let output = target.width as f32 / target.height as f32;
    (source - output).abs() <= tolerance
}

/// Cached aspect comparison, recomputed only when the source geometry changes.
#[derive(Debug, Clone, Copy)]
pub struct AspectState {
    last_width: u32,
    last_height: u32,
    matches_target: bool,
}

impl AspectState {
    pub fn new(target: TargetGeometry) -> Self {
        Self {
            last_width: target.width,
            last_height: target.height,
            matches_target: true,
        }
    }

    pub fn matches(
        &mut self,
        width: u32,
        height: u32,
        target: TargetGeometry,
        tolerance: f32,
    ) -> bool {
        if width != self.last_width || height != self.last_height {
            self.last_width = width;
            self.last_height = height;
            self.matches_target = aspect_ratios_match(width, height, target, tolerance);
        }
        self.matches_target
    }
}

/// Worker-owned resizer. Holds the lookup tables for the current source
/// geometry; they are rebuilt (reusing their allocations) only when it changes.
pub struct FrameResizer {
    target: TargetGeometry,
    tolerance: f32,
    orientation: Orientation,
    aspect: AspectState,
    /// Source byte offset within a row, per destination column.
    columns: Vec<usize>,
    /// Source row index, per destination row.
    rows: Vec<usize>,
    mapped_for: Option<(u32, u32)>,
}

impl FrameResizer {
    pub fn new(target: TargetGeometry, tolerance: f32, orientation: Orientation) -> Self {
        Self {
            target,
            tolerance,
            orientation,
            aspect: AspectState::new(target),
            columns: Vec::with_capacity(target.width as usize),
            rows: Vec::with_capacity(target.height as usize),
            mapped_for: None,
        }
    }

    pub fn target(&self) -> TargetGeometry {
        self.target
    }

    /// Pick the strategy for a source geometry.
    pub fn strategy(&mut self, width: u32, height: u32) -> ResizeStrategy {
        if width == self.target.width && height == self.target.height {
            ResizeStrategy::ConvertOnly
        } else if self
            .aspect
            .matches(width, height, self.target, self.tolerance)
        {
            ResizeStrategy::Direct
        } else {
            ResizeStrategy::AspectPreserving
        }
    }

    /// Sampling window used for a source geometry.
    pub fn window(&mut self, width: u32, height: u32) -> SamplingWindow {
        match self.strategy(width, height) {
            ResizeStrategy::AspectPreserving => {
                SamplingWindow::aspect_crop(width, height, self.target)
            }
            ResizeStrategy::ConvertOnly | ResizeStrategy::Direct => {
                SamplingWindow::full(width, height)
            }
        }
    }

    /// Render a BGRA source frame into the RGB output buffer.
    ///
    /// `src` must hold `width * height * 4` bytes and `dst` the target's
    /// RGB size; both are checked once at the pipeline boundary.
    pub fn render(
        &mut self,
        src: &[u8],
        width: u32,
        height: u32,
        dst: &mut [u8],
    ) -> ResizeStrategy {
        let strategy = self.strategy(width, height);
        if strategy == ResizeStrategy::ConvertOnly && self.orientation == Orientation::Normal {
            convert::convert(src, dst, width as usize, height as usize);
            return strategy;
        }

        self.prepare_tables(width, height);
        resample(
            src,
            width as usize,
            &self.columns,
            &self.rows,
            dst,
            self.target.width as usize,
        );
        strategy
    }

    fn prepare_tables(&mut self, width: u32, height: u32) {
        if self.mapped_for == Some((width, height)) {
            return;
        }

        let window = self.window(width, height);
        let (dst_w, dst_h) = (
            u64::from(self.target.width),
            u64::from(self.target.height),
        );

        self.columns.clear();
        self.columns.extend((0..dst_w).map(|x| {
            let sx = u64::from(window.x) + x * u64::from(window.width) / dst_w;
            sx as usize * SRC_BYTES_PER_PIXEL
        }));
        self.rows.clear();
        self.rows.extend((0..dst_h).map(|y| {
            (u64::from(window.y) + y * u64::from(window.height) / dst_h) as usize
        }));

        if self.orientation.mirrors() {
            self.columns.reverse();
        }
        if self.orientation.flips() {
            self.rows.reverse();
        }

        tracing::debug!(
            "Resize tables rebuilt for {width}x{height} -> {}x{} (window {window:?}, {:?})",
            self.target.width,
            self.target.height,
            self.orientation
        );
        self.mapped_for = Some((width, height));
    }
}

/// Single fused pass: sample through the lookup tables and reorder channels.
fn resample(
    src: &[u8],
    src_width: usize,
    columns: &[usize],
    rows: &[usize],
    dst: &mut [u8],
    dst_width: usize,
) {
    let src_stride = src_width * SRC_BYTES_PER_PIXEL;
    let dst_stride = dst_width * DST_BYTES_PER_PIXEL;

    for (dst_row, &sy) in dst.chunks_exact_mut(dst_stride).zip(rows) {
        let src_row = &src[sy * src_stride..(sy + 1) * src_stride];
        for (rgb, &sx) in dst_row.chunks_exact_mut(DST_BYTES_PER_PIXEL).zip(columns) {
            write_pixel(&src_row[sx..sx + SRC_BYTES_PER_PIXEL], rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: TargetGeometry = TargetGeometry {
        width: 1280,
        height: 720,
    };

    /// BGRA frame where every pixel encodes its own coordinates.
    fn coordinate_frame(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x & 0xFF) as u8); // B
                data.push((y & 0xFF) as u8); // G
                data.push(((x >> 8) | ((y >> 8) << 4)) as u8); // R
                data.push(0xFF);
            }
        }
        data
    }

    /// Decode the source coordinates stored in an output RGB pixel.
    fn source_of(rgb: &[u8]) -> (u32, u32) {
        let high = u32::from(rgb[0]);
        let x = u32::from(rgb[2]) | ((high & 0x0F) << 8);
        let y = u32::from(rgb[1]) | ((high >> 4) << 8);
        (x, y)
    }

    fn render(
        target: TargetGeometry,
        orientation: Orientation,
        src_w: u32,
        src_h: u32,
    ) -> (Vec<u8>, ResizeStrategy) {
        let src = coordinate_frame(src_w, src_h);
        let mut dst = vec![0u8; target.buffer_len()];
        let mut resizer = FrameResizer::new(target, 0.1, orientation);
        let strategy = resizer.render(&src, src_w, src_h, &mut dst);
        (dst, strategy)
    }

    #[test]
    fn identity_geometry_matches_plain_conversion() {
        let target = TargetGeometry::new(64, 36);
        let src = coordinate_frame(64, 36);
        let mut expected = vec![0u8; target.buffer_len()];
        convert::convert(&src, &mut expected, 64, 36);

        let (actual, strategy) = render(target, Orientation::Normal, 64, 36);
        assert_eq!(strategy, ResizeStrategy::ConvertOnly);
        assert_eq!(actual, expected);
    }

    #[test]
    fn matching_aspect_uses_direct_floor_mapping() {
        let target = TargetGeometry::new(64, 36);
        let (src_w, src_h) = (96, 54);
        let (dst, strategy) = render(target, Orientation::Normal, src_w, src_h);
        assert_eq!(strategy, ResizeStrategy::Direct);

        for (i, rgb) in dst.chunks_exact(3).enumerate() {
            let (x, y) = (i as u32 % target.width, i as u32 / target.width);
            assert_eq!(
                source_of(rgb),
                (x * src_w / target.width, y * src_h / target.height),
                "pixel ({x}, {y})"
            );
        }
    }

    #[test]
    fn direct_mapping_upscales_small_sources() {
        let target = TargetGeometry::new(32, 18);
        let (dst, strategy) = render(target, Orientation::Normal, 16, 9);
        assert_eq!(strategy, ResizeStrategy::Direct);
        // Each source pixel covers a 2x2 block.
        assert_eq!(source_of(&dst[0..3]), (0, 0));
        assert_eq!(source_of(&dst[3..6]), (0, 0));
        assert_eq!(source_of(&dst[6..9]), (1, 0));
    }

    #[test]
    fn aspect_ratio_tolerance_is_absolute() {
        // 1280x720 = 1.778, 1280x768 = 1.667, 1024x768 = 1.333.
        assert!(aspect_ratios_match(1920, 1080, HD, 0.1));
        assert!(aspect_ratios_match(1280, 768, HD, 0.12));
        assert!(!aspect_ratios_match(1024, 768, HD, 0.1));
        assert!(!aspect_ratios_match(720, 1280, HD, 0.1));
    }

    #[test]
    fn aspect_state_caches_until_geometry_changes() {
        let mut state = AspectState::new(HD);
        assert!(state.matches(1280, 720, HD, 0.1));
        assert!(!state.matches(640, 480, HD, 0.1));
        // Same geometry: cached answer, even with a different tolerance.
        assert!(!state.matches(640, 480, HD, 10.0));
        assert!(state.matches(1920, 1080, HD, 0.1));
    }

    #[test]
    fn aspect_crop_scale_is_min_of_axis_scales() {
        for &(w, h) in &[(640, 480), (1024, 768), (720, 1280), (300, 300), (4000, 100)] {
            let scale = (f64::from(w) / 1280.0).min(f64::from(h) / 720.0);
            let window = SamplingWindow::aspect_crop(w, h, HD);
            assert!((f64::from(window.width) - 1280.0 * scale).abs() <= 1.0);
            assert!((f64::from(window.height) - 720.0 * scale).abs() <= 1.0);
        }
    }

    #[test]
    fn aspect_crop_is_centred_and_inside_source() {
        let window = SamplingWindow::aspect_crop(640, 480, HD);
        // Width-limited: full width, 360 rows centred in 480.
        assert_eq!(
            window,
            SamplingWindow {
                x: 0,
                y: 60,
                width: 640,
                height: 360
            }
        );

        let window = SamplingWindow::aspect_crop(720, 1280, HD);
        assert!(window.x + window.width <= 720);
        assert!(window.y + window.height <= 1280);
        assert_eq!(window.width, 720);
        assert_eq!(window.height, 405);
        assert_eq!(window.y, (1280 - 405) / 2);
    }

    #[test]
    fn mismatched_aspect_never_samples_outside_source() {
        let target = TargetGeometry::new(64, 36);
        for &(w, h) in &[(48, 48), (30, 90), (200, 20), (1, 1), (7, 3)] {
            let (dst, strategy) = render(target, Orientation::Normal, w, h);
            assert_eq!(strategy, ResizeStrategy::AspectPreserving, "{w}x{h}");
            let window = SamplingWindow::aspect_crop(w, h, target);
            for rgb in dst.chunks_exact(3) {
                let (x, y) = source_of(rgb);
                assert!(x >= window.x && x < window.x + window.width, "{w}x{h} x={x}");
                assert!(y >= window.y && y < window.y + window.height, "{w}x{h} y={y}");
            }
        }
    }

    #[test]
    fn mismatched_aspect_fills_whole_output_from_centre_crop() {
        let target = TargetGeometry::new(16, 9);
        let (dst, _) = render(target, Orientation::Normal, 32, 32);
        // Crop is 32x18 starting at row 7.
        assert_eq!(source_of(&dst[0..3]), (0, 7));
        let last = dst.len() - 3;
        assert_eq!(source_of(&dst[last..]), (30, 7 + 16));
    }

    #[test]
    fn mirror_reverses_columns() {
        let target = TargetGeometry::new(8, 4);
        let (dst, strategy) = render(target, Orientation::Mirror, 8, 4);
        assert_eq!(strategy, ResizeStrategy::ConvertOnly);
        assert_eq!(source_of(&dst[0..3]), (7, 0));
        assert_eq!(source_of(&dst[21..24]), (0, 0));
    }

    #[test]
    fn flip_reverses_rows() {
        let target = TargetGeometry::new(8, 4);
        let (dst, _) = render(target, Orientation::Flip, 8, 4);
        assert_eq!(source_of(&dst[0..3]), (0, 3));
        let last_row = 3 * 8 * 3;
        assert_eq!(source_of(&dst[last_row..last_row + 3]), (0, 0));
    }

    #[test]
    fn rotate180_reverses_both_axes() {
        let target = TargetGeometry::new(8, 4);
        let (dst, _) = render(target, Orientation::Rotate180, 16, 8);
        assert_eq!(source_of(&dst[0..3]), (14, 6));
        let last = dst.len() - 3;
        assert_eq!(source_of(&dst[last..]), (0, 0));
    }

    #[test]
    fn tables_follow_source_geometry_changes() {
        let target = TargetGeometry::new(8, 4);
        let mut resizer = FrameResizer::new(target, 0.1, Orientation::Normal);
        let mut dst = vec![0u8; target.buffer_len()];

        let a = coordinate_frame(16, 8);
        assert_eq!(resizer.render(&a, 16, 8, &mut dst), ResizeStrategy::Direct);
        assert_eq!(source_of(&dst[3..6]), (2, 0));

        let b = coordinate_frame(8, 8);
        assert_eq!(
            resizer.render(&b, 8, 8, &mut dst),
            ResizeStrategy::AspectPreserving
        );
        assert_eq!(source_of(&dst[0..3]), (0, 2));

        assert_eq!(resizer.render(&a, 16, 8, &mut dst), ResizeStrategy::Direct);
        assert_eq!(source_of(&dst[3..6]), (2, 0));
    }

    #[test]
    fn orientation_deserialises_from_snake_case() {
        let o: Orientation = serde_json::from_str("\"rotate180\"").unwrap();
        assert_eq!(o, Orientation::Rotate180);
        assert_eq!(Orientation::default(), Orientation::Normal);
    }
}
