/// Bytes per pixel of producer frames (B G R A).
pub const SRC_BYTES_PER_PIXEL: usize = 4;
/// Bytes per pixel of delivered frames (R G B).
pub const DST_BYTES_PER_PIXEL: usize = 3;

/// Convert a BGRA frame into RGB, dropping alpha.
///
/// Channels 0..3 of every source pixel are written in reverse order; the
/// fourth channel is discarded. The caller guarantees `src` holds at least
/// `width * height * 4` bytes and `dst` at least `width * height * 3`.
pub fn convert(src: &[u8], dst: &mut [u8], width: usize, height: usize) {
    let pixels = width * height;
    let src = &src[..pixels * SRC_BYTES_PER_PIXEL];
    let dst = &mut dst[..pixels * DST_BYTES_PER_PIXEL];

    for (s, d) in src
        .chunks_exact(SRC_BYTES_PER_PIXEL)
        .zip(dst.chunks_exact_mut(DST_BYTES_PER_PIXEL))
    {
        write_pixel(s, d);
    }
}

/// Write one BGRA pixel as RGB.
#[inline(always)]
pub(crate) fn write_pixel(bgra: &[u8], rgb: &mut [u8]) {
    rgb[0] = bgra[2];
    rgb[1] = bgra[1];
    rgb[2] = bgra[0];
}
