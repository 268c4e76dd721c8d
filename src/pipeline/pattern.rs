//! Synthetic BGRA frames for the feeder binary and tests.

use super::convert::SRC_BYTES_PER_PIXEL;

/// Allocate and fill a moving gradient frame.
pub fn bgra_gradient(width: u32, height: u32, phase: u32) -> Vec<u8> {
    let mut frame = vec![0u8; width as usize * height as usize * SRC_BYTES_PER_PIXEL];
    fill_bgra_gradient(&mut frame, width, height, phase);
    frame
}

/// Fill `frame` with a diagonal gradient shifted by `phase`.
///
/// Blue tracks X and green tracks Y; red carries the phase so consecutive
/// frames always differ.
pub fn fill_bgra_gradient(frame: &mut [u8], width: u32, height: u32, phase: u32) {
    let width = width.max(1);
    let height = height.max(1);
    for (i, pixel) in frame.chunks_exact_mut(SRC_BYTES_PER_PIXEL).enumerate() {
        let x = i as u32 % width;
        let y = i as u32 / width;
        pixel[0] = ((x + phase % width) % width * 255 / width) as u8;
        pixel[1] = ((y + phase % height) % height * 255 / height) as u8;
        pixel[2] = (phase % 256) as u8;
        pixel[3] = 0xFF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_has_frame_size() {
        let frame = bgra_gradient(16, 9, 0);
        assert_eq!(frame.len(), 16 * 9 * 4);
        assert!(frame.chunks_exact(4).all(|p| p[3] == 0xFF));
    }

    #[test]
    fn consecutive_phases_differ() {
        assert_ne!(bgra_gradient(8, 8, 0), bgra_gradient(8, 8, 1));
    }

    #[test]
    fn pixels_vary_across_the_frame() {
        let frame = bgra_gradient(8, 8, 0);
        assert_ne!(&frame[0..4], &frame[4..8]);
        assert_ne!(&frame[0..4], &frame[32..36]);
    }
}
