//! Diagnostic consumer for shared-memory virtual camera endpoints.
//!
//! Creates an endpoint, marks it ready and prints what arrives, standing in
//! for a conferencing app reading the virtual camera.
//!
//! Usage: `vcam-test [name] [seconds]`

use std::time::{Duration, Instant};

use vcam_shared::{default_root, endpoint_path, FrameFormat, SharedFrameReader};

const SLOT_WIDTH: usize = 1920;
const SLOT_HEIGHT: usize = 1080;
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn main() {
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "vcam-test".to_string());
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10);

    let path = endpoint_path(&default_root(), &name);
    let capacity = SLOT_WIDTH * SLOT_HEIGHT * FrameFormat::Bgra32.bytes_per_pixel();
    let mut reader = match SharedFrameReader::create(&path, &name, capacity) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("[vcam-test] failed to create endpoint: {e}");
            std::process::exit(1);
        }
    };
    reader.set_ready(true);
    println!(
        "[vcam-test] endpoint '{}' ready at {} for {seconds}s",
        reader.name(),
        reader.path().display()
    );

    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut window_start = Instant::now();
    let mut frames_in_window = 0u32;
    let mut last_sequence = 0u64;
    let mut missed = 0u64;
    let mut pixels = Vec::with_capacity(capacity);

    while Instant::now() < deadline {
        if let Some(info) = reader.read_frame(&mut pixels) {
            if last_sequence != 0 && info.sequence > last_sequence + 1 {
                missed += info.sequence - last_sequence - 1;
            }
            last_sequence = info.sequence;
            frames_in_window += 1;

            if window_start.elapsed() >= Duration::from_secs(1) {
                let first = pixels.get(..3).unwrap_or_default();
                println!(
                    "[vcam-test] {}x{} {:?} stride={} seq={} fps={} missed={} first_px={:?}",
                    info.width,
                    info.height,
                    info.format,
                    info.stride,
                    info.sequence,
                    frames_in_window,
                    missed,
                    first
                );
                frames_in_window = 0;
                window_start = Instant::now();
            }
        } else {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    reader.set_ready(false);
    if let Err(e) = std::fs::remove_file(&path) {
        eprintln!("[vcam-test] failed to remove {}: {e}", path.display());
    }
    println!("[vcam-test] done, last frame seq={last_sequence}");
}
