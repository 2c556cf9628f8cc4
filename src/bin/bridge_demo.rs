// Smoke test of the matcher on synthetic clips, no ffmpeg required

use frame_bridge::{
    config::TargetSize,
    matcher::{normalize, score, FrameMatcher},
    video::{Frame, MemoryVideo, VideoSource},
};

/// Diagonal stripes drifting by `shift`, drawn at `scale` times the base resolution
fn stripes(width: u32, height: u32, scale: u32, shift: u32, tint: [u8; 3]) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        let on = (((x + y) / scale + shift) / 8) % 2 == 0;
        if on { tint } else { [tint[0] / 4, tint[1] / 4, tint[2] / 4] }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Frame Bridge matcher demo");

    // Test 1: SSIM sanity
    println!("\n1. Scoring frames...");
    let frame = stripes(160, 90, 1, 0, [200, 180, 40]);
    let same = normalize(&frame, (160, 90))?;
    let shifted = normalize(&stripes(160, 90, 1, 4, [200, 180, 40]), (160, 90))?;
    println!("   identical: {:.4}", score(&same, &same)?);
    println!("   shifted:   {:.4}", score(&same, &shifted)?);
    assert_eq!(score(&same, &same)?, 1.0);

    // Test 2: Two clips that share a moment
    println!("\n2. Building clips...");
    let first = MemoryVideo::new((0..24).map(|i| stripes(160, 90, 1, i * 2, [200, 180, 40])).collect(), 24.0);
    // The second clip starts where the first one was at frame 20, at a different resolution
    let second = MemoryVideo::new((20..44).map(|i| stripes(320, 180, 2, i * 2, [200, 180, 40])).collect(), 24.0);
    println!("   first:  {} frames, {:?}", first.frame_count(), first.dimensions());
    println!("   second: {} frames, {:?}", second.frame_count(), second.dimensions());

    // Test 3: Find the connection
    println!("\n3. Finding best connection...");
    let matcher = FrameMatcher::new(8, TargetSize::SmallestSource).with_parallel(true);
    let result = matcher.find_best_connection(&first, &second)?;
    println!("   cut: first[{}] -> second[{}]", result.frame_index_a, result.frame_index_b);
    println!("   SSIM {:.4} ({}), {} comparisons at {:?}",
             result.score, result.quality(), result.comparisons, result.normalized_size);

    // Test 4: Save the connection frames
    println!("\n4. Saving connection frames...");
    for (name, frame) in [("demo_connection_a.png", &result.frame_a), ("demo_connection_b.png", &result.frame_b)] {
        match frame.save(name) {
            Ok(()) => println!("   saved {}", name),
            Err(e) => println!("   could not save {}: {}", name, e),
        }
    }

    println!("\nDemo complete.");
    Ok(())
}
