//! Scanline flood fill.

use super::coverage::Coverage;
use super::ChunkyImage;
use crate::util::VecI;

/// Every pixel 4-connected to `start` with exactly the color of `start`, within the canvas.
/// Empty if `start` lies outside the canvas.
pub(super) fn coverage(image: &ChunkyImage, start: VecI) -> Coverage {
    let bounds = image.bounds();
    let mut coverage = Coverage::default();
    if !bounds.contains(start) {
        return coverage;
    }
    let target = image.pixel(start);
    let fillable = |coverage: &Coverage, p: VecI| {
        bounds.contains(p) && !coverage.contains(p) && image.pixel(p) == target
    };

    let mut seeds = vec![start];
    while let Some(seed) = seeds.pop() {
        if !fillable(&coverage, seed) {
            continue;
        }
        let y = seed.y;
        let mut left = seed.x;
        while fillable(&coverage, VecI::new(left - 1, y)) {
            left -= 1;
        }
        let mut right = seed.x + 1;
        while fillable(&coverage, VecI::new(right, y)) {
            right += 1;
        }
        coverage.add_span(y, left, right);

        // Seed the first pixel of each fillable run on the neighboring rows.
        for ny in [y - 1, y + 1] {
            let mut in_run = false;
            for x in left..right {
                let p = VecI::new(x, ny);
                if fillable(&coverage, p) {
                    if !in_run {
                        seeds.push(p);
                        in_run = true;
                    }
                } else {
                    in_run = false;
                }
            }
        }
    }
    coverage
}
