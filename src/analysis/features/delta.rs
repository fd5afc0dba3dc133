// Delta module - time derivatives of coefficient trajectories
//
// Each derivative is the leading term of a least-squares polynomial fit over
// a 9-frame window (degree 1 for the first derivative, degree 2 for the
// second). With the polynomial degree equal to the derivative order the
// estimate is constant across the window, so edge frames simply reuse the
// first or last full window.

/// Frames in the local fit window
pub const DELTA_WIDTH: usize = 9;

const HALF: isize = (DELTA_WIDTH / 2) as isize;

/// Sum of x^2 for x in -4..=4
const SUM_X2: f32 = 60.0;

/// Sum of (x^2 - mean(x^2))^2 for x in -4..=4
const SUM_P2_SQ: f32 = 308.0;

/// Derivative order along the time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOrder {
    First,
    Second,
}

impl DeltaOrder {
    fn weights(self) -> [f32; DELTA_WIDTH] {
        let mut weights = [0.0; DELTA_WIDTH];
        let mean_x2 = SUM_X2 / DELTA_WIDTH as f32;
        for (i, w) in weights.iter_mut().enumerate() {
            let x = (i as isize - HALF) as f32;
            *w = match self {
                DeltaOrder::First => x / SUM_X2,
                // d2/dx2 of a*x^2 is 2a
                DeltaOrder::Second => 2.0 * (x * x - mean_x2) / SUM_P2_SQ,
            };
        }
        weights
    }
}

/// Differentiate `frames` (time x coefficient) along time
///
/// Returns `None` when there are fewer than `DELTA_WIDTH` frames.
pub fn delta(frames: &[Vec<f32>], order: DeltaOrder) -> Option<Vec<Vec<f32>>> {
    let count = frames.len();
    if count < DELTA_WIDTH {
        return None;
    }
    let coefficients = frames[0].len();
    let weights = order.weights();

    let output = (0..count)
        .map(|t| {
            let window_start = t.saturating_sub(HALF as usize).min(count - DELTA_WIDTH);
            (0..coefficients)
                .map(|c| {
                    weights
                        .iter()
                        .enumerate()
                        .map(|(i, w)| w * frames[window_start + i][c])
                        .sum()
                })
                .collect()
        })
        .collect();

    Some(output)
}
