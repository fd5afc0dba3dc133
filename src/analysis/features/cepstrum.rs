// Cepstrum module - log compression and DCT of mel spectra

/// Floor applied before taking the log (power units)
const AMIN: f32 = 1e-10;

/// Dynamic range kept below the loudest bin
const TOP_DB: f32 = 80.0;

/// Convert a mel power spectrogram to decibels in place
///
/// `10 * log10(max(AMIN, S))`, then everything more than `TOP_DB` below the
/// maximum of the whole spectrogram is raised to that floor.
pub fn power_to_db(spectrogram: &mut [Vec<f32>]) {
    let mut max_db = f32::NEG_INFINITY;
    for frame in spectrogram.iter_mut() {
        for value in frame.iter_mut() {
            *value = 10.0 * value.max(AMIN).log10();
            max_db = max_db.max(*value);
        }
    }

    let floor = max_db - TOP_DB;
    for value in spectrogram.iter_mut().flatten() {
        *value = value.max(floor);
    }
}

/// Orthonormal DCT-II keeping the first `coefficients` outputs
pub struct Dct {
    /// `coefficients` rows of `inputs` basis values
    basis: Vec<Vec<f32>>,
}

impl Dct {
    pub fn new(inputs: usize, coefficients: usize) -> Self {
        let n = inputs as f64;
        let basis = (0..coefficients)
            .map(|k| {
                let scale = if k == 0 {
                    (1.0 / n).sqrt()
                } else {
                    (2.0 / n).sqrt()
                };
                (0..inputs)
                    .map(|i| {
                        let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0)
                            / (2.0 * n);
                        (scale * angle.cos()) as f32
                    })
                    .collect()
            })
            .collect();

        Self { basis }
    }

    pub fn coefficients(&self) -> usize {
        self.basis.len()
    }

    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        self.basis
            .iter()
            .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
            .collect()
    }
}
