// Mel filterbank - Slaney-style triangular filters
//
// Filters are spaced evenly on the Slaney mel scale (linear below 1 kHz,
// logarithmic above) between 0 Hz and Nyquist, and each filter is scaled by
// 2 / bandwidth so every filter has roughly constant energy.
//
// References:
// - Slaney, M. (1998). Auditory Toolbox, Technical Report #1998-010

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Mel filterbank applied to power spectra
pub struct MelFilterbank {
    /// `bands` rows of `bins` weights
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build `bands` filters over an FFT of `fft_size` at `sample_rate`
    pub fn new(sample_rate: u32, fft_size: usize, bands: usize) -> Self {
        let bins = fft_size / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;

        let fft_freqs: Vec<f64> = (0..bins)
            .map(|i| i as f64 * sample_rate as f64 / fft_size as f64)
            .collect();

        let max_mel = hz_to_mel(nyquist);
        let mel_points: Vec<f64> = (0..bands + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (bands + 1) as f64))
            .collect();

        let weights = (0..bands)
            .map(|band| {
                let lower_hz = mel_points[band];
                let center_hz = mel_points[band + 1];
                let upper_hz = mel_points[band + 2];
                let norm = 2.0 / (upper_hz - lower_hz);

                fft_freqs
                    .iter()
                    .map(|&f| {
                        let rising = (f - lower_hz) / (center_hz - lower_hz);
                        let falling = (upper_hz - f) / (upper_hz - center_hz);
                        (rising.min(falling).max(0.0) * norm) as f32
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn bands(&self) -> usize {
        self.weights.len()
    }

    /// Project one power spectrum onto the mel bands
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|filter| filter.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}
