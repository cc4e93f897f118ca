//! FFT (Fast Fourier Transform) analysis module
//!
//! Amplitude and phase spectra of time traces:
//! - [`FftAnalyzer::fftp`] transforms a whole 1-D trace
//! - [`FftAnalyzer::sldfft`] transforms a window sliding along the time axis
//!
//! Spectra are one-sided, scaled by `1/N`. Phase is `atan2(re, im)` with a
//! two-pass ±2π continuity correction (see [`unwrap_phase`]). When the time
//! axis is in seconds the frequency axis is reported in kHz.

use super::{wrap_label, AnalysisError};
use crate::types::{DataItem, DataValue, Dimension};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Upper bound on `sldfft` windows, relative to the trace length
const MAX_WINDOWS_PER_SAMPLE: usize = 4;

/// One-sided spectrum of a real signal
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Frequency of each bin, in `1/step` units
    pub frequencies: Vec<f64>,
    /// `|X_k| / N`
    pub amplitude: Vec<f64>,
    /// Continuity-corrected phase in radians
    pub phase: Vec<f64>,
}

/// Sample frequencies of a real FFT of length `n` with sample spacing `step`
pub fn rfftfreq(n: usize, step: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * step);
    (0..n / 2 + 1).map(|i| i as f64 * scale).collect()
}

/// Remove ±2π jumps between neighbouring bins.
///
/// Two passes: first every bin that lands within 1 rad of its predecessor
/// after subtracting 2π takes that value, then the same with adding 2π.
pub fn unwrap_phase(phase: &mut [f64]) {
    for shift in [-2.0 * PI, 2.0 * PI] {
        let shifted: Vec<f64> = phase.iter().map(|p| p + shift).collect();
        for i in 1..phase.len() {
            if (phase[i - 1] - shifted[i]).abs() < 1.0 {
                phase[i] = shifted[i];
            }
        }
    }
}

/// FFT Analyzer for computing amplitude/phase spectra
pub struct FftAnalyzer {
    planner: FftPlanner<f64>,
}

impl FftAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// One-sided spectrum of `samples` taken every `step`
    pub fn spectrum(&mut self, samples: &[f64], step: f64) -> Spectrum {
        let n = samples.len();
        if n == 0 {
            return Spectrum {
                frequencies: Vec::new(),
                amplitude: Vec::new(),
                phase: Vec::new(),
            };
        }

        let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let scale = 1.0 / n as f64;
        let bins: Vec<Complex<f64>> = buffer.iter().take(n / 2 + 1).map(|c| *c * scale).collect();

        let amplitude = bins.iter().map(|c| c.norm()).collect();
        let mut phase: Vec<f64> = bins.iter().map(|c| c.re.atan2(c.im)).collect();
        unwrap_phase(&mut phase);

        Spectrum {
            frequencies: rfftfreq(n, step),
            amplitude,
            phase,
        }
    }

    /// Amplitude and phase of a 1-D trace as functions of frequency
    pub fn fftp(&mut self, item: &DataItem) -> Result<(DataItem, DataItem), AnalysisError> {
        let samples = match &item.value {
            DataValue::Series(values) if item.dims.len() == 1 => values,
            DataValue::Tuple(_) => return Err(AnalysisError::Tuple("fftp")),
            _ => return Err(AnalysisError::NotOneDimensional("fftp")),
        };
        let time_dim = &item.dims[0];
        let step = sample_step(item, time_dim)?;

        let spectrum = self.spectrum(samples, step);
        let (scale, units) = frequency_units(time_dim);
        let freq = Dimension::new("Frequency")
            .with_units(units)
            .with_data(spectrum.frequencies.iter().map(|f| f * scale).collect());

        tracing::debug!(
            "fftp({}): {} samples -> {} bins",
            item.display_label(),
            samples.len(),
            spectrum.amplitude.len()
        );

        Ok(spectral_pair(
            item,
            vec![freq],
            0,
            DataValue::Series(spectrum.amplitude),
            DataValue::Series(spectrum.phase),
        ))
    }

    /// Sliding-window spectra of a 1-D trace.
    ///
    /// Windows `[t0, t0 + width]` start at `t0 = 0` and advance by `stride`
    /// while the window end does not pass the last time point. Windows with
    /// fewer than two samples are skipped. Every window contributes one row;
    /// rows are cut to the shortest spectrum so the result is rectangular.
    /// The result axes are (window centre, frequency).
    pub fn sldfft(
        &mut self,
        item: &DataItem,
        stride: f64,
        width: f64,
    ) -> Result<(DataItem, DataItem), AnalysisError> {
        if !(stride > 0.0 && width > 0.0) {
            return Err(AnalysisError::Invalid(format!(
                "stride ({stride}) and width ({width}) must be positive"
            )));
        }
        let samples = match &item.value {
            DataValue::Series(values) if item.dims.len() == 1 => values,
            DataValue::Tuple(_) => return Err(AnalysisError::Tuple("sldfft")),
            _ => return Err(AnalysisError::NotOneDimensional("sldfft")),
        };
        let time_dim = &item.dims[0];
        let time = time_dim
            .data
            .as_deref()
            .filter(|t| t.len() == samples.len())
            .ok_or_else(|| AnalysisError::NoTime(item.display_label().to_string()))?;
        let last = time.last().copied().unwrap_or(f64::NEG_INFINITY);

        let windows = if last >= width {
            ((last - width) / stride).floor() + 1.0
        } else {
            0.0
        };
        let max_windows = (samples.len() * MAX_WINDOWS_PER_SAMPLE) as f64;
        if !windows.is_finite() || windows > max_windows {
            return Err(AnalysisError::Invalid(format!(
                "stride {stride} gives more than {max_windows} windows over '{}'",
                item.display_label()
            )));
        }

        let mut centres = Vec::new();
        let mut spectra = Vec::new();
        for i in 0..windows as usize {
            let start = i as f64 * stride;
            let end = start + width;
            let (win_time, win_data): (Vec<f64>, Vec<f64>) = time
                .iter()
                .zip(samples)
                .filter(|&(&t, _)| t >= start && t <= end)
                .map(|(&t, &v)| (t, v))
                .unzip();
            if win_time.len() >= 2 {
                spectra.push(self.spectrum(&win_data, win_time[1] - win_time[0]));
                centres.push((start + end) / 2.0);
            }
        }

        let Some(bins) = spectra.iter().map(|s| s.amplitude.len()).min() else {
            return Err(AnalysisError::Invalid(format!(
                "no window of width {width} with at least two samples fits '{}'",
                item.display_label()
            )));
        };

        let (scale, units) = frequency_units(time_dim);
        let freq = Dimension::new("Frequency")
            .with_units(units)
            .with_data(spectra[0].frequencies[..bins].iter().map(|f| f * scale).collect());
        let window_time = Dimension {
            data: Some(centres),
            ..time_dim.clone()
        };

        let rows = spectra.len();
        let amplitude = spectra
            .iter()
            .flat_map(|s| s.amplitude[..bins].iter().copied())
            .collect();
        let phase = spectra
            .iter()
            .flat_map(|s| s.phase[..bins].iter().copied())
            .collect();

        tracing::debug!(
            "sldfft({}): {} windows x {} bins",
            item.display_label(),
            rows,
            bins
        );

        Ok(spectral_pair(
            item,
            vec![window_time, freq],
            0,
            DataValue::Grid {
                shape: vec![rows, bins],
                values: amplitude,
            },
            DataValue::Grid {
                shape: vec![rows, bins],
                values: phase,
            },
        ))
    }
}

impl Default for FftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_step(item: &DataItem, time_dim: &Dimension) -> Result<f64, AnalysisError> {
    match time_dim.data.as_deref() {
        Some([t0, t1, ..]) => Ok(t1 - t0),
        Some(_) => Err(AnalysisError::Invalid(format!(
            "'{}' needs at least two time points",
            item.display_label()
        ))),
        None => Err(AnalysisError::NoTime(item.display_label().to_string())),
    }
}

/// Scale factor and units for frequencies derived from `time_dim`
fn frequency_units(time_dim: &Dimension) -> (f64, String) {
    if time_dim.is_seconds() {
        (1e-3, "kHz".to_string())
    } else {
        (1.0, format!("1/{}", time_dim.units))
    }
}

fn spectral_pair(
    item: &DataItem,
    dims: Vec<Dimension>,
    order: usize,
    amplitude: DataValue,
    phase: DataValue,
) -> (DataItem, DataItem) {
    let amp = DataItem {
        name: wrap_label("AMP", &item.name),
        label: wrap_label("AMP", &item.label),
        source: item.source.clone(),
        units: item.units.clone(),
        dims: dims.clone(),
        order,
        value: amplitude,
        ..Default::default()
    };
    let phase = DataItem {
        name: wrap_label("PHASE", &item.name),
        label: wrap_label("PHASE", &item.label),
        source: item.source.clone(),
        units: "Radians".to_string(),
        dims,
        order,
        value: phase,
        ..Default::default()
    };
    (amp, phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, rate: f64, n: usize, units: &str) -> DataItem {
        let time: Vec<f64> = (0..n).map(|i| i as f64 / rate).collect();
        let values = time.iter().map(|t| (2.0 * PI * freq * t).sin()).collect();
        DataItem::series("sig", values)
            .with_label("Signal")
            .with_units("V")
            .with_source("test")
            .with_time(units, time)
    }

    fn peak_bin(values: &[f64]) -> usize {
        values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_rfftfreq() {
        assert_eq!(rfftfreq(4, 0.5), vec![0.0, 0.5, 1.0]);
        assert_eq!(rfftfreq(5, 1.0), vec![0.0, 0.2, 0.4]);
    }

    #[test]
    fn test_fftp_sine_peak() {
        // 50 Hz sampled at 1 kHz for 1 s: exactly on bin 50
        let item = sine(50.0, 1000.0, 1000, "ms");
        let (amp, phase) = FftAnalyzer::new().fftp(&item).unwrap();

        let values = amp.values().unwrap();
        assert_eq!(values.len(), 501);
        assert_eq!(peak_bin(values), 50);
        assert!((values[50] - 0.5).abs() < 1e-9);

        assert_eq!(amp.name, "AMP( sig )");
        assert_eq!(amp.label, "AMP( Signal )");
        assert_eq!(amp.units, "V");
        assert_eq!(amp.source, "test");
        assert_eq!(phase.name, "PHASE( sig )");
        assert_eq!(phase.units, "Radians");
        assert_eq!(amp.dims[0].name, "Frequency");
        assert_eq!(amp.dims[0].units, "1/ms");
    }

    #[test]
    fn test_fftp_seconds_become_khz() {
        let item = sine(50.0, 1000.0, 1000, "s");
        let (amp, _) = FftAnalyzer::new().fftp(&item).unwrap();
        let freq = amp.dims[0].data.as_deref().unwrap();
        assert_eq!(amp.dims[0].units, "kHz");
        assert!((freq[50] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_fftp_rejects_multi_dimensional() {
        let item = sine(1.0, 10.0, 10, "s").with_dimension(Dimension::new("radius"));
        assert_eq!(
            FftAnalyzer::new().fftp(&item),
            Err(AnalysisError::NotOneDimensional("fftp"))
        );
    }

    #[test]
    fn test_empty_label_stays_empty() {
        let mut item = sine(1.0, 10.0, 10, "s");
        item.label.clear();
        let (amp, _) = FftAnalyzer::new().fftp(&item).unwrap();
        assert!(amp.label.is_empty());
    }

    #[test]
    fn test_unwrap_phase_removes_jump() {
        let mut phase = vec![3.0, 3.1, -3.1];
        unwrap_phase(&mut phase);
        assert!((phase[2] - (-3.1 + 2.0 * PI)).abs() < 1e-12);
        assert_eq!(&phase[..2], &[3.0, 3.1]);
    }

    #[test]
    fn test_sldfft_windows() {
        // 0.0 .. 9.9 s in 0.1 s steps
        let item = sine(2.0, 10.0, 100, "s");
        let (amp, phase) = FftAnalyzer::new().sldfft(&item, 2.0, 4.0).unwrap();

        // windows [0,4], [2,6], [4,8]; [6,10] ends after the last sample
        assert_eq!(amp.dims[0].data.as_deref(), Some(&[2.0, 4.0, 6.0][..]));
        assert_eq!(amp.dims[0].name, "time");
        assert_eq!(amp.dims[1].units, "kHz");
        assert_eq!(amp.value.shape()[0], 3);
        assert_eq!(amp.value.shape(), phase.value.shape());
    }

    #[test]
    fn test_sldfft_invalid_arguments() {
        let item = sine(2.0, 10.0, 100, "s");
        let mut analyzer = FftAnalyzer::new();
        assert!(analyzer.sldfft(&item, 0.0, 1.0).is_err());
        assert!(matches!(
            analyzer.sldfft(&item, 1.0, 100.0),
            Err(AnalysisError::Invalid(_))
        ));
    }

    #[test]
    fn test_sldfft_tiny_stride_is_rejected() {
        let item = sine(2.0, 10.0, 40, "s");
        let mut analyzer = FftAnalyzer::new();
        assert!(matches!(
            analyzer.sldfft(&item, 1e-20, 2.0),
            Err(AnalysisError::Invalid(_))
        ));
        // one window per sample still fits
        assert!(analyzer.sldfft(&item, 0.1, 2.0).is_ok());
    }
}
