use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Interleaved audio read from or written to a WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct WavData {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: Vec<f32>,
}

impl WavData {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Read any integer or float WAV file into normalised `f32` samples.
pub fn read(path: &Path) -> Result<WavData> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    debug!("Input {}: {:?}", path.display(), spec);

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode float samples")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("unsupported bit depth {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to decode integer samples")?
        }
    };

    Ok(WavData {
        sample_rate: spec.sample_rate,
        channels: usize::from(spec.channels),
        samples,
    })
}

/// Write 32-bit float WAV.
pub fn write(path: &Path, data: &WavData) -> Result<()> {
    let spec = WavSpec {
        channels: u16::try_from(data.channels).context("too many channels for WAV")?,
        sample_rate: data.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file {}", path.display()))?;

    for &sample in &data.samples {
        writer
            .write_sample(sample)
            .context("failed to write sample")?;
    }

    writer.finalize().context("failed to finalize WAV file")?;
    info!("Rendered file saved: {}", path.display());
    Ok(())
}

/// Timestamped output path inside `dir`.
pub fn timestamped_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "render_{}.wav",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;
    use tempfile::TempDir;

    #[test]
    fn float_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..960)
            .map(|i| (TAU * 440.0 * (i / 2) as f32 / 48_000.0).sin() * 0.5)
            .collect();
        let data = WavData {
            sample_rate: 48_000,
            channels: 2,
            samples,
        };

        write(&path, &data)?;
        let loaded = read(&path)?;

        assert_eq!(loaded, data);
        assert_eq!(loaded.frames(), 480);
        Ok(())
    }

    #[test]
    fn integer_input_is_normalised() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("int.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec)?;
        for s in [i16::MIN, 0, 16384] {
            writer.write_sample(s)?;
        }
        writer.finalize()?;

        let loaded = read(&path)?;
        assert_eq!(loaded.samples, vec![-1.0, 0.0, 0.5]);
        Ok(())
    }

    #[test]
    fn timestamped_names_live_in_dir() {
        let path = timestamped_path(Path::new("/tmp/out"));
        assert!(path.starts_with("/tmp/out"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("wav"));
    }
}
