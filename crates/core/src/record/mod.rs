use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use crate::render::RenderedAudio;
use crate::{MoodMusicError, Result};

/// Configuration options for writing rendered audio to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_path: PathBuf,
    pub bits_per_sample: u16,
}

impl RecordingSettings {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            bits_per_sample: 16,
        }
    }
}

/// Writes mono PCM WAV files.
#[derive(Debug)]
pub struct WavRecorder {
    settings: RecordingSettings,
}

impl WavRecorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self { settings }
    }

    pub fn output_path(&self) -> &Path {
        &self.settings.output_path
    }

    pub fn write(&self, audio: &RenderedAudio) -> Result<()> {
        if !matches!(self.settings.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(MoodMusicError::msg(format!(
                "unsupported bit depth {}",
                self.settings.bits_per_sample
            )));
        }
        let spec = WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: self.settings.bits_per_sample,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&self.settings.output_path, spec)?;
        let scale = ((1i64 << (self.settings.bits_per_sample - 1)) - 1) as f32;
        for sample in &audio.samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * scale) as i32)?;
        }
        writer.finalize()?;

        tracing::info!(
            path = %self.settings.output_path.display(),
            samples = audio.samples.len(),
            "wrote WAV file"
        );
        Ok(())
    }
}
