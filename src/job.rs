//! Mix jobs
//!
//! A [`MixJob`] is one end-to-end request: load the bed, fetch narration,
//! conform it to the bed's format, render, export, and checksum the file.
//! Both the CLI and the HTTP service run mixes through here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::MixSettings;
use crate::engine::buffer::{calculate_peak, calculate_rms, frames_to_ms};
use crate::engine::io::{conform, export_audio, import_audio, ExportFormat};
use crate::error::Result;
use crate::mix::{render, MixRequest, TimelineReport};
use crate::synthesis::{NarrationSource, SynthesisRequest};

/// One mix to run
#[derive(Debug, Clone)]
pub struct MixJob {
    pub id: Uuid,
    pub background: PathBuf,
    pub output: PathBuf,
    pub narration: SynthesisRequest,
    pub settings: MixSettings,
    pub format: ExportFormat,
}

/// What a finished job produced
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub output: PathBuf,
    pub duration_ms: f64,
    pub narration_ms: f64,
    /// Hex SHA-256 of the exported file
    pub sha256: String,
    pub peak_db: f32,
    pub rms_db: f32,
    pub timeline: TimelineReport,
}

impl MixJob {
    pub fn new(
        background: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        narration: SynthesisRequest,
        settings: MixSettings,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            background: background.into(),
            output: output.into(),
            narration,
            settings,
            format: ExportFormat::default(),
        }
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Run the job to completion
    ///
    /// Settings are checked before any audio is loaded and the bed is loaded
    /// before narration is requested, so a bad request never costs a
    /// synthesis call.
    ///
    /// # Errors
    /// Any error from decoding, synthesis, rendering or export. No output
    /// file is created unless rendering succeeds.
    pub fn run(&self, source: &dyn NarrationSource) -> Result<JobReport> {
        let _span = info_span!("mix_job", job_id = %self.id, source = source.name()).entered();

        self.settings.validate()?;
        let background = import_audio(&self.background)?;

        let narration = source.synthesize(&self.narration)?;
        let narration = conform(&narration, background.sample_rate(), background.channels())?;
        info!(
            narration_ms = narration.duration_ms(),
            bed_ms = background.duration_ms(),
            "inputs ready"
        );

        let result = render(&MixRequest::new(background, narration, self.settings))?;
        let peak_db = calculate_peak(&result.audio);
        if peak_db > 0.0 {
            warn!(peak_db, "mix exceeds full scale and will clip on integer export");
        }

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Jobs sharing an output name each write their own file; the rename
        // swaps it in whole, so the checksum always matches this job's bytes
        let staging = self.staging_path();
        let written = export_audio(&result.audio, &staging, self.format)
            .and_then(|()| file_sha256(&staging))
            .and_then(|sha256| {
                fs::rename(&staging, &self.output)?;
                Ok(sha256)
            });
        let sha256 = match written {
            Ok(sha256) => sha256,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                return Err(e);
            }
        };

        info!(output = %self.output.display(), %sha256, "mix written");

        let timeline = &result.timeline;
        Ok(JobReport {
            job_id: self.id,
            output: self.output.clone(),
            duration_ms: result.duration_ms(),
            narration_ms: frames_to_ms(timeline.narration_frames(), timeline.sample_rate()),
            sha256,
            peak_db,
            rms_db: calculate_rms(&result.audio),
            timeline: timeline.report(),
        })
    }

    /// Hidden per-job file next to the output
    fn staging_path(&self) -> PathBuf {
        let name = self
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output
            .with_file_name(format!(".{}.{}.part", name, self.id.simple()))
    }
}

/// Hex SHA-256 of a file's contents
pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::AudioBuffer;
    use crate::engine::io::generate_test_tone;
    use crate::error::MixError;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Mono 8kHz tone standing in for a speech service
    struct ToneVoice {
        duration_ms: i64,
        calls: AtomicUsize,
    }

    impl ToneVoice {
        fn new(duration_ms: i64) -> Self {
            Self {
                duration_ms,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl NarrationSource for ToneVoice {
        fn name(&self) -> &str {
            "tone"
        }

        fn synthesize(&self, _request: &SynthesisRequest) -> Result<AudioBuffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(generate_test_tone(300.0, 0.4, self.duration_ms, 8000, 1))
        }
    }

    fn write_bed(dir: &Path, ms: i64) -> PathBuf {
        let path = dir.join("bed.wav");
        let bed = generate_test_tone(110.0, 0.5, ms, 16_000, 2);
        export_audio(&bed, &path, ExportFormat::cd_quality()).unwrap();
        path
    }

    #[test]
    fn test_job_end_to_end() {
        let dir = tempdir().unwrap();
        let bed = write_bed(dir.path(), 3_000);
        let output = dir.path().join("out/final_mix.wav");
        let voice = ToneVoice::new(2_000);

        let job = MixJob::new(&bed, &output, SynthesisRequest::new("Hi"), MixSettings::default());
        let report = job.run(&voice).unwrap();

        assert_relative_eq!(report.duration_ms, 9_500.0);
        assert_relative_eq!(report.narration_ms, 2_000.0, epsilon = 0.1);
        assert_relative_eq!(report.timeline.narration_start_ms, 4_250.0);
        assert_eq!(report.sha256.len(), 64);
        assert_eq!(report.sha256, file_sha256(&output).unwrap());
        assert!(report.peak_db < 0.0);
        assert!(report.rms_db < report.peak_db);

        // Written in the bed's format
        let written = import_audio(&output).unwrap();
        assert_eq!(written.sample_rate(), 16_000);
        assert_eq!(written.channels(), 2);
        assert_eq!(written.len(), 16 * 9_500);
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_shared_output_name_keeps_checksums_honest() {
        let dir = tempdir().unwrap();
        let bed = write_bed(dir.path(), 3_000);
        let output = dir.path().join("final_mix.wav");

        let handles: Vec<_> = [1_000, 2_000]
            .into_iter()
            .map(|narration_ms| {
                let job =
                    MixJob::new(&bed, &output, SynthesisRequest::new("Hi"), MixSettings::default());
                std::thread::spawn(move || job.run(&ToneVoice::new(narration_ms)).unwrap())
            })
            .collect();
        let reports: Vec<JobReport> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_ne!(reports[0].sha256, reports[1].sha256);
        let on_disk = file_sha256(&output).unwrap();
        assert!(reports.iter().any(|r| r.sha256 == on_disk));
        assert_eq!(file_names(dir.path()), vec!["bed.wav", "final_mix.wav"]);
    }

    #[test]
    fn test_failed_export_leaves_no_files() {
        let dir = tempdir().unwrap();
        let bed = write_bed(dir.path(), 1_000);
        let job = MixJob::new(
            &bed,
            dir.path().join("out.wav"),
            SynthesisRequest::new("Hi"),
            MixSettings::default(),
        )
        .with_format(ExportFormat::new(12));
        assert!(matches!(
            job.run(&ToneVoice::new(1_000)),
            Err(MixError::Encode { .. })
        ));
        assert_eq!(file_names(dir.path()), vec!["bed.wav"]);
    }

    #[test]
    fn test_missing_background_skips_synthesis() {
        let dir = tempdir().unwrap();
        let voice = ToneVoice::new(1_000);
        let job = MixJob::new(
            dir.path().join("nope.wav"),
            dir.path().join("out.wav"),
            SynthesisRequest::new("Hi"),
            MixSettings::default(),
        );
        assert!(matches!(job.run(&voice), Err(MixError::Decode { .. })));
        assert_eq!(voice.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out.wav").exists());
    }

    #[test]
    fn test_invalid_settings_fail_first() {
        let dir = tempdir().unwrap();
        let bed = write_bed(dir.path(), 1_000);
        let voice = ToneVoice::new(1_000);
        let settings = MixSettings {
            duck_db: 6.0,
            ..Default::default()
        };
        let job = MixJob::new(&bed, dir.path().join("out.wav"), SynthesisRequest::new("Hi"), settings);
        assert!(matches!(job.run(&voice), Err(MixError::InvalidInput { .. })));
        assert_eq!(voice.calls.load(Ordering::SeqCst), 0);
    }
}
