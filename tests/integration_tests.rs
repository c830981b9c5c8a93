//! Integration Tests
//!
//! End-to-end tests for the bedmix rendering pipeline.

use approx::assert_relative_eq;
use bedmix::engine::{
    export_audio, generate_constant, generate_test_tone, import_audio, linear_to_db, AudioBuffer,
    ExportFormat,
};
use bedmix::mix::{render, MixRequest, SegmentKind};
use bedmix::{MixError, MixSettings};
use tempfile::tempdir;
use test_case::test_case;

const RATE: u32 = 8_000;

fn frames(ms: usize) -> usize {
    ms * RATE as usize / 1000
}

fn mix(bed: AudioBuffer, narration: AudioBuffer) -> bedmix::MixResult {
    render(&MixRequest::new(bed, narration, MixSettings::default())).unwrap()
}

// === Reference scenario ===

#[test]
fn test_ten_second_bed_two_second_narration() {
    let bed = generate_test_tone(110.0, 0.5, 10_000, RATE, 2);
    let narration = generate_test_tone(440.0, 0.3, 2_000, RATE, 2);
    let result = mix(bed, narration);

    assert_relative_eq!(result.duration_ms(), 9_500.0);
    assert_relative_eq!(result.timeline.narration_overlay_position_ms(), 4_250.0);
    assert_eq!(result.timeline.narration_end_frame(), frames(6_250));

    let report = result.timeline.report();
    let lengths: Vec<f64> = report.segments.iter().map(|s| s.duration_ms).collect();
    assert_eq!(lengths, vec![4_000.0, 500.0, 1_500.0, 500.0, 3_000.0]);
}

// === Duration ===

#[test_case(2_000, 500 ; "typical")]
#[test_case(300, 500 ; "narration shorter than fade")]
#[test_case(500, 500 ; "narration equal to fade")]
#[test_case(7_250, 0 ; "no fade")]
#[test_case(12_345, 1_500 ; "long narration short bed")]
fn test_output_duration(narration_ms: i64, fade_ms: i64) {
    let settings = MixSettings {
        fade_ms,
        ..Default::default()
    };
    let bed = generate_test_tone(110.0, 0.5, 3_000, RATE, 1);
    let narration = generate_test_tone(440.0, 0.3, narration_ms, RATE, 1);
    let result = render(&MixRequest::new(bed, narration, settings)).unwrap();

    let effective_fade = fade_ms.min(narration_ms);
    let body = narration_ms - effective_fade;
    let expected_ms = 4_000 + 2 * effective_fade + body + 3_000;
    assert_relative_eq!(result.duration_ms(), expected_ms as f64);
}

// === Envelope continuity ===

#[test]
fn test_bed_level_has_no_steps() {
    let bed = generate_constant(1.0, 10_000, RATE, 1);
    let narration = AudioBuffer::silence(frames(2_000), 1, RATE);
    let audio = mix(bed, narration).audio;

    assert!(audio.is_finite());
    // Everything up to the tail fade moves by well under a tenth of a dB per frame
    let tail_start = audio.len() - frames(1_000);
    let level = |i| linear_to_db(audio.get_sample(0, i).unwrap());
    for i in 1..tail_start {
        let step = (level(i) - level(i - 1)).abs();
        assert!(step < 0.1, "step of {} dB at frame {}", step, i);
    }

    assert_relative_eq!(level(frames(5_000)), -18.0, epsilon = 1e-3);
    assert_eq!(audio.get_sample(0, audio.len() - 1), Some(0.0));
}

// === Narration placement ===

#[test]
fn test_narration_occupies_exact_window() {
    let bed = AudioBuffer::silence(frames(10_000), 1, RATE);
    let narration = generate_constant(0.25, 2_000, RATE, 1);
    let audio = mix(bed, narration).audio;

    let start = frames(4_250);
    let end = frames(6_250);
    for i in 0..audio.len() {
        let sample = audio.get_sample(0, i).unwrap();
        if (start..end).contains(&i) {
            assert_eq!(sample, 0.25, "frame {}", i);
        } else {
            assert_eq!(sample, 0.0, "frame {}", i);
        }
    }
}

#[test]
fn test_narration_centered_on_fades() {
    let bed = generate_test_tone(110.0, 0.5, 1_000, RATE, 1);
    let narration = generate_test_tone(440.0, 0.3, 3_333, RATE, 1);
    let timeline = mix(bed, narration).timeline;

    let fade_out = timeline.segment(SegmentKind::FadeOut).unwrap();
    let fade_in = timeline.segment(SegmentKind::FadeIn).unwrap();
    assert_eq!(
        timeline.narration_position_frames(),
        fade_out.start_frame + fade_out.duration_frames / 2
    );
    let fade_in_mid = fade_in.start_frame + fade_in.duration_frames / 2;
    assert!(timeline.narration_end_frame().abs_diff(fade_in_mid) <= 1);
}

// === Looping ===

#[test]
fn test_short_bed_loops_seamlessly() {
    let bed = generate_test_tone(3.0, 0.8, 1_500, RATE, 2);
    let narration = AudioBuffer::silence(frames(2_000), 2, RATE);
    let audio = mix(bed.clone(), narration).audio;

    assert_eq!(audio.len(), frames(9_500));
    // Intro is unity gain, so it is the bed repeated verbatim
    for i in 0..frames(4_000) {
        let expected = bed.get_sample(1, i % bed.len());
        assert_eq!(audio.get_sample(1, i), expected, "frame {}", i);
    }
}

// === Edge cases ===

#[test]
fn test_short_narration_collapses_body() {
    let bed = generate_test_tone(110.0, 0.5, 10_000, RATE, 1);
    let narration = generate_test_tone(440.0, 0.3, 300, RATE, 1);
    let result = mix(bed, narration);

    assert_relative_eq!(result.duration_ms(), 7_600.0);
    assert_relative_eq!(result.timeline.narration_overlay_position_ms(), 4_150.0);
    assert!(result
        .timeline
        .segment(SegmentKind::DuckedBody)
        .unwrap()
        .is_empty());
    assert!(result.audio.is_finite());
}

#[test]
fn test_narration_not_whole_milliseconds() {
    // 44101 frames at 44.1kHz is 1000.02ms
    let bed = generate_test_tone(110.0, 0.5, 2_000, 44_100, 1);
    let narration = AudioBuffer::silence(44_101, 1, 44_100);
    let result = mix(bed, narration);
    assert!(result.timeline.narration_end_frame() <= result.audio.len());
}

#[test]
fn test_overlay_past_end_is_range_error() {
    let base = AudioBuffer::silence(frames(1_000), 1, RATE);
    let over = AudioBuffer::silence(frames(600), 1, RATE);
    assert!(matches!(
        base.overlay(&over, 500),
        Err(MixError::Range { .. })
    ));
    assert!(base.overlay(&over, 400).is_ok());
}

#[test]
fn test_empty_background_rejected() {
    let bed = AudioBuffer::silence(0, 1, RATE);
    let narration = generate_test_tone(440.0, 0.3, 1_000, RATE, 1);
    let err = render(&MixRequest::new(bed, narration, MixSettings::default())).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INPUT");
    assert!(err.is_caller_bug());
}

// === Determinism ===

#[test]
fn test_rendering_is_byte_identical() {
    let dir = tempdir().unwrap();
    let bed = generate_test_tone(110.0, 0.5, 2_700, RATE, 2);
    let narration = generate_test_tone(440.0, 0.3, 2_222, RATE, 2);
    let request = MixRequest::new(bed, narration, MixSettings::default());

    let first = dir.path().join("a.wav");
    let second = dir.path().join("b.wav");
    export_audio(&render(&request).unwrap().audio, &first, ExportFormat::float()).unwrap();
    export_audio(&render(&request).unwrap().audio, &second, ExportFormat::float()).unwrap();

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    assert_eq!(import_audio(&first).unwrap().sample_rate(), RATE);
}
