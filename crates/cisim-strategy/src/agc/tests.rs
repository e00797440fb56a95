use super::*;
use std::f64::consts::PI;

const FS: f64 = 17400.0;

fn sine(amplitude: f64, freq: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / FS).sin())
        .collect()
}

fn rms(x: &[f64]) -> f64 {
    (x.iter().map(|s| s * s).sum::<f64>() / x.len() as f64).sqrt()
}

#[test]
fn test_output_length_matches_input() {
    let cfg = AgcConfig::default();
    for n in [1, 7, 8, 31, 1000] {
        let out = dual_loop_agc(&sine(0.1, 500.0, n), None, &cfg, FS, None).unwrap();
        assert_eq!(out.wav_out.len(), n);
        assert_eq!(out.gain.len(), n);
        assert_eq!(out.trace.gain.len(), n.div_ceil(8));
    }
}

#[test]
fn test_empty_input_rejected() {
    let err = dual_loop_agc(&[], None, &AgcConfig::default(), FS, None).unwrap_err();
    assert!(matches!(err, StrategyError::EmptyInput { .. }));
}

#[test]
fn test_below_knee_gain_is_g0() {
    let cfg = AgcConfig::default();
    let x = sine(1e-5, 1000.0, 4000);
    let out = dual_loop_agc(&x, None, &cfg, FS, None).unwrap();
    let g0 = 2f64.powf(cfg.g0);
    for g in &out.trace.gain {
        assert!((g - g0).abs() < 1e-9 * g0);
    }
    for (i, g) in out.gain.iter().enumerate().skip(cfg.gain_buf_len) {
        assert!((g - g0).abs() < 1e-9 * g0, "sample {}", i);
    }
    // output is the input delayed by env_buf_len - gain_buf_len
    let delay = cfg.output_delay();
    assert_eq!(out.wav_out[..delay], vec![0.0; delay][..]);
    assert!((out.wav_out[100] - g0 * x[100 - delay]).abs() < 1e-12);
}

#[test]
fn test_gain_follows_compression_law() {
    let cfg = AgcConfig::default();
    let out = dual_loop_agc(&sine(0.3, 800.0, 8000), None, &cfg, FS, None).unwrap();
    let c0_log2 = cfg.knee_pt - 15.0;
    let slope = 1.0 / cfg.comp_ratio - 1.0;
    for (c, g) in out.trace.c.iter().zip(&out.trace.gain) {
        let expected = 2f64.powf(cfg.g0 + slope * (c.log2() - c0_log2).max(0.0));
        assert!((g - expected).abs() < 1e-9 * expected);
    }
}

#[test]
fn test_above_knee_compresses_level_differences() {
    let cfg = AgcConfig::default();
    let n = (2.5 * FS) as usize;
    let tail = (0.5 * FS) as usize;
    let quiet = dual_loop_agc(&sine(0.05, 1000.0, n), None, &cfg, FS, None).unwrap();
    let loud = dual_loop_agc(&sine(0.5, 1000.0, n), None, &cfg, FS, None).unwrap();
    let diff_db = 20.0 * (rms(&loud.wav_out[n - tail..]) / rms(&quiet.wav_out[n - tail..])).log10();
    // 20 dB input difference compressed by a 12:1 ratio
    assert!(diff_db > 0.5 && diff_db < 4.0, "output difference {} dB", diff_db);
}

#[test]
fn test_slow_tracker_never_below_knee() {
    let cfg = AgcConfig::default();
    let c0 = 2f64.powf(cfg.knee_pt - 15.0);
    let mut x = sine(0.4, 600.0, 3000);
    x.extend(vec![0.0; 3000]);
    let out = dual_loop_agc(&x, None, &cfg, FS, None).unwrap();
    assert!(out.trace.c_slow.iter().all(|&c| c >= c0));
    for ((c, s), f) in out.trace.c.iter().zip(&out.trace.c_slow).zip(&out.trace.c_fast) {
        assert_eq!(*c, s.max(*f));
    }
}

#[test]
fn test_hold_engages_after_onset_then_releases() {
    let cfg = AgcConfig {
        max_hold: 20,
        ..Default::default()
    };
    let mut x = sine(0.5, 1000.0, 4000);
    x.extend(vec![0.0; 4000]);
    let out = dual_loop_agc(&x, None, &cfg, FS, None).unwrap();
    let states = &out.trace.state;
    assert!(states.contains(&AgcLoopState::SlowAttackFastAttack));
    assert!(states.contains(&AgcLoopState::Hold));
    assert_eq!(*states.last().unwrap(), AgcLoopState::Release);
    assert!(out.trace.hold.iter().all(|&h| h <= 20));
}

#[test]
fn test_loop_step_branches() {
    let cfg = AgcConfig::default();
    let mut loops = DualLoop {
        state: AgcState {
            c_slow: 0.01,
            c_fast: 0.01,
            c_fast_low_limit: 0.0,
            hold: 0,
        },
        weights: LoopWeights::new(&cfg, FS),
        max_hold: 5,
        c0: 1e-4,
    };
    // far above the fast threshold
    assert_eq!(loops.step(0.5, 0.2), AgcLoopState::SlowAttackFastAttack);
    assert_eq!(loops.state.hold, 0);
    // just above the slow tracker
    let just_above = loops.state.c_slow * 1.1;
    assert_eq!(
        loops.step(just_above, just_above * 0.4),
        AgcLoopState::SlowAttackFastRelease
    );
    assert_eq!(loops.state.hold, 2);
    assert_eq!(loops.step(0.0, 0.0), AgcLoopState::Hold);
    assert_eq!(loops.state.hold, 1);
    assert_eq!(loops.step(0.0, 0.0), AgcLoopState::Hold);
    assert_eq!(loops.step(0.0, 0.0), AgcLoopState::Release);
}

#[test]
fn test_limit_clip_bounds_output() {
    let cfg = AgcConfig::default();
    let out = dual_loop_agc(&sine(0.9, 300.0, 2000), None, &cfg, FS, None).unwrap();
    assert!(out.wav_out.iter().all(|s| s.abs() <= 1.0));
}

#[test]
fn test_clip_modes() {
    let mut x = vec![1.5, -1.5, 0.25, 3.0];
    apply_clip(&mut x, &ClipMode::Overflow);
    let expected = [-0.5, 0.5, 0.25, -1.0];
    for (a, b) in x.iter().zip(expected) {
        assert!((a - b).abs() < 1e-12);
    }

    let mut y = vec![2.0, -3.0];
    apply_clip(&mut y, &ClipMode::Limit);
    assert_eq!(y, vec![1.0, -1.0]);

    let mut z = vec![2.0, -3.0];
    apply_clip(&mut z, &ClipMode::Unrecognized("saturate".into()));
    assert_eq!(z, vec![2.0, -3.0]);
}

#[test]
fn test_unrecognized_clip_mode_matches_none() {
    let x = sine(0.9, 300.0, 1500);
    let none = AgcConfig {
        clip_mode: ClipMode::None,
        ..Default::default()
    };
    let unknown = AgcConfig {
        clip_mode: ClipMode::Unrecognized("wrap".into()),
        ..Default::default()
    };
    let a = dual_loop_agc(&x, None, &none, FS, None).unwrap();
    let b = dual_loop_agc(&x, None, &unknown, FS, None).unwrap();
    assert_eq!(a.wav_out, b.wav_out);
}

#[test]
fn test_control_signal_truncates_to_shorter() {
    let cfg = AgcConfig::default();
    let x = sine(0.1, 500.0, 1000);
    let ctrl = sine(0.1, 500.0, 900);
    let out = dual_loop_agc(&x, Some(&ctrl), &cfg, FS, None).unwrap();
    assert_eq!(out.wav_out.len(), 900);
}

#[test]
fn test_naida_control_uses_louder_signal() {
    let cfg = AgcConfig::default();
    let x = sine(0.01, 500.0, 3000);
    let loud_ctrl = sine(0.8, 500.0, 3000);
    let plain = dual_loop_agc(&x, None, &cfg, FS, None).unwrap();
    let sided = dual_loop_agc(&x, Some(&loud_ctrl), &cfg, FS, None).unwrap();
    let last = plain.trace.gain.len() - 1;
    assert!(sided.trace.gain[last] < plain.trace.gain[last]);
}

#[test]
fn test_auto_initial_state() {
    let cfg = AgcConfig {
        c_slow_init: None,
        c_fast_init: None,
        ..Default::default()
    };
    let ctrl = vec![0.5; 100];
    let state = AgcState::initial(&cfg, &ctrl);
    let coef_sum: f64 = cfg.env_coefs.iter().sum();
    assert!((state.c_slow - 0.5 * coef_sum).abs() < 1e-12);
    assert!((state.c_fast - 0.5 * coef_sum * 10f64.powf(-8.0 / 20.0)).abs() < 1e-12);
    assert_eq!(state.c_fast_low_limit, state.c_fast);
    assert_eq!(state.hold, 0);

    let capped = AgcState::initial(&cfg, &vec![10.0; 10]);
    assert_eq!(capped.c_slow, 1.0);
}

#[test]
fn test_carried_state_is_used() {
    let cfg = AgcConfig::default();
    let loud = dual_loop_agc(&sine(0.5, 1000.0, 6000), None, &cfg, FS, None).unwrap();
    let quiet = sine(0.001, 1000.0, 400);
    let fresh = dual_loop_agc(&quiet, None, &cfg, FS, None).unwrap();
    let continued = dual_loop_agc(&quiet, None, &cfg, FS, Some(&loud.state)).unwrap();
    assert!(continued.trace.c_slow[0] > 10.0 * fresh.trace.c_slow[0]);
    assert!(continued.trace.gain[0] < fresh.trace.gain[0]);
}
