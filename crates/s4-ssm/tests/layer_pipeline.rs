//! End-to-end layer behaviour: config → structure → kernels → convolution.

use std::io::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;

use s4_ssm::complex_utils::all_close;
use s4_ssm::{load_config, ConvMode, PolePolicy, S4Config, S4Error, S4Layer, S4Params};

fn layer_and_params(config: &S4Config, seed: u64) -> (S4Layer, S4Params) {
    let layer = S4Layer::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let params = S4Params::init(layer.structure(), &mut rng).unwrap();
    (layer, params)
}

#[test]
fn test_zero_input_zero_output() {
    let cfg = S4Config::tiny();
    let (layer, params) = layer_and_params(&cfg, 1);
    let u = vec![0.0; cfg.channels * cfg.l_max];
    let y = layer.forward(&params, &u, cfg.l_max).unwrap();
    assert!(y.iter().all(|&v| v == 0.0));
}

#[test]
fn test_impulse_exposes_kernel() {
    let cfg = S4Config::tiny();
    let (layer, params) = layer_and_params(&cfg, 2);
    let l = cfg.l_max;
    let mut u = vec![0.0; cfg.channels * l];
    for h in 0..cfg.channels {
        u[h * l] = 1.0;
    }
    let y = layer.forward(&params, &u, l).unwrap();
    let kernels = layer.kernels(&params).unwrap();

    for (h, (k, ch)) in kernels.iter().zip(&params.channels).enumerate() {
        let y_ch = &y[h * l..(h + 1) * l];
        assert!((y_ch[0] - (k[0] + ch.d)).abs() < 1e-12);
        assert!(all_close(&y_ch[1..], &k[1..], 1e-12, 1e-12));
    }
}

#[test]
fn test_fft_and_direct_agree() {
    let mut direct = S4Config::new(8, 64, 3);
    direct.conv_mode = ConvMode::Direct;
    let mut fft = direct.clone();
    fft.conv_mode = ConvMode::Fft;

    let (layer_d, params) = layer_and_params(&direct, 5);
    let layer_f = S4Layer::new(&fft).unwrap();

    let u: Vec<f64> = (0..3 * 64).map(|i| ((i as f64) * 0.37).sin()).collect();
    let y_d = layer_d.forward(&params, &u, 64).unwrap();
    let y_f = layer_f.forward(&params, &u, 64).unwrap();
    assert!(all_close(&y_f, &y_d, 1e-9, 1e-9));
}

#[test]
fn test_recurrent_matches_convolutional() {
    let cfg = S4Config::new(16, 64, 2);
    let (layer, params) = layer_and_params(&cfg, 9);
    let u: Vec<f64> = (0..2 * 64).map(|i| if i % 7 == 0 { 1.0 } else { -0.25 }).collect();
    let y_conv = layer.forward(&params, &u, 64).unwrap();
    let y_rec = layer.forward_recurrent(&params, &u, 64).unwrap();
    assert!(all_close(&y_conv, &y_rec, 1e-2, 1e-4));
}

#[test]
fn test_shorter_sequence_uses_kernel_prefix() {
    let cfg = S4Config::tiny();
    let (layer, params) = layer_and_params(&cfg, 4);
    let u = vec![1.0; cfg.channels * 5];
    let y = layer.forward(&params, &u, 5).unwrap();
    let y_rec = layer.forward_recurrent(&params, &u, 5).unwrap();
    assert_eq!(y.len(), u.len());
    assert!(all_close(&y, &y_rec, 1e-2, 1e-4));
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("s4_layer_{}.json", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"d_state": 4, "l_max": 32, "channels": 2,
                "pole_policy": {{"perturb": {{"epsilon": 1e-9}}}},
                "conv_mode": {{"auto": {{"threshold": 16}}}}}}"#
        )
        .unwrap();
    }
    let cfg = load_config(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.pole_policy, PolePolicy::Perturb { epsilon: 1e-9 });
    assert_eq!(cfg.conv_mode, ConvMode::Auto { threshold: 16 });

    let (layer, params) = layer_and_params(&cfg, 0);
    assert_eq!(layer.kernels(&params).unwrap().iter().map(Vec::len).collect::<Vec<_>>(), vec![32, 32]);
}

#[test]
fn test_invalid_config_file() {
    let path = std::env::temp_dir().join(format!("s4_bad_{}.json", std::process::id()));
    std::fs::write(&path, r#"{"d_state": 0, "l_max": 8}"#).unwrap();
    let err = load_config(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(err, S4Error::InvalidConfig(_)));
}
