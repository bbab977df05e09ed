use candle_core::{Device, Tensor};
use docqa_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_basic() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0u32], (1, 2), &dev).unwrap();
    let out = masked_mean_l2(&h, &mask).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    let norm: f32 = (1.0f32 + 4.0 + 9.0 + 16.0).sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in v[0].iter().copied().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn fully_masked_row_stays_finite() {
    let dev = Device::Cpu;
    let h = Tensor::ones((2, 3, 4), candle_core::DType::F32, &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 1, 1, 0, 0, 0], (2, 3), &dev).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    assert!(v[1].iter().all(|x| x.is_finite()));
    assert!((v[0].iter().map(|x| x * x).sum::<f32>() - 1.0).abs() < 1e-4);
}

#[test]
fn rejects_mismatched_mask() {
    let dev = Device::Cpu;
    let h = Tensor::ones((1, 3, 4), candle_core::DType::F32, &dev).unwrap();
    let mask = Tensor::ones((1, 2), candle_core::DType::U32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}
