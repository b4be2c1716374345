use proptest::prelude::*;
use tans_image_codec::{Bitmap, CodecParams, decode_image, encode_image};

fn lcg_noise(width: u32, height: u32, seed: u32) -> Bitmap {
    let mut s = seed;
    Bitmap::from_fn(width, height, |_, _| {
        s = s.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (s >> 16) as u8
    })
}

fn gradient(width: u32, height: u32) -> Bitmap {
    Bitmap::from_fn(width, height, |x, y| ((x * 3 + y * 5) % 256) as u8)
}

fn roundtrip(image: &Bitmap, block_width: u32, block_height: u32, params: &CodecParams) -> Bitmap {
    let encoded =
        encode_image(image, block_width, block_height, params).expect("Failed to encode image");
    decode_image(&encoded).expect("Failed to decode image")
}

#[test]
fn test_near_lossless_error_bound() {
    for near in [1u8, 2, 5, 31] {
        let params = CodecParams::new().with_near(near);
        for image in [lcg_noise(40, 24, 5), gradient(40, 24)] {
            let decoded = roundtrip(&image, 40, 24, &params);
            let peak = image.peak_error(&decoded).unwrap();
            assert!(peak <= near, "NEAR {}: peak error {}", near, peak);
        }
    }
}

#[test]
fn test_larger_near_shrinks_output() {
    let image = lcg_noise(64, 64, 21);
    let size = |near: u8| {
        encode_image(&image, 64, 64, &CodecParams::new().with_near(near))
            .unwrap()
            .len()
    };
    assert!(size(2) < size(0));
    assert!(size(8) < size(2));
}

#[test]
fn test_extreme_samples_survive() {
    // Alternating black and white stresses the reconstruction folding
    let image = Bitmap::from_fn(16, 16, |x, y| if (x + y) % 2 == 0 { 0 } else { 255 });
    for near in [0u8, 3, 31] {
        let decoded = roundtrip(&image, 16, 16, &CodecParams::new().with_near(near));
        assert!(image.peak_error(&decoded).unwrap() <= near);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_within_near(
        width in 1u32..24,
        height in 1u32..24,
        near in 0u8..=8,
        buffer_exp in 0u8..=7,
        seed in any::<u32>(),
    ) {
        let image = lcg_noise(width, height, seed);
        let params = CodecParams::new()
            .with_near(near)
            .with_buffer_exp(buffer_exp)
            .with_max_bpp(32);
        let decoded = roundtrip(&image, width, height, &params);
        prop_assert!(image.peak_error(&decoded).unwrap() <= near);
    }
}
