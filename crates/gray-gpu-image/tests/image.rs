mod common;

use common::{Add, Scale, context};
use gray_gpu_image::{BlurAxis, BuiltinFilter, BuiltinGenerator, Error, FilterKernel, Image, Region};

#[test]
fn test_scale_level_gamma_chain() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (1, 1)).unwrap();
    image.replace_with_pixels(&[0xFF], None, 1).unwrap();

    // 255 * 0.8 = 204; (0.8 - 0.1) / 0.8 = 0.875 -> 223; (223 / 255)^2 -> 195
    image
        .apply_filters(&[
            &Scale { factor: 0.8 },
            &BuiltinFilter::Level { black_level: 0.1, white_level: 0.9 },
            &BuiltinFilter::Gamma { gamma: 0.5 },
        ])
        .unwrap();

    assert_eq!(image.to_bytes().unwrap(), vec![195]);
    assert!(image.has_scratch());
}

#[test]
fn test_solid_color_generator() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (1, 1)).unwrap();

    for (color, expected) in [(0.5, 128u8), (0.75, 192), (1.0, 255)] {
        image.apply(&BuiltinGenerator::SolidColor { color }).unwrap();
        let value = image.to_bytes().unwrap()[0];
        assert!(value.abs_diff(expected) <= 2, "solid color {color} produced {value}, expected about {expected}");
    }
    assert!(!image.has_scratch());
}

#[test]
fn test_generator_covers_partial_workgroups() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (17, 33)).unwrap();
    image.apply(&BuiltinGenerator::SolidColor { color: 1.0 }).unwrap();
    assert!(image.to_bytes().unwrap().iter().all(|&value| value == 255));
}

#[test]
fn test_pixel_round_trip() {
    let Some(context) = context() else { return };
    let pixels = (0..=255u8).collect::<Vec<_>>();
    let mut image = Image::new(&context, (16, 16)).unwrap();
    image.replace_with_pixels(&pixels, None, 16).unwrap();
    assert_eq!(image.to_bytes().unwrap(), pixels);
}

#[test]
fn test_strided_upload_and_region_readback() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (1, 1)).unwrap();

    // 5x3 image with 3 bytes of row padding
    let mut padded = vec![0xEE; 8 * 3];
    for y in 0..3 {
        for x in 0..5 {
            padded[y * 8 + x] = (y * 5 + x) as u8;
        }
    }
    image.replace_with_pixels(&padded, Some((5, 3)), 8).unwrap();
    assert_eq!(image.size(), (5, 3));
    assert_eq!(image.to_bytes().unwrap(), (0..15).collect::<Vec<u8>>());

    let mut region = vec![0; 4 * 2];
    image
        .get_bytes(&mut region, 4, Some(Region { x: 1, y: 1, width: 2, height: 2 }))
        .unwrap();
    assert_eq!(region, vec![6, 7, 0, 0, 11, 12, 0, 0]);
}

#[test]
fn test_invalid_layouts_are_rejected() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (4, 4)).unwrap();

    assert!(matches!(image.replace_with_pixels(&[0; 15], None, 4), Err(Error::InvalidLayout(_))));
    assert!(matches!(image.replace_with_pixels(&[0; 12], None, 3), Err(Error::InvalidLayout(_))));
    assert!(matches!(
        image.get_bytes(&mut [0; 16], 4, Some(Region { x: 2, y: 0, width: 4, height: 1 })),
        Err(Error::InvalidLayout(_))
    ));
    assert_eq!(image.size(), (4, 4));
}

#[test]
fn test_resize_drops_scratch() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (2, 2)).unwrap();
    image.apply_filters(&[&BuiltinFilter::Threshold { color: 0.5 }]).unwrap();
    assert!(image.has_scratch());

    image.replace_with_pixels(&[1, 2, 3], Some((3, 1)), 3).unwrap();
    assert!(!image.has_scratch());
    assert_eq!(image.size(), (3, 1));
}

#[test]
fn test_empty_chain_is_noop() {
    let Some(context) = context() else { return };
    let pixels = [9, 8, 7, 6, 5, 4];
    let mut image = Image::new(&context, (3, 2)).unwrap();
    image.replace_with_pixels(&pixels, None, 3).unwrap();

    image.apply_filters(&[]).unwrap();

    assert!(!image.has_scratch());
    assert_eq!(image.size(), (3, 2));
    assert_eq!(image.to_bytes().unwrap(), pixels);
}

#[test]
fn test_identity_chain() {
    let Some(context) = context() else { return };
    let pixels = (0..=255u8).rev().collect::<Vec<_>>();
    let mut image = Image::new(&context, (32, 8)).unwrap();
    image.replace_with_pixels(&pixels, None, 32).unwrap();

    image
        .apply_filters(&[&BuiltinFilter::Level { black_level: 0.0, white_level: 1.0 }, &BuiltinFilter::Gamma { gamma: 1.0 }])
        .unwrap();

    assert_eq!(image.to_bytes().unwrap(), pixels);
}

#[test]
fn test_threshold_boundary() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (4, 1)).unwrap();
    image.replace_with_pixels(&[0, 127, 128, 255], None, 4).unwrap();

    image.apply_filters(&[&BuiltinFilter::Threshold { color: 0.5 }]).unwrap();

    assert_eq!(image.to_bytes().unwrap(), vec![0, 0, 255, 255]);
}

#[test]
fn test_rotate_quarter_turn() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (1, 1)).unwrap();
    image.replace_with_pixels(&[10, 20, 30, 40, 50, 60], Some((3, 2)), 3).unwrap();

    let rotate = BuiltinFilter::Rotate90 { turn_count: 1 };
    image.apply_resized(&rotate, rotate.output_size(image.size())).unwrap();

    assert_eq!(image.size(), (2, 3));
    assert!(!image.has_scratch());
    assert_eq!(image.to_bytes().unwrap(), vec![40, 10, 50, 20, 60, 30]);
}

#[test]
fn test_four_rotations_restore_image() {
    let Some(context) = context() else { return };
    let pixels = (0..35u8).map(|value| value * 7).collect::<Vec<_>>();
    let mut image = Image::new(&context, (7, 5)).unwrap();
    image.replace_with_pixels(&pixels, None, 7).unwrap();

    let rotate = BuiltinFilter::Rotate90 { turn_count: 1 };
    for _ in 0..4 {
        image.apply_resized(&rotate, rotate.output_size(image.size())).unwrap();
    }

    assert_eq!(image.size(), (7, 5));
    assert_eq!(image.to_bytes().unwrap(), pixels);
}

#[test]
fn test_same_size_resize_uses_chain() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (2, 2)).unwrap();
    image.replace_with_pixels(&[1, 2, 3, 4], None, 2).unwrap();

    let rotate = BuiltinFilter::Rotate90 { turn_count: 2 };
    image.apply_resized(&rotate, (2, 2)).unwrap();

    assert!(image.has_scratch());
    assert_eq!(image.to_bytes().unwrap(), vec![4, 3, 2, 1]);
}

#[test]
fn test_blur_preserves_flat_field() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (20, 20)).unwrap();
    image.replace_with_pixels(&[200; 400], None, 20).unwrap();

    image
        .apply_filters(&[
            &BuiltinFilter::GaussianBlur { axis: BlurAxis::X, radius: 3.0 },
            &BuiltinFilter::GaussianBlur { axis: BlurAxis::Y, radius: 3.0 },
        ])
        .unwrap();

    assert!(image.to_bytes().unwrap().iter().all(|&value| value.abs_diff(200) <= 1));
}

#[test]
fn test_blur_spreads_along_axis() {
    let Some(context) = context() else { return };
    let mut pixels = vec![0; 9 * 9];
    pixels[4 * 9 + 4] = 255;
    let mut image = Image::new(&context, (9, 9)).unwrap();
    image.replace_with_pixels(&pixels, None, 9).unwrap();

    image.apply_filters(&[&BuiltinFilter::GaussianBlur { axis: BlurAxis::X, radius: 2.0 }]).unwrap();
    let blurred = image.to_bytes().unwrap();

    assert!(blurred[4 * 9 + 3] > 0);
    assert!(blurred[4 * 9 + 4] < 255);
    assert_eq!(blurred[3 * 9 + 4], 0);
}

#[test]
fn test_zero_radius_blur_copies() {
    let Some(context) = context() else { return };
    let pixels = [0, 50, 100, 150, 200, 250];
    let mut image = Image::new(&context, (6, 1)).unwrap();
    image.replace_with_pixels(&pixels, None, 6).unwrap();

    image.apply_filters(&[&BuiltinFilter::GaussianBlur { axis: BlurAxis::X, radius: 0.0 }]).unwrap();

    assert_eq!(image.to_bytes().unwrap(), pixels);
}

#[test]
fn test_lookup_table() {
    let Some(context) = context() else { return };
    let mut image = Image::new(&context, (3, 1)).unwrap();
    image.replace_with_pixels(&[0, 100, 255], None, 3).unwrap();

    image.apply_filters(&[&BuiltinFilter::lookup_from_fn(|value| 255 - value)]).unwrap();

    assert_eq!(image.to_bytes().unwrap(), vec![255, 155, 0]);
}

#[test]
fn test_auxiliary_texture() {
    let Some(context) = context() else { return };
    let mut addend = Image::new(&context, (2, 1)).unwrap();
    addend.replace_with_pixels(&[50, 200], None, 2).unwrap();
    let mut image = Image::new(&context, (2, 1)).unwrap();
    image.replace_with_pixels(&[100, 100], None, 2).unwrap();

    let add = Add { addend: addend.texture().clone() };
    let filters: [&dyn FilterKernel; 2] = [&add, &add];
    image.apply_filters(&filters).unwrap();

    assert_eq!(image.to_bytes().unwrap(), vec![200, 255]);
}

#[test]
fn test_replace_from_image_and_clone() {
    let Some(context) = context() else { return };
    let mut source = Image::new(&context, (3, 1)).unwrap();
    source.replace_with_pixels(&[1, 2, 3], None, 3).unwrap();

    let mut target = Image::new(&context, (2, 2)).unwrap();
    target.apply_filters(&[&BuiltinFilter::Gamma { gamma: 1.0 }]).unwrap();
    target.replace_from_image(&source).unwrap();
    assert_eq!(target.size(), (3, 1));
    assert!(!target.has_scratch());
    assert_eq!(target.to_bytes().unwrap(), vec![1, 2, 3]);

    let copy = source.try_clone().unwrap();
    source.apply(&BuiltinGenerator::SolidColor { color: 0.0 }).unwrap();
    assert_eq!(copy.to_bytes().unwrap(), vec![1, 2, 3]);
    assert_eq!(source.to_bytes().unwrap(), vec![0, 0, 0]);
}

#[test]
fn test_allocation_failures() {
    let Some(context) = context() else { return };
    let too_wide = context.device().limits().max_texture_dimension_2d + 1;

    assert!(matches!(Image::new(&context, (0, 0)), Err(Error::TextureAllocFailed { width: 0, height: 0, .. })));
    assert!(matches!(Image::new(&context, (too_wide, 1)), Err(Error::TextureAllocFailed { .. })));
    // The context stays usable
    assert_eq!(Image::new(&context, (1, 1)).unwrap().size(), (1, 1));
}

#[test]
fn test_images_on_one_context_from_two_threads() {
    let Some(context) = context() else { return };

    std::thread::scope(|scope| {
        let working = scope.spawn(|| {
            let mut image = Image::new(&context, (4, 4)).unwrap();
            for round in 0..20u8 {
                image.replace_with_pixels(&[round * 10; 16], None, 4).unwrap();
                image.apply_filters(&[&Scale { factor: 0.5 }]).unwrap();
                assert_eq!(image.to_bytes().unwrap(), vec![round * 5; 16]);
            }
        });
        let failing = scope.spawn(|| {
            for _ in 0..20 {
                assert!(matches!(Image::new(&context, (0, 0)), Err(Error::TextureAllocFailed { .. })));
            }
        });
        working.join().unwrap();
        failing.join().unwrap();
    });
}
