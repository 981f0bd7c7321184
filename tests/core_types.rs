use autotrack::{
    AutoTrackError, AutoTrackOptions, EllipseMask, ImageView, IntRect, OwnedImage, Point, Rect,
    Template,
};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        AutoTrackError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::from_slice(&data, 1, 0).err().unwrap();
    assert_eq!(
        err,
        AutoTrackError::InvalidDimensions {
            width: 1,
            height: 0,
        }
    );
}

#[test]
fn image_view_rejects_invalid_stride() {
    let data = [0u8; 8];

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        AutoTrackError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );
}

#[test]
fn image_view_rejects_small_buffer() {
    let data = [0u8; 3];

    let err = ImageView::new(&data, 2, 2, 2).err().unwrap();
    assert_eq!(err, AutoTrackError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn image_view_roi_matches_expected_values() {
    let data: Vec<u8> = (0u8..16).collect();
    let view = ImageView::from_slice(&data, 4, 4).unwrap();
    assert_eq!(view.stride(), 4);

    let roi = view.roi(1, 1, 2, 2).unwrap();
    assert_eq!(roi.width(), 2);
    assert_eq!(roi.height(), 2);
    assert_eq!(roi.get(0, 0), Some(&5));
    assert_eq!(roi.get(1, 1), Some(&10));
    assert_eq!(roi.get(2, 0), None);
    assert!(view.roi(3, 3, 2, 2).is_err());
}

#[test]
fn owned_image_from_fn_is_row_major() {
    let img = OwnedImage::from_fn(3, 2, |x, y| (10 * y + x) as u8).unwrap();
    assert_eq!(img.data(), &[0, 1, 2, 10, 11, 12]);
    assert_eq!(img.get(2, 1), Some(12));
    assert_eq!(img.get(3, 0), None);
}

#[test]
fn template_rejects_mask_of_wrong_length() {
    let img = OwnedImage::filled(3, 3, 7).unwrap();
    let err = Template::new(img, vec![true; 8]).err().unwrap();
    assert_eq!(err, AutoTrackError::MaskMismatch { needed: 9, got: 8 });
}

#[test]
fn rect_bounds_enclose_fractional_edges() {
    let rect = Rect::new(1.5, 2.25, 3.0, 4.5);
    assert_eq!(rect.bounds(), IntRect::new(1, 2, 4, 5));
    assert_eq!(rect.center(), Point::new(3.0, 4.5));
}

#[test]
fn ellipse_mask_covers_only_interior_pixels() {
    let mask = EllipseMask::from_handles(Point::new(20.0, 20.0), Point::new(25.0, 25.0), 4.0);
    let b = mask.bounds();
    let flags = mask.pixel_mask();
    assert_eq!(flags.len(), (b.width * b.height) as usize);
    let centre = ((b.height / 2) * b.width + b.width / 2) as usize;
    assert!(flags[centre]);
    assert!(!flags[0]);
    assert!(!flags[flags.len() - 1]);
}

#[test]
fn ellipse_mask_with_coincident_handles_uses_min_radius() {
    let c = Point::new(10.0, 10.0);
    let mask = EllipseMask::from_handles(c, c, 4.0);
    let frame = mask.frame();
    assert!(frame.width > 0.0 && frame.height > 0.0);
    assert!(mask.contains(c));
}

#[test]
fn options_validation_reports_the_violation() {
    let bad = AutoTrackOptions {
        good_match: 11.0,
        ..AutoTrackOptions::default()
    };
    assert!(matches!(
        bad.validate(),
        Err(AutoTrackError::InvalidOptions(_))
    ));

    let bad = AutoTrackOptions {
        search_size: (0.0, 40.0),
        ..AutoTrackOptions::default()
    };
    assert!(bad.validate().is_err());
}
