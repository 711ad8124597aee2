//! Property-based tests using proptest
//!
//! Round-trip of the annotation format, union behaviour of the rasterizer
//! and the tile count formula.

use polycrop::annotation::{self, AnnotationSet, Polygon};
use polycrop::tiling::{start_offsets, TileGrid};
use polycrop::{classify, rasterize, OverlapRule, PixelPoint, RasterSize, TileLabel};
use proptest::prelude::*;
use std::path::Path;

fn raster() -> impl Strategy<Value = RasterSize> {
    (1u32..4000, 1u32..4000).prop_map(|(w, h)| RasterSize::new(w, h))
}

fn polygon_in(size: RasterSize) -> impl Strategy<Value = Vec<PixelPoint>> {
    prop::collection::vec(
        (0..size.width as i32, 0..size.height as i32).prop_map(|(x, y)| PixelPoint::new(x, y)),
        3..8,
    )
}

fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<PixelPoint> {
    vec![
        PixelPoint::new(x1, y1),
        PixelPoint::new(x2, y1),
        PixelPoint::new(x2, y2),
        PixelPoint::new(x1, y2),
    ]
}

proptest! {
    #[test]
    fn prop_save_load_round_trip(
        (size, polygons) in raster().prop_flat_map(|size| {
            (Just(size), prop::collection::vec(polygon_in(size), 0..5))
        })
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ann.txt");

        let mut set = AnnotationSet::new();
        for poly in &polygons {
            set.push(Polygon::from_pixels(poly, size));
        }
        annotation::save(&path, &set).unwrap();
        let loaded = annotation::load(&path).unwrap();

        prop_assert_eq!(loaded.len(), polygons.len());
        for (original, back) in polygons.iter().zip(loaded.to_pixels(size)) {
            prop_assert_eq!(original.len(), back.len());
            for (a, b) in original.iter().zip(back.iter()) {
                prop_assert!((a.x - b.x).abs() <= 1, "x drifted: {:?} -> {:?}", a, b);
                prop_assert!((a.y - b.y).abs() <= 1, "y drifted: {:?} -> {:?}", a, b);
            }
        }
    }

    #[test]
    fn prop_text_format_is_lossless(
        coords in prop::collection::vec(prop::collection::vec(0.0f64..=1.0, 6..16), 1..4)
    ) {
        let text = coords
            .iter()
            .map(|line| {
                let even = &line[..line.len() / 2 * 2];
                even.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
            })
            .collect::<Vec<_>>()
            .join("\n");

        let set = AnnotationSet::parse(&text, Path::new("p.txt")).unwrap();
        prop_assert_eq!(set.to_text(), text);
    }

    #[test]
    fn prop_union_is_or(
        a in polygon_in(RasterSize::new(64, 64)),
        b in polygon_in(RasterSize::new(64, 64)),
    ) {
        let both = rasterize(&[a.clone(), b.clone()], 64, 64);
        let mut or = rasterize(&[a], 64, 64);
        or.union_with(&rasterize(&[b], 64, 64));
        prop_assert_eq!(both, or);
    }

    #[test]
    fn prop_nested_polygon_adds_nothing(
        x1 in 0i32..30, y1 in 0i32..30, w in 10i32..30, h in 10i32..30,
        inset in 1i32..5,
    ) {
        let outer = rect(x1, y1, x1 + w, y1 + h);
        let inner = rect(x1 + inset, y1 + inset, x1 + w - inset, y1 + h - inset);
        let alone = rasterize(&[outer.clone()], 64, 64);
        let with_inner = rasterize(&[outer, inner], 64, 64);
        prop_assert_eq!(alone, with_inner);
    }

    #[test]
    fn prop_tile_count_formula(
        w in 0u32..3000, h in 0u32..3000, c in 1u32..800, s in 1u32..400,
    ) {
        let grid = TileGrid::new(RasterSize::new(w, h), c, s);
        let expected = if w >= c && h >= c {
            (((w - c) / s + 1) * ((h - c) / s + 1)) as usize
        } else {
            0
        };
        prop_assert_eq!(grid.len(), expected);
        prop_assert_eq!(start_offsets(w, c, s).len() * start_offsets(h, c, s).len(), expected);
    }

    #[test]
    fn prop_any_rule_partitions_tiles(
        poly in polygon_in(RasterSize::new(120, 80)),
        c in 5u32..40, s in 5u32..40,
    ) {
        let mask = rasterize(&[poly], 120, 80);
        for tile in classify(&mask, c, s, OverlapRule::AnyOverlap) {
            match tile.label {
                Some(TileLabel::Positive) => prop_assert_eq!(tile.intersection, 0),
                Some(TileLabel::Negative) => prop_assert!(tile.intersection > 0),
                None => prop_assert!(false, "tile dropped under any-overlap rule"),
            }
            prop_assert!(tile.bounds.x2 <= 120 && tile.bounds.y2 <= 80);
        }
    }
}
