//! Property-based tests for the containers, the cell math and the
//! compression codec

use proptest::prelude::*;

use molio::io::xdr::XdrFile;
use molio::prelude::*;
use molio::utils::SortedSet;

fn temp_path(tag: u64) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "molio-property-{}-{}.bin",
        std::process::id(),
        tag
    ))
}

proptest! {
    #[test]
    fn sorted_set_stays_sorted_and_unique(values in prop::collection::vec(0usize..500, 0..200)) {
        let mut set = SortedSet::new();
        for &value in &values {
            set.insert(value);
        }

        let content = set.as_vec();
        for window in content.windows(2) {
            prop_assert!(window[0] < window[1]);
        }
        for &value in &values {
            prop_assert!(set.contains(&value));
        }
    }

    #[test]
    fn sorted_set_removal_keeps_order(
        values in prop::collection::vec(0usize..100, 1..100),
        removals in prop::collection::vec(0usize..100, 0..50),
    ) {
        let mut set: SortedSet<usize> = values.iter().copied().collect();
        for value in &removals {
            set.remove(value);
        }
        for window in set.as_vec().windows(2) {
            prop_assert!(window[0] < window[1]);
        }
        for value in &removals {
            prop_assert!(!set.contains(value));
        }
    }

    #[test]
    fn wrap_shrinks_vectors(
        x in -50.0f64..50.0, y in -50.0f64..50.0, z in -50.0f64..50.0,
        gamma in 45.0f64..135.0,
    ) {
        let cell = UnitCell::triclinic(
            Vector3D::new(10.0, 12.0, 14.0),
            Vector3D::new(90.0, 90.0, gamma),
        );
        let vector = Vector3D::new(x, y, z);
        let wrapped = cell.wrap(&vector);
        prop_assert!(wrapped.norm() <= vector.norm() + 1e-9);
    }

    #[test]
    fn wrap_is_lattice_invariant(
        x in -20.0f64..20.0, y in -20.0f64..20.0, z in -20.0f64..20.0,
        nx in -3i64..4, ny in -3i64..4, nz in -3i64..4,
    ) {
        let cell = UnitCell::triclinic(
            Vector3D::new(11.0, 13.0, 17.0),
            Vector3D::new(80.0, 95.0, 105.0),
        );
        let vector = Vector3D::new(x, y, z);
        let translated = vector + cell.matrix() * Vector3D::new(nx as f64, ny as f64, nz as f64);
        let difference = cell.wrap(&vector) - cell.wrap(&translated);
        prop_assert!(difference.norm() < 1e-8);
    }

    #[test]
    fn xtc_codec_roundtrip(
        coords in prop::collection::vec(-50.0f32..50.0, 30..120),
        seed in 0u64..u64::MAX,
    ) {
        // keep a multiple of three values
        let mut coords = coords;
        coords.truncate(coords.len() - coords.len() % 3);
        let precision = 1000.0f32;

        let path = temp_path(seed);
        {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_gmx_compressed_floats(&coords, precision).unwrap();
        }

        let mut decoded = vec![0.0f32; coords.len()];
        {
            let mut file = XdrFile::open(&path, Mode::Read).unwrap();
            let read_precision = file.read_gmx_compressed_floats(&mut decoded).unwrap();
            prop_assert_eq!(read_precision, precision);
        }
        std::fs::remove_file(&path).unwrap();

        for (value, original) in decoded.iter().zip(&coords) {
            let expected = if *original >= 0.0 {
                ((original * precision + 0.5) as i32) as f32 / precision
            } else {
                ((original * precision - 0.5) as i32) as f32 / precision
            };
            // the decoder multiplies by the inverse precision in single
            // precision, which costs a couple of ulps at these magnitudes
            prop_assert!(
                (value - expected).abs() < 1e-4,
                "decoded {} does not match rounded {}", value, expected
            );
        }
    }
}

#[test]
fn frame_resize_matches_size() {
    let mut frame = Frame::new();
    frame.add_velocities();
    for n in [0usize, 5, 3, 12, 0] {
        frame.resize(n).unwrap();
        assert_eq!(frame.size(), n);
        assert_eq!(frame.positions().len(), n);
        assert_eq!(frame.velocities().unwrap().len(), n);
    }
}
