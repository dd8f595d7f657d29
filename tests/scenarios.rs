//! End-to-end scenarios exercising the public API

use molio::io::xdr::XdrFile;
use molio::prelude::*;
use molio::{Error, Property};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("molio-scenario-{}-{}", std::process::id(), name))
}

#[test]
fn topology_cache() {
    let mut topology = Topology::new();
    for _ in 0..5 {
        topology.add_atom(Atom::new("C"));
    }
    for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 4), (1, 4)] {
        topology.add_bond(i, j, BondOrder::Unknown).unwrap();
    }

    let angles: Vec<[usize; 3]> = topology.angles().iter().map(|a| a.atoms()).collect();
    let expected = [
        [0, 1, 2],
        [0, 1, 4],
        [1, 2, 3],
        [2, 1, 4],
        [2, 3, 4],
        [1, 4, 3],
    ];
    assert_eq!(angles.len(), expected.len());
    for [i, j, k] in expected {
        let canonical = [i.min(k), j, i.max(k)];
        assert!(angles.contains(&canonical), "missing angle {:?}", canonical);
    }

    let dihedrals: Vec<[usize; 4]> = topology.dihedrals().iter().map(|d| d.atoms()).collect();
    assert!(dihedrals.contains(&[0, 1, 2, 3]));
    assert!(dihedrals.contains(&[0, 1, 4, 3]));
}

#[test]
fn angles_follow_bonds() {
    let mut topology = Topology::new();
    for _ in 0..6 {
        topology.add_atom(Atom::new("C"));
    }
    for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 4), (1, 4), (4, 5)] {
        topology.add_bond(i, j, BondOrder::Unknown).unwrap();
    }

    let bonds: Vec<[usize; 2]> = topology.bonds().iter().map(|b| b.atoms()).collect();
    let angles: Vec<[usize; 3]> = topology.angles().iter().map(|a| a.atoms()).collect();
    for [i, j, k] in &angles {
        assert!(bonds.contains(&[*i.min(j), *i.max(j)]));
        assert!(bonds.contains(&[*j.min(k), *j.max(k)]));
    }

    let dihedrals: Vec<[usize; 4]> = topology.dihedrals().iter().map(|d| d.atoms()).collect();
    for [i, j, k, m] in &dihedrals {
        assert!(bonds.contains(&[*i.min(j), *i.max(j)]));
        assert!(bonds.contains(&[*j.min(k), *j.max(k)]));
        assert!(bonds.contains(&[*k.min(m), *k.max(m)]));
    }
}

#[test]
fn bond_guessing_water() {
    let mut frame = Frame::with_cell(UnitCell::orthorhombic(10.0, 10.0, 10.0));
    frame.add_atom(Atom::new("O"), Vector3D::new(0.0, 0.0, 0.0), None);
    frame.add_atom(Atom::new("H"), Vector3D::new(0.96, 0.0, 0.0), None);
    frame.add_atom(Atom::new("H"), Vector3D::new(-0.96, 0.0, 0.0), None);
    frame.add_atom(Atom::new("H"), Vector3D::new(0.0, 5.0, 0.0), None);

    frame.guess_bonds().unwrap();

    let bonds: Vec<[usize; 2]> = frame.topology().bonds().iter().map(|b| b.atoms()).collect();
    assert_eq!(bonds, vec![[0, 1], [0, 2]]);
}

#[test]
fn xtc_codec_rounds_to_precision() {
    let path = temp_path("codec.bin");
    let input: Vec<f32> = vec![0.0, 0.0, 0.0, 0.1234, 0.2345, 0.3456];
    {
        let mut file = XdrFile::open(&path, Mode::Write).unwrap();
        file.write_gmx_compressed_floats(&input, 1000.0).unwrap();
    }

    let mut file = XdrFile::open(&path, Mode::Read).unwrap();
    let mut output = vec![0.0f32; input.len()];
    let precision = file.read_gmx_compressed_floats(&mut output).unwrap();
    assert_eq!(precision, 1000.0);

    for (decoded, original) in output.iter().zip(&input) {
        let rounded = if *original >= 0.0 {
            ((original * 1000.0 + 0.5) as i32) as f32 / 1000.0
        } else {
            ((original * 1000.0 - 0.5) as i32) as f32 / 1000.0
        };
        assert!(
            (decoded - rounded).abs() < 1e-6,
            "decoded {} does not match {}",
            decoded,
            rounded
        );
    }
    assert_eq!(output[0], 0.0);
    assert!((output[3] - 0.123).abs() < 1e-6);
    assert!((output[5] - 0.346).abs() < 1e-6);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn amber_restart_single_frame() {
    let path = temp_path("restart.ncrst");
    let mut trajectory = Trajectory::open(&path, Mode::Write).unwrap();

    let mut frame = Frame::with_cell(UnitCell::orthorhombic(10.0, 10.0, 10.0));
    frame.add_atom(Atom::new("Na"), Vector3D::new(1.0, 2.0, 3.0), None);

    trajectory.write(&frame).unwrap();
    let error = trajectory.write(&frame).unwrap_err();
    assert!(matches!(error, Error::Format(_)));

    drop(trajectory);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn triclinic_wrap() {
    let cell = UnitCell::triclinic(
        Vector3D::new(10.0, 10.0, 10.0),
        Vector3D::new(90.0, 90.0, 60.0),
    );
    let vector = Vector3D::new(7.0, 7.0, 0.0);
    let wrapped = cell.wrap(&vector);

    assert!(wrapped.norm() <= vector.norm());

    // the image must be within half a lattice translation along every
    // fractional axis
    let fractional = cell.fractional(&wrapped).unwrap();
    for k in 0..3 {
        assert!(fractional[k].abs() <= 0.5 + 1e-12);
    }

    // wrapping again changes nothing
    assert!((cell.wrap(&wrapped) - wrapped).norm() < 1e-12);
}

#[test]
fn format_name_suggestion() {
    let error = Trajectory::open_with_format("/tmp/whatever.dat", Mode::Read, "XYX").unwrap_err();
    let message = error.to_string();
    // 'XYZ' must be offered among the suggestions
    assert!(message.contains("Did you mean"), "got: {}", message);
    assert!(message.contains("'XYZ'"), "got: {}", message);
}

#[test]
fn property_widening_and_errors() {
    let mut frame = Frame::new();
    frame.set("count", 42u8);
    frame.set("signed", -12i64);
    assert_eq!(frame.get("count"), Some(&Property::Double(42.0)));
    assert_eq!(frame.get("signed"), Some(&Property::Double(-12.0)));

    let error = frame.get("count").unwrap().as_string().unwrap_err();
    assert!(matches!(error, Error::Property(_)));
}

#[test]
fn configuration_overrides_guessing_radii() {
    // a huge radius on carbon makes a long pair bond appear
    let mut frame = Frame::new();
    frame.add_atom(Atom::new("C"), Vector3D::new(0.0, 0.0, 0.0), None);
    frame.add_atom(Atom::new("C"), Vector3D::new(2.2, 0.0, 0.0), None);
    frame.guess_bonds().unwrap();
    assert!(frame.topology().bonds().is_empty());

    molio::config::add_atom_data(
        "C",
        molio::config::AtomData {
            vdw_radius: Some(2.0),
            ..Default::default()
        },
    );
    frame.guess_bonds().unwrap();
    assert_eq!(frame.topology().bonds().len(), 1);

    molio::config::clear_atom_data();
}
