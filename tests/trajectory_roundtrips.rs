//! Write-then-read round-trips through the trajectory driver

use molio::prelude::*;
use molio::Error;

fn temp_path(name: &str) -> std::path::PathBuf {
    // surfacing the library diagnostics when RUST_LOG is set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    std::env::temp_dir().join(format!("molio-roundtrip-{}-{}", std::process::id(), name))
}

fn water_box(natoms: usize, shift: f64) -> Frame {
    let mut frame = Frame::with_cell(UnitCell::orthorhombic(18.0, 18.0, 18.0));
    frame.add_velocities();
    for i in 0..natoms {
        let name = if i % 3 == 0 { "O" } else { "H" };
        let base = i as f64 * 0.4 + shift;
        frame.add_atom(
            Atom::new(name),
            Vector3D::new(base, base * 0.5, base * 0.25),
            Some(Vector3D::new(0.1, -0.1, 0.05)),
        );
    }
    frame.set_step(3);
    frame
}

fn write_frames(path: &std::path::Path, frames: &[Frame]) {
    let mut trajectory = Trajectory::open(path, Mode::Write).unwrap();
    for frame in frames {
        trajectory.write(frame).unwrap();
    }
    trajectory.close().unwrap();
}

#[test]
fn xyz_through_driver() {
    let path = temp_path("driver.xyz");
    write_frames(&path, &[water_box(6, 0.0), water_box(6, 1.0)]);

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    assert_eq!(trajectory.nsteps(), 2);
    assert!(!trajectory.done());

    let frame = trajectory.read().unwrap();
    assert_eq!(frame.size(), 6);
    assert_eq!(frame.topology().atoms()[0].name(), "O");
    assert_eq!(frame.topology().atoms()[1].name(), "H");

    let _ = trajectory.read().unwrap();
    assert!(trajectory.done());
    assert!(matches!(trajectory.read(), Err(Error::Format(_))));

    // random access resets the cursor
    let frame = trajectory.read_step(0).unwrap();
    assert!((frame.positions()[3][0] - 1.2).abs() < 1e-6);
    assert!(!trajectory.done());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn xtc_through_driver() {
    let path = temp_path("driver.xtc");
    write_frames(&path, &[water_box(30, 0.0), water_box(30, 2.0)]);

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    assert_eq!(trajectory.nsteps(), 2);

    let frame = trajectory.read_step(1).unwrap();
    assert_eq!(frame.size(), 30);
    assert_eq!(frame.step(), 3);
    let expected = water_box(30, 2.0);
    for (read, written) in frame.positions().iter().zip(expected.positions()) {
        assert!((read - written).norm() < 0.02);
    }
    // XTC does not store velocities
    assert!(frame.velocities().is_none());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn trr_through_driver() {
    let path = temp_path("driver.trr");
    write_frames(&path, &[water_box(10, 0.0)]);

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    let frame = trajectory.read().unwrap();
    let expected = water_box(10, 0.0);
    for (read, written) in frame.positions().iter().zip(expected.positions()) {
        assert!((read - written).norm() < 1e-5);
    }
    for (read, written) in frame
        .velocities()
        .unwrap()
        .iter()
        .zip(expected.velocities().unwrap())
    {
        assert!((read - written).norm() < 1e-6);
    }
    assert!((frame.cell().lengths() - Vector3D::new(18.0, 18.0, 18.0)).norm() < 1e-4);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn amber_netcdf_through_driver() {
    let path = temp_path("driver.nc");
    write_frames(&path, &[water_box(8, 0.0), water_box(8, 0.5), water_box(8, 1.0)]);

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    assert_eq!(trajectory.nsteps(), 3);

    let frame = trajectory.read_step(2).unwrap();
    let expected = water_box(8, 1.0);
    // coordinates are stored as f32
    for (read, written) in frame.positions().iter().zip(expected.positions()) {
        assert!((read - written).norm() < 1e-5);
    }
    let angles = frame.cell().angles();
    assert!((angles - Vector3D::new(90.0, 90.0, 90.0)).norm() < 1e-4);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn lammps_through_driver() {
    let path = temp_path("driver.lammpstrj");
    write_frames(&path, &[water_box(6, 0.0)]);

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    let frame = trajectory.read().unwrap();
    assert_eq!(frame.size(), 6);
    assert_eq!(frame.step(), 3);
    let expected = water_box(6, 0.0);
    for (read, written) in frame.positions().iter().zip(expected.positions()) {
        assert!((read - written).norm() < 1e-9);
    }

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn append_mode_through_driver() {
    let path = temp_path("append.xyz");
    write_frames(&path, &[water_box(4, 0.0)]);

    {
        let mut trajectory = Trajectory::open(&path, Mode::Append).unwrap();
        trajectory.write(&water_box(4, 1.0)).unwrap();
    }

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    assert_eq!(trajectory.nsteps(), 2);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn mode_checks() {
    let path = temp_path("modes.xyz");
    write_frames(&path, &[water_box(4, 0.0)]);

    let mut read_only = Trajectory::open(&path, Mode::Read).unwrap();
    assert!(read_only.write(&water_box(4, 0.0)).is_err());

    let mut write_only = Trajectory::open(&path, Mode::Write).unwrap();
    assert!(write_only.read().is_err());

    drop(write_only);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn amber_restart_preserves_doubles() {
    let path = temp_path("exact.ncrst");
    let mut frame = Frame::with_cell(UnitCell::orthorhombic(31.0, 32.0, 33.0));
    frame.add_atom(Atom::new("K"), Vector3D::new(0.123456789, 1.0, 2.0), None);
    frame.add_atom(Atom::new("Cl"), Vector3D::new(3.0, 4.0, 5.987654321), None);
    write_frames(&path, std::slice::from_ref(&frame));

    let mut trajectory = Trajectory::open(&path, Mode::Read).unwrap();
    let read = trajectory.read().unwrap();
    assert_eq!(read.positions(), frame.positions());

    std::fs::remove_file(&path).unwrap();
}
