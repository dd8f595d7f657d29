//! Benchmark for the XTC coordinate compression codec

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use molio::io::xdr::XdrFile;
use molio::prelude::Mode;

fn water_coordinates(natoms: usize) -> Vec<f32> {
    let mut coords = Vec::with_capacity(natoms * 3);
    for i in 0..natoms {
        let base = (i / 3) as f32 * 0.31;
        let offset = (i % 3) as f32 * 0.096;
        coords.extend_from_slice(&[base + offset, base * 0.5, base * 0.25 + offset]);
    }
    coords
}

fn bench_compression(c: &mut Criterion) {
    let coords = water_coordinates(10_000);
    let path = std::env::temp_dir().join(format!("molio-bench-{}.xtc-part", std::process::id()));

    c.bench_function("xtc_compress_10k", |b| {
        b.iter(|| {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_gmx_compressed_floats(black_box(&coords), 1000.0)
                .unwrap();
        })
    });

    {
        let mut file = XdrFile::open(&path, Mode::Write).unwrap();
        file.write_gmx_compressed_floats(&coords, 1000.0).unwrap();
    }
    let mut decoded = vec![0.0f32; coords.len()];
    c.bench_function("xtc_decompress_10k", |b| {
        b.iter(|| {
            let mut file = XdrFile::open(&path, Mode::Read).unwrap();
            file.read_gmx_compressed_floats(black_box(&mut decoded))
                .unwrap();
        })
    });

    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_compression);
criterion_main!(benches);
