use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use tempfile::TempDir;
use ucm::{codec, Ccd, Endian, Frame, Header, HeaderValue, Window};

fn full_frame(nx: usize, ny: usize) -> Frame {
    let mut header = Header::new();
    header.set_value("Exposure.Time", HeaderValue::Double(30.0), "seconds");
    header.set_value("Run.Number", HeaderValue::Int(17), "");

    let ccds = (0..3)
        .map(|nc| {
            let left = Array2::from_shape_fn((ny, nx), |(y, x)| (nc * 1000 + y * nx + x) as f32);
            let right = left.mapv(|v| -v);
            Ccd::new(vec![Window::new(1, 1, left), Window::new(513, 1, right)])
        })
        .collect();
    Frame::new(header, ccds, 1, 1, 1080, 1032)
}

fn bench_encode(c: &mut Criterion) {
    let frame = full_frame(512, 512);
    let size = frame.to_bytes().unwrap().len() as u64;

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(size));
    for endian in [Endian::NATIVE, Endian::NATIVE.swapped()] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{endian:?}")),
            &endian,
            |b, &endian| {
                b.iter(|| {
                    let mut out = Vec::with_capacity(size as usize);
                    codec::encode_with(black_box(&frame), &mut out, endian).unwrap();
                    out
                });
            },
        );
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let frame = full_frame(512, 512);

    let mut group = c.benchmark_group("decode");
    for endian in [Endian::NATIVE, Endian::NATIVE.swapped()] {
        let mut bytes = Vec::new();
        codec::encode_with(&frame, &mut bytes, endian).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{endian:?}")),
            &bytes,
            |b, bytes| b.iter(|| codec::decode(black_box(bytes.as_slice())).unwrap()),
        );
    }
    group.finish();
}

fn bench_open(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = full_frame(512, 512)
        .save(&dir.path().join("bench"))
        .unwrap();

    c.bench_function("open_mmap", |b| {
        b.iter(|| Frame::open(black_box(&path)).unwrap());
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_open);
criterion_main!(benches);
