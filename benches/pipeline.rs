use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;
use std::io::Cursor;

use textlift::{BatchRequest, DynamicImage, decode_image, derive_id, flatten_lines};

const REFERENCES: &[&str] = &[
    "http://cdn.example.com/scans/invoice-2024-001.png",
    "https://media.example.org/receipts/store/receipt.jpg",
    "http://example.com/image.jpg?param=special&extension=.png",
    "bare-filename.webp",
    "http://example.com/path/",
];

fn sample_png() -> Vec<u8> {
    let frame = image::RgbImage::from_pixel(64, 64, image::Rgb([200, 200, 200]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(frame)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("png encode");
    buf.into_inner()
}

fn id_derivation_bench(c: &mut Criterion) {
    c.bench_function("derive_id_mixed_references", |b| {
        b.iter(|| {
            for reference in REFERENCES {
                black_box(derive_id(black_box(reference)));
            }
        });
    });
}

fn normalization_bench(c: &mut Criterion) {
    let page: String = "LINE OF RECOGNIZED TEXT\r\n".repeat(200);

    c.bench_function("flatten_lines_200_lines", |b| {
        b.iter(|| {
            black_box(flatten_lines(black_box(&page)));
        });
    });
}

fn admission_bench(c: &mut Criterion) {
    let urls: Vec<String> = (0..8)
        .map(|i| format!("http://cdn.example.com/batch/img{i}.png"))
        .collect();
    let body = json!({ "image_urls": urls });

    c.bench_function("batch_admission_full_batch", |b| {
        b.iter(|| {
            let request =
                BatchRequest::from_value(black_box(&body), 8).expect("batch should admit");
            black_box(request);
        });
    });
}

fn decode_bench(c: &mut Criterion) {
    let png = sample_png();

    c.bench_function("decode_64x64_png", |b| {
        b.iter(|| {
            let image = decode_image(black_box(&png)).expect("decode should succeed");
            black_box(image);
        });
    });
}

criterion_group!(
    benches,
    id_derivation_bench,
    normalization_bench,
    admission_bench,
    decode_bench
);
criterion_main!(benches);
