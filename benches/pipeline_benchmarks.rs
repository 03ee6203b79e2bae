use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::DynamicImage;
use product_studio::{
    collaborators::test_utils::{studio_photo, MockRemover},
    fit_canvas, AspectRatio, CanvasRequest, ProductStudio, RgbColor, ShadowParams,
    ShadowSynthesizer, StudioConfig,
};
use tokio::runtime::Runtime;

fn cutout(width: u32, height: u32) -> image::RgbaImage {
    let photo = studio_photo(width, height, (width / 8, height / 8, width * 3 / 4, height * 3 / 4));
    MockRemover::key_out_backdrop(&photo)
}

fn benchmark_shadow_synthesis(c: &mut Criterion) {
    let product = cutout(640, 480);
    let mut group = c.benchmark_group("shadow_synthesis");
    group.sample_size(10);

    for blur in [0.0f32, 5.0, 20.0, 50.0] {
        let params = ShadowParams::new(60, blur, 0, 30).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(blur), &params, |b, params| {
            b.iter(|| ShadowSynthesizer::synthesize_rgba(black_box(&product), params).unwrap());
        });
    }

    group.finish();
}

fn benchmark_fit_canvas(c: &mut Criterion) {
    c.bench_function("fit_canvas_all_ratios", |b| {
        b.iter(|| {
            for ratio in AspectRatio::ALL {
                black_box(fit_canvas(black_box((1234, 987)), ratio).unwrap());
            }
        });
    });
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let photo = DynamicImage::ImageRgba8(studio_photo(800, 600, (150, 100, 500, 400)));
    let config = StudioConfig::default();
    let shadow = ShadowParams::default();

    let mut group = c.benchmark_group("full_pipeline");
    group.sample_size(10);

    for ratio in [AspectRatio::Square, AspectRatio::Landscape16x9, AspectRatio::Portrait9x16] {
        let canvas = CanvasRequest::solid(ratio, RgbColor::WHITE);
        group.bench_with_input(BenchmarkId::from_parameter(ratio), &canvas, |b, canvas| {
            let mut studio = ProductStudio::new(config.clone(), Box::new(MockRemover::new())).unwrap();
            b.iter(|| {
                runtime
                    .block_on(studio.run_pipeline(black_box(&photo), &shadow, canvas))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_shadow_synthesis,
    benchmark_fit_canvas,
    benchmark_full_pipeline
);
criterion_main!(benches);
