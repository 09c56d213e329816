// Batched stack splicing vs one splice per inserted element, plus the cost
// of flushing a table after many scattered writes.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec3, Vec4};
use gpu_mirror::{
    BufferBackedTable, GrowableMirroredBuffer, GrowthConfig, PackingMode, RecordingDevice,
    TableSchema,
};

const BUFFER_LENGTHS: &[usize] = &[1_000, 10_000, 100_000];
const INSERTS: usize = 64;

fn filled_buffer(len: usize) -> GrowableMirroredBuffer<[f32; 4], RecordingDevice> {
    let device = Arc::new(RecordingDevice::new());
    let config = GrowthConfig::default().with_capacity(len + INSERTS + 1);
    let mut buffer = GrowableMirroredBuffer::new(device, config).unwrap();
    buffer
        .extend_from_slice(&vec![[1.0, 2.0, 3.0, 4.0]; len])
        .unwrap();
    buffer.flush().unwrap();
    buffer
}

fn bench_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_middle");

    for &len in BUFFER_LENGTHS {
        group.bench_with_input(BenchmarkId::new("stack_merge", len), &len, |b, &len| {
            b.iter_batched(
                || filled_buffer(len),
                |mut buffer| {
                    for i in 0..INSERTS {
                        buffer.push_to_stack([i as f32; 4]);
                    }
                    buffer.merge_stack((len / 2) as isize).unwrap();
                    buffer.flush().unwrap();
                    black_box(buffer.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("per_element", len), &len, |b, &len| {
            b.iter_batched(
                || filled_buffer(len),
                |mut buffer| {
                    for i in 0..INSERTS {
                        buffer.push_to_stack([i as f32; 4]);
                        buffer.merge_stack((len / 2 + i) as isize).unwrap();
                    }
                    buffer.flush().unwrap();
                    black_box(buffer.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_table_flush(c: &mut Criterion) {
    let device = Arc::new(RecordingDevice::new());
    let schema = TableSchema::new()
        .field_of::<Mat4>("view")
        .field_of::<Mat4>("projection")
        .array_of::<Vec4>("light_colors", 16)
        .array_of::<Vec3>("light_positions", 16)
        .field_of::<f32>("time");
    let mut table = BufferBackedTable::with_schema(device, PackingMode::Std140, &schema).unwrap();
    table.flush().unwrap();

    c.bench_function("table_scattered_writes_then_flush", |b| {
        b.iter(|| {
            for i in 0..16 {
                table
                    .set_element("light_positions", i, Vec3::splat(i as f32))
                    .unwrap();
            }
            table.set("time", black_box(1.0f32)).unwrap();
            table.flush().unwrap();
        })
    });
}

criterion_group!(benches, bench_insertion, bench_table_flush);
criterion_main!(benches);
