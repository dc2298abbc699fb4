use criterion::{black_box, criterion_group, criterion_main, Criterion};
use motion::planner::{MotionPlanner, SegmentQueue};
use motion::Easing;

const TICK_RATE: f32 = 40_000.0;

fn benchmark_pump(c: &mut Criterion) {
    c.bench_function("pump_profiled_segment", |b| {
        let mut q: SegmentQueue<3> = SegmentQueue::new();
        let (mut p, mut consumer) = q.split();
        let mut planner = MotionPlanner::<3>::new(TICK_RATE, [4000.0; 3]);
        planner
            .submit_profile([0, 0, 0], [1_000_000, 0, 0], 3600.0, Easing::Quintic)
            .unwrap();

        b.iter(|| {
            planner.pump(black_box(&mut p));
            consumer.dequeue();
        })
    });
}

fn benchmark_full_move_generation(c: &mut Criterion) {
    c.bench_function("generate_full_move", |b| {
        b.iter(|| {
            let mut q: SegmentQueue<3> = SegmentQueue::new();
            let (mut p, mut consumer) = q.split();
            let mut planner = MotionPlanner::<3>::new(TICK_RATE, [4000.0; 3]);
            planner
                .submit_profile(
                    black_box([0, 0, 0]),
                    black_box([120_000, 40_000, 16_000]),
                    black_box(1.5),
                    Easing::Quintic,
                )
                .unwrap();
            loop {
                let outcome = planner.pump(&mut p);
                consumer.dequeue();
                if outcome == motion::planner::PumpOutcome::Idle {
                    break;
                }
            }
        })
    });
}

criterion_group!(benches, benchmark_pump, benchmark_full_move_generation);
criterion_main!(benches);
