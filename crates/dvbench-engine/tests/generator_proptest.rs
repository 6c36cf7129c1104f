use std::time::Duration;

use dvbench_engine::generator::{concat, generate, generate_features, split, SplitBoundaries};
use dvbench_engine::netio::{NetSnapshot, ScriptedNetCounters};
use dvbench_engine::{FnOperation, OperationInput, OperationRunner};
use dvbench_types::{FileContext, Technology};
use proptest::prelude::*;

fn snapshot() -> impl Strategy<Value = NetSnapshot> {
    (0_u64..1_000_000, 0_u64..1_000_000).prop_map(|(sent, recv)| NetSnapshot {
        bytes_sent: sent,
        bytes_recv: recv,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn split_partitions_reconstruct_superset(
        start in 0_usize..200,
        add in 0_usize..50,
        step in 0_usize..4,
        seed in any::<u64>(),
    ) {
        let boundaries = SplitBoundaries::for_step(start, add, step);
        let dataset = generate(seed, boundaries.total_rows(), true).unwrap();
        let parts = split(&dataset, boundaries).unwrap();

        prop_assert_eq!(parts.train.num_rows(), start + add * step);
        prop_assert_eq!(parts.validation.num_rows(), add);
        prop_assert_eq!(parts.test.num_rows(), add);

        let rebuilt = concat(&[parts.train, parts.validation, parts.test]).unwrap();
        prop_assert_eq!(rebuilt.batch().columns(), dataset.batch().columns());
    }

    #[test]
    fn numeric_generation_is_deterministic(seed in any::<u64>(), rows in 0_usize..300) {
        let a = generate(seed, rows, true).unwrap();
        let b = generate(seed, rows, true).unwrap();
        prop_assert_eq!(a.column_names(), b.column_names());
        prop_assert_eq!(a.batch().columns(), b.batch().columns());
    }

    #[test]
    fn features_have_requested_shape(seed in any::<u64>(), rows in 0_usize..100, count in 0_usize..6) {
        let features = generate_features(seed, rows, count).unwrap();
        prop_assert_eq!(features.num_rows(), rows);
        prop_assert_eq!(features.num_columns(), count);
    }

    #[test]
    fn records_never_go_negative(script in proptest::collection::vec(snapshot(), 0..4)) {
        let runner = OperationRunner::new(Box::new(ScriptedNetCounters::new(script)))
            .with_idle_window(Duration::ZERO);
        let op = FnOperation::noop(Technology::LakeFs);
        let file = FileContext {
            filename: "random.parquet".into(),
            file_bytes: 0,
            row_count: 0,
            merged: false,
            step: 0,
        };

        let record = runner.run(&op, &OperationInput::new("random.parquet"), file).record;
        prop_assert!(record.time_seconds >= 0.0);
        prop_assert!(record.bytes_sent < 1_000_000);
        prop_assert!(record.bytes_recv < 1_000_000);
        prop_assert!(record.bytes_sent_1s < 1_000_000);
        prop_assert!(record.bytes_recv_1s < 1_000_000);
    }
}
