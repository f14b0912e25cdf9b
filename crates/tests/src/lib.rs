//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（配置 -> 模拟引擎 -> 分发器 -> 轮询循环）
//! - 顺序保证的性质测试

#[cfg(test)]
mod contract_tests {
    use contracts::{Completion, CompletionStatus, DispatchBlueprint, DispatcherConfig, Policy};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::MAX_CHANNELS, 64);
    }

    #[test]
    fn test_blueprint_json_snapshot() {
        let blueprint = DispatchBlueprint::with_dispatcher(DispatcherConfig::new(2, 4));
        let json = config_loader::ConfigLoader::to_json(&blueprint).unwrap();

        assert!(json.contains("\"channels\": 2"));
        assert!(json.contains("\"queue_depth\": 4"));
        assert!(json.contains("\"kind\": \"disabled\""));
        assert_eq!(blueprint.reorder_capacity(), 16);
    }

    #[test]
    fn test_toml_round_trip_keeps_policy() {
        let mut blueprint = DispatchBlueprint::with_dispatcher(DispatcherConfig::new(3, 2));
        blueprint.policy.kind = Policy::WeightedLeastLoaded;

        let toml = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(parsed.dispatcher, blueprint.dispatcher);
        assert_eq!(parsed.policy.kind, Policy::WeightedLeastLoaded);
    }

    #[test]
    fn test_completion_ok_status() {
        let completion = Completion {
            status: CompletionStatus::Failed(-5),
            context: 1,
            size: 16,
            request_id: Some(0),
            channel: 1,
        };
        assert!(!completion.status.is_ok());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{Command, CompletionStatus, FlowType, Policy, PollOutcome, SplitState};
    use dispatcher::{Dispatcher, PollLoopHandle};
    use engine_sim::{MockEngine, MockEngineConfig};
    use observability::ReleaseMetricsAggregator;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const CONFIG: &str = r#"
[dispatcher]
channels = 4
queue_depth = 2

[policy]
kind = "weighted_least_loaded"

[engine]
min_latency_polls = 1
max_latency_polls = 6
seed = 11

[workload]
commands = 250
min_size = 64
max_size = 1024
split_ratio = 0.25
poll_interval_us = 50
"#;

    /// End-to-end test: config -> MockEngine -> Dispatcher -> PollLoop
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并校验配置
    /// 2. Dispatcher 按加权策略把命令分到 4 个通道
    /// 3. 轮询循环按提交顺序交付所有完成结果
    #[tokio::test]
    async fn test_e2e_config_to_ordered_completions() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            CONFIG,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let engine = MockEngine::with_config(MockEngineConfig::from_sim_config(
            blueprint.dispatcher.channels,
            &blueprint.engine,
        ));
        let dispatcher = Arc::new(Dispatcher::init(blueprint.dispatcher, engine).unwrap());
        dispatcher.set_policy(blueprint.policy.kind, None).unwrap();

        let (tx, mut rx) = mpsc::channel(dispatcher.reorder_capacity());
        let poll_loop = PollLoopHandle::spawn(
            Arc::clone(&dispatcher),
            Duration::from_micros(blueprint.workload.poll_interval_us),
            tx,
        );

        let total = blueprint.workload.commands;
        let mut submitted = 0u64;
        let mut aggregator = ReleaseMetricsAggregator::new();

        while aggregator.total_released < total {
            while submitted < total && dispatcher.has_capacity() {
                // Every fourth command opens a split pair
                let split = match submitted % 4 {
                    0 if submitted + 1 < total => SplitState::First,
                    1 => SplitState::Second,
                    _ => SplitState::Whole,
                };
                let size = 64 + (submitted * 37) % 960;
                let command = Command::new(Bytes::new(), submitted)
                    .with_size(size)
                    .with_split(split);
                let placed = dispatcher.submit(command).unwrap();
                if split == SplitState::Second {
                    let first = dispatcher.engine().history(placed.channel);
                    assert!(first.contains(&(submitted - 1)), "split halves diverged");
                }
                submitted += 1;
            }

            let completion = timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("no completion within 10s")
                .expect("poll loop exited");
            aggregator.update(&completion, None);
        }

        let stats = poll_loop.shutdown().await;
        let summary = aggregator.summary();
        assert_eq!(summary.total_released, total);
        assert_eq!(summary.order_violations, 0);
        assert_eq!(summary.per_channel.len(), 4);
        assert_eq!(stats.errors, 0);

        let dispatcher = Arc::try_unwrap(dispatcher).ok().unwrap();
        let report = dispatcher.shutdown();
        assert_eq!(report.in_flight, 0);
        assert_eq!(report.buffered, 0);
        assert_eq!(report.metrics.submitted, total);
        assert_eq!(report.metrics.released, total);
    }

    /// 失败状态的完成结果同样按顺序交付
    #[test]
    fn test_failed_status_keeps_its_place() {
        let engine = MockEngine::with_config(MockEngineConfig {
            fail_contexts: vec![(1, -22)],
            ..MockEngineConfig::manual(2)
        });
        let dispatcher =
            Dispatcher::init(contracts::DispatcherConfig::new(2, 2), engine).unwrap();
        dispatcher
            .set_policy(Policy::WeightedLeastLoaded, None)
            .unwrap();

        for context in 0..3 {
            dispatcher
                .submit(Command::new(Bytes::from_static(b"abcd"), context))
                .unwrap();
        }
        dispatcher.engine().complete(0, 2);
        dispatcher.engine().complete(1, 1);

        let mut released = Vec::new();
        for channel in [1, 0, 0, 1] {
            if let PollOutcome::Ready(c) = dispatcher.poll_channel(channel).unwrap() {
                released.push((c.context, c.status));
            }
        }
        assert_eq!(
            released,
            vec![
                (0, CompletionStatus::Ok),
                (1, CompletionStatus::Failed(-22)),
                (2, CompletionStatus::Ok)
            ]
        );
    }

    /// 两个分发器实例互不影响
    #[test]
    fn test_independent_instances() {
        let a = Dispatcher::init(
            contracts::DispatcherConfig::new(2, 2),
            MockEngine::manual(2),
        )
        .unwrap();
        let b = Dispatcher::init(
            contracts::DispatcherConfig::new(2, 2),
            MockEngine::manual(2),
        )
        .unwrap();

        a.bind_flow(FlowType(1)).unwrap();
        b.set_policy(Policy::WeightedLeastLoaded, None).unwrap();

        assert_eq!(a.policy(), Policy::FlowAffinity);
        assert_eq!(b.policy(), Policy::WeightedLeastLoaded);
        assert_eq!(b.flow_binding(FlowType(1)), None);
    }
}

#[cfg(test)]
mod property_tests {
    use bytes::Bytes;
    use contracts::{Command, DispatcherConfig, Policy, PollOutcome, SplitState};
    use dispatcher::Dispatcher;
    use engine_sim::MockEngine;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random geometry, random sizes, random completion order, random polls:
    /// release order always equals submission order.
    #[test]
    fn test_global_order_holds_for_random_runs() {
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let channels = rng.random_range(2..=6);
            let depth = rng.random_range(1..=4);
            let dispatcher = Dispatcher::init(
                DispatcherConfig::new(channels, depth),
                MockEngine::manual(channels),
            )
            .unwrap();
            dispatcher
                .set_policy(Policy::WeightedLeastLoaded, None)
                .unwrap();

            let total = rng.random_range(50..300u64);
            let mut submitted = 0u64;
            let mut released = Vec::new();
            let mut open_split = false;

            while (released.len() as u64) < total {
                if submitted < total && dispatcher.has_capacity() && rng.random_bool(0.5) {
                    let split = if open_split {
                        open_split = false;
                        SplitState::Second
                    } else if submitted + 1 < total && rng.random_bool(0.2) {
                        open_split = true;
                        SplitState::First
                    } else {
                        SplitState::Whole
                    };
                    let command = Command::new(Bytes::new(), submitted)
                        .with_size(rng.random_range(1..=4096))
                        .with_split(split);
                    dispatcher.submit(command).unwrap();
                    submitted += 1;
                }

                if rng.random_bool(0.4) {
                    let channel = rng.random_range(0..channels);
                    dispatcher.engine().complete(channel, 1);
                }

                let channel = rng.random_range(0..channels);
                if let PollOutcome::Ready(c) = dispatcher.poll_channel(channel).unwrap() {
                    released.push(c.context);
                }
            }

            let expected: Vec<u64> = (0..total).collect();
            assert_eq!(released, expected, "seed {seed}");
            assert_eq!(dispatcher.in_flight(), 0, "seed {seed}");
            assert!(dispatcher.channel_weights().iter().all(|w| *w == 0));
        }
    }
}
