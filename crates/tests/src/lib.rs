//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 批处理引擎 e2e 场景（直发 / 打包）
//! - 配置文件驱动的运行

#[cfg(test)]
mod contract_tests {
    use contracts::{BatcherConfig, LatencyEstimate, NextAvgFormula};

    #[test]
    fn test_contract_defaults() {
        let _ = contracts::ConfigVersion::V1;

        let config = BatcherConfig::default();
        assert_eq!(config.probe_interval_ms, 1000);
        assert_eq!(config.packing_threshold_ms, 0.1);
        assert_eq!(config.avg_item_ceiling_ms, 5.0);
        assert_eq!(config.next_avg_formula, NextAvgFormula::Reference);
    }

    #[test]
    fn test_probe_split() {
        let estimate = LatencyEstimate::from_probe(50.0);
        assert!((estimate.latency_millis - 45.0).abs() < 1e-9);
        assert!((estimate.per_item_millis - 5.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::io::Write;
    use std::time::Duration;

    use batcher::{Batcher, BatcherConfig, ChannelSink, Delivery, KeyedBatcher, LogSink, NextAvgFormula};
    use config_loader::ConfigLoader;
    use tokio::sync::mpsc;

    fn drain<T>(rx: &mut mpsc::UnboundedReceiver<Delivery<T>>) -> Vec<Delivery<T>> {
        let mut deliveries = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            deliveries.push(delivery);
        }
        deliveries
    }

    /// Slow sink: 4 producers x 25 items end up in flush batches only
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_packing_scenario_delivers_all_items_once() {
        let (sink, mut rx) = ChannelSink::new("slow", 50.0);
        let config = BatcherConfig::with_probe_interval_ms(50);
        let (batcher, tasks) = Batcher::spawn(sink, config).await.unwrap();

        let estimate = batcher.estimate();
        assert!((estimate.latency_millis - 45.0).abs() < 1e-9);
        assert!((estimate.per_item_millis - 5.0).abs() < 1e-9);
        assert!(batcher.is_packing());

        let mut producers = Vec::new();
        for p in 0..4u32 {
            let batcher = batcher.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    batcher.offer(p * 1000 + i).await.unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        batcher.close();
        tokio::time::timeout(Duration::from_secs(5), tasks.join())
            .await
            .expect("tasks should exit after close")
            .unwrap();

        let deliveries = drain(&mut rx);
        assert!(deliveries.iter().all(Delivery::is_flush));
        let total: usize = deliveries.iter().map(Delivery::len).sum();
        assert_eq!(total, 100);

        let unique: HashSet<u32> = deliveries.into_iter().flat_map(Delivery::into_items).collect();
        assert_eq!(unique.len(), 100);

        let snapshot = batcher.metrics().snapshot();
        assert_eq!(snapshot.flushed_items, 100);
        assert_eq!(snapshot.direct_calls, 0);
    }

    /// Fast sink: packing never turns on, one direct call per offer
    #[tokio::test]
    async fn test_direct_scenario_one_call_per_offer() {
        let (sink, mut rx) = ChannelSink::new("fast", 0.05);
        let config = BatcherConfig::with_probe_interval_ms(50);
        let (batcher, tasks) = Batcher::spawn(sink, config).await.unwrap();

        for i in 0..1000u32 {
            batcher.offer(i).await.unwrap();
        }
        assert!(!batcher.is_packing());

        batcher.close();
        tasks.join().await.unwrap();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1000);
        for (i, delivery) in deliveries.into_iter().enumerate() {
            assert_eq!(delivery, Delivery::Direct(i as u32));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_corrected_formula_delivers_everything() {
        let (sink, mut rx) = ChannelSink::new("slow", 5.0);
        let mut config = BatcherConfig::with_probe_interval_ms(50);
        config.next_avg_formula = NextAvgFormula::Corrected;
        let (batcher, tasks) = Batcher::spawn(sink, config).await.unwrap();

        for chunk in 0..20u32 {
            batcher.offer_all((0..10).map(|i| chunk * 10 + i).collect()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        batcher.close();
        tasks.join().await.unwrap();

        let total: usize = drain(&mut rx).iter().map(Delivery::len).sum();
        assert_eq!(total, 200);
    }

    #[tokio::test]
    async fn test_keyed_batcher_end_to_end() {
        let (sink, mut rx) = ChannelSink::new("kv", 30.0);
        let config = BatcherConfig::with_probe_interval_ms(50);
        let (batcher, tasks) = KeyedBatcher::spawn(sink, config).await.unwrap();

        batcher.offer("k0".to_string(), 0u64).await.unwrap();
        batcher
            .offer_pairs(vec!["k1".to_string(), "k2".to_string()], vec![1, 2])
            .await
            .unwrap();
        assert!(batcher.offer_pairs(vec!["k3".to_string()], vec![]).await.is_err());

        batcher.close();
        tasks.join().await.unwrap();

        let mut pairs: Vec<(String, u64)> = drain(&mut rx).into_iter().flat_map(Delivery::into_items).collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![("k0".to_string(), 0), ("k1".to_string(), 1), ("k2".to_string(), 2)]
        );
    }

    /// Config file -> loader -> batcher over a LogSink
    #[tokio::test]
    async fn test_config_file_driven_run() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
version = "V1"

[batcher]
name = "from-file"
probe_interval_ms = 25
avg_item_ceiling_ms = 2.5
next_avg_formula = "corrected"
"#
        )
        .unwrap();

        let loaded = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(loaded.batcher.name, "from-file");
        assert_eq!(loaded.batcher.next_avg_formula, NextAvgFormula::Corrected);

        let (batcher, tasks) = Batcher::spawn(LogSink::new("log", 10.0), loaded.batcher)
            .await
            .unwrap();
        assert_eq!(batcher.name(), "from-file");

        batcher.offer_all(vec!["a", "b", "c"]).await.unwrap();
        batcher.offer("d").await.unwrap();
        batcher.close();
        tasks.join().await.unwrap();

        let snapshot = batcher.metrics().snapshot();
        assert_eq!(snapshot.buffered_items, 4);
        assert_eq!(snapshot.flushed_items, 4);
        assert_eq!(batcher.buffered_len().await, 0);
    }
}
