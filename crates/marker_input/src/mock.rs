//! Mock marker 源
//!
//! 用于无外部 marker 发布端的测试和演示。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::MarkerSample;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::memory::MemoryMarkerHub;

/// Mock marker 源配置
#[derive(Debug, Clone)]
pub struct MockMarkerConfig {
    /// marker 流名称
    pub stream_name: String,

    /// 发布端 source id
    pub source_id: String,

    /// 发送频率 (Hz)
    pub frequency_hz: f64,

    /// 依次循环发送的标签
    pub labels: Vec<String>,

    /// 附加在每个样本上的时间校正 (秒)
    pub time_correction: f64,
}

impl Default for MockMarkerConfig {
    fn default() -> Self {
        Self {
            stream_name: "MockMarkers".to_string(),
            source_id: "mock".to_string(),
            frequency_hz: 1.0,
            labels: vec!["trial_start".to_string(), "trial_end".to_string()],
            time_correction: 0.0,
        }
    }
}

/// Mock marker 源
///
/// 在内存 hub 上打开一个 outlet，按固定频率循环发送标签。
pub struct MockMarkerSource {
    config: MockMarkerConfig,
    running: Arc<AtomicBool>,
}

impl MockMarkerSource {
    /// 创建新的 Mock marker 源
    pub fn new(config: MockMarkerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 以默认标签创建指定流名称的 Mock 源
    pub fn named(stream_name: &str, frequency_hz: f64) -> Self {
        Self::new(MockMarkerConfig {
            stream_name: stream_name.to_string(),
            frequency_hz,
            ..Default::default()
        })
    }

    /// 启动 Mock 源
    ///
    /// outlet 在任务内打开，任务结束时关闭，订阅端随之变为未连接。
    pub fn start(&self, hub: &MemoryMarkerHub) -> JoinHandle<u64> {
        let config = self.config.clone();
        let running = self.running.clone();
        let outlet = hub.open_outlet(&config.stream_name, &config.source_id);

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let period = Duration::from_secs_f64(1.0 / config.frequency_hz.max(f64::EPSILON));
            let mut ticker = tokio::time::interval(period);
            let start_time = std::time::Instant::now();
            let mut sent: u64 = 0;

            debug!(
                stream = %config.stream_name,
                source_id = %config.source_id,
                frequency_hz = config.frequency_hz,
                "mock marker source started"
            );

            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let label = if config.labels.is_empty() {
                    sent.to_string()
                } else {
                    config.labels[(sent as usize) % config.labels.len()].clone()
                };
                let sample = MarkerSample::new(
                    start_time.elapsed().as_secs_f64(),
                    config.time_correction,
                    vec![label],
                );
                let delivered = outlet.push(sample);
                sent += 1;

                trace!(stream = %config.stream_name, sent, delivered, "mock marker sent");
            }

            debug!(stream = %config.stream_name, sent, "mock marker source stopped");
            sent
        })
    }

    /// 停止 Mock 源
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
