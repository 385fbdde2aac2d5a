//! Bridge 指标收集模块
//!
//! 基于 TickSummary 收集和统计桥接驱动的运行指标。

use std::collections::HashMap;

use contracts::TickSummary;
use metrics::{counter, gauge, histogram};

/// 从 TickSummary 记录指标
///
/// 每次驱动 tick 结束时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick_metrics;
///
/// let packets = state.create_marker_input_packets();
/// record_tick_metrics(&summary);
/// ```
pub fn record_tick_metrics(summary: &TickSummary) {
    // tick 计数器
    counter!("emotibit_bridge_ticks_total").increment(1);

    // tick 耗时
    histogram!("emotibit_bridge_tick_duration_ms").record(summary.duration_ms);

    // marker 样本与数据包
    if summary.markers_drained > 0 {
        counter!("emotibit_bridge_markers_received_total")
            .increment(summary.markers_drained as u64);
        counter!("emotibit_bridge_packets_emitted_total")
            .increment(summary.packets_emitted as u64);
    }

    // 包序号 (用于检测回绕)
    if let Some(number) = summary.last_packet_number {
        gauge!("emotibit_bridge_last_packet_number").set(number as f64);
    }

    // 订阅连接状态
    gauge!("emotibit_bridge_marker_streams_connected").set(summary.connected_streams as f64);
    gauge!("emotibit_bridge_marker_streams_total").set(summary.total_streams as f64);
}

/// 记录按类型标签发出的数据包
pub fn record_packet_emitted(type_tag: &str) {
    counter!(
        "emotibit_bridge_packets_by_type_total",
        "type_tag" => type_tag.to_string()
    )
    .increment(1);
}

/// 记录设备样本发布结果
pub fn record_sample_published(source_id: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "emotibit_bridge_samples_published_total",
        "source_id" => source_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录配置文档注册结果
pub fn record_registration(kind: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "emotibit_bridge_registrations_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录数据包发送失败
pub fn record_packet_sink_error() {
    counter!("emotibit_bridge_packet_sink_errors_total").increment(1);
}

/// 桥接指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct BridgeMetricsAggregator {
    /// 总 tick 数
    pub total_ticks: u64,

    /// 有 marker 的 tick 数
    pub active_ticks: u64,

    /// marker 样本总数
    pub total_markers: u64,

    /// 数据包总数
    pub total_packets: u64,

    /// 每个 tick 的 marker 数统计 (仅有 marker 的 tick)
    pub markers_per_tick: RunningStats,

    /// tick 耗时统计
    pub tick_duration: RunningStats,

    /// 按类型标签的数据包数
    pub packets_by_type: HashMap<String, u64>,
}

impl BridgeMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, summary: &TickSummary) {
        self.total_ticks += 1;
        self.tick_duration.push(summary.duration_ms);

        if summary.markers_drained > 0 {
            self.active_ticks += 1;
            self.total_markers += summary.markers_drained as u64;
            self.total_packets += summary.packets_emitted as u64;
            self.markers_per_tick.push(summary.markers_drained as f64);
        }
    }

    /// 累计单个数据包的类型标签
    pub fn count_packet(&mut self, type_tag: &str) {
        *self.packets_by_type.entry(type_tag.to_string()).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_ticks: self.total_ticks,
            active_ticks: self.active_ticks,
            total_markers: self.total_markers,
            total_packets: self.total_packets,
            active_rate: if self.total_ticks > 0 {
                self.active_ticks as f64 / self.total_ticks as f64 * 100.0
            } else {
                0.0
            },
            markers_per_tick: StatsSummary::from(&self.markers_per_tick),
            tick_duration_ms: StatsSummary::from(&self.tick_duration),
            packets_by_type: self.packets_by_type.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub active_ticks: u64,
    pub total_markers: u64,
    pub total_packets: u64,
    pub active_rate: f64,
    pub markers_per_tick: StatsSummary,
    pub tick_duration_ms: StatsSummary,
    pub packets_by_type: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bridge Metrics Summary ===")?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(
            f,
            "Ticks with markers: {} ({:.2}%)",
            self.active_ticks, self.active_rate
        )?;
        writeln!(f, "Marker samples: {}", self.total_markers)?;
        writeln!(f, "Packets emitted: {}", self.total_packets)?;
        writeln!(f, "Markers per active tick: {}", self.markers_per_tick)?;
        writeln!(f, "Tick duration (ms): {}", self.tick_duration_ms)?;

        if !self.packets_by_type.is_empty() {
            writeln!(f, "Packets by type:")?;
            let mut tags: Vec<_> = self.packets_by_type.iter().collect();
            tags.sort();
            for (tag, count) in tags {
                writeln!(f, "  {}: {}", tag, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3} (n={})",
                self.min, self.max, self.mean, self.count
            )
        }
    }
}

/// 在线统计 (最小/最大/均值)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [4.0, 1.0, 3.0, 2.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = BridgeMetricsAggregator::new();

        aggregator.update(&TickSummary {
            markers_drained: 2,
            packets_emitted: 6,
            last_packet_number: Some(5),
            connected_streams: 1,
            total_streams: 2,
            duration_ms: 0.4,
        });
        aggregator.update(&TickSummary::default());
        for tag in ["LM", "TX", "TX"] {
            aggregator.count_packet(tag);
        }

        assert_eq!(aggregator.total_ticks, 2);
        assert_eq!(aggregator.active_ticks, 1);
        assert_eq!(aggregator.total_markers, 2);
        assert_eq!(aggregator.total_packets, 6);
        assert_eq!(aggregator.packets_by_type.get("TX"), Some(&2));
        assert_eq!(aggregator.summary().active_rate, 50.0);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_ticks: 100,
            active_ticks: 5,
            total_markers: 7,
            total_packets: 21,
            active_rate: 5.0,
            markers_per_tick: StatsSummary {
                count: 5,
                min: 1.0,
                max: 3.0,
                mean: 1.4,
            },
            tick_duration_ms: StatsSummary::default(),
            packets_by_type: HashMap::from([("LM".to_string(), 7)]),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Total ticks: 100"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("LM: 7"));
        assert!(output.contains("Tick duration (ms): N/A"));
    }
}
