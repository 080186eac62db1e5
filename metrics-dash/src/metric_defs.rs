//! Display definitions for well-known system metrics.
//!
//! An ordered table of `(Matcher, MetricDef)` pairs; the first matcher that
//! accepts a metric name wins, so more specific entries come first.

use crate::format::Unit;

/// Suffix marking a metric shared from another node, e.g. `gpu.0.temp/l:node1`.
const SHARED_SUFFIX: &str = "/l:";

/// How a metric name is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// The whole name.
    Exact(&'static str),
    /// `prefix` + decimal index + `suffix`, e.g. `gpu.` `0` `.temp`.
    Indexed {
        prefix: &'static str,
        suffix: &'static str,
    },
    /// `prefix` + one dot-free segment + `suffix`, e.g. `disk.` `sda1` `.usageGB`.
    Segment {
        prefix: &'static str,
        suffix: &'static str,
    },
}

impl Matcher {
    pub fn is_match(&self, name: &str) -> bool {
        match *self {
            Matcher::Exact(exact) => name == exact,
            Matcher::Indexed { prefix, suffix } => middle(name, prefix, suffix)
                .is_some_and(|mid| !mid.is_empty() && mid.bytes().all(|b| b.is_ascii_digit())),
            Matcher::Segment { prefix, suffix } => {
                middle(name, prefix, suffix).is_some_and(|mid| !mid.is_empty() && !mid.contains('.'))
            }
        }
    }
}

fn middle<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)
}

/// How a matched metric is displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDef {
    pub title: &'static str,
    pub unit: Unit,
    pub min_y: f64,
    pub max_y: f64,
}

impl MetricDef {
    pub fn is_percentage(&self) -> bool {
        self.unit == Unit::Percent
    }
}

const fn def(title: &'static str, unit: Unit, max_y: f64) -> MetricDef {
    MetricDef {
        title,
        unit,
        min_y: 0.0,
        max_y,
    }
}

const fn exact(name: &'static str) -> Matcher {
    Matcher::Exact(name)
}

const fn indexed(prefix: &'static str, suffix: &'static str) -> Matcher {
    Matcher::Indexed { prefix, suffix }
}

const fn segment(prefix: &'static str, suffix: &'static str) -> Matcher {
    Matcher::Segment { prefix, suffix }
}

const BYTES_32G: f64 = 32_768_000_000.0;
const BYTES_1G: f64 = 1_000_000_000.0;

static METRIC_DEFS: &[(Matcher, MetricDef)] = &[
    // CPU
    (exact("cpu"), def("Process CPU Usage", Unit::Percent, 100.0)),
    (indexed("cpu.", ".cpu_percent"), def("CPU Core Usage", Unit::Percent, 100.0)),
    (exact("cpu.ecpu_percent"), def("Apple E-cores Usage", Unit::Percent, 100.0)),
    (exact("cpu.ecpu_freq"), def("Apple E-cores Freq", Unit::MegaHertz, 3000.0)),
    (exact("cpu.pcpu_percent"), def("Apple P-cores Usage", Unit::Percent, 100.0)),
    (exact("cpu.pcpu_freq"), def("Apple P-cores Freq", Unit::MegaHertz, 3000.0)),
    (exact("cpu.avg_temp"), def("Avg CPU Temp", Unit::Celsius, 100.0)),
    (exact("cpu.powerWatts"), def("CPU Power", Unit::Watts, 500.0)),
    // Memory
    (exact("memory_percent"), def("System Memory Usage", Unit::Percent, 100.0)),
    (exact("memory.used"), def("RAM Used", Unit::Bytes, BYTES_32G)),
    (exact("memory.used_percent"), def("RAM Used", Unit::Percent, 100.0)),
    (exact("swap.used"), def("Swap Memory Used", Unit::Bytes, BYTES_32G)),
    (exact("swap.used_percent"), def("Swap Memory Used", Unit::Percent, 100.0)),
    // Process
    (exact("proc.memory.rssMB"), def("Process Memory Used", Unit::MegaBytes, 32768.0)),
    (exact("proc.memory.percent"), def("Process Memory Used", Unit::Percent, 100.0)),
    (exact("proc.memory.availableMB"), def("Process Memory Available", Unit::MegaBytes, 32768.0)),
    (exact("proc.cpu.threads"), def("Process CPU Threads", Unit::Scalar, 100.0)),
    // Disk
    (exact("disk"), def("Disk Usage", Unit::Percent, 100.0)),
    (segment("disk.", ".usagePercent"), def("Disk Usage", Unit::Percent, 100.0)),
    (segment("disk.", ".usageGB"), def("Disk Usage", Unit::GigaBytes, 1000.0)),
    (exact("disk.in"), def("Disk Read", Unit::MegaBytes, 1000.0)),
    (exact("disk.out"), def("Disk Write", Unit::MegaBytes, 1000.0)),
    // Network and power
    (exact("network.recv"), def("Network Received", Unit::Bytes, BYTES_1G)),
    (exact("network.sent"), def("Network Sent", Unit::Bytes, BYTES_1G)),
    (exact("system.powerWatts"), def("System Power", Unit::Watts, 500.0)),
    (exact("ane.power"), def("Neural Engine Power", Unit::Watts, 50.0)),
    // GPU
    (indexed("gpu.", ".gpu"), def("GPU Usage", Unit::Percent, 100.0)),
    (indexed("gpu.", ".temp"), def("GPU Temp", Unit::Celsius, 100.0)),
    (indexed("gpu.", ".freq"), def("GPU Freq", Unit::MegaHertz, 3000.0)),
    (indexed("gpu.", ".memory"), def("GPU Memory Access", Unit::Percent, 100.0)),
    (indexed("gpu.", ".memoryAllocated"), def("GPU Memory Allocated", Unit::Percent, 100.0)),
    (indexed("gpu.", ".memoryAllocatedBytes"), def("GPU Memory Allocated", Unit::Bytes, BYTES_32G)),
    (indexed("gpu.", ".memoryUsed"), def("GPU Memory Used", Unit::Bytes, BYTES_32G)),
    (indexed("gpu.", ".recoveryCount"), def("GPU Recovery Count", Unit::Scalar, 100.0)),
    (indexed("gpu.", ".enforcedPowerLimitWatts"), def("GPU Power Limit", Unit::Watts, 500.0)),
    (indexed("gpu.", ".powerPercent"), def("GPU Power Usage", Unit::Percent, 100.0)),
    (indexed("gpu.", ".powerWatts"), def("GPU Power", Unit::Watts, 500.0)),
    (indexed("gpu.", ".smClock"), def("GPU SM Clock", Unit::MegaHertz, 3000.0)),
    (indexed("gpu.", ".graphicsClock"), def("GPU Graphics Clock", Unit::MegaHertz, 3000.0)),
    (indexed("gpu.", ".memoryClock"), def("GPU Memory Clock", Unit::MegaHertz, 3000.0)),
    (indexed("gpu.", ".correctedMemoryErrors"), def("GPU Corrected Errors", Unit::Scalar, 1000.0)),
    (indexed("gpu.", ".uncorrectedMemoryErrors"), def("GPU Uncorrected Errors", Unit::Scalar, 100.0)),
    (indexed("gpu.", ".encoderUtilization"), def("GPU Encoder Usage", Unit::Percent, 100.0)),
    (indexed("gpu.", ".smActive"), def("GPU SM Active", Unit::Percent, 100.0)),
    (indexed("gpu.", ".smOccupancy"), def("GPU SM Occupancy", Unit::Percent, 100.0)),
    (indexed("gpu.", ".pipeTensorActive"), def("GPU Tensor Pipeline", Unit::Percent, 100.0)),
    (indexed("gpu.", ".dramActive"), def("GPU DRAM Active", Unit::Percent, 100.0)),
    (indexed("gpu.", ".pcieTxBytes"), def("GPU PCIe Tx", Unit::Bytes, BYTES_1G)),
    (indexed("gpu.", ".pcieRxBytes"), def("GPU PCIe Rx", Unit::Bytes, BYTES_1G)),
    (indexed("gpu.", ".nvlinkTxBytes"), def("GPU NVLink Tx", Unit::Bytes, BYTES_1G)),
    (indexed("gpu.", ".nvlinkRxBytes"), def("GPU NVLink Rx", Unit::Bytes, BYTES_1G)),
    // Per-process GPU
    (indexed("gpu.process.", ".gpu"), def("Process GPU Usage", Unit::Percent, 100.0)),
    (indexed("gpu.process.", ".temp"), def("Process GPU Temp", Unit::Celsius, 100.0)),
    (indexed("gpu.process.", ".memory"), def("Process GPU Memory Access", Unit::Percent, 100.0)),
    (indexed("gpu.process.", ".memoryAllocated"), def("Process GPU Memory Allocated", Unit::Percent, 100.0)),
    (indexed("gpu.process.", ".memoryAllocatedBytes"), def("Process GPU Memory Allocated", Unit::Bytes, BYTES_32G)),
    (indexed("gpu.process.", ".memoryUsedBytes"), def("Process GPU Memory Used", Unit::Bytes, BYTES_32G)),
    (indexed("gpu.process.", ".powerPercent"), def("Process GPU Power", Unit::Percent, 100.0)),
    (indexed("gpu.process.", ".powerWatts"), def("Process GPU Power", Unit::Watts, 500.0)),
    // TPU
    (indexed("tpu.", ".dutyCycle"), def("TPU Duty Cycle", Unit::Percent, 100.0)),
    (indexed("tpu.", ".memoryUsage"), def("TPU Memory Usage", Unit::Percent, 100.0)),
    (indexed("tpu.", ".memoryusage"), def("TPU Memory Usage", Unit::Percent, 100.0)),
    (indexed("tpu.", ".memoryUsageBytes"), def("TPU Memory Usage", Unit::Bytes, BYTES_32G)),
    (indexed("tpu.", ".memoryusagebytes"), def("TPU Memory Usage", Unit::Bytes, BYTES_32G)),
    // Trainium
    (indexed("trn.", ".neuroncore_utilization"), def("Neuron Core Usage", Unit::Percent, 100.0)),
    (exact("trn.host_total_memory_usage"), def("Trainium Host Memory Total", Unit::Bytes, BYTES_32G)),
    (exact("trn.neuron_device_total_memory_usage"), def("Neuron Device Memory Total", Unit::Bytes, BYTES_32G)),
];

/// Strip a leading `/` and any shared-mode suffix.
fn normalize(name: &str) -> &str {
    let name = name.strip_prefix('/').unwrap_or(name);
    match name.find(SHARED_SUFFIX) {
        Some(idx) if idx > 0 && idx + SHARED_SUFFIX.len() < name.len() => &name[..idx],
        _ => name,
    }
}

fn find_entry(name: &str) -> Option<&'static (Matcher, MetricDef)> {
    METRIC_DEFS.iter().find(|(matcher, _)| matcher.is_match(name))
}

/// First definition whose matcher accepts `name`.
pub fn match_metric_def(name: &str) -> Option<&'static MetricDef> {
    find_entry(normalize(name)).map(|(_, def)| def)
}

/// Where a recognised system metric is drawn: every device of the same
/// metric shares one chart, one series per device.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Chart title, with the unit when it has one: `GPU Temp (°C)`.
    pub title: String,
    /// Series inside the chart; `None` for metrics without a device.
    pub series: Option<String>,
    pub def: &'static MetricDef,
}

/// Chart and series for `name`, `None` if it is not a system metric.
pub fn place_metric(name: &str) -> Option<Placement> {
    let normalized = normalize(name);
    let (matcher, def) = find_entry(normalized)?;

    let title = match def.unit.symbol() {
        "" => def.title.to_string(),
        symbol => format!("{} ({symbol})", def.title),
    };
    let series = match *matcher {
        Matcher::Segment { prefix, suffix } => middle(normalized, prefix, suffix).map(str::to_string),
        _ => Some(extract_series_name(normalized)).filter(|s| s != "Default"),
    };
    Some(Placement { title, series, def })
}

fn without_shared_suffix(name: &str) -> &str {
    match name.find(SHARED_SUFFIX) {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn is_numeric(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

/// Series label for an indexed metric: `gpu.1.temp` -> `GPU 1`.
pub fn extract_series_name(name: &str) -> String {
    let name = without_shared_suffix(name);
    let parts: Vec<&str> = name.split('.').collect();

    if parts.len() >= 3 && parts[0] == "cpu" && is_numeric(parts[1]) {
        return format!("Core {}", parts[1]);
    }
    if parts.len() >= 3 && is_numeric(parts[1]) {
        return format!("{} {}", parts[0].to_uppercase(), parts[1]);
    }
    if parts.len() >= 4 && parts[1] == "process" && is_numeric(parts[2]) {
        return format!("{} Process {}", parts[0].to_uppercase(), parts[2]);
    }
    "Default".to_string()
}
