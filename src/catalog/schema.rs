//! Field tables for the Mesos record types
//!
//! Each table lists the wire names of a record's fields. Discovery walks the
//! table instead of a live sample, so every field is advertised whether or
//! not the current host populates it. Nested records are always treated as
//! present.

use crate::collector::StatValue;

/// One field of a record type
#[derive(Debug, Clone, Copy)]
pub enum Field {
    /// Numeric leaf
    Leaf(&'static str),
    /// Nested record, enumerated recursively
    Nested(&'static str, &'static [Field]),
    /// Present on the wire but not a metric (repeated, textual, ...)
    Excluded(&'static str),
}

impl Field {
    /// Wire name, which is also the namespace segment
    pub fn name(&self) -> &'static str {
        match self {
            Field::Leaf(name) | Field::Nested(name, _) | Field::Excluded(name) => *name,
        }
    }
}

/// Anything whose numeric leaves can be enumerated as slash-delimited paths
pub trait LeafSource {
    /// Push every leaf under `prefix` into `out`, depth-first
    fn collect_leaves(&self, prefix: &str, out: &mut Vec<String>);

    /// All leaf paths
    fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

impl LeafSource for [Field] {
    fn collect_leaves(&self, prefix: &str, out: &mut Vec<String>) {
        for field in self {
            match field {
                Field::Leaf(name) => out.push(join(prefix, name)),
                Field::Nested(name, inner) => inner.collect_leaves(&join(prefix, name), out),
                Field::Excluded(_) => {}
            }
        }
    }
}

impl LeafSource for StatValue {
    fn collect_leaves(&self, prefix: &str, out: &mut Vec<String>) {
        if let StatValue::Map(map) = self {
            for (key, value) in map {
                match value {
                    StatValue::Number(_) => out.push(join(prefix, key)),
                    StatValue::Map(_) => value.collect_leaves(&join(prefix, key), out),
                }
            }
        }
    }
}

/// `ResourceStatistics`, reported per executor by `/monitor/statistics`
pub const RESOURCE_STATISTICS: &[Field] = &[
    Field::Leaf("timestamp"),
    Field::Leaf("processes"),
    Field::Leaf("threads"),
    // CPU
    Field::Leaf("cpus_user_time_secs"),
    Field::Leaf("cpus_system_time_secs"),
    Field::Leaf("cpus_limit"),
    Field::Leaf("cpus_nr_periods"),
    Field::Leaf("cpus_nr_throttled"),
    Field::Leaf("cpus_throttled_time_secs"),
    // Memory
    Field::Leaf("mem_total_bytes"),
    Field::Leaf("mem_total_memsw_bytes"),
    Field::Leaf("mem_limit_bytes"),
    Field::Leaf("mem_soft_limit_bytes"),
    Field::Leaf("mem_file_bytes"),
    Field::Leaf("mem_anon_bytes"),
    Field::Leaf("mem_cache_bytes"),
    Field::Leaf("mem_rss_bytes"),
    Field::Leaf("mem_mapped_file_bytes"),
    Field::Leaf("mem_swap_bytes"),
    Field::Leaf("mem_unevictable_bytes"),
    Field::Leaf("mem_low_pressure_counter"),
    Field::Leaf("mem_medium_pressure_counter"),
    Field::Leaf("mem_critical_pressure_counter"),
    // Disk
    Field::Leaf("disk_limit_bytes"),
    Field::Leaf("disk_used_bytes"),
    Field::Excluded("disk_statistics"),
    Field::Excluded("blkio_statistics"),
    // Perf
    Field::Nested("perf", PERF_STATISTICS),
    // Network
    Field::Leaf("net_rx_packets"),
    Field::Leaf("net_rx_bytes"),
    Field::Leaf("net_rx_errors"),
    Field::Leaf("net_rx_dropped"),
    Field::Leaf("net_tx_packets"),
    Field::Leaf("net_tx_bytes"),
    Field::Leaf("net_tx_errors"),
    Field::Leaf("net_tx_dropped"),
    Field::Leaf("net_tcp_rtt_microsecs_p50"),
    Field::Leaf("net_tcp_rtt_microsecs_p90"),
    Field::Leaf("net_tcp_rtt_microsecs_p95"),
    Field::Leaf("net_tcp_rtt_microsecs_p99"),
    Field::Leaf("net_tcp_active_connections"),
    Field::Leaf("net_tcp_time_wait_connections"),
    Field::Excluded("net_traffic_control_statistics"),
    Field::Nested("net_snmp_statistics", SNMP_STATISTICS),
];

/// `PerfStatistics`; replaced by the configured events when perf is enabled
pub const PERF_STATISTICS: &[Field] = &[
    Field::Leaf("timestamp"),
    Field::Leaf("duration"),
    Field::Leaf("cycles"),
    Field::Leaf("stalled_cycles_frontend"),
    Field::Leaf("stalled_cycles_backend"),
    Field::Leaf("instructions"),
    Field::Leaf("cache_references"),
    Field::Leaf("cache_misses"),
    Field::Leaf("branches"),
    Field::Leaf("branch_misses"),
    Field::Leaf("bus_cycles"),
    Field::Leaf("ref_cycles"),
    Field::Leaf("cpu_clock"),
    Field::Leaf("task_clock"),
    Field::Leaf("page_faults"),
    Field::Leaf("minor_faults"),
    Field::Leaf("major_faults"),
    Field::Leaf("context_switches"),
    Field::Leaf("cpu_migrations"),
    Field::Leaf("alignment_faults"),
    Field::Leaf("emulation_faults"),
    Field::Leaf("l1_dcache_loads"),
    Field::Leaf("l1_dcache_load_misses"),
    Field::Leaf("l1_dcache_stores"),
    Field::Leaf("l1_dcache_store_misses"),
    Field::Leaf("l1_dcache_prefetches"),
    Field::Leaf("l1_dcache_prefetch_misses"),
    Field::Leaf("l1_icache_loads"),
    Field::Leaf("l1_icache_load_misses"),
    Field::Leaf("l1_icache_prefetches"),
    Field::Leaf("l1_icache_prefetch_misses"),
    Field::Leaf("llc_loads"),
    Field::Leaf("llc_load_misses"),
    Field::Leaf("llc_stores"),
    Field::Leaf("llc_store_misses"),
    Field::Leaf("llc_prefetches"),
    Field::Leaf("llc_prefetch_misses"),
    Field::Leaf("dtlb_loads"),
    Field::Leaf("dtlb_load_misses"),
    Field::Leaf("dtlb_stores"),
    Field::Leaf("dtlb_store_misses"),
    Field::Leaf("dtlb_prefetches"),
    Field::Leaf("dtlb_prefetch_misses"),
    Field::Leaf("itlb_loads"),
    Field::Leaf("itlb_load_misses"),
    Field::Leaf("branch_loads"),
    Field::Leaf("branch_load_misses"),
    Field::Leaf("node_loads"),
    Field::Leaf("node_load_misses"),
    Field::Leaf("node_stores"),
    Field::Leaf("node_store_misses"),
    Field::Leaf("node_prefetches"),
    Field::Leaf("node_prefetch_misses"),
];

/// `SNMPStatistics`
pub const SNMP_STATISTICS: &[Field] = &[
    Field::Nested("ip_stats", IP_STATISTICS),
    Field::Nested("icmp_stats", ICMP_STATISTICS),
    Field::Nested("tcp_stats", TCP_STATISTICS),
    Field::Nested("udp_stats", UDP_STATISTICS),
];

pub const IP_STATISTICS: &[Field] = &[
    Field::Leaf("Forwarding"),
    Field::Leaf("DefaultTTL"),
    Field::Leaf("InReceives"),
    Field::Leaf("InHdrErrors"),
    Field::Leaf("InAddrErrors"),
    Field::Leaf("ForwDatagrams"),
    Field::Leaf("InUnknownProtos"),
    Field::Leaf("InDiscards"),
    Field::Leaf("InDelivers"),
    Field::Leaf("OutRequests"),
    Field::Leaf("OutDiscards"),
    Field::Leaf("OutNoRoutes"),
    Field::Leaf("ReasmTimeout"),
    Field::Leaf("ReasmReqds"),
    Field::Leaf("ReasmOKs"),
    Field::Leaf("ReasmFails"),
    Field::Leaf("FragOKs"),
    Field::Leaf("FragFails"),
    Field::Leaf("FragCreates"),
];

pub const ICMP_STATISTICS: &[Field] = &[
    Field::Leaf("InMsgs"),
    Field::Leaf("InErrors"),
    Field::Leaf("InCsumErrors"),
    Field::Leaf("InDestUnreachs"),
    Field::Leaf("InTimeExcds"),
    Field::Leaf("InParmProbs"),
    Field::Leaf("InSrcQuenchs"),
    Field::Leaf("InRedirects"),
    Field::Leaf("InEchos"),
    Field::Leaf("InEchoReps"),
    Field::Leaf("InTimestamps"),
    Field::Leaf("InTimestampReps"),
    Field::Leaf("InAddrMasks"),
    Field::Leaf("InAddrMaskReps"),
    Field::Leaf("OutMsgs"),
    Field::Leaf("OutErrors"),
    Field::Leaf("OutDestUnreachs"),
    Field::Leaf("OutTimeExcds"),
    Field::Leaf("OutParmProbs"),
    Field::Leaf("OutSrcQuenchs"),
    Field::Leaf("OutRedirects"),
    Field::Leaf("OutEchos"),
    Field::Leaf("OutEchoReps"),
    Field::Leaf("OutTimestamps"),
    Field::Leaf("OutTimestampReps"),
    Field::Leaf("OutAddrMasks"),
    Field::Leaf("OutAddrMaskReps"),
];

pub const TCP_STATISTICS: &[Field] = &[
    Field::Leaf("RtoAlgorithm"),
    Field::Leaf("RtoMin"),
    Field::Leaf("RtoMax"),
    Field::Leaf("MaxConn"),
    Field::Leaf("ActiveOpens"),
    Field::Leaf("PassiveOpens"),
    Field::Leaf("AttemptFails"),
    Field::Leaf("EstabResets"),
    Field::Leaf("CurrEstab"),
    Field::Leaf("InSegs"),
    Field::Leaf("OutSegs"),
    Field::Leaf("RetransSegs"),
    Field::Leaf("InErrs"),
    Field::Leaf("OutRsts"),
    Field::Leaf("InCsumErrors"),
];

pub const UDP_STATISTICS: &[Field] = &[
    Field::Leaf("InDatagrams"),
    Field::Leaf("NoPorts"),
    Field::Leaf("InErrors"),
    Field::Leaf("OutDatagrams"),
    Field::Leaf("RcvbufErrors"),
    Field::Leaf("SndbufErrors"),
    Field::Leaf("InCsumErrors"),
    Field::Leaf("IgnoredMulti"),
];

/// One framework entry of `/master/frameworks`
pub const FRAMEWORK: &[Field] = &[
    Field::Excluded("id"),
    Field::Excluded("name"),
    Field::Excluded("pid"),
    Field::Excluded("hostname"),
    Field::Excluded("user"),
    Field::Excluded("role"),
    Field::Excluded("active"),
    Field::Excluded("webui_url"),
    Field::Excluded("capabilities"),
    Field::Leaf("failover_timeout"),
    Field::Leaf("registered_time"),
    Field::Leaf("reregistered_time"),
    Field::Leaf("unregistered_time"),
    Field::Nested("offered_resources", FRAMEWORK_RESOURCES),
    Field::Nested("resources", FRAMEWORK_RESOURCES),
    Field::Nested("used_resources", FRAMEWORK_RESOURCES),
    Field::Excluded("tasks"),
    Field::Excluded("unreachable_tasks"),
    Field::Excluded("completed_tasks"),
    Field::Excluded("offers"),
    Field::Excluded("executors"),
];

/// Scalar resources of a framework; `ports` is a range string and excluded
pub const FRAMEWORK_RESOURCES: &[Field] = &[
    Field::Leaf("cpus"),
    Field::Leaf("gpus"),
    Field::Leaf("mem"),
    Field::Leaf("disk"),
    Field::Excluded("ports"),
];
