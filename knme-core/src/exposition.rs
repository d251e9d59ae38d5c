//! Exposition-format text parsing
//!
//! Extracts sample values from the line-oriented Prometheus text format
//! served by kubelet and cAdvisor, and sums the two metric families the
//! exporter aggregates per node.

use std::io::{self, BufRead};

/// Metric family summed into `k8s_node_cpu_usage_cores`.
pub const CPU_USAGE_FAMILY: &str = "container_cpu_usage_seconds_total";

/// Metric family summed into `k8s_node_memory_usage_bytes`.
pub const MEMORY_WORKING_SET_FAMILY: &str = "container_memory_working_set_bytes";

/// Per-node sums accumulated from one metrics fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    /// Sum of all CPU family samples (cumulative cores-seconds)
    pub cpu_cores: f64,
    /// Sum of all memory family samples (bytes)
    pub memory_bytes: f64,
}

/// Parse the sample value from an exposition-format line.
///
/// The value is the token after the last space character. Lines without a
/// space, and values that do not parse as a float, yield `0` rather than
/// an error. Scientific notation is accepted (`1.5e2` parses to `150`).
pub fn sample_value(line: &str) -> f64 {
    match line.rsplit_once(' ') {
        Some((_, token)) => token.trim().parse().unwrap_or(0.0),
        None => 0.0,
    }
}

/// Return the sample value if `line` belongs to the metric family `family`.
///
/// Comment lines (leading `#`) never match. The comparison is a name
/// prefix check, so a bare `container_cpu_usage_seconds_total` family
/// matches both the unlabeled line and `..._total{id="/"}` variants.
pub fn family_value(line: &str, family: &str) -> Option<f64> {
    if line.starts_with('#') || !line.starts_with(family) {
        return None;
    }
    Some(sample_value(line))
}

/// Sum the samples of two metric families over a metrics stream.
///
/// Each line is credited to at most one family, CPU checked first. An
/// empty stream yields zero totals. Only a read error from the underlying
/// stream is propagated; malformed values degrade to `0` per line.
pub fn aggregate_usage<R: BufRead>(
    reader: R,
    cpu_family: &str,
    memory_family: &str,
) -> io::Result<UsageTotals> {
    let mut totals = UsageTotals::default();

    for line in reader.lines() {
        let line = line?;
        if let Some(value) = family_value(&line, cpu_family) {
            totals.cpu_cores += value;
        } else if let Some(value) = family_value(&line, memory_family) {
            totals.memory_bytes += value;
        }
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    #[test]
    fn test_sample_value() {
        let cases = [
            ("container_cpu_usage_seconds_total{id=\"/\"} 123.45", 123.45),
            (
                "container_memory_working_set_bytes{id=\"/\"} 1073741824",
                1073741824.0,
            ),
            ("metric_name 0", 0.0),
            ("metric_name 1.5e2", 150.0),
            ("no_value", 0.0),
            ("", 0.0),
            ("metric_name not_a_number", 0.0),
            ("metric_name ", 0.0),
        ];
        for (line, want) in cases {
            assert_eq!(sample_value(line), want, "line: {:?}", line);
        }
    }

    #[test]
    fn test_family_value_prefix_match() {
        assert_eq!(
            family_value(
                "container_cpu_usage_seconds_total{id=\"/\"} 1.5",
                CPU_USAGE_FAMILY
            ),
            Some(1.5)
        );
        // Exact name without a label block still matches via the prefix.
        assert_eq!(
            family_value("container_cpu_usage_seconds_total 2", CPU_USAGE_FAMILY),
            Some(2.0)
        );
        assert_eq!(
            family_value("node_cpu_seconds_total 3.0", CPU_USAGE_FAMILY),
            None
        );
    }

    #[test]
    fn test_family_value_skips_comments() {
        assert_eq!(
            family_value(
                "# TYPE container_cpu_usage_seconds_total counter",
                CPU_USAGE_FAMILY
            ),
            None
        );
        assert_eq!(
            family_value("#container_cpu_usage_seconds_total 1", "#container"),
            None
        );
    }

    #[test]
    fn test_aggregate_usage() {
        let body = "\
# HELP container_cpu_usage_seconds_total CPU usage
# TYPE container_cpu_usage_seconds_total counter
container_cpu_usage_seconds_total{id=\"/\"} 1.5
container_cpu_usage_seconds_total{id=\"/system\"} 0.2
container_memory_working_set_bytes{id=\"/\"} 536870912
container_memory_working_set_bytes{id=\"/system\"} 268435456
";
        let totals =
            aggregate_usage(body.as_bytes(), CPU_USAGE_FAMILY, MEMORY_WORKING_SET_FAMILY).unwrap();
        assert_eq!(totals.cpu_cores, 1.7);
        assert_eq!(totals.memory_bytes, 805306368.0);
    }

    #[test]
    fn test_aggregate_usage_empty_stream() {
        let totals =
            aggregate_usage("".as_bytes(), CPU_USAGE_FAMILY, MEMORY_WORKING_SET_FAMILY).unwrap();
        assert_eq!(totals, UsageTotals::default());
    }

    #[test]
    fn test_aggregate_usage_first_match_wins() {
        // Overlapping prefixes: "metric" would also match "metric_a" lines.
        let body = "metric_a 5\nmetric_b 3\n";
        let totals = aggregate_usage(body.as_bytes(), "metric_a", "metric").unwrap();
        assert_eq!(totals.cpu_cores, 5.0);
        assert_eq!(totals.memory_bytes, 3.0);
    }

    #[test]
    fn test_aggregate_usage_malformed_values_degrade_to_zero() {
        let body = "\
container_cpu_usage_seconds_total{id=\"/\"} oops
container_cpu_usage_seconds_total{id=\"/a\"} 0.5
container_memory_working_set_bytes{id=\"/\"}
";
        let totals =
            aggregate_usage(body.as_bytes(), CPU_USAGE_FAMILY, MEMORY_WORKING_SET_FAMILY).unwrap();
        assert_eq!(totals.cpu_cores, 0.5);
        assert_eq!(totals.memory_bytes, 0.0);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "connection reset"))
        }
    }

    #[test]
    fn test_aggregate_usage_propagates_read_errors() {
        let reader = BufReader::new(FailingReader);
        let result = aggregate_usage(reader, CPU_USAGE_FAMILY, MEMORY_WORKING_SET_FAMILY);
        assert!(result.is_err());
    }
}
