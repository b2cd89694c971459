//! Prometheus text exposition (format 0.0.4).

use std::fmt::Write;

use super::metrics::{FamilySamples, LabelSet, RegistrySnapshot};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn join_labels(labels: &LabelSet) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// `{a="1"}`, or nothing for an empty label set.
fn braced(labels: &str) -> String {
    if labels.is_empty() {
        String::new()
    } else {
        format!("{{{labels}}}")
    }
}

/// Render a snapshot. Families with no children are omitted, so a registry
/// that has seen no calls renders as an empty body.
pub fn render(snapshot: &RegistrySnapshot) -> String {
    let mut out = String::with_capacity(2048);

    for family in &snapshot.families {
        let name = &family.name;
        match &family.samples {
            FamilySamples::Counter(series) => {
                if series.is_empty() {
                    continue;
                }
                write_header(&mut out, name, &family.help, "counter");
                for (labels, value) in series {
                    let _ = writeln!(out, "{}{} {}", name, braced(&join_labels(labels)), value);
                }
            }
            FamilySamples::Histogram { bounds, series } => {
                if series.is_empty() {
                    continue;
                }
                write_header(&mut out, name, &family.help, "histogram");
                for (labels, sample) in series {
                    let label_str = join_labels(labels);
                    let prefix = if label_str.is_empty() {
                        String::new()
                    } else {
                        format!("{label_str},")
                    };

                    for (le, count) in bounds.iter().zip(&sample.cumulative) {
                        let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {count}");
                    }
                    let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {}", sample.count);

                    let series_labels = braced(&label_str);
                    let _ = writeln!(out, "{name}_sum{series_labels} {}", sample.sum);
                    let _ = writeln!(out, "{name}_count{series_labels} {}", sample.count);
                }
            }
        }
    }
    out
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    if !help.is_empty() {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    }
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}
