//! Declarative mapping from upstream record fields to Prometheus gauges.

use crate::document::Record;

/// How a gauge value is derived from its source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Copy a JSON number as-is.
    Number,
    /// 1.0 when the field is exactly this string, 0.0 otherwise.
    Matches(&'static str),
}

/// One exported gauge and where its value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// Metric name without the namespace prefix.
    pub name: &'static str,
    /// Help text.
    pub help: &'static str,
    /// Record identifier (bean object name, or top-level member name).
    pub source: &'static str,
    /// Field key, or a one-level nested path such as `HeapMemoryUsage.used`.
    pub field: &'static str,
    /// Value derivation.
    pub extraction: Extraction,
    /// Static labels attached to this gauge only.
    pub labels: &'static [(&'static str, &'static str)],
}

impl MetricSpec {
    /// A numeric gauge whose help text is its name.
    pub const fn gauge(name: &'static str, source: &'static str, field: &'static str) -> Self {
        Self {
            name,
            help: name,
            source,
            field,
            extraction: Extraction::Number,
            labels: &[],
        }
    }

    /// A 0/1 gauge set from an exact string comparison.
    pub const fn flag(
        name: &'static str,
        source: &'static str,
        field: &'static str,
        expected: &'static str,
    ) -> Self {
        Self {
            name,
            help: name,
            source,
            field,
            extraction: Extraction::Matches(expected),
            labels: &[],
        }
    }

    /// Replace the help text.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    /// Attach static labels.
    pub const fn with_labels(mut self, labels: &'static [(&'static str, &'static str)]) -> Self {
        self.labels = labels;
        self
    }

    /// Derive this gauge's value from a record.
    ///
    /// `None` means "leave the gauge untouched": the field is missing or is
    /// not a JSON number. A [`Extraction::Matches`] spec always yields a value
    /// once its record is present.
    pub fn extract(&self, record: &Record) -> Option<f64> {
        match self.extraction {
            Extraction::Number => record.number(self.field),
            Extraction::Matches(expected) => {
                let matched = record.text(self.field) == Some(expected);
                Some(if matched { 1.0 } else { 0.0 })
            }
        }
    }
}

/// Check a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Sanitize a label name to be Prometheus-compatible.
///
/// Prometheus label names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Labels starting with `__` are reserved for internal use.
pub fn sanitize_label_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for (i, c) in name.chars().enumerate() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };

        if valid {
            result.push(c);
            last_was_underscore = c == '_';
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return "label".to_string();
    }

    // Reserved prefix
    if result.starts_with("__") {
        result.insert(0, 'z');
    }

    result
}
