use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::MetricLineError;

/// What an absent metric is written as on disk.
pub const ABSENT: &str = "-1";

/// Unsigned decimal with an optional exponent, as metric values and eps are
/// written.
pub const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?(?:e[+-]?\d+)?";

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(NUMBER_PATTERN).expect("valid number pattern"));

/// A numeric token lifted verbatim out of a log line or filename.
///
/// The text is kept as written (`1.0` stays `1.0`) so values survive the trip
/// into file names and CSV cells unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value(String);

impl Value {
    /// First number (optionally with an exponent) found in `text`.
    pub fn find_in(text: &str) -> Option<Self> {
        NUMBER.find(text).map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metrics recognised in a benchmark log, in the order lines are tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Metric {
    TimeAll,
    TimePopulation,
    TimeClustering,
    TimeUpdate,
    TimeSingleRegion,
    TimeWhileLoop,
    TimeUpdateNewVertices,
    TimeUpdateRepresentatives,
    NumIterations,
    NumOriginalVertices,
    NumSimplifiedVertices,
}

impl Metric {
    /// Substring identifying a line that reports this metric.
    pub fn marker(self) -> &'static str {
        match self {
            Metric::TimeAll => "average time",
            Metric::TimePopulation => "adj list took",
            Metric::TimeClustering => "Clustering took",
            Metric::TimeUpdate => "Update mesh took",
            Metric::TimeSingleRegion => "Single region",
            Metric::TimeWhileLoop => "While loop took",
            Metric::TimeUpdateNewVertices => "Update new vertices took",
            Metric::TimeUpdateRepresentatives => "Update representatives took",
            Metric::NumIterations => "numIterations",
            Metric::NumOriginalVertices => "original vertices",
            Metric::NumSimplifiedVertices => "vertices after",
        }
    }

    /// The first metric whose marker occurs in `line`.
    pub fn classify(line: &str) -> Option<Self> {
        Metric::iter().find(|metric| line.contains(metric.marker()))
    }
}

/// Every metric a single log reported. Unreported metrics stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricRecord {
    pub time_all: Option<Value>,
    pub time_p: Option<Value>,
    pub time_c: Option<Value>,
    pub time_w: Option<Value>,
    pub time_s: Option<Value>,
    pub time_unv: Option<Value>,
    pub time_ur: Option<Value>,
    pub time_u: Option<Value>,
    pub num_iterations: Option<Value>,
    pub num_original_vertices: Option<Value>,
    pub num_simplified_vertices: Option<Value>,
}

impl MetricRecord {
    /// Scans a log body line by line. A later line for the same metric
    /// overwrites an earlier one.
    pub fn scan(body: &str) -> Result<Self, MetricLineError> {
        let mut record = Self::default();
        for (idx, line) in body.lines().enumerate() {
            let Some(metric) = Metric::classify(line) else {
                continue;
            };
            let value = Value::find_in(line).ok_or(MetricLineError {
                line: idx + 1,
                marker: metric.marker(),
            })?;
            *record.slot_mut(metric) = Some(value);
        }
        Ok(record)
    }

    pub fn get(&self, metric: Metric) -> Option<&Value> {
        match metric {
            Metric::TimeAll => self.time_all.as_ref(),
            Metric::TimePopulation => self.time_p.as_ref(),
            Metric::TimeClustering => self.time_c.as_ref(),
            Metric::TimeUpdate => self.time_u.as_ref(),
            Metric::TimeSingleRegion => self.time_s.as_ref(),
            Metric::TimeWhileLoop => self.time_w.as_ref(),
            Metric::TimeUpdateNewVertices => self.time_unv.as_ref(),
            Metric::TimeUpdateRepresentatives => self.time_ur.as_ref(),
            Metric::NumIterations => self.num_iterations.as_ref(),
            Metric::NumOriginalVertices => self.num_original_vertices.as_ref(),
            Metric::NumSimplifiedVertices => self.num_simplified_vertices.as_ref(),
        }
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut Option<Value> {
        match metric {
            Metric::TimeAll => &mut self.time_all,
            Metric::TimePopulation => &mut self.time_p,
            Metric::TimeClustering => &mut self.time_c,
            Metric::TimeUpdate => &mut self.time_u,
            Metric::TimeSingleRegion => &mut self.time_s,
            Metric::TimeWhileLoop => &mut self.time_w,
            Metric::TimeUpdateNewVertices => &mut self.time_unv,
            Metric::TimeUpdateRepresentatives => &mut self.time_ur,
            Metric::NumIterations => &mut self.num_iterations,
            Metric::NumOriginalVertices => &mut self.num_original_vertices,
            Metric::NumSimplifiedVertices => &mut self.num_simplified_vertices,
        }
    }

    /// A log without a population time did not finish a run and carries no
    /// usable data.
    pub fn has_population_time(&self) -> bool {
        self.time_p.is_some()
    }
}

/// Renders an optional metric the way accumulation files store it.
pub fn cell(value: Option<&Value>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}
