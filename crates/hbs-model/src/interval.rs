//! Integer range sets.
//!
//! An [`IntervalSet`] is parsed from a metadata value and normalized into a
//! sorted list of disjoint half-open intervals `[start, end)`. The accepted
//! specifications are:
//!
//! | Form | Meaning |
//! |---|---|
//! | `42` | `[42, 43)` |
//! | `"10-19"` | `[10, 20)`, both ends inclusive in the text |
//! | `"10-"` / `"-19"` | open on one side, filled from the defaults |
//! | `"1-5, 8"` | comma separated union |
//! | `{start: 10, end: 20}` | `[10, 20)`, either key may be omitted |
//! | `[a, b, ...]` | union of the elements |
//! | `{not: spec}` | subtracted from the rest of the set |
//! | `{code: spec, year: spec}` | keyword tagged; only requested keywords count |
//!
//! Open sides take `default_start` / `default_end` from [`IntervalOptions`],
//! which lets "until now" ranges stay valid when new survey years appear.

use std::fmt;

use serde_yaml::{Mapping, Value};

use crate::error::IntervalError;
use crate::scalar::value_to_i64;

const START_KEY: &str = "start";
const END_KEY: &str = "end";
const NOT_KEY: &str = "not";

/// A half-open integer interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.start <= value && value < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start != i64::MIN && self.end != i64::MAX && self.end - 1 == self.start {
            return write!(f, "{}", self.start);
        }
        if self.start == i64::MIN && self.end == i64::MAX {
            return f.write_str("all");
        }
        if self.start != i64::MIN {
            write!(f, "{}", self.start)?;
        }
        f.write_str("-")?;
        if self.end != i64::MAX {
            write!(f, "{}", self.end - 1)?;
        }
        Ok(())
    }
}

/// Parsing options for [`IntervalSet::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalOptions {
    /// Fills an open lower side. `None` leaves it unbounded.
    pub default_start: Option<i64>,
    /// Fills an open upper side (exclusive). `None` leaves it unbounded.
    pub default_end: Option<i64>,
    /// Keywords whose tagged entries contribute to the set.
    pub keywords: Vec<String>,
}

impl IntervalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, default_start: i64, default_end: i64) -> Self {
        self.default_start = Some(default_start);
        self.default_end = Some(default_end);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    fn lower(&self) -> i64 {
        self.default_start.unwrap_or(i64::MIN)
    }

    fn upper(&self) -> i64 {
        self.default_end.unwrap_or(i64::MAX)
    }

    fn accepts(&self, key: &str) -> bool {
        self.keywords.iter().any(|keyword| keyword == key)
    }
}

/// A normalized set of disjoint, sorted half-open intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

#[derive(Default)]
struct Collected {
    included: Vec<Interval>,
    excluded: Vec<Interval>,
}

impl Collected {
    fn push(&mut self, interval: Interval, negated: bool) {
        if negated {
            self.excluded.push(interval);
        } else {
            self.included.push(interval);
        }
    }
}

impl IntervalSet {
    /// An empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The set `[start, end)`.
    pub fn from_range(start: i64, end: i64) -> Self {
        Self::from_intervals([Interval::new(start, end)])
    }

    /// Builds a set from arbitrary, possibly overlapping intervals.
    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval>) -> Self {
        Self {
            intervals: normalize(intervals.into_iter().collect()),
        }
    }

    /// Parses a metadata value into a set.
    pub fn parse(value: &Value, options: &IntervalOptions) -> Result<Self, IntervalError> {
        let mut collected = Collected::default();
        collect(value, options, false, &mut collected)?;
        let included = normalize(collected.included);
        let excluded = normalize(collected.excluded);
        Ok(Self {
            intervals: subtract(&included, &excluded),
        })
    }

    /// Membership test by binary search over the normalized intervals.
    pub fn contains(&self, value: i64) -> bool {
        let idx = self.intervals.partition_point(|iv| iv.end <= value);
        self.intervals
            .get(idx)
            .is_some_and(|interval| interval.start <= value)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::from_intervals(self.intervals.iter().chain(other.intervals.iter()).copied())
    }

    pub fn difference(&self, other: &Self) -> Self {
        Self {
            intervals: subtract(&self.intervals, &other.intervals),
        }
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return f.write_str("none");
        }
        for (idx, interval) in self.intervals.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{interval}")?;
        }
        Ok(())
    }
}

fn collect(
    value: &Value,
    options: &IntervalOptions,
    negated: bool,
    out: &mut Collected,
) -> Result<(), IntervalError> {
    match value {
        Value::Null => Ok(()),
        Value::Number(_) => {
            let point = value_to_i64(value).ok_or_else(|| IntervalError::Unsupported {
                message: format!("non-integer bound {value:?}"),
            })?;
            out.push(Interval::new(point, inclusive_end(point)?), negated);
            Ok(())
        }
        Value::String(text) => {
            for interval in parse_range_text(text, options)? {
                out.push(interval, negated);
            }
            Ok(())
        }
        Value::Sequence(items) => {
            for item in items {
                collect(item, options, negated, out)?;
            }
            Ok(())
        }
        Value::Mapping(map) => collect_mapping(map, options, negated, out),
        Value::Tagged(tagged) => collect(&tagged.value, options, negated, out),
        Value::Bool(_) => Err(IntervalError::Unsupported {
            message: "boolean is not a range".to_string(),
        }),
    }
}

fn collect_mapping(
    map: &Mapping,
    options: &IntervalOptions,
    negated: bool,
    out: &mut Collected,
) -> Result<(), IntervalError> {
    let has_bounds = map.contains_key(START_KEY) || map.contains_key(END_KEY);
    if has_bounds {
        let start = bound(map.get(START_KEY))?.unwrap_or_else(|| options.lower());
        let end = bound(map.get(END_KEY))?.unwrap_or_else(|| options.upper());
        if start > end {
            return Err(IntervalError::InvertedBounds { start, end });
        }
        out.push(Interval::new(start, end), negated);
    }

    for (key, value) in map {
        let Some(key) = key.as_str() else {
            return Err(IntervalError::Unsupported {
                message: format!("non-string key {key:?} in range mapping"),
            });
        };
        match key {
            START_KEY | END_KEY => {}
            NOT_KEY => collect(value, options, !negated, out)?,
            keyword if options.accepts(keyword) => collect(value, options, negated, out)?,
            other if options.keywords.is_empty() => {
                return Err(IntervalError::Unsupported {
                    message: format!("unexpected key '{other}' in range mapping"),
                });
            }
            // Tagged for a role the caller did not ask for.
            _ => {}
        }
    }
    Ok(())
}

fn bound(value: Option<&Value>) -> Result<Option<i64>, IntervalError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value_to_i64(value)
            .map(Some)
            .ok_or_else(|| IntervalError::Unsupported {
                message: format!("non-integer bound {value:?}"),
            }),
    }
}

fn inclusive_end(value: i64) -> Result<i64, IntervalError> {
    value
        .checked_add(1)
        .ok_or(IntervalError::Overflow { value })
}

fn parse_range_text(text: &str, options: &IntervalOptions) -> Result<Vec<Interval>, IntervalError> {
    let invalid = || IntervalError::InvalidRange {
        text: text.to_string(),
    };
    let mut intervals = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let interval = match part.split_once('-') {
            None => {
                let point = part.parse::<i64>().map_err(|_| invalid())?;
                Interval::new(point, inclusive_end(point)?)
            }
            Some((start, end)) => {
                let (start, end) = (start.trim(), end.trim());
                let start = if start.is_empty() {
                    options.lower()
                } else {
                    start.parse::<i64>().map_err(|_| invalid())?
                };
                let end = if end.is_empty() {
                    options.upper()
                } else {
                    inclusive_end(end.parse::<i64>().map_err(|_| invalid())?)?
                };
                if start > end {
                    return Err(IntervalError::InvertedBounds { start, end });
                }
                Interval::new(start, end)
            }
        };
        intervals.push(interval);
    }
    Ok(intervals)
}

/// Sorts, drops empty intervals and merges overlapping or adjacent ones.
fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|interval| !interval.is_empty());
    intervals.sort();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Removes every `excluded` interval from `included`; both must be normalized.
fn subtract(included: &[Interval], excluded: &[Interval]) -> Vec<Interval> {
    let mut result = Vec::with_capacity(included.len());
    for interval in included {
        let mut start = interval.start;
        for cut in excluded {
            if cut.end <= start {
                continue;
            }
            if cut.start >= interval.end {
                break;
            }
            if cut.start > start {
                result.push(Interval::new(start, cut.start));
            }
            start = start.max(cut.end);
            if start >= interval.end {
                break;
            }
        }
        if start < interval.end {
            result.push(Interval::new(start, interval.end));
        }
    }
    result
}
