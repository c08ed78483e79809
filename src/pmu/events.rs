#![allow(missing_docs)]

use crate::pmu::abbrev::abbreviate;
use crate::{Error, Result};
use derive_more::{Deref, DerefMut, From, IntoIterator};
use log::debug;
use pest::Parser;
use pest_derive::*;

/// Grammar for the two dialects of lines in x86 event files.
#[derive(Parser)]
#[grammar = "pmu/event_line.pest"]
struct EventLineParser;

/// A line of an x86 event file split into its dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLine<'a> {
    /// A single token such as `cpu-cycles` or `power/energy-pkg/`.
    Bare(&'a str),
    /// A perf event record `unit/param=val,...,name='NAME'/`.
    Record {
        /// PMU unit the event is programmed on.
        unit: &'a str,
        /// Text quoted by the `name=` field.
        name: &'a str,
    },
}

impl<'a> EventLine<'a> {
    /// Tokenize `line`, which must not carry the trailing group separator.
    pub fn parse(line: &'a str) -> Result<Self> {
        let mut unit = "";
        let mut name = "";
        for pair in EventLineParser::parse(Rule::event_line, line)?.flatten() {
            match pair.as_rule() {
                Rule::bare => return Ok(EventLine::Bare(pair.as_str())),
                Rule::unit => unit = pair.as_str(),
                Rule::quoted => name = pair.as_str(),
                _ => {}
            }
        }
        Ok(EventLine::Record { unit, name })
    }
}

/// A single event as it is passed to the sampling tool.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    /// Token used verbatim on the sampling command line.
    pub raw: String,
    /// Identifier used for matching, reporting and abbreviation.
    pub name: String,
    /// PMU unit: `cpu`, an uncore device type, or empty.
    pub device: String,
    /// Free text description, only known for ARM events.
    pub description: String,
}

impl EventDefinition {
    /// Create an `EventDefinition` from a line of an x86 event file.
    ///
    /// A line that fits neither dialect is a `Format` error.
    ///
    /// A bare token names itself and has no device. A record takes its name from the quoted
    /// `name=` field and its device from the unit before the first `/`.
    pub fn from_line(line: &str) -> Result<Self> {
        let parsed = EventLine::parse(line).map_err(|e| {
            debug!("Malformed event line -- {}: {}", line, e);
            Error::format("event line", line)
        })?;
        let (name, device) = match parsed {
            EventLine::Bare(token) => (token, ""),
            EventLine::Record { unit, name } => (name, unit),
        };
        Ok(EventDefinition {
            raw: String::from(line),
            name: String::from(name),
            device: String::from(device),
            description: String::default(),
        })
    }

    /// Apply the abbreviation table to both the name and the raw token.
    pub fn abbreviated(mut self) -> Self {
        self.name = abbreviate(&self.name);
        self.raw = abbreviate(&self.raw);
        self
    }

    /// Name without any `:` modifier, e.g. `cpu-cycles:k` gives `cpu-cycles`.
    pub fn base_name(&self) -> &str {
        self.name.split(':').next().unwrap_or("")
    }
}

/// Events that must be counted simultaneously.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deref, DerefMut, From, IntoIterator)]
#[into_iterator(owned, ref)]
pub struct GroupDefinition(Vec<EventDefinition>);

impl GroupDefinition {
    /// Device type of the group, taken from its first event.
    pub fn device(&self) -> Option<&str> {
        self.0.first().map(|e| e.device.as_str())
    }
}

impl std::iter::FromIterator<EventDefinition> for GroupDefinition {
    fn from_iter<I: IntoIterator<Item = EventDefinition>>(iter: I) -> Self {
        GroupDefinition(iter.into_iter().collect())
    }
}
