use derive_more::Display;
use fxhash::FxHashMap;
use internment::Intern;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use event::{LogEvent, LogRecord};
pub use message::{
    empty_message, Message, Parameter, ParameterizedMessage, PortableMessage, SimpleMessage,
    TimestampedMessage, TimestampedSimpleMessage,
};
pub use throwable::{Throwable, ThrowableCause, ThrowableProxy};

pub mod event;
pub mod message;
pub mod throwable;

/// Milliseconds since the unix epoch
pub type TimeMillis = i64;

/// Snapshot of the per-thread diagnostic map
pub type ContextMap = FxHashMap<String, String>;

/// Snapshot of the per-thread diagnostic stack, oldest entry first
pub type ContextStack = Vec<String>;

#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Debug,
    Default,
    Display,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(i32)]
pub enum Level {
    #[default]
    #[display("OFF")]
    Off = 0,
    #[display("FATAL")]
    Fatal = 100,
    #[display("ERROR")]
    Error = 200,
    #[display("WARN")]
    Warn = 300,
    #[display("INFO")]
    Info = 400,
    #[display("DEBUG")]
    Debug = 500,
    #[display("TRACE")]
    Trace = 600,
    #[display("ALL")]
    All = i32::MAX,
}

impl Level {
    pub fn int_level(self) -> i32 {
        self.into()
    }

    /// True if this level is at least as severe as `other`.
    pub fn is_more_specific_than(self, other: Level) -> bool {
        self.int_level() <= other.int_level()
    }

    /// True if this level is at most as severe as `other`.
    pub fn is_less_specific_than(self, other: Level) -> bool {
        self.int_level() >= other.int_level()
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
struct MarkerData {
    name: String,
    parents: Vec<Marker>,
}

/// Interned marker handle.
///
/// Markers with the same name and parents are the same handle.
/// Encoded as a flat list of the marker and its ancestors.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "MarkerGraph", try_from = "MarkerGraph")]
pub struct Marker(Intern<MarkerData>);

impl Marker {
    /// Longest ancestry accepted when decoding a marker
    pub const MAX_DEPTH: usize = 64;

    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_parents(name, Vec::new())
    }

    pub fn with_parents<S: Into<String>>(name: S, parents: Vec<Marker>) -> Self {
        Marker(Intern::new(MarkerData {
            name: name.into(),
            parents,
        }))
    }

    pub fn name(&self) -> &str {
        self.0.name.as_str()
    }

    pub fn parents(&self) -> &[Marker] {
        &self.0.parents
    }

    /// True if this marker, or any of its ancestors, is named `name`.
    pub fn is_instance_of(&self, name: &str) -> bool {
        self.name() == name || self.parents().iter().any(|p| p.is_instance_of(name))
    }
}

/// A marker and its ancestors, each node listed after all of its parents.
/// The last node is the marker itself.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
struct MarkerGraph {
    nodes: Vec<MarkerNode>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
struct MarkerNode {
    name: String,
    /// Indices of earlier nodes
    parents: Vec<u32>,
}

impl From<Marker> for MarkerGraph {
    fn from(marker: Marker) -> Self {
        let mut index: FxHashMap<Marker, u32> = FxHashMap::default();
        let mut nodes = Vec::new();
        let mut stack = vec![(marker, false)];
        while let Some((m, parents_done)) = stack.pop() {
            if index.contains_key(&m) {
                continue;
            }
            if parents_done {
                let parents = m
                    .parents()
                    .iter()
                    .filter_map(|p| index.get(p).copied())
                    .collect();
                index.insert(m, nodes.len() as u32);
                nodes.push(MarkerNode {
                    name: m.name().to_owned(),
                    parents,
                });
            } else {
                stack.push((m, true));
                stack.extend(
                    m.parents()
                        .iter()
                        .filter(|p| !index.contains_key(*p))
                        .map(|p| (*p, false)),
                );
            }
        }
        MarkerGraph { nodes }
    }
}

impl TryFrom<MarkerGraph> for Marker {
    type Error = String;

    fn try_from(graph: MarkerGraph) -> Result<Self, Self::Error> {
        let mut built: Vec<(Marker, usize)> = Vec::with_capacity(graph.nodes.len());
        for (idx, node) in graph.nodes.into_iter().enumerate() {
            let mut parents = Vec::with_capacity(node.parents.len());
            let mut depth = 1;
            for p in node.parents {
                let (parent, parent_depth) = built
                    .get(p as usize)
                    .copied()
                    .ok_or_else(|| format!("marker node {idx} refers to later node {p}"))?;
                parents.push(parent);
                depth = depth.max(parent_depth + 1);
            }
            if depth > Marker::MAX_DEPTH {
                return Err(format!(
                    "marker ancestry depth {depth} exceeds {}",
                    Marker::MAX_DEPTH
                ));
            }
            built.push((Marker::with_parents(node.name, parents), depth));
        }
        built
            .pop()
            .map(|(m, _)| m)
            .ok_or_else(|| "empty marker".to_owned())
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("name", &self.0.name)
            .field("parents", &self.0.parents)
            .finish()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if !self.parents().is_empty() {
            f.write_str("[ ")?;
            for (idx, p) in self.parents().iter().enumerate() {
                if idx != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{p}")?;
            }
            f.write_str(" ]")?;
        }
        Ok(())
    }
}

/// Location of the logging call site.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Location {
    pub module_path: String,
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Location {
    /// Location of the caller of this function.
    #[track_caller]
    pub fn caller<S: Into<String>>(module_path: S) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            module_path: module_path.into(),
            function: None,
            file: Some(loc.file().to_owned()),
            line: Some(loc.line()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.module_path)?;
        if let Some(func) = self.function.as_ref() {
            write!(f, "::{func}")?;
        }
        match (self.file.as_ref(), self.line) {
            (Some(file), Some(line)) => write!(f, "({file}:{line})"),
            (Some(file), None) => write!(f, "({file})"),
            _ => f.write_str("(Unknown Source)"),
        }
    }
}

/// A configured property merged into an event's context map.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Property {
    pub name: String,
    pub value: String,
    /// The value contains a `${...}` lookup to be resolved per event
    pub value_needs_lookup: bool,
}

impl Property {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            value_needs_lookup: value.contains("${"),
            value,
        }
    }
}
