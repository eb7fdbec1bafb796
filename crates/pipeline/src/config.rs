//! System configuration types and serialization
//!
//! The on-disk format is a JSON document with `__sim_model_info__`,
//! `__general__` and `__processors__` sections. Processor declarations keep
//! their file order, which also fixes each node's module index.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, PipelineResult};

/// Complete system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(rename = "__sim_model_info__", default)]
    pub sim_model_info: SimModelInfo,
    #[serde(rename = "__general__")]
    pub general: GeneralConfig,
    #[serde(rename = "__processors__", default)]
    pub processors: ProcessorMap,
}

/// Free-form description of the simulated model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimModelInfo {
    #[serde(rename = "__name__", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<serde_json::Value>,
    #[serde(rename = "__date__", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<serde_json::Value>,
    #[serde(rename = "__author__", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<serde_json::Value>,
    #[serde(rename = "__rev__", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<serde_json::Value>,
    #[serde(rename = "__desc__", default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<serde_json::Value>,
    /// Keys not listed above, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Run-wide parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of samples per packet
    #[serde(rename = "__paket_len__", default)]
    pub paket_len: u32,
    /// Number of packets in a run
    #[serde(rename = "__num_of_paket__", default)]
    pub num_of_paket: u32,
    /// Raw byte file backing the vector sources
    #[serde(rename = "__data_file_name__", default)]
    pub data_file_name: String,
}

impl GeneralConfig {
    /// Number of bytes synthesised when the backing data file is missing
    pub fn data_len(&self) -> usize {
        self.paket_len as usize * self.num_of_paket as usize
    }
}

/// Node kinds understood by the graph builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcType {
    SrcVec,
    Adder,
    SinkVec,
    RandVecGen,
    Logger,
}

impl ProcType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcType::SrcVec => "SRC_VEC_PROC",
            ProcType::Adder => "ADDER_PROC",
            ProcType::SinkVec => "SINK_VEC_PROC",
            ProcType::RandVecGen => "RAND_VEC_GEN",
            ProcType::Logger => "LOGGER",
        }
    }
}

impl FromStr for ProcType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SRC_VEC_PROC" => Ok(ProcType::SrcVec),
            "ADDER_PROC" => Ok(ProcType::Adder),
            "SINK_VEC_PROC" => Ok(ProcType::SinkVec),
            "RAND_VEC_GEN" => Ok(ProcType::RandVecGen),
            "LOGGER" => Ok(ProcType::Logger),
            other => Err(PipelineError::InvalidConfiguration {
                message: format!("unknown processor type '{}'", other),
            }),
        }
    }
}

impl fmt::Display for ProcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(rename = "__proc_type__")]
    pub proc_type: String,
    #[serde(rename = "__in_data_type__", default)]
    pub in_data_type: String,
    #[serde(rename = "__out_data_type__", default)]
    pub out_data_type: String,
    #[serde(rename = "__out_vector_size__", default)]
    pub out_vector_size: u32,
    #[serde(rename = "__trig_start__", default)]
    pub trig_start: bool,
    #[serde(rename = "__repeat__", default)]
    pub repeat: bool,
    #[serde(rename = "__vlen__", default = "default_vlen")]
    pub vlen: u32,
    #[serde(rename = "__adjacency_connection_to__", default)]
    pub adjacency: Adjacency,
}

fn default_vlen() -> u32 {
    1
}

impl ProcessorConfig {
    pub fn new(proc_type: ProcType, data_type: &str, out_vector_size: u32) -> Self {
        Self {
            proc_type: proc_type.as_str().to_string(),
            in_data_type: data_type.to_string(),
            out_data_type: data_type.to_string(),
            out_vector_size,
            trig_start: false,
            repeat: false,
            vlen: 1,
            adjacency: Adjacency::default(),
        }
    }

    pub fn with_trig_start(mut self, trig_start: bool) -> Self {
        self.trig_start = trig_start;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_vlen(mut self, vlen: u32) -> Self {
        self.vlen = vlen;
        self
    }

    pub fn connect_to(mut self, target: &str, event: &str, port: &str) -> Self {
        self.adjacency.0.push(Edge::new(target, event, port));
        self
    }

    /// Value kind the node is built for: sinks use the input kind, every
    /// other node the output kind.
    pub fn value_type(&self) -> &str {
        match self.proc_type.parse::<ProcType>() {
            Ok(ProcType::SinkVec) => &self.in_data_type,
            _ => &self.out_data_type,
        }
    }
}

/// A directed connection `(target, event, port)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct Edge {
    pub target: String,
    pub event: String,
    pub port: String,
}

impl Edge {
    pub fn new(target: &str, event: &str, port: &str) -> Self {
        Self {
            target: target.to_string(),
            event: event.to_string(),
            port: port.to_string(),
        }
    }
}

impl From<(String, String, String)> for Edge {
    fn from((target, event, port): (String, String, String)) -> Self {
        Self { target, event, port }
    }
}

impl From<Edge> for (String, String, String) {
    fn from(edge: Edge) -> Self {
        (edge.target, edge.event, edge.port)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{}:{})", self.target, self.event, self.port)
    }
}

/// Ordered adjacency list. Accepts a JSON array of `[target, event, port]`
/// triples or an object whose values are such triples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AdjacencyRepr", into = "Vec<Edge>")]
pub struct Adjacency(pub Vec<Edge>);

#[derive(Deserialize)]
#[serde(untagged)]
enum AdjacencyRepr {
    List(Vec<Edge>),
    Named(serde_json::Map<String, serde_json::Value>),
}

impl TryFrom<AdjacencyRepr> for Adjacency {
    type Error = String;

    fn try_from(repr: AdjacencyRepr) -> Result<Self, Self::Error> {
        match repr {
            AdjacencyRepr::List(edges) => Ok(Adjacency(edges)),
            AdjacencyRepr::Named(map) => map
                .into_iter()
                .map(|(key, value)| {
                    serde_json::from_value::<Edge>(value)
                        .map_err(|e| format!("adjacency entry '{}': {}", key, e))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Adjacency),
        }
    }
}

impl From<Adjacency> for Vec<Edge> {
    fn from(adjacency: Adjacency) -> Self {
        adjacency.0
    }
}

impl Adjacency {
    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Processor declarations in file order. Duplicate names are kept so that
/// `SystemConfig::validate` can report them.
#[derive(Debug, Clone, Default)]
pub struct ProcessorMap(Vec<(String, ProcessorConfig)>);

impl ProcessorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, config: ProcessorConfig) {
        self.0.push((name.to_string(), config));
    }

    pub fn get(&self, name: &str) -> Option<&ProcessorConfig> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ProcessorConfig> {
        self.0.iter_mut().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessorConfig)> {
        self.0.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ProcessorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, config) in &self.0 {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProcessorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProcessorMapVisitor;

        impl<'de> Visitor<'de> for ProcessorMapVisitor {
            type Value = ProcessorMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of processor name to processor declaration")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, config)) = access.next_entry::<String, ProcessorConfig>()? {
                    entries.push((name, config));
                }
                Ok(ProcessorMap(entries))
            }
        }

        deserializer.deserialize_map(ProcessorMapVisitor)
    }
}

impl SystemConfig {
    pub fn new(general: GeneralConfig) -> Self {
        Self {
            sim_model_info: SimModelInfo::default(),
            general,
            processors: ProcessorMap::new(),
        }
    }

    /// Parses a configuration document.
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let config: SystemConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from an already-parsed JSON tree.
    pub fn from_value(value: serde_json::Value) -> PipelineResult<Self> {
        let config: SystemConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks for duplicate names and for missing or zero sizes.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.general.paket_len == 0 {
            return Err(PipelineError::InvalidConfiguration {
                message: "__paket_len__ must be greater than zero".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (name, proc) in self.processors.iter() {
            if !seen.insert(name) {
                return Err(PipelineError::DuplicateNode {
                    name: name.to_string(),
                });
            }

            let proc_type = match proc.proc_type.parse::<ProcType>() {
                Ok(proc_type) => proc_type,
                // reported and skipped by the builder
                Err(_) => continue,
            };

            match proc_type {
                ProcType::Logger => {}
                _ => {
                    if proc.value_type().is_empty() {
                        return Err(PipelineError::InvalidConfiguration {
                            message: format!("processor '{}' has no data type", name),
                        });
                    }
                    if proc_type != ProcType::SinkVec && proc.out_vector_size == 0 {
                        return Err(PipelineError::InvalidConfiguration {
                            message: format!("processor '{}' has a zero __out_vector_size__", name),
                        });
                    }
                    if proc.vlen == 0 {
                        return Err(PipelineError::InvalidConfiguration {
                            message: format!("processor '{}' has a zero __vlen__", name),
                        });
                    }
                }
            }

            if proc_type == ProcType::SrcVec && self.general.data_file_name.is_empty() {
                return Err(PipelineError::InvalidConfiguration {
                    message: format!(
                        "processor '{}' needs __general__.__data_file_name__",
                        name
                    ),
                });
            }

            for edge in proc.adjacency.iter() {
                if edge.target.is_empty() {
                    return Err(PipelineError::InvalidConfiguration {
                        message: format!("processor '{}' has an edge with no target", name),
                    });
                }
            }
        }

        Ok(())
    }
}
