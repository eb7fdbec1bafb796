//! Pipeline graph construction, wiring and execution.

use crate::config::{Edge, ProcType, SystemConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::event_log::TagSink;
use crate::factory::{NodeFactoryRegistry, NodeSpec};
use crate::node::{Node, NodeHandle};
use crate::registry::{NodeKind, NodeRegistry, NodeVisitor};
use flow_types::SharedContext;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name that always refers to the event logger.
pub const LOGGER_NAME: &str = "logger";

/// One wired connection, as recorded by the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub from: String,
    pub event: String,
    pub to: String,
    pub port: String,
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}.{}", self.from, self.event, self.to, self.port)
    }
}

/// Input operation an edge drives on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Process,
    FirstInput,
    Start,
}

impl Hook {
    fn for_edge(edge: &Edge) -> Option<Self> {
        match (edge.event.as_str(), edge.port.as_str()) {
            ("NewData", "Proc") => Some(Hook::Process),
            ("NewData", "In1") => Some(Hook::FirstInput),
            ("SetIn1", "Strt") => Some(Hook::Start),
            _ => None,
        }
    }
}

/// Reads the backing data file, or synthesises `len` random bits and
/// persists them when the file does not exist.
pub fn load_or_generate_data(path: impl AsRef<Path>, len: usize) -> PipelineResult<Vec<u8>> {
    let path = path.as_ref();
    if path.exists() {
        let data = fs::read(path)?;
        info!(path = ?path, len = data.len(), "Loaded source data");
        return Ok(data);
    }

    let mut rng = rand::thread_rng();
    let data: Vec<u8> = (0..len).map(|_| rng.gen_range(0..=1)).collect();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, &data)?;
    info!(path = ?path, len, "Generated source data");
    Ok(data)
}

/// A built pipeline: every declared node, owned by a `NodeRegistry`, plus
/// the record of how they are wired.
pub struct PipelineGraph {
    config: SystemConfig,
    context: SharedContext,
    registry: NodeRegistry,
    /// Built nodes in declaration order
    nodes: Vec<NodeHandle>,
    loggers: HashSet<String>,
    subscriptions: Vec<Subscription>,
}

impl PipelineGraph {
    /// Builds every node of `config`, loading or synthesising the backing
    /// data file first.
    pub fn build(config: &SystemConfig, context: SharedContext) -> PipelineResult<Self> {
        let data = if config.general.data_file_name.is_empty() {
            Vec::new()
        } else {
            load_or_generate_data(&config.general.data_file_name, config.general.data_len())?
        };
        Self::build_with_data(config, context, &data)
    }

    pub fn build_with_data(
        config: &SystemConfig,
        context: SharedContext,
        data: &[u8],
    ) -> PipelineResult<Self> {
        Self::build_with_factories(config, context, data, &NodeFactoryRegistry::with_builtin())
    }

    pub fn build_with_factories(
        config: &SystemConfig,
        context: SharedContext,
        data: &[u8],
        factories: &NodeFactoryRegistry,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let mut registry = NodeRegistry::new();
        let mut nodes = Vec::new();
        let mut loggers = HashSet::new();
        let mut index: u64 = 0;

        for (name, proc) in config.processors.iter() {
            index += 1;
            match proc.proc_type.parse::<ProcType>() {
                Ok(ProcType::Logger) => {
                    loggers.insert(name.to_string());
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(node = %name, index, "Skipping processor: {}", e);
                    continue;
                }
            }

            let node_index = u8::try_from(index).map_err(|_| PipelineError::TooManyNodes { index })?;
            let spec = NodeSpec {
                index: node_index,
                name,
                config: proc,
                source_data: data,
                num_of_paket: u64::from(config.general.num_of_paket),
                context: context.clone(),
            };
            match factories.create(&spec, &mut registry)? {
                Some(node) => nodes.push(node),
                None => warn!(node = %name, proc_type = %proc.proc_type, "No factory registered, skipping"),
            }
        }

        info!(nodes = nodes.len(), loggers = loggers.len(), run_id = %context.run_id(), "Pipeline built");

        Ok(Self {
            config: config.clone(),
            context,
            registry,
            nodes,
            loggers,
            subscriptions: Vec::new(),
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Number of nodes built.
    pub fn size(&self) -> usize {
        self.registry.size()
    }

    /// Number of processor declarations, including loggers and skipped ones.
    pub fn number_of_nodes(&self) -> usize {
        self.config.processors.len()
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<NodeHandle> {
        self.registry.find(name)
    }

    pub fn node_as<N: Node>(&self, name: &str) -> Option<Arc<N>> {
        self.registry.find_as::<N>(name)
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn is_logger(&self, name: &str) -> bool {
        is_logger(&self.loggers, name)
    }

    /// Model info entries, general parameters, then every node with its
    /// adjacency list.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Ok(serde_json::Value::Object(info)) = serde_json::to_value(&self.config.sim_model_info) {
            for (key, value) in &info {
                lines.push(format!("{}: {}", key, value));
            }
        }
        let general = &self.config.general;
        lines.push(format!("__paket_len__: {}", general.paket_len));
        lines.push(format!("__num_of_paket__: {}", general.num_of_paket));
        lines.push(format!("__data_file_name__: {}", general.data_file_name));
        lines.push(format!("Pipeline {} with {} nodes", self.context.run_id(), self.size()));
        lines.extend(self.nodes.iter().map(|node| node.core().to_string()));
        lines
    }

    /// Logs the lines of [`describe`](Self::describe).
    pub fn print_pipeline(&self) {
        for line in self.describe() {
            info!("{}", line);
        }
    }

    /// Connects every non-logger edge to the matching input of its target.
    pub fn connect_processors(&mut self) -> PipelineResult<()> {
        let mut wiring = Wiring {
            registry: &self.registry,
            loggers: &self.loggers,
            subscriptions: Vec::new(),
        };
        self.registry.visit_all_of_kind(&mut wiring)?;
        let subscriptions = wiring.subscriptions;

        info!(count = subscriptions.len(), "Connected processors");
        self.subscriptions.extend(subscriptions);
        Ok(())
    }

    /// Sends the tags of every node with a logger edge to `sink`.
    pub fn connect_logger(&mut self, sink: Arc<dyn TagSink>) -> PipelineResult<()> {
        for node in &self.nodes {
            let Some(edge) = node.edges().iter().find(|e| is_logger(&self.loggers, &e.target)) else {
                continue;
            };
            let sink = sink.clone();
            node.core().on_new_tag.connect(move |tag| sink.log_tag(tag));
            debug!(node = %node.name(), "Connected logger");
            self.subscriptions.push(Subscription {
                from: node.name().to_string(),
                event: "NewTag".to_string(),
                to: edge.target.clone(),
                port: "Log".to_string(),
            });
        }
        Ok(())
    }

    /// Starts every node flagged with `__trig_start__`, repeatedly, until it
    /// reports done or `__num_of_paket__` pulses have been issued. The pulse
    /// count is what drives sources without a feedback edge into `Strt`.
    pub fn run(&self) -> PipelineResult<()> {
        let max_pulses = self.config.general.num_of_paket.max(1);
        for node in self.nodes.iter().filter(|node| node.trig_start()) {
            let mut pulses = 0;
            while pulses < max_pulses && !node.is_done() {
                node.start().map_err(|source| PipelineError::Stage {
                    node: node.name().to_string(),
                    source,
                })?;
                pulses += 1;
            }
            info!(node = %node.name(), pulses, "Node finished");
        }
        Ok(())
    }
}

fn is_logger(loggers: &HashSet<String>, name: &str) -> bool {
    name == LOGGER_NAME || loggers.contains(name)
}

struct Wiring<'a> {
    registry: &'a NodeRegistry,
    loggers: &'a HashSet<String>,
    subscriptions: Vec<Subscription>,
}

impl Wiring<'_> {
    fn wire(&mut self, from: &NodeHandle, edge: &Edge) -> PipelineResult<()> {
        if is_logger(self.loggers, &edge.target) {
            return Ok(());
        }
        let Some(to) = self.registry.find(&edge.target) else {
            warn!(node = %from.name(), target = %edge.target, "Edge target not found, skipping");
            return Ok(());
        };

        let invalid = |message: String| PipelineError::InvalidConnection {
            from: from.name().to_string(),
            to: edge.target.clone(),
            message,
        };
        if Arc::ptr_eq(from, &to) {
            return Err(invalid("a node cannot feed itself".to_string()));
        }
        let hook = Hook::for_edge(edge)
            .ok_or_else(|| invalid(format!("illegal event/port pair {}:{}", edge.event, edge.port)))?;

        let signals = from.core();
        match hook {
            Hook::Process => signals
                .on_new_data
                .connect_method(&to, |node, value| node.process(value)),
            Hook::FirstInput => signals
                .on_new_data
                .connect_method(&to, |node, value| node.set_first_input(value)),
            Hook::Start => signals
                .on_first_input_set
                .connect_method(&to, |node, _| node.start()),
        }

        debug!(from = %from.name(), to = %to.name(), event = %edge.event, port = %edge.port, "Connected");
        self.subscriptions.push(Subscription {
            from: from.name().to_string(),
            event: edge.event.clone(),
            to: to.name().to_string(),
            port: edge.port.clone(),
        });
        Ok(())
    }
}

impl NodeVisitor for Wiring<'_> {
    fn visit_collection(&mut self, _kind: NodeKind, nodes: &[NodeHandle]) -> PipelineResult<()> {
        for node in nodes {
            for edge in node.edges() {
                self.wire(node, edge)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeneralConfig, ProcessorConfig};
    use crate::nodes::VecSink;
    use flow_types::RunContext;

    fn general() -> GeneralConfig {
        GeneralConfig {
            paket_len: 2,
            num_of_paket: 1,
            data_file_name: String::new(),
        }
    }

    fn build(config: &SystemConfig) -> PipelineResult<PipelineGraph> {
        PipelineGraph::build_with_data(config, RunContext::new().shared(), &[])
    }

    #[test]
    fn test_hook_pairs() {
        assert_eq!(Hook::for_edge(&Edge::new("a", "NewData", "Proc")), Some(Hook::Process));
        assert_eq!(Hook::for_edge(&Edge::new("a", "NewData", "In1")), Some(Hook::FirstInput));
        assert_eq!(Hook::for_edge(&Edge::new("a", "SetIn1", "Strt")), Some(Hook::Start));
        assert_eq!(Hook::for_edge(&Edge::new("a", "SetIn1", "Proc")), None);
        assert_eq!(Hook::for_edge(&Edge::new("a", "NewTag", "Strt")), None);
    }

    #[test]
    fn test_describe_lists_model_info_and_general() {
        let mut config = SystemConfig::new(GeneralConfig {
            paket_len: 4,
            num_of_paket: 3,
            data_file_name: "bits.bin".to_string(),
        });
        config.sim_model_info.name = Some(serde_json::json!("chain"));
        config
            .sim_model_info
            .extra
            .insert("__owner__".to_string(), serde_json::json!("lab"));
        config
            .processors
            .push("sink", ProcessorConfig::new(ProcType::SinkVec, "UINT8", 4));

        let lines = build(&config).unwrap().describe();
        assert!(lines.contains(&"__name__: \"chain\"".to_string()));
        assert!(lines.contains(&"__owner__: \"lab\"".to_string()));
        assert!(lines.contains(&"__paket_len__: 4".to_string()));
        assert!(lines.contains(&"__num_of_paket__: 3".to_string()));
        assert!(lines.contains(&"__data_file_name__: bits.bin".to_string()));
        assert!(lines.last().unwrap().contains("sink"));
    }

    #[test]
    fn test_declared_loggers_are_recognised() {
        let mut config = SystemConfig::new(general());
        config.processors.push(
            "adder",
            ProcessorConfig::new(ProcType::Adder, "UINT8", 2).connect_to("events", "NewData", "Proc"),
        );
        config.processors.push("events", ProcessorConfig::new(ProcType::Logger, "", 0));

        let mut graph = build(&config).unwrap();
        assert!(graph.is_logger("events"));
        assert!(graph.is_logger(LOGGER_NAME));
        assert!(!graph.is_logger("adder"));
        assert_eq!(graph.size(), 1);
        assert_eq!(graph.number_of_nodes(), 2);

        graph.connect_processors().unwrap();
        assert!(graph.subscriptions().is_empty());
    }

    #[test]
    fn test_self_connection_is_rejected() {
        let mut config = SystemConfig::new(general());
        config.processors.push(
            "adder",
            ProcessorConfig::new(ProcType::Adder, "UINT8", 2).connect_to("adder", "NewData", "Proc"),
        );
        let mut graph = build(&config).unwrap();
        assert!(matches!(
            graph.connect_processors(),
            Err(PipelineError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn test_too_many_nodes() {
        let mut config = SystemConfig::new(general());
        for i in 0..256 {
            config
                .processors
                .push(&format!("sink{}", i), ProcessorConfig::new(ProcType::SinkVec, "UINT8", 1));
        }
        assert!(matches!(
            build(&config),
            Err(PipelineError::TooManyNodes { index: 256 })
        ));
    }

    #[test]
    fn test_indices_follow_declarations() {
        let mut config = SystemConfig::new(general());
        config.processors.push("events", ProcessorConfig::new(ProcType::Logger, "", 0));
        config.processors.push("sink", ProcessorConfig::new(ProcType::SinkVec, "UINT8", 1));

        let graph = build(&config).unwrap();
        let sink = graph.node_as::<VecSink<u8>>("sink").unwrap();
        assert_eq!(sink.index(), 2);
    }

    #[test]
    fn test_generates_missing_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.bin");

        let data = load_or_generate_data(&path, 16).unwrap();
        assert_eq!(data.len(), 16);
        assert!(data.iter().all(|b| *b <= 1));
        assert_eq!(fs::read(&path).unwrap(), data);

        let again = load_or_generate_data(&path, 99).unwrap();
        assert_eq!(again, data);
    }
}
