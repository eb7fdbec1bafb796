//! Kind-indexed node construction.
//!
//! A `NodeFactoryRegistry` maps each `__proc_type__` to a factory. Factories
//! resolve the declared value kind to a concrete sample type and insert the
//! resulting node into the graph's `NodeRegistry`.

use crate::config::{ProcType, ProcessorConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::node::NodeHandle;
use crate::nodes::{Adder, RandSource, VecSink, VecSource};
use crate::registry::NodeRegistry;
use flow_types::{DataType, NumericKind, Sample, SharedContext, TaggedValue};
use num_complex::{Complex32, Complex64};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Everything a factory needs to build one declared node.
pub struct NodeSpec<'a> {
    pub index: u8,
    pub name: &'a str,
    pub config: &'a ProcessorConfig,
    /// Backing data, one byte per sample.
    pub source_data: &'a [u8],
    pub num_of_paket: u64,
    pub context: SharedContext,
}

impl NodeSpec<'_> {
    /// Numeric kind named by the declaration's value type.
    pub fn numeric_kind(&self) -> PipelineResult<NumericKind> {
        let name = self.config.value_type();
        let data_type: DataType = name.parse().unwrap_or(DataType::Unknown);
        data_type
            .numeric_kind()
            .ok_or_else(|| PipelineError::UnknownDataType {
                node: self.name.to_string(),
                data_type: name.to_string(),
            })
    }

    fn stage_error(&self, source: crate::error::StageError) -> PipelineError {
        PipelineError::Stage {
            node: self.name.to_string(),
            source,
        }
    }
}

/// Instantiates `$build::<T>` for the sample type matching `$kind`.
macro_rules! dispatch_kind {
    ($kind:expr, $build:ident ( $($arg:expr),* )) => {
        match $kind {
            NumericKind::Uint8 => $build::<u8>($($arg),*),
            NumericKind::Int8 => $build::<i8>($($arg),*),
            NumericKind::Uint16 => $build::<u16>($($arg),*),
            NumericKind::Int16 => $build::<i16>($($arg),*),
            NumericKind::Uint32 => $build::<u32>($($arg),*),
            NumericKind::Int32 => $build::<i32>($($arg),*),
            NumericKind::Uint64 => $build::<u64>($($arg),*),
            NumericKind::Int64 => $build::<i64>($($arg),*),
            NumericKind::Float => $build::<f32>($($arg),*),
            NumericKind::Double => $build::<f64>($($arg),*),
            NumericKind::ComplexFloat => $build::<Complex32>($($arg),*),
            NumericKind::ComplexDouble => $build::<Complex64>($($arg),*),
        }
    };
}

/// Builds nodes of one `__proc_type__`.
pub trait NodeFactory: Send + Sync {
    fn create(&self, spec: &NodeSpec<'_>, registry: &mut NodeRegistry) -> PipelineResult<NodeHandle>;

    fn proc_type(&self) -> ProcType;
}

pub struct VecSourceFactory;

fn build_vec_source<T: Sample>(
    spec: &NodeSpec<'_>,
    registry: &mut NodeRegistry,
) -> PipelineResult<NodeHandle> {
    let samples: Vec<T> = spec.source_data.iter().map(|b| T::from_byte(*b)).collect();
    let data = TaggedValue::gen_vector_from_slice(&samples);
    let node = VecSource::<T>::new(
        spec.index,
        spec.name,
        spec.config.adjacency.0.clone(),
        spec.config.out_vector_size as usize,
        spec.config.trig_start,
        &data,
        spec.config.repeat,
        spec.config.vlen as usize,
        spec.context.clone(),
    )
    .map_err(|e| spec.stage_error(e))?;
    Ok(registry.insert(Arc::new(node)))
}

impl NodeFactory for VecSourceFactory {
    fn create(&self, spec: &NodeSpec<'_>, registry: &mut NodeRegistry) -> PipelineResult<NodeHandle> {
        dispatch_kind!(spec.numeric_kind()?, build_vec_source(spec, registry))
    }

    fn proc_type(&self) -> ProcType {
        ProcType::SrcVec
    }
}

pub struct RandSourceFactory;

fn build_rand_source<T: Sample>(
    spec: &NodeSpec<'_>,
    registry: &mut NodeRegistry,
) -> PipelineResult<NodeHandle> {
    let node = RandSource::<T>::new(
        spec.index,
        spec.name,
        spec.config.adjacency.0.clone(),
        spec.config.out_vector_size as usize,
        spec.config.vlen as usize,
        spec.config.trig_start,
        spec.num_of_paket.max(1),
        spec.context.clone(),
    );
    Ok(registry.insert(Arc::new(node)))
}

impl NodeFactory for RandSourceFactory {
    fn create(&self, spec: &NodeSpec<'_>, registry: &mut NodeRegistry) -> PipelineResult<NodeHandle> {
        dispatch_kind!(spec.numeric_kind()?, build_rand_source(spec, registry))
    }

    fn proc_type(&self) -> ProcType {
        ProcType::RandVecGen
    }
}

pub struct AdderFactory;

fn build_adder<T: Sample>(
    spec: &NodeSpec<'_>,
    registry: &mut NodeRegistry,
) -> PipelineResult<NodeHandle> {
    let node = Adder::<T>::new(
        spec.index,
        spec.name,
        spec.config.adjacency.0.clone(),
        spec.config.out_vector_size as usize,
        spec.config.trig_start,
        spec.context.clone(),
    );
    Ok(registry.insert(Arc::new(node)))
}

impl NodeFactory for AdderFactory {
    fn create(&self, spec: &NodeSpec<'_>, registry: &mut NodeRegistry) -> PipelineResult<NodeHandle> {
        dispatch_kind!(spec.numeric_kind()?, build_adder(spec, registry))
    }

    fn proc_type(&self) -> ProcType {
        ProcType::Adder
    }
}

pub struct VecSinkFactory;

fn build_vec_sink<T: Sample>(
    spec: &NodeSpec<'_>,
    registry: &mut NodeRegistry,
) -> PipelineResult<NodeHandle> {
    let node = VecSink::<T>::new(
        spec.index,
        spec.name,
        spec.config.adjacency.0.clone(),
        spec.config.trig_start,
        spec.context.clone(),
    );
    Ok(registry.insert(Arc::new(node)))
}

impl NodeFactory for VecSinkFactory {
    fn create(&self, spec: &NodeSpec<'_>, registry: &mut NodeRegistry) -> PipelineResult<NodeHandle> {
        dispatch_kind!(spec.numeric_kind()?, build_vec_sink(spec, registry))
    }

    fn proc_type(&self) -> ProcType {
        ProcType::SinkVec
    }
}

/// Registry of node factories keyed by `__proc_type__`.
#[derive(Default)]
pub struct NodeFactoryRegistry {
    factories: HashMap<String, Box<dyn NodeFactory>>,
}

impl NodeFactoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in node kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(VecSourceFactory);
        registry.register(RandSourceFactory);
        registry.register(AdderFactory);
        registry.register(VecSinkFactory);
        registry
    }

    pub fn register<F>(&mut self, factory: F)
    where
        F: NodeFactory + 'static,
    {
        let proc_type = factory.proc_type().as_str().to_string();
        self.factories.insert(proc_type, Box::new(factory));
    }

    pub fn contains(&self, proc_type: &str) -> bool {
        self.factories.contains_key(proc_type)
    }

    /// Builds the node declared by `spec`, or `None` when no factory handles
    /// its `__proc_type__`.
    pub fn create(
        &self,
        spec: &NodeSpec<'_>,
        registry: &mut NodeRegistry,
    ) -> PipelineResult<Option<NodeHandle>> {
        match self.factories.get(&spec.config.proc_type) {
            Some(factory) => {
                let node = factory.create(spec, registry)?;
                debug!(node = %spec.name, index = spec.index, proc_type = %spec.config.proc_type, "Created node");
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    pub fn proc_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }
}
