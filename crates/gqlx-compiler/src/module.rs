//! Compiled modules, the services created from them and the field-resolver
//! adapters for schema-execution engines.

use std::collections::BTreeMap;

use gqlx_eval::{ApiImplementations, Runtime};
use gqlx_types::ast::Block;
use gqlx_types::Capabilities;
use indexmap::IndexMap;
use serde_json::Value as Json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::extract::Container;
use crate::schema::Schema;

// ══════════════════════════════════════════════════════════════════════════════
// Units
// ══════════════════════════════════════════════════════════════════════════════

/// The compiled resolver of one `(type, field)` pair.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub container: Container,
    pub field: String,
    /// Declared argument names, in schema order.
    pub arguments: Vec<String>,
    /// Generated resolver text, error boundary included.
    pub source: String,
    /// `true` when the unit must be invoked asynchronously.
    pub is_async: bool,
    block: Block,
}

impl CompiledUnit {
    pub fn new(
        container: Container,
        field: String,
        arguments: Vec<String>,
        source: String,
        block: Block,
    ) -> Self {
        let is_async = source.contains("await ");
        Self {
            container,
            field,
            arguments,
            source,
            is_async,
            block,
        }
    }

    /// The rewritten body the runtime executes.
    pub fn block(&self) -> &Block {
        &self.block
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Module
// ══════════════════════════════════════════════════════════════════════════════

/// The result of one compile call.
///
/// Immutable; any number of services may be created from it.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    name: String,
    source: String,
    schema: Schema,
    capabilities: Capabilities,
    units: Vec<CompiledUnit>,
    fingerprint: String,
}

impl CompiledModule {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        schema: Schema,
        capabilities: Capabilities,
        units: Vec<CompiledUnit>,
    ) -> Self {
        let fingerprint = fingerprint(&units);
        Self {
            name: name.into(),
            source: source.into(),
            schema,
            capabilities,
            units,
            fingerprint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The composite source the module was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The pure schema text, embedded regions removed.
    pub fn schema_text(&self) -> &str {
        self.schema.text()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn units(&self) -> &[CompiledUnit] {
        &self.units
    }

    pub fn unit(&self, type_name: &str, field: &str) -> Option<&CompiledUnit> {
        self.units
            .iter()
            .find(|u| u.container.as_str() == type_name && u.field == field)
    }

    /// SHA-256 over every unit's coordinates and source, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Field-resolver adapters grouped by type, then field.
    pub fn resolvers(&self) -> IndexMap<String, IndexMap<String, ResolverAdapter>> {
        let mut resolvers: IndexMap<String, IndexMap<String, ResolverAdapter>> = IndexMap::new();
        for container in Container::ALL {
            for unit in self.units.iter().filter(|u| u.container == container) {
                let adapter = ResolverAdapter::for_container(&self.name, container, &unit.field);
                resolvers
                    .entry(container.as_str().to_string())
                    .or_default()
                    .insert(unit.field.clone(), adapter);
            }
        }
        resolvers
    }

    /// Bind live API implementations, yielding the dispatcher.
    pub fn create_service(&self, api: ApiImplementations) -> Service<'_> {
        debug!(module = %self.name, api = ?api, "created service");
        Service {
            module: self,
            runtime: Runtime::new(self.capabilities.clone(), api),
        }
    }
}

fn fingerprint(units: &[CompiledUnit]) -> String {
    let mut hasher = Sha256::new();
    for unit in units {
        hasher.update(unit.container.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(unit.field.as_bytes());
        hasher.update([0u8]);
        hasher.update(unit.source.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

// ══════════════════════════════════════════════════════════════════════════════
// Service
// ══════════════════════════════════════════════════════════════════════════════

/// A compiled module bound to API implementations.
#[derive(Debug, Clone)]
pub struct Service<'m> {
    module: &'m CompiledModule,
    runtime: Runtime,
}

impl<'m> Service<'m> {
    pub fn module(&self) -> &'m CompiledModule {
        self.module
    }

    /// Run the resolver of `type_name.field` with the given arguments.
    ///
    /// Anything the resolver throws or rejects with surfaces as one
    /// [`ServiceError::Fault`].
    pub async fn dispatch(&self, type_name: &str, field: &str, args: &Json) -> Result<Json, ServiceError> {
        let unit = self
            .module
            .unit(type_name, field)
            .ok_or_else(|| ServiceError::UnknownField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })?;

        debug!(module = %self.module.name, type_name, field, is_async = unit.is_async, "dispatch");
        self.runtime
            .invoke(unit.block(), &unit.arguments, args)
            .await
            .map_err(|fault| {
                warn!(module = %self.module.name, type_name, field, fault = %fault, "resolver failed");
                ServiceError::Fault(fault)
            })
    }
}

/// Services by module name, handed to adapters as their context.
#[derive(Debug, Clone, Default)]
pub struct ServicesContext<'m> {
    services: BTreeMap<String, Service<'m>>,
}

impl<'m> ServicesContext<'m> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under its module's name.
    pub fn with_service(mut self, service: Service<'m>) -> Self {
        self.insert(service);
        self
    }

    pub fn insert(&mut self, service: Service<'m>) {
        self.services.insert(service.module.name.clone(), service);
    }

    pub fn get_service(&self, name: &str) -> Option<&Service<'m>> {
        self.services.get(name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Adapters
// ══════════════════════════════════════════════════════════════════════════════

/// One field resolver in the `(root, args, context)` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAdapter {
    pub module: String,
    pub type_name: String,
    pub field: String,
}

impl FieldAdapter {
    /// Look up this module's service in `context` and dispatch to it.
    /// `root` is not used by compiled resolvers.
    pub async fn call(
        &self,
        _root: &Json,
        args: &Json,
        context: &ServicesContext<'_>,
    ) -> Result<Json, ServiceError> {
        let service = context
            .get_service(&self.module)
            .ok_or_else(|| ServiceError::UnknownService(self.module.clone()))?;
        service.dispatch(&self.type_name, &self.field, args).await
    }
}

/// Queries and mutations resolve; subscriptions subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverAdapter {
    Resolve(FieldAdapter),
    Subscribe(FieldAdapter),
}

impl ResolverAdapter {
    /// Build the adapter for `type_name.field` of `module`.
    pub fn new(module: &str, type_name: &str, field: &str) -> Result<Self, ServiceError> {
        Container::from_name(type_name)
            .map(|container| Self::for_container(module, container, field))
            .ok_or_else(|| ServiceError::InvalidType(type_name.to_string()))
    }

    fn for_container(module: &str, container: Container, field: &str) -> Self {
        let adapter = FieldAdapter {
            module: module.to_string(),
            type_name: container.as_str().to_string(),
            field: field.to_string(),
        };
        match container {
            Container::Query | Container::Mutation => ResolverAdapter::Resolve(adapter),
            Container::Subscription => ResolverAdapter::Subscribe(adapter),
        }
    }

    pub fn resolve(&self) -> Option<&FieldAdapter> {
        match self {
            ResolverAdapter::Resolve(adapter) => Some(adapter),
            ResolverAdapter::Subscribe(_) => None,
        }
    }

    pub fn subscribe(&self) -> Option<&FieldAdapter> {
        match self {
            ResolverAdapter::Subscribe(adapter) => Some(adapter),
            ResolverAdapter::Resolve(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_kinds() {
        let query = ResolverAdapter::new("m", "Query", "a").unwrap();
        assert_eq!(query.resolve().map(|a| a.field.as_str()), Some("a"));
        assert!(query.subscribe().is_none());
        let subscription = ResolverAdapter::new("m", "Subscription", "b").unwrap();
        assert!(subscription.subscribe().is_some());
    }

    #[test]
    fn test_invalid_adapter_type() {
        let err = ResolverAdapter::new("m", "Item", "a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type used. Expected 'Subscription', 'Query', or 'Mutation', but received 'Item'."
        );
    }

    #[test]
    fn test_fingerprint_depends_on_sources() {
        let block = Block::new(Vec::new(), Default::default());
        let unit = |source: &str| {
            CompiledUnit::new(Container::Query, "a".into(), Vec::new(), source.into(), block.clone())
        };
        let a = fingerprint(&[unit("{ return 1; }")]);
        assert_eq!(a, fingerprint(&[unit("{ return 1; }")]));
        assert_ne!(a, fingerprint(&[unit("{ return 2; }")]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_async_detection() {
        let block = Block::new(Vec::new(), Default::default());
        let unit = CompiledUnit::new(Container::Query, "a".into(), Vec::new(), "{ return (await $api.get()); }".into(), block.clone());
        assert!(unit.is_async);
        let unit = CompiledUnit::new(Container::Query, "a".into(), Vec::new(), "{ return 1; }".into(), block);
        assert!(!unit.is_async);
    }
}
