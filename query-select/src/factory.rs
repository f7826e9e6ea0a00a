//! Field factory: one descriptor in, any number of independent fields out.

use std::sync::Arc;

use tracing::debug;

use crate::client::QueryClient;
use crate::config::SelectConfig;
use crate::controller::SelectionController;
use crate::descriptor::EntityDescriptor;
use crate::error::Result;
use crate::field::SelectField;
use crate::resolver::ValueResolver;
use crate::searcher::OptionSearcher;
use crate::types::{SelectHandlers, SelectProps};

/// Produces selection fields for one kind of entity.
///
/// The factory holds only immutable configuration. Every field it builds
/// gets its own option cache and batched-document cache, so two fields
/// never share mutable state even when built from the same factory.
#[derive(Debug, Clone)]
pub struct FieldFactory {
    descriptor: Arc<EntityDescriptor>,
    config: Arc<SelectConfig>,
}

impl FieldFactory {
    /// A factory using [`SelectConfig::default`].
    pub fn new(descriptor: EntityDescriptor) -> Self {
        Self::with_config(descriptor, SelectConfig::default())
    }

    pub fn with_config(descriptor: EntityDescriptor, config: SelectConfig) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            config: Arc::new(config),
        }
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    /// The bare state machine, for hosts that drive their own event loop.
    pub fn controller(&self, props: SelectProps, create_enabled: bool) -> Result<SelectionController> {
        let searcher = OptionSearcher::new(self.descriptor.clone(), &self.config)?;
        let resolver = ValueResolver::new(self.descriptor.clone(), &self.config);
        Ok(SelectionController::new(
            Arc::new(searcher),
            Arc::new(resolver),
            self.config.clone(),
            props,
            create_enabled,
        ))
    }

    /// Mount a field that queries through `client`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(
        &self,
        client: Arc<dyn QueryClient>,
        props: SelectProps,
        handlers: SelectHandlers,
    ) -> Result<SelectField> {
        debug!(
            entity = self.descriptor.name(),
            multiple = props.value.is_multiple(),
            create = handlers.create_enabled(),
            "building selection field"
        );
        let controller = self.controller(props, handlers.create_enabled())?;
        Ok(SelectField::spawn(controller, client, handlers))
    }
}
