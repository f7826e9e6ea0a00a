//! Query-backed selection fields
//!
//! `query-select` builds search-as-you-type selection fields for entities that
//! live behind a query API (users, teams, schedules, ...). Each entity kind is
//! described once as data, an [`EntityDescriptor`], and a [`FieldFactory`]
//! turns that description into any number of independent fields.
//!
//! # Architecture
//!
//! - **Headless**: a field publishes a [`SelectView`] for whatever widget renders it
//! - **Batched resolution**: all selected ids resolve in one aliased request
//! - **Debounced search**: typing echoes immediately, queries wait for a quiet period
//! - **Stable options**: content-identical options are the same `Arc` across refreshes
//! - **Transport-agnostic**: queries go through the [`QueryClient`] trait
//!
//! [`SelectionController`] is the pure state machine; [`SelectField`] runs it on
//! tokio, owning the debounce timer and in-flight requests.

pub mod cache;
pub mod client;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod factory;
pub mod field;
pub mod resolver;
pub mod searcher;
pub mod types;
pub mod variables;

#[cfg(test)]
mod testing;

pub use cache::OptionCache;
pub use client::{FetchPolicy, JsonObject, QueryClient, QueryRequest, QueryResponse, ResponseError};
pub use config::SelectConfig;
pub use controller::{Effect, SearchPhase, SelectView, SelectionController};
pub use descriptor::{default_node_mapper, EntityDescriptor, EntityDescriptorBuilder};
pub use document::{Document, Field, Value, VariableDefinition};
pub use error::{Result, SelectError};
pub use factory::FieldFactory;
pub use field::SelectField;
pub use resolver::{ResolutionPlan, ResolvedBatch, Slot, ValueResolver};
pub use searcher::{OptionSearcher, SearchOutcome};
pub use types::{
    Icon, Resolved, ResolvedValue, SelectHandlers, SelectOption, SelectProps, SelectedOptions,
    SelectionValue,
};
