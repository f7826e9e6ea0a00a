//! The selection state machine.
//!
//! [`SelectionController`] owns the ephemeral state of one field (search
//! text, debounce, in-flight requests, option cache) and derives the widget
//! view from it plus the caller's props. It performs no I/O and keeps no
//! clock: every transition returns the [`Effect`]s the runtime must carry
//! out, and completed requests are fed back in with the sequence number
//! they were issued under. The caller-owned selection value is never
//! copied into local state; it is read from props on every derivation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::cache::OptionCache;
use crate::client::{JsonObject, QueryRequest};
use crate::config::SelectConfig;
use crate::resolver::{ResolutionPlan, ResolvedBatch, Slot, ValueResolver};
use crate::searcher::{OptionSearcher, SearchOutcome};
use crate::types::{SelectOption, SelectProps, SelectedOptions, SelectionValue};

/// Where the field is in its search cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Nothing pending.
    Idle,
    /// Text changed; the debounce timer is running.
    Typing,
    /// A search request is outstanding.
    Searching,
}

/// Work the runtime must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// (Re)arm the single debounce timer; any earlier deadline is replaced.
    ArmDebounce(Duration),
    /// Drop the pending debounce timer, if any.
    CancelDebounce,
    /// Run a search and report back with `seq`.
    Search { seq: u64, request: QueryRequest },
    /// Resolve labels for `ids` and report back with `seq`.
    Resolve { seq: u64, ids: Vec<String> },
    /// Hand a new selection value to the caller.
    Change(SelectionValue),
    /// Hand typed text to the caller's create callback.
    Create(String),
}

/// Everything the presentation widget needs to render.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectView {
    /// Immediate echo of typed text.
    pub input: String,
    pub options: Vec<Arc<SelectOption>>,
    pub value: SelectedOptions,
    pub is_loading: bool,
    pub phase: SearchPhase,
    pub no_options_message: String,
    pub placeholder: Option<String>,
    pub error: bool,
    pub disabled: bool,
}

/// Per-field selection state.
pub struct SelectionController {
    searcher: Arc<OptionSearcher>,
    resolver: Arc<ValueResolver>,
    config: Arc<SelectConfig>,
    props: SelectProps,
    create_enabled: bool,
    cache: OptionCache,

    search_input: String,
    search: String,
    debounce_pending: bool,

    search_seq: u64,
    awaited_search: Option<u64>,
    issued_variables: Option<JsonObject>,
    search_skipped: bool,
    options: Vec<Arc<SelectOption>>,
    search_error: Option<String>,

    resolve_seq: u64,
    resolving: Option<Vec<String>>,
    resolved: Option<ResolvedBatch>,
}

impl SelectionController {
    pub fn new(
        searcher: Arc<OptionSearcher>,
        resolver: Arc<ValueResolver>,
        config: Arc<SelectConfig>,
        mut props: SelectProps,
        create_enabled: bool,
    ) -> Self {
        props.value = props.value.normalized();
        Self {
            searcher,
            resolver,
            config,
            props,
            create_enabled,
            cache: OptionCache::new(),
            search_input: String::new(),
            search: String::new(),
            debounce_pending: false,
            search_seq: 0,
            awaited_search: None,
            issued_variables: None,
            search_skipped: true,
            options: Vec::new(),
            search_error: None,
            resolve_seq: 0,
            resolving: None,
            resolved: None,
        }
    }

    pub fn searcher(&self) -> Arc<OptionSearcher> {
        self.searcher.clone()
    }

    pub fn resolver(&self) -> Arc<ValueResolver> {
        self.resolver.clone()
    }

    pub fn props(&self) -> &SelectProps {
        &self.props
    }

    /// Immediate search text.
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Debounced search text; this is what queries are issued for.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Initial requests for a freshly mounted field.
    pub fn mount(&mut self) -> Vec<Effect> {
        self.refresh()
    }

    /// Replace the caller's props.
    pub fn set_props(&mut self, mut props: SelectProps) -> Vec<Effect> {
        props.value = props.value.normalized();
        self.props = props;
        self.refresh()
    }

    /// A keystroke: echo immediately, search after the quiet period.
    pub fn input_changed(&mut self, text: impl Into<String>) -> Vec<Effect> {
        self.search_input = text.into();
        self.debounce_pending = true;
        trace!(input = %self.search_input, "debounce re-armed");
        vec![Effect::ArmDebounce(self.config.debounce_delay())]
    }

    /// The debounce timer fired.
    pub fn debounce_elapsed(&mut self) -> Vec<Effect> {
        if !self.debounce_pending {
            return Vec::new();
        }
        self.debounce_pending = false;
        self.search = self.search_input.clone();
        self.refresh()
    }

    /// The widget committed a selection.
    ///
    /// `selected` is the complete new selection: at most one option in
    /// single mode, every chosen option in multi mode.
    pub fn select(&mut self, selected: Vec<SelectOption>) -> Vec<Effect> {
        let mut effects = self.clear_search();
        match selected.iter().find(|opt| opt.is_create) {
            Some(created) if self.create_enabled => {
                effects.push(Effect::Create(created.value.clone()));
            }
            _ => {
                let multiple = self.props.value.is_multiple();
                effects.push(Effect::Change(SelectionValue::from_options(
                    multiple,
                    selected.iter().filter(|opt| !opt.is_create),
                )));
            }
        }
        effects.extend(self.refresh());
        effects
    }

    /// Drop any search text and return to the idle state.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut effects = self.clear_search();
        effects.extend(self.refresh());
        effects
    }

    fn clear_search(&mut self) -> Vec<Effect> {
        self.search_input.clear();
        self.search.clear();
        self.debounce_pending = false;
        vec![Effect::CancelDebounce]
    }

    /// A search finished. Returns whether it was applied.
    ///
    /// Only the response to the most recently issued search is applied;
    /// anything older is stale and dropped.
    pub fn search_completed(&mut self, seq: u64, outcome: SearchOutcome) -> bool {
        if self.awaited_search != Some(seq) {
            trace!(seq, latest = self.search_seq, "discarding stale search response");
            return false;
        }
        self.awaited_search = None;
        if outcome.error.is_some() {
            // a failed search is retried for the same variables
            self.issued_variables = None;
        }
        self.options = self.cache.cachify(outcome.options);
        self.search_error = outcome.error;
        true
    }

    /// A value lookup finished. Returns whether it was applied.
    ///
    /// A batch with failed or missing slots is requested again on the next
    /// refresh; its known labels stay on screen meanwhile.
    pub fn resolution_completed(&mut self, seq: u64, batch: ResolvedBatch) -> bool {
        if seq != self.resolve_seq {
            trace!(seq, latest = self.resolve_seq, "discarding stale value lookup");
            return false;
        }
        let incomplete = batch
            .slots
            .iter()
            .any(|slot| matches!(slot, Slot::Failed(_) | Slot::Pending));
        if incomplete {
            trace!(seq, "value lookup incomplete, will retry");
            self.resolving = None;
        }
        self.resolved = Some(batch);
        true
    }

    /// Issue whatever requests the current state calls for.
    fn refresh(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        effects.extend(self.refresh_search());
        effects.extend(self.refresh_resolution());
        effects
    }

    fn refresh_search(&mut self) -> Option<Effect> {
        let omit: &[String] = match &self.props.value {
            SelectionValue::Multi(ids) => ids,
            SelectionValue::Single(_) => &[],
        };
        let Some(request) = self.searcher.plan(&self.search, omit, &self.props.context) else {
            self.search_skipped = true;
            self.awaited_search = None;
            self.issued_variables = None;
            self.options.clear();
            self.search_error = None;
            return None;
        };
        if self.issued_variables.as_ref() == Some(&request.variables) {
            return None;
        }
        self.search_seq += 1;
        self.search_skipped = false;
        self.awaited_search = Some(self.search_seq);
        self.issued_variables = Some(request.variables.clone());
        Some(Effect::Search {
            seq: self.search_seq,
            request,
        })
    }

    fn refresh_resolution(&mut self) -> Option<Effect> {
        match self.resolver.plan(&self.props.value) {
            ResolutionPlan::Empty | ResolutionPlan::Immediate(_) => {
                self.resolving = None;
                None
            }
            ResolutionPlan::Fetch(ids) => {
                if self.resolving.as_ref() == Some(&ids) {
                    return None;
                }
                self.resolve_seq += 1;
                self.resolving = Some(ids.clone());
                Some(Effect::Resolve {
                    seq: self.resolve_seq,
                    ids,
                })
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.search != self.search_input || self.awaited_search.is_some()
    }

    pub fn phase(&self) -> SearchPhase {
        if self.debounce_pending {
            SearchPhase::Typing
        } else if self.awaited_search.is_some() {
            SearchPhase::Searching
        } else {
            SearchPhase::Idle
        }
    }

    /// Display options for the current selection.
    ///
    /// A resolved lookup wins; otherwise a live search option with the same
    /// value; otherwise the resolver's placeholder.
    fn selected_options(&mut self) -> SelectedOptions {
        let resolved = self.resolver.resolve(&self.props.value, self.resolved.as_ref());
        let batch = self.resolved.as_ref();
        let live = &self.options;
        let cache = &mut self.cache;
        resolved.map(|opt| {
            let ready = matches!(batch.and_then(|b| b.slot(&opt.value)), Some(Slot::Ready(_)));
            if !ready {
                if let Some(found) = live.iter().find(|o| o.value == opt.value) {
                    return found.clone();
                }
            }
            cache.get_or_insert(opt)
        })
    }

    /// Derive the widget view.
    pub fn view(&mut self) -> SelectView {
        let value = self.selected_options();
        let multiple = self.props.value.is_multiple();

        let mut seen: HashSet<String> = HashSet::new();
        let mut options: Vec<Arc<SelectOption>> = Vec::new();
        if self.search_error.is_none() {
            for opt in &self.options {
                if multiple && self.props.value.contains(&opt.value) {
                    continue;
                }
                if seen.insert(opt.value.clone()) {
                    options.push(opt.clone());
                }
            }
            if !multiple && !self.search_skipped {
                for current in value.as_slice() {
                    if seen.insert(current.value.clone()) {
                        options.push(current.clone());
                    }
                }
            }
        }

        if self.create_enabled
            && !self.search_input.is_empty()
            && !seen.contains(&self.search_input)
            && !self.props.value.contains(&self.search_input)
            && !self.options.iter().any(|o| o.value == self.search_input)
        {
            options.push(Arc::new(SelectOption::create(self.search_input.clone())));
        }

        let no_options_message = if self.search_skipped {
            self.config.start_typing_message.clone()
        } else if let Some(error) = &self.search_error {
            format!("Error: {error}")
        } else {
            self.config.no_options_message.clone()
        };

        let placeholder = self.props.placeholder.clone().or_else(|| {
            (self.searcher.has_default_variables() && self.search.is_empty())
                .then(|| self.config.start_typing_message.clone())
        });

        SelectView {
            input: self.search_input.clone(),
            options,
            value,
            is_loading: self.is_loading(),
            phase: self.phase(),
            no_options_message,
            placeholder,
            error: self.props.error,
            disabled: self.props.disabled,
        }
    }
}
