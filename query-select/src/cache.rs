//! Content-addressed option cache.
//!
//! Options are keyed by their serialized form, which leaves out the icon.
//! The first instance seen for a key is the one handed out from then on,
//! so unchanged options keep the same `Arc` across refreshes and widgets
//! can short-circuit on pointer equality. Entries are never evicted; a
//! cache lives exactly as long as the field that owns it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::types::SelectOption;

/// Per-field cache of option instances.
#[derive(Debug, Default)]
pub struct OptionCache {
    entries: HashMap<String, Arc<SelectOption>>,
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `option`, inserting it if unseen.
    pub fn get_or_insert(&mut self, option: SelectOption) -> Arc<SelectOption> {
        let key = match serde_json::to_string(&option) {
            Ok(key) => key,
            Err(err) => {
                warn!(%err, value = %option.value, "option fingerprint failed; not caching");
                return Arc::new(option);
            }
        };
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(option))
            .clone()
    }

    /// Map every option to its cached instance, preserving order.
    pub fn cachify(&mut self, options: Vec<SelectOption>) -> Vec<Arc<SelectOption>> {
        options
            .into_iter()
            .map(|opt| self.get_or_insert(opt))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
