//! Core option, value, and prop types shared by every selection field.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::JsonObject;

/// Visual marker attached to an option.
///
/// Icons never take part in option identity: two options that differ
/// only by icon are the same option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Favorite,
    Named(String),
}

/// A single selectable item as handed to the presentation widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_create: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_text: Option<String>,
    #[serde(skip)]
    pub icon: Option<Icon>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            is_favorite: false,
            is_create: false,
            sub_text: None,
            icon: None,
        }
    }

    /// An option whose label is its own value.
    pub fn bare(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(value.clone(), value)
    }

    /// The synthetic "create" entry offered for unmatched search text.
    pub fn create(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: format!("Create \"{text}\""),
            is_create: true,
            ..Self::bare(text)
        }
    }

    /// Mark as a favorite; favorites carry the favorite icon.
    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self.icon = is_favorite.then_some(Icon::Favorite);
        self
    }

    pub fn with_sub_text(mut self, sub_text: impl Into<String>) -> Self {
        self.sub_text = Some(sub_text.into());
        self
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }
}

/// The caller-owned record of what is selected.
///
/// The variant doubles as the field mode: `Single` fields pick at most one
/// identifier, `Multi` fields pick an ordered list without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionValue {
    Single(Option<String>),
    Multi(Vec<String>),
}

impl Default for SelectionValue {
    fn default() -> Self {
        Self::Single(None)
    }
}

impl SelectionValue {
    pub fn single(id: impl Into<String>) -> Self {
        Self::Single(Some(id.into()))
    }

    /// A multi-select value; later duplicates are dropped.
    pub fn multi<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self::Multi(out)
    }

    /// This value with later duplicate ids dropped.
    pub fn normalized(self) -> Self {
        match self {
            Self::Multi(ids) => Self::multi(ids),
            single => single,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// The selected identifiers in order.
    pub fn ids(&self) -> &[String] {
        match self {
            Self::Single(id) => id.as_slice(),
            Self::Multi(ids) => ids,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|v| v == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Reduce selected options to identifiers in this value's mode.
    pub fn from_options<'a, I>(multiple: bool, options: I) -> Self
    where
        I: IntoIterator<Item = &'a SelectOption>,
    {
        let mut ids = options.into_iter().map(|opt| opt.value.clone());
        if multiple {
            Self::multi(ids)
        } else {
            Self::Single(ids.next())
        }
    }
}

/// A display value whose shape mirrors a [`SelectionValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    Single(Option<T>),
    Multi(Vec<T>),
}

impl<T> Resolved<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Resolved<U> {
        match self {
            Self::Single(v) => Resolved::Single(v.map(f)),
            Self::Multi(vs) => Resolved::Multi(vs.into_iter().map(f).collect()),
        }
    }

    /// All entries in order.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Single(v) => v.as_slice(),
            Self::Multi(vs) => vs,
        }
    }
}

/// Resolved display options for the current selection.
pub type ResolvedValue = Resolved<SelectOption>;

/// Resolved display options as shown by the widget.
pub type SelectedOptions = Resolved<Arc<SelectOption>>;

/// Inputs a form supplies to a selection field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectProps {
    pub value: SelectionValue,
    pub placeholder: Option<String>,
    pub error: bool,
    pub disabled: bool,
    /// Remaining host props, consulted by an entity's extra-variables hook.
    pub context: JsonObject,
}

impl SelectProps {
    pub fn new(value: SelectionValue) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_context(mut self, context: JsonObject) -> Self {
        self.context = context;
        self
    }

    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

type ChangeHandler = Arc<dyn Fn(SelectionValue) + Send + Sync>;
type CreateHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Callbacks a form supplies to a selection field.
///
/// Supplying `on_create` turns on the "create new value" entry.
#[derive(Clone)]
pub struct SelectHandlers {
    pub on_change: ChangeHandler,
    pub on_create: Option<CreateHandler>,
}

impl SelectHandlers {
    pub fn new(on_change: impl Fn(SelectionValue) + Send + Sync + 'static) -> Self {
        Self {
            on_change: Arc::new(on_change),
            on_create: None,
        }
    }

    pub fn on_create(mut self, on_create: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_create = Some(Arc::new(on_create));
        self
    }

    pub fn create_enabled(&self) -> bool {
        self.on_create.is_some()
    }
}

impl fmt::Debug for SelectHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectHandlers")
            .field("create_enabled", &self.create_enabled())
            .finish()
    }
}
