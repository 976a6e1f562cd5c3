use std::collections::HashMap;

use serde_json::Value;

use crate::spec::{form::FormSpec, id::scalar_key, question::OptionSpec};

/// Option id to display label lookup for one form snapshot.
#[derive(Debug, Clone, Default)]
pub struct OptionResolver {
    labels: HashMap<String, String>,
}

impl OptionResolver {
    pub fn new<'a>(options: impl IntoIterator<Item = &'a OptionSpec>) -> Self {
        let labels = options
            .into_iter()
            .map(|option| (option.id.to_string(), option.text.clone()))
            .collect();
        Self { labels }
    }

    pub fn for_form(form: &FormSpec) -> Self {
        Self::new(form.all_options())
    }

    /// Label for `id`, or `id` itself when no option carries it.
    pub fn label(&self, id: &str) -> String {
        self.labels
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Label for a raw answer value; returns an empty string for null.
    pub fn label_for_value(&self, value: &Value) -> String {
        scalar_key(value)
            .map(|key| self.label(&key))
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
