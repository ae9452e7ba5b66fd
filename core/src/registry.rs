//! Named steps, selectable by name from the command line.

use std::collections::BTreeMap;

use crate::error::UnknownStep;
use crate::step::Step;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    steps: BTreeMap<String, Step>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `step` under `name`, replacing any step already there.
    pub fn add(&mut self, name: impl Into<String>, step: Step) -> &mut Self {
        self.steps.insert(name.into(), step);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up every name in order; the first unknown name is an error.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Step>, UnknownStep> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| UnknownStep(name.to_string()))
            })
            .collect()
    }
}
