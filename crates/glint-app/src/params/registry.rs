use std::collections::HashSet;

use super::types::{Declaration, Parameter};

/// Ordered set of tunable parameters that survives reloads.
///
/// Entries are kept in first-seen order so slider order is stable. Reloads
/// only ever append or redeclare; a parameter that vanishes from the source
/// stays registered (idle) unless [`VariableRegistry::prune_unreferenced`] is
/// called.
#[derive(Default)]
pub struct VariableRegistry {
    params: Vec<Parameter>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge freshly parsed declarations, in order.
    ///
    /// Returns the number of entries that were inserted or redeclared.
    pub fn merge(&mut self, declarations: &[Declaration]) -> usize {
        let mut touched = 0;
        for decl in declarations {
            match self.params.iter_mut().find(|p| p.name == decl.name) {
                None => {
                    self.params.push(decl.to_parameter());
                    touched += 1;
                }
                Some(existing) => {
                    let Some(bounds) = decl.bounds else {
                        continue;
                    };
                    if bounds == existing.bounds() {
                        continue;
                    }
                    log::debug!(
                        "Parameter '{}' redeclared: [{}, {}] -> [{}, {}]",
                        decl.name,
                        existing.min,
                        existing.max,
                        bounds.min,
                        bounds.max
                    );
                    *existing = decl.to_parameter();
                    touched += 1;
                }
            }
        }
        touched
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Set a value from the UI. Clamps into the entry's bounds; name and
    /// bounds are never touched. Returns false for unknown names.
    pub fn set_value(&mut self, name: &str, value: f32) -> bool {
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.value = p.bounds().clamp(value);
                true
            }
            None => false,
        }
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        self.get(name).map(|p| p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Parameter names in registry order.
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Values for `names`, in that order. Unknown names pack as 0.
    pub fn pack_values(&self, names: &[String]) -> Vec<f32> {
        names
            .iter()
            .map(|n| self.value(n).unwrap_or(0.0))
            .collect()
    }

    /// Drop every entry not in `referenced`. Returns how many were removed.
    pub fn prune_unreferenced(&mut self, referenced: &HashSet<String>) -> usize {
        let before = self.params.len();
        self.params.retain(|p| referenced.contains(&p.name));
        before - self.params.len()
    }
}
