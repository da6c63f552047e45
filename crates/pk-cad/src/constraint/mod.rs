//! Constraint rules and the registry that validates them
//!
//! Rules are registered under a unique id and bound to entity ids. When an
//! entity changes, [`ConstraintSystem::revalidate`] runs every enabled rule
//! bound to it and reports the violations. Violations are data, not errors.

mod entity;
mod rule;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{CadError, CadResult};

pub use entity::{Entity, EntityId};
pub use rule::{ConstraintRule, LengthConstraint, Predicate, RuleKind, Validation, Violation};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    rule_id: String,
    entity: EntityId,
}

/// Registry of constraint rules
#[derive(Debug, Clone, Default)]
pub struct ConstraintSystem {
    rules: Vec<ConstraintRule>,
    index: HashMap<String, usize>,
    /// Kept in insertion order so reports are stable
    bindings: Vec<Binding>,
}

impl ConstraintSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.index.contains_key(rule_id)
    }

    pub fn get(&self, rule_id: &str) -> Option<&ConstraintRule> {
        self.index.get(rule_id).map(|&i| &self.rules[i])
    }

    /// Rules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ConstraintRule> {
        self.rules.iter()
    }

    // ============== Registration ==============

    /// Register a predicate rule
    pub fn add_rule<F>(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        predicate: F,
        message: impl Into<String>,
    ) -> CadResult<&ConstraintRule>
    where
        F: Fn(&Entity<'_>) -> bool + Send + Sync + 'static,
    {
        self.insert(ConstraintRule::predicate(id, name, predicate, message)?)
    }

    /// Register a length rule
    pub fn add_length_constraint(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        target: f64,
        tolerance: f64,
        message: impl Into<String>,
    ) -> CadResult<&ConstraintRule> {
        self.insert(ConstraintRule::length(id, name, target, tolerance, message)?)
    }

    /// Register a horizontal rule
    pub fn add_horizontal_constraint(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        tolerance: f64,
        message: impl Into<String>,
    ) -> CadResult<&ConstraintRule> {
        self.insert(ConstraintRule::horizontal(id, name, tolerance, message)?)
    }

    /// Register a vertical rule
    pub fn add_vertical_constraint(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        tolerance: f64,
        message: impl Into<String>,
    ) -> CadResult<&ConstraintRule> {
        self.insert(ConstraintRule::vertical(id, name, tolerance, message)?)
    }

    /// Register a prepared rule; ids must be unique
    pub fn insert(&mut self, rule: ConstraintRule) -> CadResult<&ConstraintRule> {
        if self.index.contains_key(rule.id()) {
            return Err(CadError::DuplicateRule(rule.id().to_string()));
        }
        let slot = self.rules.len();
        debug!(rule = rule.id(), kind = rule.kind().type_name(), "registered rule");
        self.index.insert(rule.id().to_string(), slot);
        self.rules.push(rule);
        Ok(&self.rules[slot])
    }

    /// Remove a rule and every binding that refers to it
    pub fn remove_rule(&mut self, rule_id: &str) -> CadResult<ConstraintRule> {
        let slot = self
            .index
            .remove(rule_id)
            .ok_or_else(|| CadError::RuleNotFound(rule_id.to_string()))?;
        let rule = self.rules.remove(slot);
        for i in self.index.values_mut() {
            if *i > slot {
                *i -= 1;
            }
        }
        self.bindings.retain(|b| b.rule_id != rule_id);
        Ok(rule)
    }

    pub fn set_enabled(&mut self, rule_id: &str, enabled: bool) -> CadResult<()> {
        let slot = *self
            .index
            .get(rule_id)
            .ok_or_else(|| CadError::RuleNotFound(rule_id.to_string()))?;
        self.rules[slot].set_enabled(enabled);
        Ok(())
    }

    // ============== Bindings ==============

    /// Attach a rule to an entity; binding twice is a no-op
    pub fn bind(&mut self, rule_id: &str, entity: EntityId) -> CadResult<()> {
        if !self.contains(rule_id) {
            return Err(CadError::RuleNotFound(rule_id.to_string()));
        }
        let binding = Binding {
            rule_id: rule_id.to_string(),
            entity,
        };
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
        Ok(())
    }

    /// Detach a rule from an entity; returns whether a binding existed
    pub fn unbind(&mut self, rule_id: &str, entity: EntityId) -> bool {
        let before = self.bindings.len();
        self.bindings
            .retain(|b| !(b.entity == entity && b.rule_id == rule_id));
        self.bindings.len() != before
    }

    /// Drop every binding of a deleted entity; returns how many were removed
    pub fn unbind_entity(&mut self, entity: EntityId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.entity != entity);
        before - self.bindings.len()
    }

    /// Rules bound to an entity, in binding order
    pub fn rules_for(&self, entity: EntityId) -> impl Iterator<Item = &ConstraintRule> {
        self.bindings
            .iter()
            .filter(move |b| b.entity == entity)
            .filter_map(|b| self.get(&b.rule_id))
    }

    /// Entities bound to a rule, in binding order
    pub fn entities_for<'s>(&'s self, rule_id: &'s str) -> impl Iterator<Item = EntityId> + 's {
        self.bindings
            .iter()
            .filter(move |b| b.rule_id == rule_id)
            .map(|b| b.entity)
    }

    // ============== Validation ==============

    /// Validate a single rule against an entity
    pub fn validate(&self, rule_id: &str, entity: &Entity<'_>) -> CadResult<Validation> {
        let rule = self
            .get(rule_id)
            .ok_or_else(|| CadError::RuleNotFound(rule_id.to_string()))?;
        rule.validate(entity)
    }

    /// Re-run every rule bound to an entity after it changed
    pub fn revalidate(&self, entity_id: EntityId, entity: &Entity<'_>) -> CadResult<Vec<Violation>> {
        let mut violations = Vec::new();
        for rule in self.rules_for(entity_id) {
            if let Validation::Violated(v) = rule.validate(entity)? {
                warn!(rule = %v.rule_id, entity = %entity_id.0, "{}", v.message);
                violations.push(v);
            }
        }
        Ok(violations)
    }

    /// Validate every binding, resolving entities through `lookup`
    ///
    /// Bindings whose entity no longer resolves are skipped.
    pub fn validate_all<'a, F>(&self, mut lookup: F) -> CadResult<Vec<Violation>>
    where
        F: FnMut(EntityId) -> Option<Entity<'a>>,
    {
        let mut violations = Vec::new();
        for binding in &self.bindings {
            let Some(rule) = self.get(&binding.rule_id) else {
                continue;
            };
            let Some(entity) = lookup(binding.entity) else {
                debug!(entity = %binding.entity.0, "skipping unresolved entity");
                continue;
            };
            if let Validation::Violated(v) = rule.validate(&entity)? {
                violations.push(v);
            }
        }
        if !violations.is_empty() {
            warn!(count = violations.len(), "constraint violations");
        }
        Ok(violations)
    }
}
