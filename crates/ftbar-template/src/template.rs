//! Compiled templates and a per-source compile cache.

use std::collections::HashMap;
use std::sync::Arc;

use ftbar_core::config::EvaluatorConfig;

use crate::error::EvaluationError;
use crate::eval::Evaluator;
use crate::parser::{parse, Expr};
use crate::scope::Scope;
use crate::value::Value;

/// A template source parsed once into a shared AST.
#[derive(Debug, Clone)]
pub struct Template {
    source: Arc<str>,
    expr: Arc<Expr>,
}

impl Template {
    /// Compile with the default depth limit.
    pub fn compile(source: &str) -> Result<Self, EvaluationError> {
        Self::compile_with_limits(source, &EvaluatorConfig::default())
    }

    pub fn compile_with_limits(
        source: &str,
        limits: &EvaluatorConfig,
    ) -> Result<Self, EvaluationError> {
        let expr = parse(source, limits.max_depth)?;
        Ok(Self {
            source: Arc::from(source),
            expr: Arc::new(expr),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, scope: &Scope, limits: &EvaluatorConfig) -> Result<Value, EvaluationError> {
        Evaluator::new(scope, *limits).eval(&self.expr)
    }
}

/// Parse and evaluate in one go with default limits.
pub fn evaluate(source: &str, scope: &Scope) -> Result<Value, EvaluationError> {
    let limits = EvaluatorConfig::default();
    Template::compile_with_limits(source, &limits)?.evaluate(scope, &limits)
}

/// Compiled templates keyed by source text. Failed compilations are
/// cached too, so a broken template is parsed only once.
#[derive(Debug, Default)]
pub struct TemplateCache {
    limits: EvaluatorConfig,
    entries: HashMap<String, Result<Template, EvaluationError>>,
}

impl TemplateCache {
    pub fn new(limits: EvaluatorConfig) -> Self {
        Self {
            limits,
            entries: HashMap::new(),
        }
    }

    pub fn get_or_compile(&mut self, source: &str) -> Result<Template, EvaluationError> {
        if let Some(entry) = self.entries.get(source) {
            return entry.clone();
        }
        let compiled = Template::compile_with_limits(source, &self.limits);
        if let Err(e) = &compiled {
            tracing::debug!(source, error = %e, "Template failed to compile");
        }
        self.entries.insert(source.to_string(), compiled.clone());
        compiled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
