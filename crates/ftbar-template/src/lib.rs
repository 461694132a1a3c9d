//! Expression language for toolbar item templates.
//!
//! A template is a single expression (`window.title + ' ' + icon.BiMoon`)
//! evaluated against a [`Scope`]. Evaluation is self-contained: the only
//! names an expression can reach are scope entries and a fixed list of
//! builtins, and every run is bounded by a step and depth budget taken
//! from [`ftbar_core::EvaluatorConfig`].

pub mod builtins;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod template;
pub mod value;

pub use error::EvaluationError;
pub use scope::Scope;
pub use template::{evaluate, Template, TemplateCache};
pub use value::{Effect, Function, Value};
