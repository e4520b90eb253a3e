//! Core use-case services.
//!
//! # Responsibility
//! - Drive template edit sessions and assignment deployment over a
//!   `TemplateStore`.
//! - Keep callers decoupled from storage details.

pub mod assignment_service;
pub mod template_editor;
