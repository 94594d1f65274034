//! The frontend module handles parsing of the edit-command language.
//!
//! This module provides:
//! - **parser**: Transforms command text into [`ast::Command`] records
//! - **ast**: Type definitions for parsed commands

pub mod ast;
pub mod parser;
