//! Core functionality for documents, workspace layout, and configuration

pub mod config;
pub mod document;
pub mod workspace;
