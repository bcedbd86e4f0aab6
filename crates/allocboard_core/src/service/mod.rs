//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Apply product defaults to operator input.
//! - Keep the CLI decoupled from storage details.

pub mod allocation_service;
pub mod developer_service;
pub mod project_service;
