//! Drover Core Library
//!
//! This is the core library for the drover task orchestrator. It provides all the
//! business logic for declaring tasks, resolving them into execution plans, running
//! those plans, and the built-in behaviours behind the standard task set.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`workspace_manager`] - High-level workspace management interface
//! - [`task_graph`] - Task declarations, plan resolution and cycle detection
//! - [`execution`] - Process invocation and fail-fast plan execution
//! - [`environment`] - Idempotent isolated environment provisioning
//! - [`coverage`] - Test runs gated on aggregate coverage
//! - [`matrix`] - Test runs across supported runtime versions
//! - [`release`] - The gated release pipeline
//! - [`versioning`] - Version bumps driven by git tags
//! - [`targets`] - Discovery of invocable task names
//! - [`configs`] - Configuration parsing for workspace settings and tasks
//! - [`results`] - Result types for workspace operations
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! The primary entry point is the [`WorkspaceManager`] which provides a high-level
//! interface for all workspace operations:
//!
//! ```rust,no_run
//! use drover_core::workspace_manager::{WorkspaceManager, WorkspaceManagerConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> drover_core::types::DroverResult<()> {
//! let manager = WorkspaceManager::new(WorkspaceManagerConfig {
//!     workspace_root: PathBuf::from("."),
//! }).await?;
//!
//! let targets = manager.list_targets()?;
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod coverage;
pub mod environment;
pub mod execution;
pub mod matrix;
pub mod platform;
pub mod release;
pub mod results;
pub mod targets;
pub mod task_graph;
pub mod tasks;
pub mod text;
pub mod types;
pub mod versioning;
pub mod workspace_manager;

// Re-export the main types for easier usage
pub use types::{DroverError, DroverResult};
pub use workspace_manager::{RunOptions, WorkspaceManager, WorkspaceManagerConfig};
