//! Self-Extending Skills System
//!
//! Lets the agent forge small scripts, find them again later, and run them.
//!
//! # Architecture
//!
//! ```text
//! create_skill ──► SkillRegistry::forge ──► {root}/{name}/script.py + SKILL.md
//!                                                   │
//! list_skills  ──► SkillRegistry::discover ◄────────┤
//!                                                   │
//! run_skill    ──► SkillExecutor::run ──► interpreter script.py args...
//! ```
//!
//! The executor only depends on the directory convention, not on the
//! registry object.
//!
//! # Isolation
//!
//! A skill runs as a separate child process with the package root on its
//! module search path. There are no resource or filesystem limits beyond
//! that; an optional timeout can be configured.

pub mod executor;
pub mod registry;
pub mod types;

pub use executor::{resolve_interpreter, ExecutorConfig, SkillExecutor, SkillRun, NO_OUTPUT};
pub use registry::{Discovery, SkillRegistry};
pub use types::{sanitize_name, SkillDefinition, SkillError, METADATA_FILE, SCRIPT_FILE};
