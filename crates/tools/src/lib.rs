//! Tool registry (C6): schema-validated dispatch, plus a small set of
//! illustrative tools (`read_file`, `list_directory`, `write_file`,
//! `shell_run`) that exercise the registry, approval gate, and invocation
//! engine end to end. Real tool implementations are out of scope.

pub mod fs_tools;
pub mod registry;
pub mod schema;
pub mod shell_tool;
pub mod tool;

pub use fs_tools::{ListDirectoryTool, ReadFileTool, WriteFileTool};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use shell_tool::ShellRunTool;
pub use tool::{RiskLevel, Tool, ToolError};
