//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Config error - invalid or ambiguous configuration document
pub const CONFIG_ERROR: i32 = 2;

/// Template error - a value or document failed to render
pub const TEMPLATE_ERROR: i32 = 3;

/// Precondition error - a required value was not provided
pub const PRECONDITION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Interrupted by SIGINT
pub const CANCELLED: i32 = 130;
