//! Error handling for keel
//!
//! This module provides the typed error enum and user-friendly error reporting
//! for the provisioning engine. The error system is designed around two core
//! principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`KeelError`] - Enumerated error types for all fatal failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Expected provisioning failures (a module that fails validation, a plan that
//! exits non-zero) are *not* errors: they are carried as values in
//! [`crate::terraform::TerraformValidation`], [`crate::helm::HelmValidation`]
//! and [`crate::terraform::PlanOutcome`]. Only environmental faults (missing
//! tools, I/O, timeouts, cancellation) and programming-contract violations
//! (self-referencing dependency edges, cycles, an empty provider set) surface
//! through [`KeelError`].
//!
//! # Error Conversion
//!
//! Common standard library and serde errors convert automatically:
//! - [`std::io::Error`] → [`KeelError::IoError`]
//! - [`serde_json::Error`] → [`KeelError::JsonError`]
//! - [`serde_yaml::Error`] → [`KeelError::YamlError`]
//! - [`toml::de::Error`] → [`KeelError::TomlError`]
//!
//! Use [`user_friendly_error`] to convert any error into a user-friendly
//! format with contextual suggestions.
//!
//! # Examples
//!
//! ```rust,no_run
//! use keel::core::{KeelError, user_friendly_error};
//!
//! fn run_tool() -> Result<(), KeelError> {
//!     Err(KeelError::ToolNotFound { tool: "terraform".to_string() })
//! }
//!
//! match run_tool() {
//!     Ok(_) => println!("done"),
//!     Err(e) => {
//!         let ctx = user_friendly_error(anyhow::Error::from(e));
//!         ctx.display(); // Colored error with suggestions
//!     }
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for keel operations
///
/// Each variant represents a specific fatal failure mode with enough context
/// to act on. Recoverable validation outcomes never appear here; they are
/// returned as tagged result values by the validators and the driver.
///
/// # Categories
///
/// ## External tools
/// - [`ToolNotFound`] - required executable missing from PATH
/// - [`CommandFailed`] - tool invocation itself could not run
/// - [`CommandTimeout`] - tool exceeded its timeout budget
///
/// ## Git
/// - [`GitCloneFailed`] / [`GitCheckoutFailed`] - fetch-sequence failures
///
/// ## Dependency graph contract
/// - [`SelfDependency`] - an edge from a node to itself
/// - [`GraphNodeMissing`] - edge endpoint not present in the graph
/// - [`DependencyCycle`] - rejected edge that would close a cycle
/// - [`CycleDetected`] - resolve-order output shorter than the node count
///
/// ## Catalog contract
/// - [`DuplicateVersion`] / [`DuplicateVersionSource`] - template invariants
///
/// ## Project builder contract
/// - [`NoProvidersDeclared`] - a project with zero required providers
///
/// ## Cancellation
/// - [`Cancelled`] - the batch's cancellation token fired
///
/// [`ToolNotFound`]: KeelError::ToolNotFound
/// [`CommandFailed`]: KeelError::CommandFailed
/// [`CommandTimeout`]: KeelError::CommandTimeout
/// [`GitCloneFailed`]: KeelError::GitCloneFailed
/// [`GitCheckoutFailed`]: KeelError::GitCheckoutFailed
/// [`SelfDependency`]: KeelError::SelfDependency
/// [`GraphNodeMissing`]: KeelError::GraphNodeMissing
/// [`DependencyCycle`]: KeelError::DependencyCycle
/// [`CycleDetected`]: KeelError::CycleDetected
/// [`DuplicateVersion`]: KeelError::DuplicateVersion
/// [`DuplicateVersionSource`]: KeelError::DuplicateVersionSource
/// [`NoProvidersDeclared`]: KeelError::NoProvidersDeclared
/// [`Cancelled`]: KeelError::Cancelled
#[derive(Error, Debug)]
pub enum KeelError {
    /// A required external executable is not installed or not in PATH
    ///
    /// keel drives `git`, `terraform` and the module-introspection tool as
    /// subprocesses; none of them ship with keel.
    #[error("External tool '{tool}' is not installed or not found in PATH")]
    ToolNotFound {
        /// The executable name that could not be resolved
        tool: String,
    },

    /// An external command could not be executed
    ///
    /// This covers spawn failures and abnormal termination, not ordinary
    /// non-zero exits (those are interpreted by the driver state machine).
    #[error("Command '{tool} {operation}' failed: {reason}")]
    CommandFailed {
        /// The executable that was invoked
        tool: String,
        /// The subcommand or operation being run (e.g. "clone", "plan")
        operation: String,
        /// What went wrong
        reason: String,
    },

    /// An external command exceeded its timeout budget
    #[error("Command '{tool} {operation}' timed out after {seconds} seconds")]
    CommandTimeout {
        /// The executable that was invoked
        tool: String,
        /// The subcommand or operation being run
        operation: String,
        /// The timeout that was exceeded, in seconds
        seconds: u64,
    },

    /// Repository clone failed
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL that failed to clone
        url: String,
        /// The reason for the clone failure
        reason: String,
    },

    /// Checkout of a pinned reference failed
    #[error("Failed to checkout reference '{reference}' in repository")]
    GitCheckoutFailed {
        /// The git reference (tag or commit) that failed to checkout
        reference: String,
        /// The reason for the checkout failure
        reason: String,
    },

    /// A dependency edge from a resource to itself was rejected
    #[error("Resource '{id}' cannot depend on itself")]
    SelfDependency {
        /// Identifier of the offending resource
        id: String,
    },

    /// An edge endpoint does not exist in the graph
    #[error("Resource '{id}' is not present in the dependency graph")]
    GraphNodeMissing {
        /// Identifier of the missing resource
        id: String,
    },

    /// Inserting an edge would create a dependency cycle
    ///
    /// Rejected at insertion time so the graph is never observably cyclic.
    #[error("Adding dependency from '{from}' to '{to}' would create a cycle")]
    DependencyCycle {
        /// The resource declaring the dependency
        from: String,
        /// The resource being depended on
        to: String,
    },

    /// Topological resolution covered fewer nodes than the graph holds
    ///
    /// Only reachable if the insertion-time cycle guard was bypassed.
    #[error("Dependency graph contains a cycle; resolution order is undefined")]
    CycleDetected,

    /// A provisioning project declared no required providers
    ///
    /// Every generated project must carry at least one provider requirement;
    /// an empty set means the validated module schemas were unusable.
    #[error("Provisioning project '{project}' declares no providers")]
    NoProvidersDeclared {
        /// The project folder name being built
        project: String,
    },

    /// A template already contains a version with this label
    #[error("Template '{template}' already has a version '{version}'")]
    DuplicateVersion {
        /// The template name
        template: String,
        /// The duplicated version label
        version: String,
    },

    /// A template already contains this exact version and source pair
    #[error("Template '{template}' already has version '{version}' from this source")]
    DuplicateVersionSource {
        /// The template name
        template: String,
        /// The duplicated version label
        version: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Template catalog file could not be parsed
    #[error("Invalid catalog file '{file}': {reason}")]
    CatalogParseError {
        /// Path to the catalog file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Score descriptor file could not be parsed
    #[error("Invalid score file '{file}': {reason}")]
    ScoreParseError {
        /// Path to the score file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// The operation was cancelled before it completed
    ///
    /// Raised at any suspension point once the batch's cancellation token
    /// fires; a cancelled batch never proceeds to apply or destroy.
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for KeelError {
    fn clone(&self) -> Self {
        match self {
            Self::ToolNotFound {
                tool,
            } => Self::ToolNotFound {
                tool: tool.clone(),
            },
            Self::CommandFailed {
                tool,
                operation,
                reason,
            } => Self::CommandFailed {
                tool: tool.clone(),
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::CommandTimeout {
                tool,
                operation,
                seconds,
            } => Self::CommandTimeout {
                tool: tool.clone(),
                operation: operation.clone(),
                seconds: *seconds,
            },
            Self::GitCloneFailed {
                url,
                reason,
            } => Self::GitCloneFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::GitCheckoutFailed {
                reference,
                reason,
            } => Self::GitCheckoutFailed {
                reference: reference.clone(),
                reason: reason.clone(),
            },
            Self::SelfDependency {
                id,
            } => Self::SelfDependency {
                id: id.clone(),
            },
            Self::GraphNodeMissing {
                id,
            } => Self::GraphNodeMissing {
                id: id.clone(),
            },
            Self::DependencyCycle {
                from,
                to,
            } => Self::DependencyCycle {
                from: from.clone(),
                to: to.clone(),
            },
            Self::CycleDetected => Self::CycleDetected,
            Self::NoProvidersDeclared {
                project,
            } => Self::NoProvidersDeclared {
                project: project.clone(),
            },
            Self::DuplicateVersion {
                template,
                version,
            } => Self::DuplicateVersion {
                template: template.clone(),
                version: version.clone(),
            },
            Self::DuplicateVersionSource {
                template,
                version,
            } => Self::DuplicateVersionSource {
                template: template.clone(),
                version: version.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::CatalogParseError {
                file,
                reason,
            } => Self::CatalogParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ScoreParseError {
                file,
                reason,
            } => Self::ScoreParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::Cancelled => Self::Cancelled,
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON parsing error: {e}"),
            },
            Self::YamlError(e) => Self::Other {
                message: format!("YAML parsing error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::TomlSerError(e) => Self::Other {
                message: format!("TOML serialization error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Returns true when the error chain bottoms out in [`KeelError::Cancelled`].
///
/// The CLI checks this at its error boundary so an interrupted batch exits
/// with the shell's interrupt status instead of being reported as a fault.
#[must_use]
pub fn is_cancellation(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<KeelError>(), Some(KeelError::Cancelled))
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`KeelError`] and adds optional user-friendly
/// messages, suggestions for resolution, and additional details. This is the
/// primary way keel presents errors to CLI users.
///
/// # Display Format
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use keel::core::{KeelError, ErrorContext};
///
/// let context = ErrorContext::new(KeelError::ToolNotFound {
///     tool: "terraform".to_string(),
/// })
/// .with_suggestion("Install terraform from https://developer.hashicorp.com/terraform")
/// .with_details("keel drives terraform as a subprocess");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying keel error
    pub error: KeelError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`KeelError`]
    ///
    /// Use the builder methods [`with_suggestion`] and [`with_details`] to add
    /// user-friendly information.
    ///
    /// [`with_suggestion`]: ErrorContext::with_suggestion
    /// [`with_details`]: ErrorContext::with_details
    #[must_use]
    pub const fn new(error: KeelError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions should be actionable steps. They are displayed in green in
    /// the terminal to draw attention.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    ///
    /// Details provide context about why the error occurred. They are
    /// displayed in yellow, less prominent than the main error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with suggestions
///
/// This function is the main entry point for converting arbitrary errors into
/// user-friendly error messages for CLI display. It recognizes [`KeelError`]
/// variants, [`std::io::Error`] kinds, and serde parse errors, and provides
/// appropriate context for each.
///
/// # Examples
///
/// ```rust,no_run
/// use keel::core::{KeelError, user_friendly_error};
///
/// let error = KeelError::ToolNotFound { tool: "git".to_string() };
/// let context = user_friendly_error(anyhow::Error::from(error));
/// context.display(); // Shows installation suggestions
/// ```
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(keel_error) = error.downcast_ref::<KeelError>() {
        return create_error_context(keel_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(KeelError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion(
                    "Check file ownership, or point KEEL_DATA_DIR at a writable location",
                )
                .with_details(
                    "keel writes module caches and provisioning projects under its data directory",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(KeelError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(yaml_error) = error.downcast_ref::<serde_yaml::Error>() {
        return ErrorContext::new(KeelError::Other {
            message: format!("YAML parsing error: {yaml_error}"),
        })
        .with_suggestion("Check the YAML syntax. Verify indentation and quoting")
        .with_details("Score descriptors and chart values files must be valid YAML");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(KeelError::Other {
            message: format!("TOML parsing error: {toml_error}"),
        })
        .with_suggestion("Check the TOML syntax. Verify quotes, brackets, and table headers")
        .with_details("Catalog and configuration files must be valid TOML");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();

    let chain: Vec<String> = error
        .chain()
        .skip(1) // Skip the root cause which is already in to_string()
        .map(std::string::ToString::to_string)
        .collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(KeelError::Other {
        message,
    })
}

/// Map each [`KeelError`] variant to an [`ErrorContext`] with tailored help.
fn create_error_context(error: KeelError) -> ErrorContext {
    match &error {
        KeelError::ToolNotFound {
            tool,
        } => {
            let suggestion = match tool.as_str() {
                "git" => "Install git from https://git-scm.com/ or via your package manager",
                "terraform" => {
                    "Install terraform from https://developer.hashicorp.com/terraform/install"
                }
                "terraform-config-inspect" => {
                    "Install with: go install github.com/hashicorp/terraform-config-inspect@latest"
                }
                _ => "Install the tool and ensure it is in your PATH",
            };
            ErrorContext::new(error.clone())
                .with_suggestion(suggestion)
                .with_details("keel drives external tools as subprocesses and needs them in PATH")
        }
        KeelError::CommandTimeout {
            seconds,
            ..
        } => {
            let details = format!("The process was killed after {seconds} seconds");
            ErrorContext::new(error.clone())
                .with_suggestion("Check network connectivity and tool health, then retry")
                .with_details(details)
        }
        KeelError::GitCloneFailed {
            url,
            ..
        } => {
            let details = format!("Could not fetch the template source from {url}");
            ErrorContext::new(error.clone())
                .with_suggestion(
                    "Verify the repository URL is reachable and any credentials are configured",
                )
                .with_details(details)
        }
        KeelError::DependencyCycle {
            ..
        }
        | KeelError::CycleDetected => ErrorContext::new(error.clone())
            .with_suggestion("Remove one of the dependencies so resources form an acyclic graph")
            .with_details("Provisioning order is derived from a topological sort, which requires an acyclic dependency graph"),
        KeelError::SelfDependency {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Remove the resource's dependency on itself"),
        KeelError::NoProvidersDeclared {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Check that the template modules declare required_providers blocks",
            )
            .with_details("A provisioning project must declare at least one provider"),
        KeelError::CatalogParseError {
            file,
            ..
        } => {
            let details = format!("The catalog file {file} could not be loaded");
            ErrorContext::new(error.clone())
                .with_suggestion(
                    "Check the [[templates]] and [[templates.versions]] tables for syntax errors",
                )
                .with_details(details)
        }
        KeelError::ScoreParseError {
            ..
        } => ErrorContext::new(error.clone()).with_suggestion(
            "Check the score file declares metadata.name and a resources mapping",
        ),
        KeelError::ConfigError {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Check ~/.keel/config.toml or unset KEEL_DATA_DIR"),
        KeelError::Cancelled => ErrorContext::new(error.clone())
            .with_details("The in-flight provisioning batch was interrupted before completion"),
        _ => ErrorContext::new(error),
    }
}
