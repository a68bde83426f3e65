//! Diagnostics (spec.md §6/§7). Shared by every phase so analysis, code
//! generation, and allocation can all report into the same listing sink
//! without the driver depending back on them.

use derive_more::Display;

use crate::common::{Id, ScopeId};

/// The four diagnostic kinds of spec.md §7, each using one of the two
/// message templates from §6.
#[derive(Debug, Clone, Display)]
pub enum Diagnostic {
    #[display("Type Error at line {line}: {message}")]
    Type { line: u32, message: String },
    #[display("Var Error: {what} '{name}' {detail} at line {line} and scope {scope}")]
    Var { what: String, name: Id, detail: String, line: u32, scope: ScopeId },
    #[display("Fatal Error: {message}")]
    Fatal { message: String },
    #[display("Error: {message}")]
    Error { message: String },
}

impl Diagnostic {
    pub fn type_error(line: u32, message: impl Into<String>) -> Self {
        Diagnostic::Type { line, message: message.into() }
    }

    pub fn var_error(
        what: impl Into<String>,
        name: Id,
        detail: impl Into<String>,
        line: u32,
        scope: ScopeId,
    ) -> Self {
        Diagnostic::Var { what: what.into(), name, detail: detail.into(), line, scope }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Diagnostic::Fatal { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::Error { message: message.into() }
    }
}
