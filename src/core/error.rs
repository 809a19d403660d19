// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for nestql
//!
//! One error enum covers compilation, column resolution, scan I/O and
//! expression evaluation. The `is_*` predicates group variants into the
//! families callers usually care about.

use thiserror::Error;

/// Result type alias for nestql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Compile errors
    // =========================================================================
    /// Function symbol is not registered
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// Invalid argument for function or operation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Feature not supported
    #[error("not supported: {0}")]
    NotSupported(String),

    // =========================================================================
    // Schema errors
    // =========================================================================
    /// Column not present in the table
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    // =========================================================================
    // Scan I/O errors
    // =========================================================================
    /// I/O error
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Column stream failed validation or ended unexpectedly
    #[error("corrupted column '{column}': {message}")]
    Corrupted { column: String, message: String },

    // =========================================================================
    // Evaluation errors
    // =========================================================================
    /// Type error with message
    #[error("type error: {0}")]
    Type(String),

    /// Type conversion failed
    #[error("cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Aggregate instruction executed without instance memory
    #[error("aggregate instance memory required but not provided")]
    MissingInstance,

    /// Expression evaluation failed
    #[error("expression evaluation failed: {message}")]
    ExpressionEvaluationWithMessage { message: String },

    // =========================================================================
    // Lifecycle errors
    // =========================================================================
    /// Operation not allowed in the current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Query cancelled by the caller
    #[error("query cancelled")]
    QueryCancelled,

    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new type conversion error
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
        }
    }

    /// Create a new corrupted column error
    pub fn corrupted(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Corrupted {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create a new expression evaluation error
    pub fn expression_evaluation(message: impl Into<String>) -> Self {
        Error::ExpressionEvaluationWithMessage {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Errors raised while lowering an expression tree
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::SymbolNotFound(_) | Error::InvalidArgument(_) | Error::NotSupported(_)
        )
    }

    /// Errors raised while binding column names to the table
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::ColumnNotFound(_))
    }

    /// Errors raised by the column readers
    pub fn is_scan_io_error(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Corrupted { .. })
    }

    /// Errors raised while executing a program
    pub fn is_runtime_error(&self) -> bool {
        matches!(
            self,
            Error::Type(_)
                | Error::TypeConversion { .. }
                | Error::DivisionByZero
                | Error::MissingInstance
                | Error::ExpressionEvaluationWithMessage { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::io(format!("unexpected end of file: {}", err)),
            _ => Error::io(err.to_string()),
        }
    }
}
