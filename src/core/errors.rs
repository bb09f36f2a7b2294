use thiserror::Error;

/// Unified error type for flow assembly and compilation
#[derive(Debug, Error)]
pub enum FlowError {
    /// An edge whose source and destination are the same action
    #[error("Self dependency in flow '{flow}': '{action}' cannot be ordered before itself")]
    SelfDependency { flow: String, action: String },

    /// The accumulated constraints admit no total order
    #[error("Cycle detected in flow '{flow}': unresolved actions {unresolved:?}")]
    Cycle {
        flow: String,
        /// Every action that never became ready, sorted by identity
        unresolved: Vec<String>,
        /// Strongly connected components of the residual graph
        cycles: Vec<Vec<String>>,
    },

    /// An edge endpoint that was never registered as an action
    #[error("Unknown action '{action}' in flow '{flow}' (referenced by '{referenced_by}')")]
    UnknownAction {
        flow: String,
        action: String,
        referenced_by: String,
    },

    /// Same identity registered twice with different bodies
    #[error("Duplicate definition of action '{action}' in flow '{flow}'")]
    DuplicateDefinition { flow: String, action: String },

    /// Flow larger than the configured capacity
    #[error("Flow '{flow}' has {actions} actions, exceeding the limit of {limit}")]
    CapacityExceeded {
        flow: String,
        actions: usize,
        limit: usize,
    },

    /// Lookup of a flow identity nobody contributed to
    #[error("Unknown flow: {flow}")]
    UnknownFlow { flow: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FlowError {
    /// Create a self dependency error
    pub fn self_dependency<F: Into<String>, A: Into<String>>(flow: F, action: A) -> Self {
        Self::SelfDependency {
            flow: flow.into(),
            action: action.into(),
        }
    }

    /// Create a cycle error; both lists are sorted so the message is reproducible
    pub fn cycle<F: Into<String>>(
        flow: F,
        mut unresolved: Vec<String>,
        mut cycles: Vec<Vec<String>>,
    ) -> Self {
        unresolved.sort();
        for cycle in &mut cycles {
            cycle.sort();
        }
        cycles.sort();
        Self::Cycle {
            flow: flow.into(),
            unresolved,
            cycles,
        }
    }

    /// Create an unknown action error
    pub fn unknown_action<F, A, R>(flow: F, action: A, referenced_by: R) -> Self
    where
        F: Into<String>,
        A: Into<String>,
        R: Into<String>,
    {
        Self::UnknownAction {
            flow: flow.into(),
            action: action.into(),
            referenced_by: referenced_by.into(),
        }
    }

    /// Create a duplicate definition error
    pub fn duplicate<F: Into<String>, A: Into<String>>(flow: F, action: A) -> Self {
        Self::DuplicateDefinition {
            flow: flow.into(),
            action: action.into(),
        }
    }

    /// Create a capacity error
    pub fn capacity_exceeded<F: Into<String>>(flow: F, actions: usize, limit: usize) -> Self {
        Self::CapacityExceeded {
            flow: flow.into(),
            actions,
            limit,
        }
    }

    /// Create an unknown flow error
    pub fn unknown_flow<F: Into<String>>(flow: F) -> Self {
        Self::UnknownFlow { flow: flow.into() }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an IO error
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// The flow this error was raised for, if any
    pub fn flow(&self) -> Option<&str> {
        match self {
            Self::SelfDependency { flow, .. }
            | Self::Cycle { flow, .. }
            | Self::UnknownAction { flow, .. }
            | Self::DuplicateDefinition { flow, .. }
            | Self::CapacityExceeded { flow, .. }
            | Self::UnknownFlow { flow } => Some(flow.as_str()),
            _ => None,
        }
    }

    /// Action identities implicated by this error, sorted
    pub fn implicated(&self) -> Vec<&str> {
        let mut names: Vec<&str> = match self {
            Self::SelfDependency { action, .. } | Self::DuplicateDefinition { action, .. } => {
                vec![action.as_str()]
            }
            Self::Cycle { unresolved, .. } => unresolved.iter().map(String::as_str).collect(),
            Self::UnknownAction {
                action,
                referenced_by,
                ..
            } => vec![action.as_str(), referenced_by.as_str()],
            _ => Vec::new(),
        };
        names.sort_unstable();
        names
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::SelfDependency { .. } => "self_dependency",
            Self::Cycle { .. } => "cycle",
            Self::UnknownAction { .. } => "unknown_action",
            Self::DuplicateDefinition { .. } => "duplicate_definition",
            Self::CapacityExceeded { .. } => "capacity",
            Self::UnknownFlow { .. } => "unknown_flow",
            Self::Configuration { .. } => "configuration",
            Self::Io { .. } => "io",
            Self::Serialization { .. } => "serialization",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FlowError>;

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}
