//! Translation errors and non-fatal diagnostics

use thiserror::Error;

/// Result type for every fallible step of a translation run
pub type GenResult<T> = Result<T, GenError>;

/// Fatal errors. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("malformed version string '{0}'")]
    MalformedVersion(String),

    #[error("unsupported description version {found} (engine supports {supported})")]
    UnsupportedVersion { found: String, supported: String },

    #[error("the point refers to unknown element '{0}'")]
    UnresolvedReference(String),

    #[error("element id '{0}' is declared more than once")]
    DuplicateId(String),

    #[error("connectors must be attached to lines at both ends")]
    DetachedConnector,

    #[error("incorrect order of line ends ({start} > {end})")]
    LineEndsOrder { start: f64, end: f64 },

    #[error("line is not horizontal (y goes from {start} to {end})")]
    DiagonalLine { start: f64, end: f64 },

    #[error("connector must rise from its start line (y = {start}) to its end line (y = {end})")]
    ConnectorOrder { start: f64, end: f64 },

    #[error("invalid line property: {0}")]
    InvalidProperty(String),

    #[error("block overlap between lines at y = {upper} and y = {lower}")]
    StrongConflict { upper: f64, lower: f64 },

    #[error("resource error: {0}")]
    Resource(String),

    #[error("template '{name}' failed to render: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to parse description: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenError {
    /// Stable numeric code printed alongside the message
    pub fn code(&self) -> u32 {
        match self {
            GenError::MalformedVersion(_) => 1,
            GenError::UnsupportedVersion { .. } => 2,
            GenError::UnresolvedReference(_) => 10,
            GenError::DuplicateId(_) => 11,
            GenError::DetachedConnector => 12,
            GenError::LineEndsOrder { .. } => 13,
            GenError::DiagonalLine { .. } => 14,
            GenError::InvalidProperty(_) => 15,
            GenError::ConnectorOrder { .. } => 16,
            GenError::StrongConflict { .. } => 20,
            GenError::Resource(_) => 30,
            GenError::Template { .. } => 31,
            GenError::Yaml(_) | GenError::Json(_) => 40,
            GenError::Io(_) => 41,
        }
    }
}

/// Kinds of non-fatal findings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    NoElements,
    NoSources,
    NoObservers,
    SourceOutside,
    ObserverOutside,
    TransientOutside,
}

impl WarningKind {
    pub fn code(&self) -> u32 {
        match self {
            WarningKind::NoElements => 100,
            WarningKind::NoSources => 101,
            WarningKind::NoObservers => 102,
            WarningKind::SourceOutside => 110,
            WarningKind::ObserverOutside => 111,
            WarningKind::TransientOutside => 112,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// Accumulates warnings over a run; they are reported but never stop translation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(code = kind.code(), "{}", message);
        self.warnings.push(Warning { kind, message });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}
