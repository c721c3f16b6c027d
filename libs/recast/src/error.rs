/// Boxed error returned by user conversion functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error kind for conversion errors. Compare by kind, not by message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad conversion function or options.
    Config,
    /// Permanent, cached record schema error.
    Schema,
    /// Source and destination do not fit together.
    Shape,
    /// Returned by a user conversion function.
    Custom,
}

/// Record schema error. Cached with the schema and returned on every use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("ambiguous field {0}")]
    AmbiguousField(&'static str),

    #[error("conflict field name and tag: {0}")]
    ConflictingNameAndTag(&'static str),

    #[error("circular record dependency: {0}")]
    CircularDependency(&'static str),
}

/// Rejected conversion function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("conversion function source type {0} must not be a pointer")]
    SourceIsPointer(&'static str),

    #[error("conversion function destination type {0} must not be a pointer; destinations are dereferenced before lookup")]
    DestinationIsPointer(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("type {from} is not convertible to type {to}")]
    NotConvertible { from: &'static str, to: &'static str },

    #[error("dest has no field to receive src field {name}({ty})")]
    MissingDestinationField { name: &'static str, ty: &'static str },

    #[error("src has no field {name}({ty}) convert to dest")]
    MissingSourceField { name: &'static str, ty: &'static str },

    #[error("type {ty} exposes no field at index {index}")]
    FieldAccess { ty: &'static str, index: usize },

    #[error("config error: {0}")]
    Config(String),

    /// Error from a conversion function, passed through unmodified.
    #[error(transparent)]
    Custom(BoxError),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Schema(_) => ErrorKind::Schema,
            ConvertError::Registration(_) | ConvertError::Config(_) => ErrorKind::Config,
            ConvertError::NotConvertible { .. }
            | ConvertError::MissingDestinationField { .. }
            | ConvertError::MissingSourceField { .. }
            | ConvertError::FieldAccess { .. } => ErrorKind::Shape,
            ConvertError::Custom(_) => ErrorKind::Custom,
        }
    }

    /// The conversion function's own error, if it is an `E`.
    pub fn custom_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            ConvertError::Custom(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }
}
