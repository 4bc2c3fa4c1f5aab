#![warn(missing_docs)]
//! Propagation specific error structures
use std::{error::Error, fmt::Display};

/// Result type used throughout the propagation engine
pub type PopResult<T> = std::result::Result<T, PopError>;

/// Errors that can be returned by the propagation engine.
#[derive(Debug, PartialEq, Eq)]
pub enum PopError {
    /// invalid user input: grid size, zoom, unknown surface type, malformed coefficient lists, ...
    Configuration(String),
    /// numerically degenerate optics (e.g. an ABCD matrix that cannot be decomposed or a beam without power)
    Degenerate(String),
    /// a grid or scratch buffer could not be created
    Resource(String),
    /// reading or parsing of external files (system documents, grid sag maps)
    File(String),
    /// an error that occured while processing a given surface of the optical chain
    Surface {
        /// index of the failing surface
        index: usize,
        /// the underlying error
        source: Box<PopError>,
    },
    /// errors not falling in one of the categories above
    Other(String),
}

impl PopError {
    /// Attach the index of the surface being processed to this error.
    ///
    /// Errors that already carry a surface index are returned unchanged.
    #[must_use]
    pub fn at_surface(self, index: usize) -> Self {
        match self {
            Self::Surface { .. } => self,
            other => Self::Surface {
                index,
                source: Box::new(other),
            },
        }
    }
    /// Return the index of the failing surface (if any).
    #[must_use]
    pub const fn surface_index(&self) -> Option<usize> {
        if let Self::Surface { index, .. } = self {
            Some(*index)
        } else {
            None
        }
    }
}

impl Display for PopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(m) => {
                write!(f, "Configuration:{m}")
            }
            Self::Degenerate(m) => {
                write!(f, "Degenerate:{m}")
            }
            Self::Resource(m) => {
                write!(f, "Resource:{m}")
            }
            Self::File(m) => {
                write!(f, "File:{m}")
            }
            Self::Surface { index, source } => {
                write!(f, "Surface {index}:{source}")
            }
            Self::Other(m) => write!(f, "Propagation Error:Other:{m}"),
        }
    }
}
impl Error for PopError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Surface { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl std::convert::From<String> for PopError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn from() {
        let error = PopError::from("test".to_string());
        assert_eq!(error, PopError::Other("test".to_string()));
    }
    #[test]
    fn display() {
        assert_eq!(
            format!("{}", PopError::Configuration("test".to_string())),
            "Configuration:test"
        );
        assert_eq!(
            format!("{}", PopError::Degenerate("test".to_string())),
            "Degenerate:test"
        );
        assert_eq!(
            format!("{}", PopError::Resource("test".to_string())),
            "Resource:test"
        );
        assert_eq!(
            format!("{}", PopError::File("test".to_string())),
            "File:test"
        );
        assert_eq!(
            format!("{}", PopError::Other("test".to_string())),
            "Propagation Error:Other:test"
        );
        assert_eq!(
            format!(
                "{}",
                PopError::Degenerate("test".to_string()).at_surface(3)
            ),
            "Surface 3:Degenerate:test"
        );
    }
    #[test]
    fn debug() {
        assert_eq!(
            format!("{:?}", PopError::Configuration("test".to_string())),
            "Configuration(\"test\")"
        );
    }
    #[test]
    fn at_surface() {
        let e = PopError::File("missing".into()).at_surface(4);
        assert_eq!(e.surface_index(), Some(4));
        assert!(e.source().is_some());
        let e = e.at_surface(7);
        assert_eq!(e.surface_index(), Some(4));
        assert_eq!(PopError::Other("x".into()).surface_index(), None);
    }
}
