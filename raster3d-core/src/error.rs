/// Error type shared by the matrix engine, geometry, mesh loading and rendering

/// Errors raised by the rendering pipeline.
#[derive(Debug)]
pub enum Error {
    /// Matrix product with `left.cols != right.rows`. Shapes are `(rows, cols)`.
    Dimension {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// A value outside the domain of an operation (zero perspective constant,
    /// zero-length normal or direction).
    Domain(String),
    /// Malformed mesh source. `line` is 1-based, 0 for binary input.
    Parse { line: usize, message: String },
    /// File could not be read or written.
    Io(std::io::Error),
    /// Output image could not be encoded.
    Image(image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn domain(message: impl Into<String>) -> Self {
        Error::Domain(message.into())
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Dimension { left, right } => write!(
                f,
                "Matrices cannot be multiplied: {}x{} by {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Error::Domain(msg) => write!(f, "Domain error: {}", msg),
            Error::Parse { line, message } => {
                write!(f, "Parse error at line {}: {}", line, message)
            }
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dimension() {
        let err = Error::Dimension {
            left: (2, 3),
            right: (2, 2),
        };
        assert_eq!(err.to_string(), "Matrices cannot be multiplied: 2x3 by 2x2");
    }

    #[test]
    fn test_io_source() {
        use std::error::Error as _;
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(Error::domain("k = 0").source().is_none());
    }
}
