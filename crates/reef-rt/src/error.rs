use std::fmt;

/// Arithmetic failure raised by the emulated 64-bit integer operations.
///
/// Division and remainder are the only fallible operations in the runtime
/// core. Everything else is total: two's-complement wraparound on overflow
/// and saturation at the double conversion boundaries are defined results,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    /// The divisor was the zero value.
    DivideByZero,
}

impl fmt::Display for ArithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivideByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for ArithError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_by_zero_display() {
        assert_eq!(ArithError::DivideByZero.to_string(), "division by zero");
    }
}
