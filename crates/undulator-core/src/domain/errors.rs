use std::error::Error;
use std::fmt::{Display, Formatter};

pub type UndulatorResult<T> = Result<T, UndulatorError>;
pub type ConfigResult<T> = UndulatorResult<T>;
pub type ComputeResult<T> = UndulatorResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UndulatorErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl UndulatorErrorCategory {
    pub const fn exit_status(self) -> ExitStatusMapping {
        match self {
            Self::Success => ExitStatusMapping {
                exit_code: 0,
                category_name: "Success",
            },
            Self::InputValidationError => ExitStatusMapping {
                exit_code: 2,
                category_name: "InputValidationError",
            },
            Self::IoSystemError => ExitStatusMapping {
                exit_code: 3,
                category_name: "IoSystemError",
            },
            Self::ComputationError => ExitStatusMapping {
                exit_code: 4,
                category_name: "ComputationError",
            },
            Self::InternalError => ExitStatusMapping {
                exit_code: 5,
                category_name: "InternalError",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_status().exit_code
    }

    pub const fn category_name(self) -> &'static str {
        self.exit_status().category_name
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusMapping {
    pub exit_code: i32,
    pub category_name: &'static str,
}

/// Run failure with a stable placeholder tag (`CONFIG.GRID_SHAPE`,
/// `IO.WRITE_INTENSITY`, ...) used in diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndulatorError {
    category: UndulatorErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl UndulatorError {
    pub fn new(
        category: UndulatorErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            UndulatorErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(UndulatorErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(UndulatorErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(UndulatorErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> UndulatorErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for UndulatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.category_name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for UndulatorError {}
