//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first validation error into a `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_manager(config, &mut result);
        Self::validate_supervisor(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }

        if config.server.host == "0.0.0.0" || config.server.host == "::" {
            result.add_warning(ValidationWarning::new(
                "server.host",
                "Listening on all interfaces, the API has no authentication",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.path.as_os_str().is_empty() {
            result.add_error(ValidationError::new("store.path", "Store path cannot be empty"));
        }
    }

    fn validate_manager(config: &Config, result: &mut ValidationResult) {
        let manager = &config.manager;
        if manager.exit_retry_initial_ms == 0 {
            result.add_error(ValidationError::new(
                "manager.exit_retry_initial_ms",
                "exit_retry_initial_ms must be greater than 0",
            ));
        }

        if manager.exit_retry_initial_ms > manager.exit_retry_max_ms {
            result.add_error(ValidationError::new(
                "manager.exit_retry_max_ms",
                "exit_retry_max_ms must not be lower than exit_retry_initial_ms",
            ));
        }
    }

    fn validate_supervisor(config: &Config, result: &mut ValidationResult) {
        if config.supervisor.use_shell && config.supervisor.shell.trim().is_empty() {
            result.add_error(ValidationError::new(
                "supervisor.shell",
                "shell cannot be empty when use_shell is enabled",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
