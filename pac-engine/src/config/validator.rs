//! Configuration validation

use super::schema::{Config, PacConfig, SandboxLimits};
use crate::error::{Result, ValidationError};
use crate::source::PacLocation;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate entire configuration
    pub fn validate(config: &Config) -> Result<()> {
        Self::validate_pac(&config.pac)?;
        Self::validate_limits(&config.sandbox)?;
        Ok(())
    }

    fn validate_pac(pac: &PacConfig) -> Result<()> {
        if pac.fetch_timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout.into());
        }

        if let Some(url) = &pac.url {
            if PacLocation::parse(url).is_err() {
                return Err(ValidationError::InvalidPacUrl { url: url.clone() }.into());
            }
        }

        Ok(())
    }

    fn validate_limits(limits: &SandboxLimits) -> Result<()> {
        if limits.eval_timeout_ms == 0 {
            return Err(ValidationError::ZeroEvalTimeout.into());
        }

        let checks = [
            ("loop_iteration_limit", limits.loop_iteration_limit == 0),
            ("recursion_limit", limits.recursion_limit == 0),
            ("stack_size_limit", limits.stack_size_limit == 0),
        ];
        for (name, is_zero) in checks {
            if is_zero {
                return Err(ValidationError::ZeroLimit { name }.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PacError;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_valid_locations() {
        for url in [
            "http://wpad.example/wpad.dat",
            "file:///etc/proxy.pac",
            "/etc/proxy.pac",
        ] {
            let mut config = Config::default();
            config.pac.url = Some(url.to_string());
            assert!(ConfigValidator::validate(&config).is_ok(), "{url}");
        }
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.pac.url = Some("ftp://example.com/proxy.pac".to_string());

        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(
            err,
            PacError::Validation(ValidationError::InvalidPacUrl { .. })
        ));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.pac.fetch_timeout_secs = 0;

        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(
            err,
            PacError::Validation(ValidationError::ZeroTimeout)
        ));
    }

    #[test]
    fn test_zero_eval_timeout() {
        let mut config = Config::default();
        config.sandbox.eval_timeout_ms = 0;

        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(
            err,
            PacError::Validation(ValidationError::ZeroEvalTimeout)
        ));
    }

    #[test]
    fn test_zero_limit() {
        let mut config = Config::default();
        config.sandbox.recursion_limit = 0;

        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(
            err,
            PacError::Validation(ValidationError::ZeroLimit {
                name: "recursion_limit"
            })
        ));
    }
}
