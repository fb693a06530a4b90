//! Front-end parse errors.

use miette::Diagnostic;
use thiserror::Error;

use crate::qualified::QualifiedNameError;

/// Errors raised while parsing instruction flags.
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum FrontendError {
    /// A comma separated value could not be split into fields.
    #[error("failed to parse csv {what}: {message}")]
    #[diagnostic(code(bock::frontend::csv))]
    Csv {
        /// What was being parsed.
        what: &'static str,
        /// Why splitting failed.
        message: String,
    },

    /// The device name is not a qualified name.
    #[error("invalid device name {name}")]
    #[diagnostic(
        code(bock::frontend::device_name),
        help("Device names look like vendor.com/class=name")
    )]
    InvalidDeviceName {
        /// The rejected name.
        name: String,
        /// Why the name was rejected.
        #[source]
        source: QualifiedNameError,
    },

    /// A bare option was given where a `key=value` pair is required.
    #[error("invalid field '{field}' must be a key=value pair")]
    #[diagnostic(code(bock::frontend::not_key_value))]
    NotKeyValue {
        /// The offending field.
        field: String,
    },

    /// The device name was given twice.
    #[error("device name already set to {name}")]
    #[diagnostic(code(bock::frontend::name_already_set))]
    NameAlreadySet {
        /// The name set first.
        name: String,
    },

    /// A value does not parse for its key.
    #[error("invalid value for {key}: {value}")]
    #[diagnostic(code(bock::frontend::invalid_value))]
    InvalidValue {
        /// Option key.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// Unknown option key.
    #[error("unexpected key '{key}' in '{field}'{}", did_you_mean(.suggestion.as_deref()))]
    #[diagnostic(code(bock::frontend::unexpected_key))]
    UnexpectedKey {
        /// The unknown key.
        key: String,
        /// The field it appeared in.
        field: String,
        /// Closest known key, if any is close enough.
        suggestion: Option<String>,
    },

    /// Unknown instruction flag.
    #[error("unknown flag: --{flag}{}", did_you_mean(.suggestion.as_deref()))]
    #[diagnostic(code(bock::frontend::unknown_flag))]
    UnknownFlag {
        /// The flag name without dashes.
        flag: String,
        /// Closest registered flag, if any is close enough.
        suggestion: Option<String>,
    },

    /// A flag was given without `=value`.
    #[error("missing a value on flag: --{flag}")]
    #[diagnostic(code(bock::frontend::missing_value), help("Use --{flag}=<value>"))]
    MissingFlagValue {
        /// The flag name without dashes.
        flag: String,
    },

    /// Two extensions registered the same flag.
    #[error("flag --{flag} is already registered")]
    #[diagnostic(code(bock::frontend::duplicate_flag))]
    DuplicateFlag {
        /// The flag name without dashes.
        flag: String,
    },
}

fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion
        .map(|s| format!(" (did you mean {s}?)"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_key_with_suggestion() {
        let err = FrontendError::UnexpectedKey {
            key: "nmae".to_string(),
            field: "nmae=foo".to_string(),
            suggestion: Some("name".to_string()),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"unexpected key 'nmae' in 'nmae=foo' (did you mean name?)"
        );
    }

    #[test]
    fn unknown_flag_without_suggestion() {
        let err = FrontendError::UnknownFlag {
            flag: "xyz".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown flag: --xyz");
    }
}
