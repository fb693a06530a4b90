//! `RUN` instruction flags.
//!
//! Flags are contributed by [`ParseExtension`]s held by the [`RunParser`] in
//! the order they were added. Parsing happens in three steps: every extension
//! registers its flags, the flag tokens are read, then every extension applies
//! the values it registered to the [`RunCommand`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::{Device, DeviceExtension};
use crate::error::FrontendError;
use crate::suggest;

/// Flags known to a `RUN` instruction and the values given for them.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    values: BTreeMap<String, Vec<String>>,
}

impl FlagSet {
    /// Register a repeatable string flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag is already registered.
    pub fn add_strings(&mut self, name: &str) -> Result<(), FrontendError> {
        if self.values.contains_key(name) {
            return Err(FrontendError::DuplicateFlag {
                flag: name.to_string(),
            });
        }
        self.values.insert(name.to_string(), Vec::new());
        Ok(())
    }

    /// Values given for `name`, in order. Empty for unknown flags.
    #[must_use]
    pub fn strings(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[], Vec::as_slice)
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), FrontendError> {
        match self.values.get_mut(name) {
            Some(values) => {
                values.push(value.to_string());
                Ok(())
            }
            None => {
                let known: Vec<&str> = self.values.keys().map(String::as_str).collect();
                Err(FrontendError::UnknownFlag {
                    flag: name.to_string(),
                    suggestion: suggest::closest(name, &known, true).map(str::to_string),
                })
            }
        }
    }
}

/// A parsed `RUN` instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCommand {
    /// Command and arguments after the flags.
    pub args: Vec<String>,
    /// Requested devices.
    pub devices: Vec<Device>,
}

/// Contributes flags to `RUN`.
pub trait ParseExtension: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Register the flags this extension handles. Runs before flags are read.
    ///
    /// # Errors
    ///
    /// Returns an error if a flag clashes with one already registered.
    fn register(&self, flags: &mut FlagSet) -> Result<(), FrontendError>;

    /// Apply parsed flag values to the command. Runs after flags are read.
    ///
    /// # Errors
    ///
    /// Returns an error if a flag value is invalid.
    fn apply(&self, flags: &FlagSet, cmd: &mut RunCommand) -> Result<(), FrontendError>;
}

/// Parses `RUN` flags with an ordered list of extensions.
pub struct RunParser {
    extensions: Vec<Box<dyn ParseExtension>>,
}

impl RunParser {
    /// A parser with no extensions; every flag is rejected.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            extensions: Vec::new(),
        }
    }

    /// Append an extension. Extensions run in the order they are added.
    #[must_use]
    pub fn with_extension(mut self, extension: impl ParseExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Parse the tokens following the `RUN` keyword.
    ///
    /// Leading `--flag=value` tokens are flags; `--` or the first other token
    /// starts the command.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown flags, flags without a value, or values an
    /// extension rejects.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<RunCommand, FrontendError> {
        let mut flags = FlagSet::default();
        for extension in &self.extensions {
            extension.register(&mut flags)?;
        }

        let mut rest = tokens.iter().map(AsRef::<str>::as_ref).peekable();
        while let Some(token) = rest.next_if(|t| t.starts_with("--")) {
            let Some(flag) = token.strip_prefix("--").filter(|f| !f.is_empty()) else {
                break;
            };
            let Some((name, value)) = flag.split_once('=') else {
                return Err(FrontendError::MissingFlagValue {
                    flag: flag.to_string(),
                });
            };
            flags.set(name, value)?;
        }

        let mut cmd = RunCommand {
            args: rest.map(str::to_string).collect(),
            devices: Vec::new(),
        };

        for extension in &self.extensions {
            tracing::trace!(extension = extension.name(), "Applying RUN flags");
            extension.apply(&flags, &mut cmd)?;
        }

        Ok(cmd)
    }

    /// Parse a whitespace separated `RUN` line (without the keyword).
    ///
    /// # Errors
    ///
    /// See [`RunParser::parse`].
    pub fn parse_line(&self, line: &str) -> Result<RunCommand, FrontendError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        self.parse(&tokens)
    }
}

impl Default for RunParser {
    fn default() -> Self {
        Self::empty().with_extension(DeviceExtension)
    }
}

impl std::fmt::Debug for RunParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.extensions.iter().map(|e| e.name()).collect();
        f.debug_struct("RunParser").field("extensions", &names).finish()
    }
}
