//! `RUN --device` requests.

use serde::Serialize;

use crate::error::FrontendError;
use crate::fields;
use crate::qualified::QualifiedName;
use crate::run::{FlagSet, ParseExtension, RunCommand};
use crate::suggest;

const DEVICE_FLAG: &str = "device";
const KEYS: &[&str] = &["name", "required"];

/// A device requested for a `RUN` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Qualified device name, e.g. `nvidia.com/gpu=all`.
    pub name: String,
    /// Fail the step if the device is unavailable.
    pub required: bool,
}

/// Parse one `--device` value.
///
/// The value is a comma separated list. The first field may be the device
/// name itself; otherwise the name comes from `name=`. A bare `required`
/// marks the device as required, as does `required=true`.
///
/// # Errors
///
/// Returns an error for malformed fields, unknown keys or an invalid name.
pub fn parse_device(value: &str) -> Result<Device, FrontendError> {
    let fields = fields::split(value).map_err(|message| FrontendError::Csv {
        what: "devices",
        message,
    })?;

    let mut name: Option<String> = None;
    let mut required = false;

    for (i, field) in fields.iter().enumerate() {
        let mut first_field_err = None;
        if i == 0 {
            match QualifiedName::parse(field) {
                Ok(_) => {
                    name = Some(field.clone());
                    continue;
                }
                Err(err) => first_field_err = Some(err),
            }
        }

        let Some((key, value)) = field.split_once('=') else {
            if let (1, Some(source)) = (fields.len(), first_field_err) {
                return Err(FrontendError::InvalidDeviceName {
                    name: field.clone(),
                    source,
                });
            }
            if field.eq_ignore_ascii_case("required") {
                required = true;
                continue;
            }
            return Err(FrontendError::NotKeyValue {
                field: field.clone(),
            });
        };

        match key.to_lowercase().as_str() {
            "name" => {
                if let Some(existing) = &name {
                    return Err(FrontendError::NameAlreadySet {
                        name: existing.clone(),
                    });
                }
                name = Some(value.to_string());
            }
            "required" => {
                required = parse_bool(value).ok_or_else(|| FrontendError::InvalidValue {
                    key: "required".to_string(),
                    value: value.to_string(),
                })?;
            }
            other => {
                return Err(FrontendError::UnexpectedKey {
                    key: other.to_string(),
                    field: field.clone(),
                    suggestion: suggest::closest(other, KEYS, false).map(str::to_string),
                });
            }
        }
    }

    let name = name.unwrap_or_default();
    if let Err(source) = QualifiedName::parse(&name) {
        return Err(FrontendError::InvalidDeviceName { name, source });
    }

    Ok(Device { name, required })
}

/// Boolean spellings accepted for option values.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Registers `--device` on `RUN` and parses its values into [`RunCommand::devices`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceExtension;

impl ParseExtension for DeviceExtension {
    fn name(&self) -> &'static str {
        "device"
    }

    fn register(&self, flags: &mut FlagSet) -> Result<(), FrontendError> {
        flags.add_strings(DEVICE_FLAG)
    }

    fn apply(&self, flags: &FlagSet, cmd: &mut RunCommand) -> Result<(), FrontendError> {
        cmd.devices = flags
            .strings(DEVICE_FLAG)
            .iter()
            .map(|value| parse_device(value))
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}
