//! Qualified device names (`vendor/class=name`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Why a string is not a qualified device name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualifiedNameError {
    /// Not of the form `vendor/class=name` with every part present, or a
    /// device path was given.
    #[error("unqualified device {device:?}, missing vendor")]
    Unqualified {
        /// The input.
        device: String,
    },

    /// One of the parts contains characters it may not.
    #[error("invalid device {device:?}: invalid {part} {value:?}, {reason}")]
    InvalidPart {
        /// The input.
        device: String,
        /// Which part was rejected: vendor, class or name.
        part: &'static str,
        /// The rejected part.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// A parsed `vendor/class=name` device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Vendor, e.g. `nvidia.com`.
    pub vendor: String,
    /// Device class, e.g. `gpu`.
    pub class: String,
    /// Device name, e.g. `all` or `0`.
    pub name: String,
}

impl QualifiedName {
    /// Parse and validate a qualified device name.
    ///
    /// # Errors
    ///
    /// Returns an error if a part is missing or contains invalid characters.
    pub fn parse(device: &str) -> Result<Self, QualifiedNameError> {
        let unqualified = || QualifiedNameError::Unqualified {
            device: device.to_string(),
        };

        // A leading slash means a device path, not a vendor
        if device.starts_with('/') {
            return Err(unqualified());
        }
        let (kind, name) = device
            .split_once('=')
            .filter(|(kind, name)| !kind.is_empty() && !name.is_empty())
            .ok_or_else(unqualified)?;
        let (vendor, class) = kind
            .split_once('/')
            .filter(|(vendor, class)| !vendor.is_empty() && !class.is_empty())
            .ok_or_else(unqualified)?;

        let invalid = |part, value: &str, reason: String| QualifiedNameError::InvalidPart {
            device: device.to_string(),
            part,
            value: value.to_string(),
            reason,
        };

        validate(vendor, char::is_ascii_alphabetic, &['_', '-', '.'])
            .map_err(|reason| invalid("vendor", vendor, reason))?;
        validate(class, char::is_ascii_alphabetic, &['_', '-'])
            .map_err(|reason| invalid("class", class, reason))?;
        validate(name, char::is_ascii_alphanumeric, &['_', '-', '.', ':'])
            .map_err(|reason| invalid("name", name, reason))?;

        Ok(Self {
            vendor: vendor.to_string(),
            class: class.to_string(),
            name: name.to_string(),
        })
    }

    /// Whether `device` is a valid qualified name.
    #[must_use]
    pub fn is_qualified(device: &str) -> bool {
        Self::parse(device).is_ok()
    }
}

/// Check the first character with `first`, inner characters against ASCII
/// alphanumerics plus `extra`, and require an ASCII alphanumeric last
/// character.
fn validate(value: &str, first: fn(&char) -> bool, extra: &[char]) -> Result<(), String> {
    let chars: Vec<char> = value.chars().collect();
    let (Some(&head), Some(&tail)) = (chars.first(), chars.last()) else {
        return Err("empty".to_string());
    };

    if !first(&head) {
        return Err(format!("should start with {}", describe(first)));
    }
    if let Some(c) = chars
        .iter()
        .skip(1)
        .take(chars.len().saturating_sub(2))
        .find(|c| !c.is_ascii_alphanumeric() && !extra.contains(*c))
    {
        return Err(format!("invalid character {c:?}"));
    }
    if !tail.is_ascii_alphanumeric() {
        return Err("should end with a letter or digit".to_string());
    }
    Ok(())
}

fn describe(first: fn(&char) -> bool) -> &'static str {
    if first(&'0') { "a letter or digit" } else { "a letter" }
}

impl FromStr for QualifiedName {
    type Err = QualifiedNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}={}", self.vendor, self.class, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_valid() {
        let q = QualifiedName::parse("nvidia.com/gpu=all").unwrap();
        assert_eq!(q.vendor, "nvidia.com");
        assert_eq!(q.class, "gpu");
        assert_eq!(q.name, "all");
        assert_eq!(q.to_string(), "nvidia.com/gpu=all");

        assert!(QualifiedName::is_qualified("vendor1.com/device=foo:0"));
        assert!(QualifiedName::is_qualified("example.org/net-card=eth_1"));
    }

    #[test]
    fn parse_missing_parts() {
        for device in [
            "gpu0",
            "/dev/nvidia0",
            "/gpu=all",
            "nvidia.com=all",
            "nvidia.com/=all",
            "=all",
            "nvidia.com/gpu=",
        ] {
            assert_eq!(
                QualifiedName::parse(device),
                Err(QualifiedNameError::Unqualified {
                    device: device.to_string()
                }),
                "{device}"
            );
        }
        insta::assert_snapshot!(
            QualifiedName::parse("nvidia.com/gpu=").unwrap_err().to_string(),
            @r#"unqualified device "nvidia.com/gpu=", missing vendor"#
        );
    }

    #[test]
    fn non_ascii_parts_rejected() {
        let vendor = QualifiedName::parse("nvídia.com/gpu=all").unwrap_err();
        assert!(matches!(
            vendor,
            QualifiedNameError::InvalidPart { part: "vendor", .. }
        ));
        assert!(matches!(
            QualifiedName::parse("éx.com/gpu=all"),
            Err(QualifiedNameError::InvalidPart { part: "vendor", .. })
        ));
        assert!(matches!(
            QualifiedName::parse("nvidia.com/gpü=all"),
            Err(QualifiedNameError::InvalidPart { part: "class", .. })
        ));
        assert!(matches!(
            QualifiedName::parse("nvidia.com/gpu=ällé"),
            Err(QualifiedNameError::InvalidPart { part: "name", .. })
        ));
        assert!(matches!(
            QualifiedName::parse("nvidia.com/gpu=0١"),
            Err(QualifiedNameError::InvalidPart { part: "name", .. })
        ));
    }

    #[test]
    fn parse_invalid_parts() {
        let err = QualifiedName::parse("1vendor.com/gpu=all").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"invalid device "1vendor.com/gpu=all": invalid vendor "1vendor.com", should start with a letter"#
        );

        assert!(matches!(
            QualifiedName::parse("vendor.com/g.pu=all"),
            Err(QualifiedNameError::InvalidPart { part: "class", .. })
        ));
        assert!(matches!(
            QualifiedName::parse("vendor.com/gpu=all-"),
            Err(QualifiedNameError::InvalidPart { part: "name", .. })
        ));
        assert!(matches!(
            QualifiedName::parse("vendor.com/gpu=a b"),
            Err(QualifiedNameError::InvalidPart { part: "name", .. })
        ));
    }

    proptest! {
        #[test]
        fn generated_names_parse(
            vendor in "[a-z][a-z0-9.-]{0,10}[a-z0-9]",
            class in "[a-z][a-z0-9_-]{0,10}[a-z0-9]",
            name in "[a-z0-9][a-z0-9:._-]{0,10}[a-z0-9]",
        ) {
            let device = format!("{vendor}/{class}={name}");
            let parsed = QualifiedName::parse(&device).unwrap();
            prop_assert_eq!(parsed.to_string(), device);
        }
    }
}
