use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const HARDENED: u32 = 0x8000_0000;

/// `index` with the hardened bit set, i.e. `index'`.
pub const fn hardened(index: u32) -> u32 {
    HARDENED | index
}

/// BIP-32 style derivation path, e.g. `m/44'/60'/0'`.
///
/// Components are stored with the hardened bit already applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn is_hardened(component: u32) -> bool {
        component & HARDENED != 0
    }

    /// Path extended by one non-hardened child index.
    pub fn child(&self, index: u32) -> Self {
        let mut components = self.0.clone();
        components.push(index);
        Self(components)
    }
}

/// Parse a derivation path string like "m/44'/60'/0'/0" into its components.
/// The leading "m/" is optional; both `'` and `h` mark a hardened index.
impl FromStr for DerivationPath {
    type Err = ConfigError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        let trimmed = path.trim();
        let body = match trimmed.strip_prefix('m') {
            Some("") => return Ok(Self(vec![])),
            Some(rest) => rest
                .strip_prefix('/')
                .ok_or_else(|| invalid("expected '/' after 'm'".to_string()))?,
            None => trimmed,
        };

        if body.is_empty() {
            return Err(invalid("path is empty".to_string()));
        }

        let mut components = Vec::new();
        for component in body.split('/') {
            if component.is_empty() {
                return Err(invalid("empty path component".to_string()));
            }

            let (is_hardened, number_str) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
            {
                Some(number) => (true, number),
                None => (false, component),
            };

            let number: u32 = number_str
                .parse()
                .map_err(|_| invalid(format!("invalid number '{}'", component)))?;
            if number & HARDENED != 0 {
                return Err(invalid(format!("index {} out of range", number)));
            }

            components.push(if is_hardened { HARDENED | number } else { number });
        }

        Ok(Self(components))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for &component in &self.0 {
            if Self::is_hardened(component) {
                write!(f, "/{}'", component & !HARDENED)?;
            } else {
                write!(f, "/{}", component)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for DerivationPath {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DerivationPath> for String {
    fn from(path: DerivationPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_root_prefix() {
        let path: DerivationPath = "44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(
            path.components(),
            &[HARDENED | 44, HARDENED | 60, HARDENED, 0, 0]
        );
        assert_eq!(path.to_string(), "m/44'/60'/0'/0/0");
    }

    #[test]
    fn test_parse_with_root_and_h_marker() {
        let path: DerivationPath = "m/44h/60h/0h".parse().unwrap();
        assert_eq!(path, "44'/60'/0'".parse::<DerivationPath>().unwrap());
        assert_eq!("m".parse::<DerivationPath>().unwrap().components(), &[] as &[u32]);
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for bad in ["", "m44'", "44'//0", "44'/x/0", "44'/2147483648", "/44'"] {
            assert!(bad.parse::<DerivationPath>().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_child_appends_plain_index() {
        let path: DerivationPath = "m/44'/60'/0'".parse().unwrap();
        assert_eq!(path.child(7).to_string(), "m/44'/60'/0'/7");
    }

    #[test]
    fn test_serde_as_string() {
        let path: DerivationPath = "m/44'/60'/0'/0".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"m/44'/60'/0'/0\"");
        let back: DerivationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
