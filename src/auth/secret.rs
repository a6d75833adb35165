use std::fmt;

use zeroize::{Zeroize, Zeroizing};

/// String holding sensitive material (poll tokens, app passwords).
///
/// The backing buffer is overwritten when the value is dropped or
/// [`wipe`](Self::wipe)d. `Debug` never prints the contents and there is no
/// `Display` or `Serialize` impl, so the value cannot end up in logs by
/// accident.
///
/// # Example
/// ```
/// use loginflow::auth::SecretString;
///
/// let mut secret = SecretString::new("hunter2");
/// assert_eq!(secret.expose_secret(), "hunter2");
/// assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
/// secret.wipe();
/// assert!(secret.is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the secret. Callers must not log or persist the result.
    pub fn expose_secret(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite the secret in place and leave an empty string behind.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl<'de> serde::Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        <String as serde::Deserialize>::deserialize(deserializer).map(SecretString::from)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let secret = SecretString::new("tok1");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("tok1"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn wipe_clears_value() {
        let mut secret = SecretString::from("secret123".to_string());
        secret.wipe();
        assert!(secret.is_empty());
        assert_eq!(secret.expose_secret(), "");
    }
}
