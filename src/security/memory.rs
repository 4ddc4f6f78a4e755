use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Holder for the API token that zeroizes on drop and never prints its content
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString([REDACTED; {} bytes])", self.inner.len())
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_basic_operations() {
        let secure = SecureString::from("CCIPAT_secret");

        assert_eq!(secure.as_str(), "CCIPAT_secret");
        assert_eq!(secure.len(), 13);
        assert!(!secure.is_empty());
        assert!(SecureString::from(String::new()).is_empty());
    }

    #[test]
    fn test_secure_string_debug_is_redacted() {
        let secure = SecureString::from("CCIPAT_secret");
        let debug = format!("{:?}", secure);

        assert!(!debug.contains("CCIPAT_secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secure_string_zeroize() {
        let mut secure = SecureString::from("CCIPAT_secret");
        secure.zeroize();
        assert!(secure.is_empty());
    }
}
