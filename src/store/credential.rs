// Trustward — Store credentials
//
// SECURITY: the secret is private, zeroized on drop, and never appears in
// Debug output. It reaches external tools only through the child's
// environment.

use std::fmt;

use zeroize::Zeroizing;

/// The secret that opened a store, or no secret at all for formats that
/// have none.
#[derive(Clone, Default)]
pub struct Credential(Option<Zeroizing<String>>);

impl Credential {
    /// Sentinel for stores without a credential concept.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(secret: impl Into<String>) -> Self {
        Self(Some(Zeroizing::new(secret.into())))
    }

    /// Access the raw secret. Callers must not log it.
    pub fn expose(&self) -> Option<&str> {
        self.0.as_deref().map(String::as_str)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Credential([REDACTED])"),
            None => f.write_str("Credential(none)"),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::new("changeit");
        let debug_output = format!("{:?}", cred);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(
            !debug_output.contains("changeit"),
            "Debug output must NEVER contain the raw secret"
        );
    }

    #[test]
    fn test_empty_secret_is_not_none() {
        let empty = Credential::new("");
        assert!(!empty.is_none());
        assert_eq!(empty.expose(), Some(""));

        let none = Credential::none();
        assert!(none.is_none());
        assert_eq!(none.expose(), None);
        assert_eq!(format!("{:?}", none), "Credential(none)");
    }
}
