use std::fmt;

/// Environment variable holding the shared password unless configured otherwise.
pub const DEFAULT_PASSWORD_ENV: &str = "RECDOC_PASSWORD";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no password configured; set the {0} environment variable")]
    SecretUnset(String),
    #[error("incorrect password")]
    Rejected,
}

/// Password check against a single secret taken from the process environment.
pub struct AuthGate {
    secret: Option<String>,
    source: String,
}

impl AuthGate {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            secret: (!secret.is_empty()).then_some(secret),
            source: DEFAULT_PASSWORD_ENV.to_string(),
        }
    }

    /// Reads the secret from `var`. An unset or empty variable denies every attempt.
    pub fn from_env(var: &str) -> Self {
        let secret = std::env::var(var).ok().filter(|s| !s.is_empty());
        Self {
            secret,
            source: var.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn verify(&self, attempt: &str) -> Result<AuthContext, AuthError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| AuthError::SecretUnset(self.source.clone()))?;
        if constant_time_eq(secret.as_bytes(), attempt.as_bytes()) {
            Ok(AuthContext { _granted: () })
        } else {
            Err(AuthError::Rejected)
        }
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("source", &self.source)
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

/// Proof that the password gate was passed. Only `AuthGate::verify` creates one.
#[derive(Debug, Clone)]
pub struct AuthContext {
    _granted: (),
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
