use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CredentialsConfig;

/// An access/refresh token pair. Both halves are absent when unauthenticated.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Credential {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<&CredentialsConfig> for Credential {
    fn from(config: &CredentialsConfig) -> Self {
        Credential {
            access_token: config.access_token.clone(),
            refresh_token: config.refresh_token.clone(),
        }
    }
}

fn mask(token: &Option<String>) -> &'static str {
    match token {
        Some(_) => "<redacted>",
        None => "<none>",
    }
}

/// Tokens never show up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .finish()
    }
}
