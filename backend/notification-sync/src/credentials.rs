/// Session credential sources
///
/// The sync core never issues credentials. It only reads an opaque token that
/// another part of the client persisted, and skips connecting when none exists.
use crate::config::SessionConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Opaque session token
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        SessionToken(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SessionToken(***)")
    }
}

/// Where the current session token is read from
pub trait CredentialSource: Send + Sync {
    /// `None` when no session is active
    fn session_token(&self) -> Option<SessionToken>;
}

/// Fixed token, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<SessionToken>);

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        StaticCredentials(Some(SessionToken::new(token)))
    }

    pub fn none() -> Self {
        StaticCredentials(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn session_token(&self) -> Option<SessionToken> {
        self.0.clone()
    }
}

/// Token read from an environment variable on every lookup
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredentials {
    fn session_token(&self) -> Option<SessionToken> {
        std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(SessionToken)
    }
}

/// Token persisted in a file by the login flow
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileCredentials {
    fn session_token(&self) -> Option<SessionToken> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(SessionToken::new(token))
                }
            }
            Err(e) => {
                debug!("No session token at {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// First source that yields a token wins
#[derive(Clone, Default)]
pub struct ChainedCredentials {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl ChainedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Environment variable first, then the token file if one is configured
    pub fn from_config(config: &SessionConfig) -> Self {
        let chain = ChainedCredentials::new().with(EnvCredentials::new(&config.token_env));
        match &config.token_file {
            Some(path) => chain.with(FileCredentials::new(path)),
            None => chain,
        }
    }
}

impl CredentialSource for ChainedCredentials {
    fn session_token(&self) -> Option<SessionToken> {
        self.sources.iter().find_map(|source| source.session_token())
    }
}
