use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub jwt_secret: Option<String>,
    pub memory: bool,
    /// Credentials seeded into the in-memory credential map.
    pub users: Vec<(String, String)>,
}

/// What the process should do after parsing its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    /// Apply the schema and exit.
    Migrate,
    /// Print an Argon2 hash of the given password and exit.
    HashPassword(String),
    /// Store a credential and exit.
    AddUser { username: String, secret: String },
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Path-addressed file management API")]
pub struct Args {
    /// Host to bind to (overrides FILE_API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides FILE_API_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FILE_API_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// HMAC secret used to sign access tokens (overrides FILE_API_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Keep objects and credentials in memory instead of SQLite + disk
    #[arg(long)]
    pub memory: bool,

    /// Credential for --memory mode; repeatable
    #[arg(long = "user", value_name = "USERNAME:SECRET")]
    pub users: Vec<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Print an Argon2 hash of PASSWORD and exit
    #[arg(long, value_name = "PASSWORD")]
    pub hash_password: Option<String>,

    /// Store a credential for USERNAME (requires --password) and exit
    #[arg(long, value_name = "USERNAME", requires = "password")]
    pub add_user: Option<String>,

    /// Secret stored by --add-user; plaintext or an Argon2 PHC string
    #[arg(long)]
    pub password: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command
    /// to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        Self::from_sources(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge `args` over the `FILE_API_*` variables returned by `lookup`.
    pub fn from_sources(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, Command)> {
        // --- Environment fallback ---
        let env_host = lookup("FILE_API_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match lookup("FILE_API_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILE_API_PORT value `{}`", value))?,
            None => 3000,
        };
        let env_storage =
            lookup("FILE_API_STORAGE_DIR").unwrap_or_else(|| "./data/objects".into());
        let env_db = lookup("FILE_API_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/meta/file_api.db".into());
        let env_secret = lookup("FILE_API_JWT_SECRET");

        let command = match (args.migrate, args.hash_password, args.add_user) {
            (true, None, None) => Command::Migrate,
            (false, Some(password), None) => Command::HashPassword(password),
            (false, None, Some(username)) => Command::AddUser {
                username,
                secret: args.password.context("--add-user requires --password")?,
            },
            (false, None, None) => Command::Serve,
            _ => bail!("--migrate, --hash-password and --add-user are mutually exclusive"),
        };

        let users = args
            .users
            .iter()
            .map(|entry| match entry.split_once(':') {
                Some((user, secret)) if !user.is_empty() => {
                    Ok((user.to_string(), secret.to_string()))
                }
                _ => bail!("--user expects USERNAME:SECRET, got `{}`", entry),
            })
            .collect::<Result<Vec<_>>>()?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            jwt_secret: args.jwt_secret.or(env_secret).filter(|s| !s.is_empty()),
            memory: args.memory,
            users,
        };

        Ok((cfg, command))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The token signing secret; serving without one is a startup error.
    pub fn jwt_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .context("no token secret configured; set FILE_API_JWT_SECRET or --jwt-secret")
    }
}

/// Never prints the token secret.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("memory", &self.memory)
            .field(
                "users",
                &self.users.iter().map(|(u, _)| u.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
