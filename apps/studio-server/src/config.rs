use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;
pub const DEFAULT_LOG_FILTER: &str = "studio_server=debug,project=info,tower_http=info";

#[derive(Debug, Clone, Parser)]
#[command(name = "studio-server")]
#[command(about = "Interactive video studio backend - projects, login and embeds")]
#[command(version)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "STUDIO_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// SQLite database file (defaults to the per-user data directory)
    #[arg(long, env = "STUDIO_DATABASE")]
    pub database: Option<PathBuf>,

    /// Lifetime of a login session
    #[arg(long, env = "STUDIO_SESSION_TTL_HOURS", default_value_t = DEFAULT_SESSION_TTL_HOURS)]
    pub session_ttl_hours: i64,

    /// Account created at startup when no user with this name exists
    #[arg(long, env = "STUDIO_ADMIN_USER", requires = "admin_password")]
    pub admin_user: Option<String>,

    #[arg(long, env = "STUDIO_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Mark the session cookie `Secure` (serve over HTTPS)
    #[arg(long, env = "STUDIO_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// tracing filter directives
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(project::default_db_path)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.max(1))
    }

    /// Bootstrap credentials when both halves were given.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_user, &self.admin_password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}
