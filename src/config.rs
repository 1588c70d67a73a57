use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_url: String,
    pub mongo_db: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub cookie_secure: bool,
    pub log_level: String,
    pub github: Option<GithubConfig>,
    pub admin: Option<AdminSeed>,
}

/// Repository used as the public image host for perfume pictures.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

/// Account created with the admin role at startup when no user holds its email.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let mongo_url = env_required("MONGO_URL")?;
        let mongo_db = env_required("MONGO_DB")?;
        let jwt_secret = env_required("SECRET_KEY")?;

        let host: IpAddr = env_or("HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid HOST: {e}"))?;

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let max_body_size: usize = env_or("ELFUME_MAX_BODY_SIZE", "5242880")
            .parse()
            .map_err(|e| format!("Invalid ELFUME_MAX_BODY_SIZE: {e}"))?;

        let cookie_secure = match env_or("ELFUME_COOKIE_SECURE", "true").as_str() {
            "false" | "0" => false,
            _ => true,
        };

        let log_level = env_or("ELFUME_LOG_LEVEL", "info");

        let github = match (
            std::env::var("GITHUB_OWNER").ok(),
            std::env::var("GITHUB_REPO").ok(),
            std::env::var("GITHUB_TOKEN").ok(),
        ) {
            (Some(owner), Some(repo), Some(token))
                if !owner.is_empty() && !repo.is_empty() && !token.is_empty() =>
            {
                Some(GithubConfig { owner, repo, token })
            }
            _ => None,
        };

        let admin = match (
            env_optional("ELFUME_ADMIN_USERNAME"),
            env_optional("ELFUME_ADMIN_EMAIL"),
            env_optional("ELFUME_ADMIN_PASSWORD"),
            env_optional("ELFUME_ADMIN_PHONE"),
        ) {
            (Some(username), Some(email), Some(password), Some(phone)) => Some(AdminSeed {
                username,
                email,
                password,
                phone,
            }),
            (None, None, None, None) => None,
            _ => {
                return Err(
                    "ELFUME_ADMIN_USERNAME, ELFUME_ADMIN_EMAIL, ELFUME_ADMIN_PASSWORD and \
                     ELFUME_ADMIN_PHONE must be set together"
                        .to_string(),
                );
            }
        };

        Ok(Config {
            mongo_url,
            mongo_db,
            jwt_secret,
            host,
            port,
            max_body_size,
            cookie_secure,
            log_level,
            github,
            admin,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("Missing required environment variable: {key}")),
    }
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
