use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt};

/// Default upload ceiling (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_QUALITY: u8 = 80;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub public_url: String,
    pub admin_password: Secret,
    pub uploads: UploadDefaults,
    pub production: bool,
}

/// Credentials and location of the S3-compatible bucket.
///
/// Built once at startup and handed to the store client; nothing else reads
/// these values.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: Secret,
}

/// Per-upload defaults used when the form leaves an option out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadDefaults {
    pub use_hash_name: bool,
    pub enable_webp_compression: bool,
    pub quality: u8,
    pub max_file_size: usize,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            use_hash_name: false,
            enable_webp_compression: true,
            quality: DEFAULT_QUALITY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// String wrapper that keeps secrets out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image hosting API backed by an S3-compatible bucket")]
pub struct Args {
    /// Host to bind to (overrides IMGHOST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMGHOST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// R2 account id, used to derive the endpoint (overrides R2_ACCOUNT_ID)
    #[arg(long)]
    pub account_id: Option<String>,

    /// Bucket name (overrides R2_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3 endpoint URL (overrides R2_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Signing region (overrides R2_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Public base URL objects are served from (overrides R2_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Deployment environment, `production` marks cookies Secure (overrides IMGHOST_ENV)
    #[arg(long)]
    pub env: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_lookup(args, |name| env::var(name).ok())
    }

    /// Merge CLI args over values produced by `lookup`.
    pub fn from_lookup<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} is not set", name))
        };

        // --- Server ---
        let host = args
            .host
            .or_else(|| lookup("IMGHOST_HOST"))
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match (args.port, lookup("IMGHOST_PORT")) {
            (Some(port), _) => port,
            (None, Some(value)) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMGHOST_PORT value `{}`", value))?,
            (None, None) => 3000,
        };

        // --- Store ---
        let account_id = args.account_id.or_else(|| lookup("R2_ACCOUNT_ID"));
        let endpoint = match args.endpoint.or_else(|| lookup("R2_ENDPOINT")) {
            Some(endpoint) => endpoint,
            None => match account_id {
                Some(id) => format!("https://{}.r2.cloudflarestorage.com", id),
                None => bail!("either R2_ENDPOINT or R2_ACCOUNT_ID must be set"),
            },
        };
        let bucket = match args.bucket {
            Some(bucket) => bucket,
            None => required("R2_BUCKET_NAME")?,
        };
        let store = StoreConfig {
            endpoint,
            region: args
                .region
                .or_else(|| lookup("R2_REGION"))
                .unwrap_or_else(|| "auto".into()),
            bucket,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: Secret::new(required("R2_SECRET_ACCESS_KEY")?),
        };

        let public_url = match args.public_url {
            Some(url) => url,
            None => required("R2_PUBLIC_URL")?,
        };

        // --- Upload defaults ---
        let defaults = UploadDefaults::default();
        let uploads = UploadDefaults {
            use_hash_name: parse_flag(lookup("USE_HASH_NAME"), defaults.use_hash_name),
            enable_webp_compression: parse_flag(
                lookup("ENABLE_WEBP_COMPRESSION"),
                defaults.enable_webp_compression,
            ),
            quality: match lookup("WEBP_QUALITY") {
                Some(value) => parse_quality(&value)
                    .with_context(|| format!("parsing WEBP_QUALITY value `{}`", value))?,
                None => defaults.quality,
            },
            max_file_size: match lookup("MAX_FILE_SIZE") {
                Some(value) => value
                    .parse::<usize>()
                    .with_context(|| format!("parsing MAX_FILE_SIZE value `{}`", value))?,
                None => defaults.max_file_size,
            },
        };

        let env_name = args
            .env
            .or_else(|| lookup("IMGHOST_ENV"))
            .unwrap_or_else(|| "development".into());

        Ok(Self {
            host,
            port,
            store,
            public_url: public_url.trim_end_matches('/').to_string(),
            admin_password: Secret::new(required("ADMIN_PASSWORD")?),
            uploads,
            production: env_name.eq_ignore_ascii_case("production"),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Lenient boolean parsing shared by env vars and form fields.
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("on") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" || value.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        None
    }
}

/// `parse_bool` with a fallback for unset or unrecognized values.
pub fn parse_flag(value: Option<String>, default: bool) -> bool {
    value.as_deref().and_then(parse_bool).unwrap_or(default)
}

/// Parse a quality value, accepting only 1..=100.
pub fn parse_quality(value: &str) -> Option<u8> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|q| (1..=100).contains(q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn empty_args() -> Args {
        Args::parse_from(["imghost"])
    }

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("R2_ACCOUNT_ID", "abc123"),
            ("R2_ACCESS_KEY_ID", "key"),
            ("R2_SECRET_ACCESS_KEY", "secret"),
            ("R2_BUCKET_NAME", "images"),
            ("R2_PUBLIC_URL", "https://img.example.com/"),
            ("ADMIN_PASSWORD", "hunter2"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>, args: Args) -> Result<AppConfig> {
        AppConfig::from_lookup(args, |name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn derives_r2_endpoint_and_applies_defaults() {
        let cfg = load(&base_env(), empty_args()).unwrap();
        assert_eq!(cfg.store.endpoint, "https://abc123.r2.cloudflarestorage.com");
        assert_eq!(cfg.store.region, "auto");
        assert_eq!(cfg.public_url, "https://img.example.com");
        assert_eq!(cfg.uploads, UploadDefaults::default());
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert!(!cfg.production);
    }

    #[test]
    fn cli_overrides_environment() {
        let mut env = base_env();
        env.insert("IMGHOST_PORT", "8080");
        let args = Args::parse_from([
            "imghost",
            "--port",
            "9000",
            "--endpoint",
            "http://127.0.0.1:9000",
            "--env",
            "production",
        ]);
        let cfg = load(&env, args).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.store.endpoint, "http://127.0.0.1:9000");
        assert!(cfg.production);
    }

    #[test]
    fn upload_defaults_come_from_environment() {
        let mut env = base_env();
        env.insert("USE_HASH_NAME", "true");
        env.insert("ENABLE_WEBP_COMPRESSION", "0");
        env.insert("WEBP_QUALITY", "65");
        env.insert("MAX_FILE_SIZE", "1024");
        let cfg = load(&env, empty_args()).unwrap();
        assert!(cfg.uploads.use_hash_name);
        assert!(!cfg.uploads.enable_webp_compression);
        assert_eq!(cfg.uploads.quality, 65);
        assert_eq!(cfg.uploads.max_file_size, 1024);
    }

    #[test]
    fn missing_password_is_an_error() {
        let mut env = base_env();
        env.remove("ADMIN_PASSWORD");
        let err = load(&env, empty_args()).unwrap_err();
        assert!(err.to_string().contains("ADMIN_PASSWORD"));
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let mut env = base_env();
        env.insert("WEBP_QUALITY", "0");
        assert!(load(&env, empty_args()).is_err());
        assert_eq!(parse_quality("101"), None);
        assert_eq!(parse_quality(" 100 "), Some(100));
    }

    #[test]
    fn secrets_are_redacted() {
        let cfg = load(&base_env(), empty_args()).unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("\"secret\""));
    }

    #[test]
    fn flags_fall_back_to_default() {
        assert!(parse_flag(Some("on".into()), false));
        assert!(!parse_flag(Some("False".into()), true));
        assert!(parse_flag(Some("maybe".into()), true));
        assert!(!parse_flag(None, false));
    }
}
