pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        pub jwt_secret: String,
        pub site_url: String,
        #[serde(default = "default_allowed_origins")]
        pub allowed_origins: String,
        pub billing_api_key: String,
        #[serde(default = "default_billing_api_url")]
        pub billing_api_url: String,
        pub billing_store_id: i64,
        pub billing_variant_id: i64,
        #[serde(default = "default_rate_limit_per_second")]
        pub rate_limit_per_second: u32,
        #[serde(default = "default_rate_limit_burst")]
        pub rate_limit_burst: u32,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Returns the configured CORS origins as individual values.
        pub fn origins(&self) -> Vec<String> {
            self.allowed_origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_allowed_origins() -> String {
        "http://localhost:3000,http://localhost:5173".to_string()
    }

    fn default_billing_api_url() -> String {
        "https://api.lemonsqueezy.com/v1".to_string()
    }

    fn default_rate_limit_per_second() -> u32 {
        50
    }

    fn default_rate_limit_burst() -> u32 {
        100
    }
}

pub mod auth;
pub mod contact;
pub mod entities;
pub mod group;
pub mod payment;
pub mod profile;
pub mod web;
