use dargah::ZibalConfig;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: log::Level,

    #[envconfig(nested)]
    pub zibal: ZibalConfig,

    #[envconfig(from = "DEMO_AMOUNT", default = "10000")]
    pub amount: u64,

    #[envconfig(from = "DEMO_CALLBACK_URL", default = "https://yourdomain.com/callback")]
    pub callback_url: String,

    #[envconfig(from = "DEMO_DESCRIPTION", default = "")]
    pub description: String,

    /// When set, verify this payment instead of opening a new one.
    #[envconfig(from = "DEMO_TRACK_ID")]
    pub track_id: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }
}
