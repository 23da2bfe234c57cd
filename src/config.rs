use anyhow::{bail, Context};
use storefront_types::listing::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use storefront_types::Locale;
use url::Url;

pub static API_URL_KEY: &str = "STOREFRONT_API_URL";
pub static PAGE_SIZE_KEY: &str = "STOREFRONT_PAGE_SIZE";
pub static LOCALE_KEY: &str = "STOREFRONT_LOCALE";
pub static SITE_NAME_KEY: &str = "STOREFRONT_SITE_NAME";
pub static SITE_URL_KEY: &str = "STOREFRONT_SITE_URL";

static DEFAULT_API_URL: &str = "http://localhost:3000/api";
static DEFAULT_SITE_NAME: &str = "Storefront";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: Url,
    pub page_size: u32,
    pub locale: Locale,
    pub site_name: String,
    /// Absolute site base without trailing slash.
    pub site_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| envmnt::exists(key).then(|| envmnt::get_or(key, "")))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_api_url = get(API_URL_KEY).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&raw_api_url)
            .with_context(|| format!("Invalid {API_URL_KEY} {raw_api_url:?}"))?;
        if api_url.cannot_be_a_base() {
            bail!("{API_URL_KEY} {raw_api_url:?} cannot be used as a base url");
        }

        let page_size = match get(PAGE_SIZE_KEY) {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("Invalid {PAGE_SIZE_KEY} {v:?}"))?,
            None => DEFAULT_PAGE_SIZE,
        }
        .clamp(1, MAX_PAGE_SIZE);

        let site_url = get(SITE_URL_KEY)
            .map(|u| {
                Url::parse(&u).with_context(|| format!("Invalid {SITE_URL_KEY} {u:?}"))?;
                Ok::<_, anyhow::Error>(u.trim_end_matches('/').to_string())
            })
            .transpose()?;

        Ok(Self {
            api_url,
            page_size,
            locale: get(LOCALE_KEY).map(Locale::new).unwrap_or_default(),
            site_name: get(SITE_NAME_KEY).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
            site_url,
        })
    }
}

/// Loads `path` into the environment when it exists.
pub fn load_dotenv(path: &str) -> Result<(), anyhow::Error> {
    match std::fs::File::open(path) {
        Ok(_) => envmnt::load_file(path)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No {path} file, using process environment");
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open {path} file: {err}"));
        }
    }
    Ok(())
}
