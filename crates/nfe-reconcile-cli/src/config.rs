use anyhow::{Context, Result, bail};
use nfe_reconcile_sources::{ErpSettings, PosSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const POS_PASSWORD_VAR: &str = "NFE_POS_PASSWORD";
pub const ERP_PASSWORD_VAR: &str = "NFE_ERP_PASSWORD";

const CONFIG_FILE_NAMES: [&str; 2] = ["nfe-reconcile.toml", ".nfe-reconcile.toml"];

fn default_mysql_port() -> u16 {
    3306
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_application_name() -> String {
    "nfe-reconcile".to_owned()
}

fn default_output_directory() -> PathBuf {
    std::env::temp_dir()
}

fn default_file_name() -> String {
    "missing_invoices.xlsx".to_owned()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPos {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigErp {
    pub host: String,
    #[serde(default = "default_mssql_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub trust_certificate: bool,
    #[serde(default = "default_true")]
    pub encrypt: bool,
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default = "default_true")]
    pub application_intent_read_only: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOutput {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for ConfigOutput {
    fn default() -> Self {
        ConfigOutput {
            directory: default_output_directory(),
            file_name: default_file_name(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub pos: ConfigPos,
    pub erp: ConfigErp,
    #[serde(default)]
    pub output: ConfigOutput,
}

impl Config {
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a config file. A relative output directory is resolved against
    /// the directory holding the file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let base_dir = path.parent().map(ToOwned::to_owned).unwrap_or_default();

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Config::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        if config.output.directory.is_relative() {
            config.output.directory = base_dir.join(&config.output.directory);
        }

        Ok(config)
    }

    /// Look for a config file in the working directory, then next to the
    /// executable.
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut dirs = vec![PathBuf::new()];
        if let Some(exe_dir) = executable_dir() {
            dirs.push(exe_dir);
        }

        for dir in &dirs {
            for name in CONFIG_FILE_NAMES {
                let location = dir.join(name);
                if location.exists() {
                    tracing::debug!("using config file {}", location.display());
                    return Self::load_from_file(&location).map(Some);
                }
            }
        }

        Ok(None)
    }

    /// Connection settings taken from the plain `MYSQL_*`, `MSSQL_*` and
    /// `DIRETORIO_SAIDA` variables. `None` when neither server is named there.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        if env("MYSQL_HOST").is_none() && env("MSSQL_SERVER").is_none() {
            return Ok(None);
        }
        let required = |var: &str| {
            env(var).with_context(|| format!("{var} is not set and no config file was found"))
        };

        let pos = ConfigPos {
            host: required("MYSQL_HOST")?,
            port: env_parsed(&env, "MYSQL_PORT")?.unwrap_or_else(default_mysql_port),
            database: required("MYSQL_DATABASE")?,
            user: required("MYSQL_USER")?,
            password: env("MYSQL_PASSWORD"),
            connect_timeout_secs: default_connect_timeout_secs(),
        };
        let erp = ConfigErp {
            host: required("MSSQL_SERVER")?,
            port: env_parsed(&env, "MSSQL_PORT")?.unwrap_or_else(default_mssql_port),
            database: required("MSSQL_DATABASE")?,
            user: required("MSSQL_USER")?,
            password: env("MSSQL_PASSWORD"),
            trust_certificate: env_flag(&env, "MSSQL_TRUST_CERTIFICATE")?.unwrap_or(true),
            encrypt: env_flag(&env, "MSSQL_ENCRYPT")?.unwrap_or(true),
            application_name: env("MSSQL_APP").unwrap_or_else(default_application_name),
            application_intent_read_only: match env("MSSQL_APPLICATION_INTENT") {
                None => true,
                Some(intent) if intent.eq_ignore_ascii_case("readonly") => true,
                Some(intent) if intent.eq_ignore_ascii_case("readwrite") => false,
                Some(intent) => {
                    bail!("MSSQL_APPLICATION_INTENT must be ReadOnly or ReadWrite, got '{intent}'")
                }
            },
            connect_timeout_secs: default_connect_timeout_secs(),
        };
        let output = ConfigOutput {
            directory: env("DIRETORIO_SAIDA")
                .map(PathBuf::from)
                .unwrap_or_else(default_output_directory),
            file_name: default_file_name(),
        };

        Ok(Some(Config { pos, erp, output }))
    }

    /// `--config` if given, otherwise the first config file found, otherwise
    /// the connection variables in the environment.
    pub fn resolve(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Some(config) = Self::find_and_load()? {
            return Ok(config);
        }
        Self::from_env(env)?.with_context(|| {
            format!(
                "no config file found, create {} or pass --config \
                 (or set MYSQL_HOST and MSSQL_SERVER with the other connection variables)",
                CONFIG_FILE_NAMES[0]
            )
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.file_name)
    }

    /// Settings for the POS reader. `env` looks up environment variables; a
    /// password found there wins over the one in the file.
    pub fn pos_settings(&self, env: impl Fn(&str) -> Option<String>) -> Result<PosSettings> {
        let pos = &self.pos;
        Ok(PosSettings {
            host: pos.host.clone(),
            port: pos.port,
            database: pos.database.clone(),
            user: pos.user.clone(),
            password: password(env(POS_PASSWORD_VAR), &pos.password, POS_PASSWORD_VAR, "pos")?,
            connect_timeout: Duration::from_secs(pos.connect_timeout_secs),
        })
    }

    pub fn erp_settings(&self, env: impl Fn(&str) -> Option<String>) -> Result<ErpSettings> {
        let erp = &self.erp;
        Ok(ErpSettings {
            host: erp.host.clone(),
            port: erp.port,
            database: erp.database.clone(),
            user: erp.user.clone(),
            password: password(env(ERP_PASSWORD_VAR), &erp.password, ERP_PASSWORD_VAR, "erp")?,
            trust_certificate: erp.trust_certificate,
            encrypt: erp.encrypt,
            application_name: erp.application_name.clone(),
            read_only: erp.application_intent_read_only,
            connect_timeout: Duration::from_secs(erp.connect_timeout_secs),
        })
    }
}

fn password(
    from_env: Option<String>,
    from_file: &Option<String>,
    var: &str,
    section: &str,
) -> Result<String> {
    match (from_env, from_file) {
        (Some(password), _) => Ok(password),
        (None, Some(password)) => Ok(password.clone()),
        (None, None) => bail!("no password for [{section}]: set {var} or {section}.password"),
    }
}

fn env_parsed<T>(env: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("invalid {var}: '{value}'"))
        })
        .transpose()
}

/// `Yes`/`No` style switches, also accepting `true`/`false` and `1`/`0`.
fn env_flag(env: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<bool>> {
    let Some(value) = env(var) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(Some(true)),
        "no" | "false" | "0" => Ok(Some(false)),
        _ => bail!("invalid {var}: '{value}', expected Yes or No"),
    }
}

fn executable_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(ToOwned::to_owned)
}

/// Load `.env` from the working directory and from next to the executable.
/// Variables already set in the environment are left alone.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded {}", path.display()),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!("could not load .env: {error}"),
    }
    if let Some(exe_dir) = executable_dir() {
        let path = exe_dir.join(".env");
        if path.exists()
            && let Err(error) = dotenvy::from_path(&path)
        {
            tracing::warn!("could not load {}: {error}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pos]
host = "10.0.0.5"
database = "pdv"
user = "report"

[erp]
host = "erp-db"
database = "PROTHEUS"
user = "report"
password = "from-file"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_are_applied() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.pos.port, 3306);
        assert_eq!(config.erp.port, 1433);
        assert!(config.erp.trust_certificate);
        assert!(config.erp.encrypt);
        assert_eq!(config.erp.application_name, "nfe-reconcile");
        assert!(config.erp.application_intent_read_only);
        assert_eq!(config.output.file_name, "missing_invoices.xlsx");
        assert_eq!(config.output.directory, std::env::temp_dir());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let contents = format!("{MINIMAL}\n[output]\nfolder = \"out\"\n");
        let error = Config::parse(&contents).unwrap_err();
        assert!(error.to_string().contains("unknown field `folder`"));
    }

    #[test]
    fn password_from_env_wins() {
        let config = Config::parse(MINIMAL).unwrap();
        let env = |var: &str| (var == ERP_PASSWORD_VAR).then(|| "from-env".to_owned());

        assert_eq!(config.erp_settings(env).unwrap().password, "from-env");
        assert_eq!(config.erp_settings(no_env).unwrap().password, "from-file");
    }

    #[test]
    fn missing_password_is_an_error() {
        let config = Config::parse(MINIMAL).unwrap();
        let error = config.pos_settings(no_env).unwrap_err();
        assert_eq!(
            error.to_string(),
            "no password for [pos]: set NFE_POS_PASSWORD or pos.password"
        );
    }

    #[test]
    fn settings_carry_connection_details() {
        let config = Config::parse(MINIMAL).unwrap();
        let env = |var: &str| (var == POS_PASSWORD_VAR).then(|| "pw".to_owned());
        let settings = config.pos_settings(env).unwrap();

        assert_eq!(
            settings,
            PosSettings {
                host: "10.0.0.5".to_owned(),
                port: 3306,
                database: "pdv".to_owned(),
                user: "report".to_owned(),
                password: "pw".to_owned(),
                connect_timeout: Duration::from_secs(10),
            }
        );
    }

    #[test]
    fn erp_settings_carry_read_only_intent() {
        let config = Config::parse(MINIMAL).unwrap();
        assert!(config.erp_settings(no_env).unwrap().read_only);

        let contents = MINIMAL.replace(
            "password = \"from-file\"",
            "password = \"from-file\"\napplication_intent_read_only = false",
        );
        let config = Config::parse(&contents).unwrap();
        assert!(!config.erp_settings(no_env).unwrap().read_only);
    }

    fn legacy_env(var: &str) -> Option<String> {
        let value = match var {
            "MYSQL_HOST" => "10.0.0.5",
            "MYSQL_DATABASE" => "pdv",
            "MYSQL_USER" => "report",
            "MYSQL_PASSWORD" => "pos-secret",
            "MSSQL_SERVER" => "erp-db",
            "MSSQL_PORT" => "1533",
            "MSSQL_DATABASE" => "PROTHEUS",
            "MSSQL_USER" => "report",
            "MSSQL_PASSWORD" => "erp-secret",
            "MSSQL_ENCRYPT" => "No",
            "DIRETORIO_SAIDA" => "/srv/reports",
            _ => return None,
        };
        Some(value.to_owned())
    }

    #[test]
    fn config_from_connection_variables() {
        let config = Config::from_env(legacy_env).unwrap().unwrap();

        assert_eq!(config.pos.host, "10.0.0.5");
        assert_eq!(config.pos.port, 3306);
        assert_eq!(config.erp.port, 1533);
        assert!(!config.erp.encrypt);
        assert!(config.erp.trust_certificate);
        assert!(config.erp.application_intent_read_only);
        assert_eq!(
            config.report_path(),
            PathBuf::from("/srv/reports").join("missing_invoices.xlsx")
        );
        assert_eq!(config.pos_settings(legacy_env).unwrap().password, "pos-secret");
        assert_eq!(config.erp_settings(legacy_env).unwrap().password, "erp-secret");
    }

    #[test]
    fn config_from_connection_variables_needs_a_server() {
        assert!(Config::from_env(no_env).unwrap().is_none());

        let partial = |var: &str| (var == "MYSQL_HOST").then(|| "10.0.0.5".to_owned());
        let error = Config::from_env(partial).unwrap_err();
        assert_eq!(
            error.to_string(),
            "MYSQL_DATABASE is not set and no config file was found"
        );
    }

    #[test]
    fn application_intent_from_environment() {
        let read_write = |var: &str| match var {
            "MSSQL_APPLICATION_INTENT" => Some("ReadWrite".to_owned()),
            other => legacy_env(other),
        };
        let config = Config::from_env(read_write).unwrap().unwrap();
        assert!(!config.erp_settings(read_write).unwrap().read_only);

        let bogus = |var: &str| match var {
            "MSSQL_APPLICATION_INTENT" => Some("Sometimes".to_owned()),
            other => legacy_env(other),
        };
        assert!(Config::from_env(bogus).is_err());
    }

    #[test]
    fn relative_output_directory_follows_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nfe-reconcile.toml");
        std::fs::write(
            &path,
            format!("{MINIMAL}\n[output]\ndirectory = \"reports\"\nfile_name = \"gaps.xlsx\"\n"),
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();

        assert_eq!(
            config.report_path(),
            dir.path().join("reports").join("gaps.xlsx")
        );
    }
}
