//! INI file configuration adapter.

use crate::domain::error::ShockwiseError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ShockwiseError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| ShockwiseError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_strings_across_sections() {
        let content = r#"
[portfolio]
path = data/holdings.csv
base_currency = JPY

[proxies]
sectors = Technology:XLK, Energy:XLE
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("portfolio", "path"),
            Some("data/holdings.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("proxies", "sectors"),
            Some("Technology:XLK, Energy:XLE".to_string())
        );
    }

    #[test]
    fn missing_key_or_section_is_none() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\npath = h.csv\n").unwrap();
        assert_eq!(adapter.get_string("portfolio", "missing"), None);
        assert_eq!(adapter.get_string("prices", "dir"), None);
    }

    #[test]
    fn numeric_getters() {
        let adapter = FileConfigAdapter::from_string(
            "[analysis]\nmin_overlap = 30\ncontagion_threshold = 0.75\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("analysis", "min_overlap", 20), 30);
        assert_eq!(adapter.get_double("analysis", "contagion_threshold", 0.7), 0.75);
    }

    #[test]
    fn numeric_getters_fall_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[analysis]\nmin_overlap = lots\nheavy_shock = big\n")
                .unwrap();
        assert_eq!(adapter.get_int("analysis", "min_overlap", 20), 20);
        assert_eq!(adapter.get_double("analysis", "heavy_shock", -0.15), -0.15);
        assert_eq!(adapter.get_int("analysis", "absent", 7), 7);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[prices]\ndir = /var/prices\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("prices", "dir"),
            Some("/var/prices".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigParse { .. }));
    }
}
