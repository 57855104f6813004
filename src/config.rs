use std::fs::File;
use std::io::Read;

use json_comments::StripComments;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data_structure::quicklist::DEFAULT_PACKED_THRESHOLD;

pub const QUICKLIST_CONFIG_TOML: &str = "./quicklist.toml";
pub const QUICKLIST_CONFIG_JSON: &str = "./quicklist.json";

fn default_list_max_listpack_size() -> i32 {
    -2
}

fn default_packed_threshold() -> usize {
    DEFAULT_PACKED_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickListConfig {
    /// positive: max entries per node, negative: byte ceiling level -1..-5
    #[serde(default = "default_list_max_listpack_size")]
    pub list_max_listpack_size: i32,
    /// nodes at each end kept uncompressed; 0 disables compression
    #[serde(default)]
    pub list_compress_depth: i32,
    #[serde(default = "default_packed_threshold")]
    pub packed_threshold: usize,
}

impl Default for QuickListConfig {
    fn default() -> Self {
        Self {
            list_max_listpack_size: default_list_max_listpack_size(),
            list_compress_depth: 0,
            packed_threshold: default_packed_threshold(),
        }
    }
}

impl QuickListConfig {
    pub fn new(path: Option<&str>) -> Self {
        let config_path_show;
        let mut file = if let Some(path) = path {
            config_path_show = path;
            if let Ok(file) = File::open(path) {
                file
            } else {
                warn!("Config File: {} Read Fail, Use Default Config.", config_path_show);
                return QuickListConfig::default();
            }
        } else if let Ok(file) = File::open(QUICKLIST_CONFIG_TOML) {
            config_path_show = QUICKLIST_CONFIG_TOML;
            file
        } else if let Ok(file) = File::open(QUICKLIST_CONFIG_JSON) {
            config_path_show = QUICKLIST_CONFIG_JSON;
            file
        } else {
            info!("No config file found, Use Default Config.");
            return QuickListConfig::default();
        };

        let mut config_string = String::new();
        if let Err(e) = file.read_to_string(&mut config_string) {
            warn!("Config File: {} Read Fail {e}, Use Default Config.", config_path_show);
            return QuickListConfig::default();
        }
        info!("Config File: {}", config_path_show);
        match Self::from_str_any(&config_string) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config File: {} Parse Fail {e}, Use Default Config.", config_path_show);
                QuickListConfig::default()
            }
        }
    }

    /// Parses TOML, falling back to JSON with comments.
    pub fn from_str_any(config_string: &str) -> crate::Result<Self> {
        if let Ok(config) = toml::from_str(config_string) {
            return Ok(config);
        }
        let config_string = StripComments::new(config_string.as_bytes());
        Ok(serde_json::from_reader(config_string)?)
    }
}

#[cfg(test)]
mod test {
    use super::QuickListConfig;
    use crate::data_structure::quicklist::quicklist::QuickList;

    #[test]
    fn parse_toml_and_json() {
        let toml = "list_max_listpack_size = 128\nlist_compress_depth = 2\n";
        let config = QuickListConfig::from_str_any(toml).unwrap();
        assert_eq!(config.list_max_listpack_size, 128);
        assert_eq!(config.list_compress_depth, 2);
        assert_eq!(config.packed_threshold, QuickListConfig::default().packed_threshold);

        let json = r#"{
            // small nodes
            "list_max_listpack_size": -1,
            "packed_threshold": 4096
        }"#;
        let config = QuickListConfig::from_str_any(json).unwrap();
        assert_eq!(config.list_max_listpack_size, -1);
        assert_eq!(config.list_compress_depth, 0);
        assert_eq!(config.packed_threshold, 4096);

        assert!(QuickListConfig::from_str_any("list_max_listpack_size = [").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = QuickListConfig::new(Some("./no-such-dir/quicklist.toml"));
        assert_eq!(config, QuickListConfig::default());
    }

    #[test]
    fn build_list_from_config() {
        let config = QuickListConfig {
            list_max_listpack_size: -9,
            list_compress_depth: 3,
            packed_threshold: 1 << 40,
        };
        let ql = QuickList::from_config(&config);
        assert_eq!(ql.fill(), -5);
        assert_eq!(ql.compress_depth(), 3);
        assert_eq!(ql.packed_threshold(), QuickListConfig::default().packed_threshold);
    }
}
