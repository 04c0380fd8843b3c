use std::ffi::OsStr;
use std::fs::File;

use anyhow::anyhow;
use justconfig::item::ValueExtractor;
use justconfig::processors::Trim;
use justconfig::sources::env::Env;
use justconfig::sources::text::ConfigText;
use justconfig::ConfPath;
use justconfig::Config;

use crate::config_processors::Unquote;

// Set some default values
const DEFAULT_LIST_SIZE: usize = 10;
const DEFAULT_LOG_LEVEL: &str = "info";
const UNKNOWN_RUN_NAME: &str = "unknown";

pub struct AppConfig {
    pub log: LogConfig,
    pub data: DataConfig,
    pub metric: MetricConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

pub struct LogConfig {
    pub level: String,
}

pub struct DataConfig {
    pub vocabulary_path: String,
    pub item_tags_path: String,
    pub recommendations_path: String,
    pub training_data_path: Option<String>,
}

pub struct MetricConfig {
    pub list_size: usize,
}

pub struct RunConfig {
    pub algorithm: String,
    pub dataset: String,
    pub num_threads: usize,
}

pub struct OutputConfig {
    pub per_user_path: Option<String>,
}

impl AppConfig {
    pub fn new(config_path: &str) -> anyhow::Result<AppConfig> {
        // Initialize config object
        let mut conf = Config::default();

        // Check if there is a config file
        if let Ok(config_file) = File::open(config_path) {
            let config_text = ConfigText::new(config_file, config_path).map_err(|err| {
                anyhow!("loading configuration file {} failed: {}", config_path, err)
            })?;
            conf.add_source(config_text);
        }

        // Define config params from environment variables
        let config_env = Env::new(&[
            (
                ConfPath::from(&["data", "vocabulary_path"]),
                OsStr::new("VOCABULARY"),
            ),
            (
                ConfPath::from(&["data", "item_tags_path"]),
                OsStr::new("ITEM_TAGS"),
            ),
            (
                ConfPath::from(&["data", "recommendations_path"]),
                OsStr::new("RECOMMENDATIONS"),
            ),
            (
                ConfPath::from(&["data", "training_data_path"]),
                OsStr::new("TRAINING_DATA"),
            ),
            (
                ConfPath::from(&["metric", "list_size"]),
                OsStr::new("LIST_SIZE"),
            ),
            (
                ConfPath::from(&["run", "num_threads"]),
                OsStr::new("NUM_THREADS"),
            ),
            (ConfPath::from(&["log", "level"]), OsStr::new("LOG_LEVEL")),
        ]);
        conf.add_source(config_env);

        // Parse into custom config struct
        AppConfig::parse(&conf)
    }

    pub(crate) fn parse(conf: &Config) -> anyhow::Result<AppConfig> {
        Ok(AppConfig {
            log: LogConfig::parse(conf, ConfPath::from(&["log"])),
            data: DataConfig::parse(conf, ConfPath::from(&["data"]))?,
            metric: MetricConfig::parse(conf, ConfPath::from(&["metric"])),
            run: RunConfig::parse(conf, ConfPath::from(&["run"])),
            output: OutputConfig::parse(conf, ConfPath::from(&["output"])),
        })
    }
}

impl LogConfig {
    fn parse(conf: &Config, path: ConfPath) -> LogConfig {
        LogConfig {
            level: conf
                .get(path.push("level"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(DEFAULT_LOG_LEVEL)),
        }
    }
}

impl DataConfig {
    fn parse(conf: &Config, path: ConfPath) -> anyhow::Result<DataConfig> {
        Ok(DataConfig {
            vocabulary_path: conf
                .get(path.push("vocabulary_path"))
                .unquote()
                .value()
                .map_err(|err| anyhow!("data.vocabulary_path is not configured: {}", err))?,
            item_tags_path: conf
                .get(path.push("item_tags_path"))
                .unquote()
                .value()
                .map_err(|err| anyhow!("data.item_tags_path is not configured: {}", err))?,
            recommendations_path: conf
                .get(path.push("recommendations_path"))
                .unquote()
                .value()
                .map_err(|err| anyhow!("data.recommendations_path is not configured: {}", err))?,
            training_data_path: conf
                .get(path.push("training_data_path"))
                .unquote()
                .value()
                .ok(),
        })
    }
}

impl MetricConfig {
    fn parse(conf: &Config, path: ConfPath) -> MetricConfig {
        MetricConfig {
            list_size: conf
                .get(path.push("list_size"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_LIST_SIZE),
        }
    }
}

impl RunConfig {
    fn parse(conf: &Config, path: ConfPath) -> RunConfig {
        RunConfig {
            algorithm: conf
                .get(path.push("algorithm"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(UNKNOWN_RUN_NAME)),
            dataset: conf
                .get(path.push("dataset"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(UNKNOWN_RUN_NAME)),
            num_threads: conf
                .get(path.push("num_threads"))
                .trim()
                .value()
                // Detect number of CPUs
                .unwrap_or_else(|_| {
                    sys_info::cpu_num()
                        .ok()
                        .and_then(|cpus| cpus.try_into().ok())
                        .unwrap_or(1)
                }),
        }
    }
}

impl OutputConfig {
    fn parse(conf: &Config, path: ConfPath) -> OutputConfig {
        OutputConfig {
            per_user_path: conf
                .get(path.push("per_user_path"))
                .unquote()
                .value()
                .ok(),
        }
    }
}
