use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    #[allow(dead_code)]
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .datalystrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().flatten() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(self.get("CACHE_PATH").unwrap())
    }

    pub fn graph_output_path(&self) -> PathBuf {
        PathBuf::from(self.get("GRAPH_OUTPUT_PATH").unwrap())
    }

    pub fn python_bin(&self) -> String {
        self.get("PYTHON_BIN").unwrap()
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or DATALYST_*/OPENAI_* for forward-compat
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "REQUEST_TIMEOUT",
        "DEFAULT_MODEL",
        "CACHE_PATH",
        "CACHE_LENGTH",
        "GRAPH_OUTPUT_PATH",
        "PYTHON_BIN",
        "MAX_REPAIR_ATTEMPTS",
        "ORACLE_POLL_RETRIES",
        "ORACLE_POLL_INTERVAL_MS",
        "ROW_LIMIT",
        "SAMPLE_ROWS",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("DATALYST_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("datalyst").join(".datalystrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    // Paths
    let temp = env::temp_dir().join("datalyst");

    m.insert(
        "CACHE_PATH".into(),
        temp.join("cache").to_string_lossy().into_owned(),
    );
    m.insert("GRAPH_OUTPUT_PATH".into(), "graphs".into());

    // Numbers
    m.insert("CACHE_LENGTH".into(), "100".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("MAX_REPAIR_ATTEMPTS".into(), "3".into());
    m.insert("ORACLE_POLL_RETRIES".into(), "3".into());
    m.insert("ORACLE_POLL_INTERVAL_MS".into(), "2000".into());
    m.insert("ROW_LIMIT".into(), "100".into());
    m.insert("SAMPLE_ROWS".into(), "5".into());

    // Strings
    m.insert("DEFAULT_MODEL".into(), "gpt-4o".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("PYTHON_BIN".into(), "python3".into());

    // Bools as strings
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
