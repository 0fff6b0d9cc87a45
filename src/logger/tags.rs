/// Log tags identifying the emitting subsystem

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Discovery,
    Client,
    Price,
    Scanner,
    Aggregation,
    Analyzer,
    Cli,
}

impl LogTag {
    /// Key used by `--debug <key>` to enable debug output for this tag
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Discovery => "discovery",
            LogTag::Client => "client",
            LogTag::Price => "price",
            LogTag::Scanner => "scanner",
            LogTag::Aggregation => "aggregation",
            LogTag::Analyzer => "analyzer",
            LogTag::Cli => "cli",
        }
    }

    /// Uppercase label used in console and file output
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }

    pub fn all() -> &'static [LogTag] {
        &[
            LogTag::System,
            LogTag::Config,
            LogTag::Discovery,
            LogTag::Client,
            LogTag::Price,
            LogTag::Scanner,
            LogTag::Aggregation,
            LogTag::Analyzer,
            LogTag::Cli,
        ]
    }

    pub fn from_debug_key(key: &str) -> Option<LogTag> {
        let key = key.trim().to_lowercase();
        LogTag::all()
            .iter()
            .copied()
            .find(|tag| tag.to_debug_key() == key)
    }
}
