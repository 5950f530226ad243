//! Server configuration structures and loaders.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use game_core::InstanceId;
use runtime::{ChannelRef, InstanceChannels, RuntimeConfig};

/// Configuration required to bootstrap a server runtime.
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    pub runtime: RuntimeConfig,
    /// Instances served by this process, with the channels each posts to.
    pub instances: Vec<InstanceConfig>,
    /// Keep documents in memory only; nothing survives a restart.
    pub in_memory: bool,
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceConfig {
    pub id: InstanceId,
    pub channels: InstanceChannels,
}

impl ServerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MAFIA_INSTANCES` - `id=announcements:votes:operator`, comma separated
    /// - `MAFIA_IN_MEMORY` - Skip file persistence (default: false)
    /// - `MAFIA_DATA_DIR` - Directory for instance documents (default: platform-specific)
    /// - `MAFIA_LOG_DIR` - Directory for log files (default: platform-specific)
    /// - `MAFIA_TICK_SECS` - Scheduler worker period (default: 15)
    /// - `MAFIA_EPSILON_SECS` - How early a scheduled change may be claimed (default: 25)
    /// - `MAFIA_EVENT_BUFFER` - Event bus capacity per topic (default: 100)
    /// - `MAFIA_CACHE_CAPACITY` - Cached instance directory entries (default: 256)
    /// - `MAFIA_CACHE_TTL_SECS` - Lifetime of a cached directory entry (default: 300)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("MAFIA_INSTANCES") {
            config.instances = parse_instances(&raw)?;
        }

        if let Some(in_memory) = read_env::<bool>("MAFIA_IN_MEMORY") {
            config.in_memory = in_memory;
        } else if env::var("MAFIA_IN_MEMORY").is_ok() {
            // A bare `MAFIA_IN_MEMORY=` also counts as enabled
            config.in_memory = true;
        }

        config.data_dir = env::var("MAFIA_DATA_DIR").ok().map(PathBuf::from);
        config.log_dir = env::var("MAFIA_LOG_DIR").ok().map(PathBuf::from);

        let runtime = &mut config.runtime;
        if let Some(secs) = read_env::<u64>("MAFIA_TICK_SECS") {
            runtime.tick_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = read_env::<u64>("MAFIA_EPSILON_SECS") {
            runtime.schedule_epsilon = Duration::from_secs(secs);
        }
        if let Some(capacity) = read_env::<usize>("MAFIA_EVENT_BUFFER") {
            runtime.event_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("MAFIA_CACHE_CAPACITY") {
            runtime.directory_cache_capacity = capacity.max(1);
        }
        if let Some(secs) = read_env::<u64>("MAFIA_CACHE_TTL_SECS") {
            runtime.directory_cache_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Directory holding instance documents.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }
}

/// Platform data directory, e.g. `~/.local/share/mafia` on Linux.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "mafia")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./mafia_data"))
}

/// Platform cache directory for logs, e.g. `~/.cache/mafia/logs` on Linux.
pub fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "mafia")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/mafia"))
        .join("logs")
}

/// Parses `1=10:20:30,2=11:21:31` into instance configurations.
pub fn parse_instances(raw: &str) -> Result<Vec<InstanceConfig>> {
    let mut instances: Vec<InstanceConfig> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((id, channels)) = entry.split_once('=') else {
            bail!("instance entry `{entry}` is missing `=`");
        };
        let id = InstanceId(
            id.trim()
                .parse()
                .with_context(|| format!("invalid instance id in `{entry}`"))?,
        );

        let refs = channels
            .split(':')
            .map(|part| part.trim().parse::<u64>().map(ChannelRef))
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("invalid channel id in `{entry}`"))?;
        let [announcements, votes, operator] = refs[..] else {
            bail!("instance entry `{entry}` needs exactly three channels");
        };

        if instances.iter().any(|instance| instance.id == id) {
            bail!("instance {id} is configured twice");
        }
        instances.push(InstanceConfig {
            id,
            channels: InstanceChannels {
                announcements,
                votes,
                operator,
            },
        });
    }

    Ok(instances)
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
