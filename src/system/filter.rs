use std::collections::HashMap;

use crate::device::Transport;

pub const DEFAULT_APP_PREFIX: &str = "com.";

const PACKAGE_DUMP_COMMAND: &str = "dumpsys package -f p";

/// Decides which processes count as applications: those whose identifier
/// starts with a reverse-domain prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppFilter {
    prefix: String,
}

impl Default for AppFilter {
    fn default() -> Self {
        Self::new(DEFAULT_APP_PREFIX)
    }
}

impl AppFilter {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn is_app(&self, identifier: &str) -> bool {
        identifier.len() >= self.prefix.len().max(4) && identifier.starts_with(&self.prefix)
    }
}

/// Application identifier to data directory, built once from the package
/// manager dump before sampling begins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackagePathTable {
    paths: HashMap<String, String>,
}

impl PackagePathTable {
    pub async fn load<T: Transport>(transport: &T, filter: &AppFilter) -> Self {
        let mut parser = PackageDumpParser::new(filter.clone());
        if let Err(err) = transport
            .stream_shell(PACKAGE_DUMP_COMMAND, |line| parser.feed(line))
            .await
        {
            tracing::warn!(%err, "package dump failed, storage usage will read as zero");
        }
        parser.finish()
    }

    pub fn from_dump(dump: &str, filter: &AppFilter) -> Self {
        let mut parser = PackageDumpParser::new(filter.clone());
        dump.lines().for_each(|line| parser.feed(line));
        parser.finish()
    }

    pub fn data_dir(&self, identifier: &str) -> Option<&str> {
        self.paths.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Line-fed parser for `dumpsys package` output. A block opens with
/// `Package [<identifier>]` and the first `dataDir=` after it wins.
#[derive(Debug)]
pub struct PackageDumpParser {
    filter: AppFilter,
    current: Option<String>,
    table: PackagePathTable,
}

impl PackageDumpParser {
    pub fn new(filter: AppFilter) -> Self {
        Self {
            filter,
            current: None,
            table: PackagePathTable::default(),
        }
    }

    pub fn feed(&mut self, line: &str) {
        let trimmed = line.trim_start();
        if trimmed.starts_with("Package [") {
            self.current = bracketed(trimmed)
                .filter(|name| self.filter.is_app(name))
                .map(str::to_string);
            return;
        }
        if let Some(path) = trimmed.strip_prefix("dataDir=")
            && let Some(name) = self.current.take()
        {
            self.table.paths.insert(name, path.trim().to_string());
        }
    }

    pub fn finish(self) -> PackagePathTable {
        self.table
    }
}

fn bracketed(line: &str) -> Option<&str> {
    let start = line.find('[')? + 1;
    let end = start + line[start..].find(']')?;
    Some(&line[start..end])
}
