//! Type definitions for package manager commands

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Value of a `--key=value` flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag, rendered `true`/`false`
    Bool(bool),
    /// Integer flag
    Int(i64),
    /// Anything else, passed verbatim
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

/// Ordered map from option name to an optional value
///
/// Keys keep the position of their first insertion. A key mapped to `None`
/// is remembered but never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CmdOptions(Vec<(String, Option<OptionValue>)>);

impl CmdOptions {
    /// Create an empty option map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any earlier value in place
    pub fn set(&mut self, key: impl Into<String>, value: Option<OptionValue>) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Set `key` to a present value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.set(key, Some(value.into()));
    }

    /// Chainable form of [`CmdOptions::set`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Option<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up the value for `key`
    ///
    /// `None` means the key is unknown; `Some(None)` means it is set to absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&OptionValue>> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }

    /// Append every entry of `other`, with `set` semantics
    pub fn extend(&mut self, other: &CmdOptions) {
        for (key, value) in &other.0 {
            self.set(key.clone(), value.clone());
        }
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&OptionValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Number of entries, absent ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render present entries as `--key=value` tokens
    #[must_use]
    pub fn flags(&self) -> Vec<String> {
        self.iter()
            .filter_map(|(key, value)| value.map(|v| format!("--{key}={v}")))
            .collect()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for CmdOptions
where
    K: Into<String>,
    V: Into<OptionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut options = CmdOptions::new();
        for (key, value) in iter {
            options.set(key, value.map(Into::into));
        }
        options
    }
}

/// Structured description of one package manager command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Subcommand name (`install`, `update`, ...)
    pub command: String,
    /// Positional arguments, in order
    #[serde(default)]
    pub args: Vec<String>,
    /// Flags rendered after the positional arguments
    #[serde(default)]
    pub options: CmdOptions,
}

impl CommandSpec {
    /// Create a spec with no arguments and no options
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            options: CmdOptions::new(),
        }
    }

    /// Append positional arguments
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a single option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Option<OptionValue>) -> Self {
        self.options.set(key, value);
        self
    }

    /// Replace the option map
    #[must_use]
    pub fn with_options(mut self, options: CmdOptions) -> Self {
        self.options = options;
        self
    }

    /// Argument vector handed to the tool: subcommand, positionals, flags
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(1 + self.args.len() + self.options.len());
        argv.push(self.command.clone());
        argv.extend(self.args.iter().cloned());
        argv.extend(self.options.flags());
        argv
    }

    /// Human-readable command line, for logs and error messages only
    #[must_use]
    pub fn command_line(&self, program: &str) -> String {
        let mut line = program.to_string();
        for token in self.argv() {
            line.push(' ');
            line.push_str(&token);
        }
        line
    }
}

/// Options accepted by `install` and `update`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmOptions {
    /// Packages to install; ignored by `update`
    pub dependencies: Vec<String>,
    /// Skip dev dependencies
    pub production: bool,
    /// npm log level (`silent`, `error`, `warn`, ...); omitted when `None`
    pub loglevel: Option<String>,
    /// Record installed packages under `dependencies`
    pub save: bool,
    /// Record installed packages under `devDependencies`
    pub save_dev: bool,
    /// Install into this prefix instead of the working directory
    pub prefix: Option<String>,
    /// Unmodeled flags, passed through verbatim after the ones above
    pub extra: CmdOptions,
}

impl NpmOptions {
    /// Options with no dependencies and every flag at its default
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add dependencies to install
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Set the production flag
    #[must_use]
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Set the log level
    #[must_use]
    pub fn loglevel(mut self, level: impl Into<String>) -> Self {
        self.loglevel = Some(level.into());
        self
    }

    /// Save to `dependencies`
    #[must_use]
    pub fn save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    /// Save to `devDependencies`
    #[must_use]
    pub fn save_dev(mut self, save_dev: bool) -> Self {
        self.save_dev = save_dev;
        self
    }

    /// Set the install prefix
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Pass an extra flag through verbatim
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Render the flag map
    ///
    /// `production` is always present; boolean switches only when set;
    /// string options only when given.
    #[must_use]
    pub fn to_cmd_options(&self) -> CmdOptions {
        let mut options = CmdOptions::new()
            .with("production", Some(self.production.into()))
            .with("loglevel", self.loglevel.clone().map(Into::into))
            .with("save", self.save.then_some(OptionValue::Bool(true)))
            .with("save-dev", self.save_dev.then_some(OptionValue::Bool(true)))
            .with("prefix", self.prefix.clone().map(Into::into));
        options.extend(&self.extra);
        options
    }
}

/// What to do when the package manager exits non-zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatusPolicy {
    /// Report success regardless of the exit status
    #[default]
    Ignore,
    /// Report `PackageError::CommandFailed` for any non-zero status
    Fail,
}

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)").expect("version pattern is a valid regex")
});

/// Version reported by the tool's `-v` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolVersion {
    /// Everything the tool printed
    pub raw: String,
    /// Major version
    pub major: u64,
    /// Minor version
    pub minor: u64,
    /// Patch version
    pub patch: u64,
}

impl ToolVersion {
    /// Parse version output
    ///
    /// The output must start with a dotted numeric triple; anything may
    /// follow it.
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let caps = VERSION_PATTERN.captures(output)?;
        Some(Self {
            raw: output.to_string(),
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
        })
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Package manager type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PackageManagerType {
    /// npm (Node.js)
    Npm,
}

impl fmt::Display for PackageManagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageManagerType::Npm => write!(f, "npm"),
        }
    }
}
