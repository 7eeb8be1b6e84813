//! The ipset command executor.
//!
//! [`IpSet`] holds the resolved binary path and turns each ipset subcommand
//! into one subprocess invocation. Nothing is cached: every listing
//! re-queries the kernel.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::cmd_abstraction::{
    args_to_strings, CommandExecutor, CommandOutput, RealCommandExecutor, RunLimits,
};
use crate::config::Config;
use crate::error::{FailureKind, IpsetError, Result};
use crate::listing::{decode_sets, decode_single, SetCollection, SetHeader, SetRecord};
use crate::options::SetOptions;

const BINARY_NAME: &str = "ipset";

/// Kernel limit on set names (IPSET_MAXNAMELEN minus the NUL).
const SET_NAME_MAX_LEN: usize = 31;

static TEMP_SEQ: AtomicU32 = AtomicU32::new(0);

/// Executes ipset subcommands against one binary.
#[derive(Debug, Clone)]
pub struct IpSet<E = RealCommandExecutor> {
    path: PathBuf,
    executor: E,
    limits: RunLimits,
}

impl IpSet<RealCommandExecutor> {
    /// Locate `ipset` on `PATH` and apply the default timeout.
    pub fn new() -> Result<Self> {
        Self::from_config(&Config::default())
    }

    /// Use an explicit binary instead of searching for one.
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = which::which(path.as_ref()).map_err(|e| {
            IpsetError::BinaryNotFound(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::with_executor(path, RealCommandExecutor::new())
            .timeout(Config::default().timeout()))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| IpsetError::Config(e.to_string()))?;

        let ipset = match config.binary {
            Some(ref binary) => Self::with_path(binary)?,
            None => Self::with_executor(
                discover(config.search_path.as_deref())?,
                RealCommandExecutor::new(),
            ),
        };
        Ok(ipset.timeout(config.timeout()))
    }
}

fn discover(search_path: Option<&str>) -> Result<PathBuf> {
    let found = match search_path {
        Some(paths) => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
            which::which_in(BINARY_NAME, Some(paths), cwd)
        }
        None => which::which(BINARY_NAME),
    };
    let path = found.map_err(|e| {
        IpsetError::BinaryNotFound(format!(
            "{} not found in {}: {}",
            BINARY_NAME,
            search_path.unwrap_or("PATH"),
            e
        ))
    })?;
    debug!("Using ipset binary {}", path.display());
    Ok(path)
}

impl<E: CommandExecutor> IpSet<E> {
    /// Bind to `path` with a custom executor. No lookup is performed.
    pub fn with_executor(path: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            path: path.into(),
            executor,
            limits: RunLimits::default(),
        }
    }

    /// Per-invocation timeout; `None` waits indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.limits.timeout = timeout;
        self
    }

    /// Kill in-flight invocations when `token` is cancelled.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.limits.cancel = Some(token);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a new set with a given name and type (`hash:ip`, `hash:net`, ...).
    pub fn create(&self, name: &str, set_type: &str, options: &SetOptions) -> Result<()> {
        self.run(argv(&["create", name, set_type], options)).map(drop)
    }

    /// Add an entry. Fails if it is already present.
    pub fn add(&self, name: &str, entry: &str, options: &SetOptions) -> Result<()> {
        self.run(argv(&["add", name, entry], options)).map(drop)
    }

    /// Add an entry unless it is already present.
    pub fn add_unique(&self, name: &str, entry: &str, options: &SetOptions) -> Result<()> {
        self.run(argv(&["add", name, entry, "-exist"], options)).map(drop)
    }

    /// Remove an entry. Fails if it is absent.
    pub fn delete(&self, name: &str, entry: &str, options: &SetOptions) -> Result<()> {
        self.run(argv(&["del", name, entry], options)).map(drop)
    }

    /// Test membership. The exit status is the answer: `Ok` when the entry
    /// is in the set, an error otherwise.
    pub fn test(&self, name: &str, entry: &str, options: &SetOptions) -> Result<()> {
        self.run(argv(&["test", name, entry], options)).map(drop)
    }

    /// Like [`test`](Self::test), but a plain miss is `Ok(false)`.
    pub fn contains(&self, name: &str, entry: &str, options: &SetOptions) -> Result<bool> {
        match self.test(name, entry, options) {
            Ok(()) => Ok(true),
            Err(e) if e.failure_kind() == Some(FailureKind::NotInSet) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Destroy a named set, or all sets when `name` is empty.
    pub fn destroy(&self, name: &str) -> Result<()> {
        self.run(optional_name("destroy", name)).map(drop)
    }

    /// Remove all entries from a set, or from every set when `name` is empty.
    pub fn flush(&self, name: &str) -> Result<()> {
        self.run(optional_name("flush", name)).map(drop)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.run(args_to_strings(&["rename", from, to])).map(drop)
    }

    /// Atomically exchange the content of two existing sets.
    pub fn swap(&self, from: &str, to: &str) -> Result<()> {
        self.run(args_to_strings(&["swap", from, to])).map(drop)
    }

    /// Save the named set, or all sets when `name` is empty, to `filename`.
    pub fn save(&self, name: &str, filename: impl AsRef<Path>) -> Result<()> {
        let mut args = optional_name("save", name);
        args.push("-file".to_string());
        args.push(filename.as_ref().to_string_lossy().into_owned());
        self.run(args).map(drop)
    }

    /// Save format text for the named set (or all sets) read from stdout.
    pub fn save_to_string(&self, name: &str) -> Result<String> {
        Ok(self.run(optional_name("save", name))?.stdout)
    }

    /// Restore sets from a file written by [`save`](Self::save).
    pub fn restore(&self, filename: impl AsRef<Path>) -> Result<()> {
        let file = filename.as_ref().to_string_lossy();
        self.run(args_to_strings(&["restore", "-file", &file])).map(drop)
    }

    /// Restore from save-format text piped on stdin. With `exist`, entries
    /// and sets that already exist are ignored instead of failing.
    pub fn restore_from_str(&self, data: &str, exist: bool) -> Result<()> {
        let mut args = vec!["restore".to_string()];
        if exist {
            args.push("-exist".to_string());
        }
        debug!(
            "{} {} (stdin: {} bytes)",
            self.path.display(),
            args.join(" "),
            data.len()
        );
        let output = self
            .executor
            .execute_with_stdin(&self.path, &args, data, &self.limits)?;
        check(&args, output).map(drop)
    }

    pub fn version(&self) -> Result<String> {
        let output = self.run(args_to_strings(&["version"]))?;
        Ok(output.stdout.trim().to_string())
    }

    /// All sets known to the kernel.
    pub fn list_sets(&self, suppress_members: bool) -> Result<SetCollection> {
        let xml = self.list_xml(suppress_members, false, None)?;
        Ok(decode_sets(&xml)?
            .into_iter()
            .map(|set| normalize_members(set, suppress_members))
            .collect())
    }

    /// The named set. Exactly one record must come back.
    pub fn list(&self, name: &str, suppress_members: bool) -> Result<SetRecord> {
        let xml = self.list_xml(suppress_members, false, Some(name))?;
        let set = decode_single(name, &xml)?;
        Ok(normalize_members(set, suppress_members))
    }

    /// The elements of the named set, in listing order.
    pub fn list_entries(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.list(name, false)?.entries())
    }

    pub fn list_set_names(&self) -> Result<Vec<String>> {
        let xml = self.list_xml(false, true, None)?;
        Ok(decode_sets(&xml)?.into_iter().map(|set| set.name).collect())
    }

    /// Number of kernel references (iptables rules, list:set members) to the set.
    pub fn get_references(&self, name: &str) -> Result<u64> {
        Ok(self.list(name, true)?.header.reference_count)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        match self.list(name, true) {
            Ok(_) => Ok(true),
            Err(e) if e.failure_kind() == Some(FailureKind::SetNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replace the contents of an existing set with exactly `entries`.
    ///
    /// The new contents are built in a temporary set of the same type and
    /// sizing, then swapped in, so the live set is never empty or partially
    /// filled. The temporary set is destroyed on every exit path.
    pub fn refresh<I, S>(&self, name: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let current = self.list(name, true)?;
        let temp_name = temp_set_name(name);
        let options = sizing_options(&current.header);

        self.create(&temp_name, &current.set_type, &options)
            .map_err(|source| IpsetError::TempSet {
                name: temp_name.clone(),
                source: Box::new(source),
            })?;
        let temp = TempSet {
            ipset: self,
            name: temp_name,
            live: true,
        };

        let no_options = SetOptions::new();
        let mut count = 0usize;
        for entry in entries {
            self.add_unique(&temp.name, entry.as_ref(), &no_options)?;
            count += 1;
        }

        self.swap(&temp.name, name)?;
        temp.destroy()?;

        info!("Refreshed set {} with {} entries", name, count);
        Ok(())
    }

    fn list_xml(
        &self,
        suppress_members: bool,
        names_only: bool,
        name: Option<&str>,
    ) -> Result<String> {
        let mut args = vec!["list".to_string()];
        if names_only {
            args.push("-n".to_string());
        }
        args.push("-o".to_string());
        args.push("xml".to_string());
        if suppress_members {
            args.push("-t".to_string());
        }
        if let Some(name) = name {
            args.push(name.to_string());
        }
        Ok(self.run(args)?.stdout)
    }

    fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.run_with(args, &self.limits)
    }

    fn run_with(&self, args: Vec<String>, limits: &RunLimits) -> Result<CommandOutput> {
        debug!("{} {}", self.path.display(), args.join(" "));
        let output = self.executor.execute(&self.path, &args, limits)?;
        check(&args, output)
    }
}

/// The temporary set of a refresh. Dropping it destroys the set unless
/// [`TempSet::destroy`] already did.
struct TempSet<'a, E: CommandExecutor> {
    ipset: &'a IpSet<E>,
    name: String,
    live: bool,
}

impl<E: CommandExecutor> TempSet<'_, E> {
    /// Destroy the set now. On failure the guard stays armed and `Drop`
    /// retries without the cancel token.
    fn destroy(mut self) -> Result<()> {
        self.ipset.destroy(&self.name)?;
        self.live = false;
        Ok(())
    }
}

impl<E: CommandExecutor> Drop for TempSet<'_, E> {
    fn drop(&mut self) {
        if !self.live {
            return;
        }
        // Cleanup must run even when the failure was a cancellation.
        let limits = RunLimits {
            timeout: self.ipset.limits.timeout,
            cancel: None,
        };
        let args = args_to_strings(&["destroy", &self.name]);
        match self.ipset.run_with(args, &limits) {
            Ok(_) => debug!("Destroyed temporary set {}", self.name),
            Err(e) => warn!("Temporary set {} leaked, destroy failed: {}", self.name, e),
        }
    }
}

fn check(args: &[String], output: CommandOutput) -> Result<CommandOutput> {
    if output.success {
        return Ok(output);
    }
    Err(IpsetError::Subprocess {
        command: args.first().cloned().unwrap_or_default(),
        code: output.code,
        kind: FailureKind::classify(&output.stderr),
        stderr: output.stderr,
    })
}

fn argv(prefix: &[&str], options: &SetOptions) -> Vec<String> {
    let mut args = args_to_strings(prefix);
    args.extend(options.to_args());
    args
}

fn optional_name(command: &str, name: &str) -> Vec<String> {
    if name.is_empty() {
        args_to_strings(&[command])
    } else {
        args_to_strings(&[command, name])
    }
}

fn normalize_members(mut set: SetRecord, suppress_members: bool) -> SetRecord {
    if suppress_members {
        set.members = None;
    } else if set.members.is_none() {
        set.members = Some(Vec::new());
    }
    set
}

/// Create options that give a new set the same shape as `header`.
fn sizing_options(header: &SetHeader) -> SetOptions {
    let mut options = SetOptions::new();
    if let Some(ref family) = header.family {
        options = options.set("family", family);
    }
    if let Some(hash_size) = header.hash_size {
        options = options.set("hashsize", hash_size);
    }
    if let Some(max_elements) = header.max_elements {
        options = options.set("maxelem", max_elements);
    }
    if let Some(ref range) = header.range {
        options = options.set("range", range);
    }
    if let Some(netmask) = header.netmask {
        options = options.set("netmask", netmask);
    }
    if let Some(timeout) = header.timeout {
        options = options.set("timeout", timeout);
    }
    for (present, extension) in [
        (header.counters, "counters"),
        (header.comment, "comment"),
        (header.skbinfo, "skbinfo"),
        (header.forceadd, "forceadd"),
    ] {
        if present {
            options = options.flag(extension);
        }
    }
    options
}

/// `<base>-swp<token>`, unique per call and within the kernel name limit.
fn temp_set_name(base: &str) -> String {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    let salt = (std::process::id() ^ nanos.rotate_left(11)) & 0xffff;
    let suffix = format!("-swp{:04x}{:04x}", salt, seq & 0xffff);

    let max_base = SET_NAME_MAX_LEN - suffix.len();
    let mut end = base.len().min(max_base);
    while !base.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &base[..end], suffix)
}
