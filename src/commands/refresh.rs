//! Refresh command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cmd_abstraction::CommandExecutor;
use crate::ipset::IpSet;

/// Run the refresh command
pub fn run<E: CommandExecutor>(
    ipset: &IpSet<E>,
    name: &str,
    mut entries: Vec<String>,
    from_file: Option<&Path>,
) -> Result<()> {
    if let Some(path) = from_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read entries file: {:?}", path))?;
        entries.extend(parse_entries(&content));
    }

    info!("Refreshing {} with {} entries", name, entries.len());
    ipset.refresh(name, &entries)?;
    Ok(())
}

/// One entry per line; blank lines and `#` comments are skipped.
pub fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_abstraction::{CommandOutput, MockCommandExecutor};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    const LISTING: &str = r#"<ipsets>
<ipset name="s">
<type>hash:ip</type>
<header><family>inet</family></header>
</ipset>
</ipsets>
"#;

    #[test]
    fn test_parse_entries() {
        let content = "# blocklist\n10.0.0.1\n\n  10.0.0.0/8  # private\n#192.168.0.1\n";
        assert_eq!(parse_entries(content), vec!["10.0.0.1", "10.0.0.0/8"]);
    }

    #[test]
    fn test_refresh_reads_file_and_args() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.2\n10.0.0.3").unwrap();

        let added = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&added);
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute().returning(move |_, args, _| {
            if args[0] == "list" {
                return Ok(CommandOutput::ok(LISTING));
            }
            if args[0] == "add" {
                sink.lock().unwrap().push(args[2].clone());
            }
            Ok(CommandOutput::ok(""))
        });

        let ipset = IpSet::with_executor("/usr/sbin/ipset", mock);
        run(&ipset, "s", vec!["10.0.0.1".to_string()], Some(file.path())).unwrap();

        assert_eq!(
            *added.lock().unwrap(),
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        );
    }
}
