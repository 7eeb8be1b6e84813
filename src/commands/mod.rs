//! CLI command implementations.

pub mod list;
pub mod refresh;

use std::io::Read;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands};
use crate::cmd_abstraction::CommandExecutor;
use crate::config::Config;
use crate::ipset::IpSet;
use crate::options::SetOptions;

/// Build the executor from the config file and command-line overrides.
pub fn build_ipset(cli: &Cli) -> Result<IpSet> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(ref binary) = cli.binary {
        config.binary = Some(binary.clone());
    }
    if let Some(ref timeout) = cli.timeout {
        config.timeout = timeout.clone();
    }
    Ok(IpSet::from_config(&config)?)
}

/// Run one command against `ipset`.
pub fn run<E: CommandExecutor>(ipset: &IpSet<E>, command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            name,
            set_type,
            flags,
            options,
        } => {
            let opts = flags
                .into_iter()
                .fold(SetOptions::from_pairs(options)?, SetOptions::flag);
            ipset.create(&name, &set_type, &opts)?;
        }
        Commands::Add {
            name,
            entry,
            exist,
            options,
        } => {
            let opts = SetOptions::from_pairs(options)?;
            if exist {
                ipset.add_unique(&name, &entry, &opts)?;
            } else {
                ipset.add(&name, &entry, &opts)?;
            }
        }
        Commands::Del {
            name,
            entry,
            options,
        } => ipset.delete(&name, &entry, &SetOptions::from_pairs(options)?)?,
        Commands::Test {
            name,
            entry,
            options,
        } => {
            if ipset.contains(&name, &entry, &SetOptions::from_pairs(options)?)? {
                println!("{} is in set {}", entry, name);
            } else {
                anyhow::bail!("{} is NOT in set {}", entry, name);
            }
        }
        Commands::Destroy { name } => ipset.destroy(name.as_deref().unwrap_or(""))?,
        Commands::Flush { name } => ipset.flush(name.as_deref().unwrap_or(""))?,
        Commands::Rename { from, to } => ipset.rename(&from, &to)?,
        Commands::Swap { from, to } => ipset.swap(&from, &to)?,
        Commands::Save { name, file } => {
            let name = name.as_deref().unwrap_or("");
            match file {
                Some(file) => ipset.save(name, file)?,
                None => print!("{}", ipset.save_to_string(name)?),
            }
        }
        Commands::Restore { file, exist } => match file {
            Some(file) => ipset.restore(file)?,
            None => {
                let mut data = String::new();
                std::io::stdin()
                    .read_to_string(&mut data)
                    .context("Failed to read restore data from stdin")?;
                ipset.restore_from_str(&data, exist)?;
            }
        },
        Commands::List { name, terse } => list::run_list(ipset, name.as_deref(), terse)?,
        Commands::Names => {
            for name in ipset.list_set_names()? {
                println!("{}", name);
            }
        }
        Commands::Entries { name } => {
            for entry in ipset.list_entries(&name)? {
                println!("{}", entry);
            }
        }
        Commands::Refs { name } => println!("{}", ipset.get_references(&name)?),
        Commands::Refresh {
            name,
            entries,
            from_file,
        } => refresh::run(ipset, &name, entries, from_file.as_deref())?,
        Commands::Version => {
            println!("ipset-exec {}", env!("CARGO_PKG_VERSION"));
            println!("{}", ipset.version()?);
        }
    }
    Ok(())
}
