//! List command implementation.

use anyhow::Result;

use crate::cmd_abstraction::CommandExecutor;
use crate::ipset::IpSet;
use crate::listing::SetRecord;

/// Run the list command
pub fn run_list<E: CommandExecutor>(
    ipset: &IpSet<E>,
    name: Option<&str>,
    terse: bool,
) -> Result<()> {
    let sets = match name {
        Some(name) => vec![ipset.list(name, terse)?],
        None => ipset.list_sets(terse)?,
    };

    let rendered: Vec<String> = sets.iter().map(render_set).collect();
    print!("{}", rendered.join("\n"));
    Ok(())
}

/// Render a set the way `ipset list` prints it in plain mode.
pub fn render_set(set: &SetRecord) -> String {
    let h = &set.header;

    let mut header = Vec::new();
    if let Some(ref family) = h.family {
        header.push(format!("family {}", family));
    }
    if let Some(ref range) = h.range {
        header.push(format!("range {}", range));
    }
    if let Some(hash_size) = h.hash_size {
        header.push(format!("hashsize {}", hash_size));
    }
    if let Some(max_elements) = h.max_elements {
        header.push(format!("maxelem {}", max_elements));
    }
    if let Some(netmask) = h.netmask {
        header.push(format!("netmask {}", netmask));
    }
    if let Some(timeout) = h.timeout {
        header.push(format!("timeout {}", timeout));
    }
    for (present, extension) in [
        (h.counters, "counters"),
        (h.comment, "comment"),
        (h.skbinfo, "skbinfo"),
        (h.forceadd, "forceadd"),
    ] {
        if present {
            header.push(extension.to_string());
        }
    }

    let mut lines = vec![
        format!("Name: {}", set.name),
        format!("Type: {}", set.set_type),
        format!("Revision: {}", set.revision),
        format!("Header: {}", header.join(" ")),
        format!("Size in memory: {}", h.mem_size),
        format!("References: {}", h.reference_count),
        format!("Number of entries: {}", h.num_entries),
    ];

    if let Some(ref members) = set.members {
        lines.push("Members:".to_string());
        lines.extend(members.iter().map(|member| match member.timeout {
            Some(timeout) => format!("{} timeout {}", member.elem, timeout),
            None => member.elem.clone(),
        }));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{MemberEntry, SetHeader};

    fn sample(members: Option<Vec<MemberEntry>>) -> SetRecord {
        SetRecord {
            name: "blocklist".to_string(),
            set_type: "hash:ip".to_string(),
            revision: "6".to_string(),
            header: SetHeader {
                family: Some("inet".to_string()),
                hash_size: Some(1024),
                max_elements: Some(65536),
                mem_size: 200,
                reference_count: 1,
                num_entries: 1,
                ..SetHeader::default()
            },
            members,
        }
    }

    #[test]
    fn test_render_terse() {
        let out = render_set(&sample(None));
        assert!(out.contains("Name: blocklist\n"));
        assert!(out.contains("Header: family inet hashsize 1024 maxelem 65536\n"));
        assert!(out.contains("References: 1\n"));
        assert!(!out.contains("Members:"));
    }

    #[test]
    fn test_render_extensions_in_header() {
        let mut set = sample(None);
        set.header.counters = true;
        set.header.comment = true;
        let out = render_set(&set);
        assert!(out.contains("maxelem 65536 counters comment\n"));
    }

    #[test]
    fn test_render_members() {
        let members = vec![
            MemberEntry {
                elem: "10.0.0.1".to_string(),
                ..MemberEntry::default()
            },
            MemberEntry {
                elem: "10.0.0.2".to_string(),
                timeout: Some(30),
                ..MemberEntry::default()
            },
        ];
        let out = render_set(&sample(Some(members)));
        assert!(out.ends_with("Members:\n10.0.0.1\n10.0.0.2 timeout 30\n"));
    }
}
