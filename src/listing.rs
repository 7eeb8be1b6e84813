//! Typed records for `ipset list -o xml` output.
//!
//! The XML schema belongs to ipset and differs slightly between set types and
//! versions: bitmap sets report a `range` instead of `hashsize`, newer
//! releases add `bucketsize`/`initval`, and `list -n` emits bare
//! `<ipset name="..."/>` elements. Every field beyond the name is therefore
//! optional or defaulted, and unknown elements are ignored.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use crate::error::{IpsetError, Result};

/// One named kernel set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SetRecord {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "type", default)]
    pub set_type: String,

    #[serde(default)]
    pub revision: String,

    #[serde(default)]
    pub header: SetHeader,

    /// `None` when the listing suppressed members (`-t`).
    #[serde(default, deserialize_with = "deserialize_members")]
    pub members: Option<Vec<MemberEntry>>,
}

impl SetRecord {
    /// The member elements in listing order; empty when members were suppressed.
    pub fn entries(&self) -> Vec<String> {
        self.members
            .iter()
            .flatten()
            .map(|m| m.elem.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SetHeader {
    #[serde(default)]
    pub family: Option<String>,

    #[serde(rename = "hashsize", default)]
    pub hash_size: Option<u64>,

    #[serde(rename = "maxelem", default)]
    pub max_elements: Option<u64>,

    /// Address range of bitmap sets.
    #[serde(default)]
    pub range: Option<String>,

    #[serde(default)]
    pub netmask: Option<u8>,

    /// Default entry timeout, present when the set was created with one.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(rename = "memsize", default)]
    pub mem_size: u64,

    #[serde(rename = "references", default)]
    pub reference_count: u64,

    #[serde(rename = "numentries", default)]
    pub num_entries: u64,

    /// Extensions the set was created with, listed as empty elements.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub counters: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub comment: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub skbinfo: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub forceadd: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemberEntry {
    pub elem: String,

    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub packets: Option<u64>,

    #[serde(default)]
    pub bytes: Option<u64>,

    #[serde(default)]
    pub comment: Option<String>,
}

pub type SetCollection = Vec<SetRecord>;

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(rename = "ipset", default)]
    sets: Vec<SetRecord>,
}

fn deserialize_members<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<MemberEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Members {
        #[serde(rename = "member", default)]
        member: Vec<MemberEntry>,
    }

    Ok(Some(Members::deserialize(deserializer)?.member))
}

/// Present means set: `<counters/>` carries no value.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

/// Decode a full `<ipsets>` document.
pub fn decode_sets(xml: &str) -> Result<SetCollection> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: Document = quick_xml::de::from_str(xml)?;
    Ok(doc.sets)
}

/// Decode a listing that was scoped to `name` and must hold exactly one set.
pub fn decode_single(name: &str, xml: &str) -> Result<SetRecord> {
    let mut sets = decode_sets(xml)?;
    if sets.len() != 1 {
        return Err(IpsetError::AmbiguousResult {
            name: name.to_string(),
            count: sets.len(),
        });
    }
    Ok(sets.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"<ipsets>
<ipset name="blocklist">
<type>hash:net</type>
<revision>7</revision>
<header>
<family>inet</family>
<hashsize>1024</hashsize>
<maxelem>65536</maxelem>
<bucketsize>12</bucketsize>
<initval>0x5f263f5b</initval>
<memsize>600</memsize>
<references>1</references>
<numentries>2</numentries>
</header>
<members>
<member>
<elem>10.0.0.0/8</elem>
</member>
<member>
<elem>192.168.1.1</elem>
<timeout>3600</timeout>
</member>
</members>
</ipset>
</ipsets>
"#;

    const TERSE: &str = r#"<ipsets>
<ipset name="ports">
<type>bitmap:port</type>
<revision>3</revision>
<header>
<range>1-1024</range>
<memsize>280</memsize>
<references>0</references>
<numentries>0</numentries>
</header>
</ipset>
</ipsets>
"#;

    const NAMES: &str = r#"<ipsets>
<ipset name="a"/>
<ipset name="b"/>
</ipsets>
"#;

    #[test]
    fn test_decode_full_listing() {
        let sets = decode_sets(FULL).unwrap();
        assert_eq!(sets.len(), 1);

        let set = &sets[0];
        assert_eq!(set.name, "blocklist");
        assert_eq!(set.set_type, "hash:net");
        assert_eq!(set.revision, "7");
        assert_eq!(set.header.family.as_deref(), Some("inet"));
        assert_eq!(set.header.hash_size, Some(1024));
        assert_eq!(set.header.max_elements, Some(65536));
        assert_eq!(set.header.mem_size, 600);
        assert_eq!(set.header.reference_count, 1);
        assert_eq!(set.header.num_entries, 2);
        assert_eq!(set.entries(), vec!["10.0.0.0/8", "192.168.1.1"]);

        let members = set.members.as_ref().unwrap();
        assert_eq!(members[0].timeout, None);
        assert_eq!(members[1].timeout, Some(3600));
    }

    #[test]
    fn test_decode_extension_flags() {
        let xml = r#"<ipsets>
<ipset name="tagged">
<type>hash:ip</type>
<header>
<family>inet</family>
<counters/>
<comment/>
<skbinfo/>
<memsize>400</memsize>
</header>
</ipset>
</ipsets>
"#;
        let set = decode_single("tagged", xml).unwrap();
        assert!(set.header.counters);
        assert!(set.header.comment);
        assert!(set.header.skbinfo);
        assert!(!set.header.forceadd);
        assert_eq!(set.header.mem_size, 400);

        let plain = decode_single("ports", TERSE).unwrap();
        assert!(!plain.header.counters && !plain.header.comment);
    }

    #[test]
    fn test_decode_terse_listing_has_no_members() {
        let set = decode_single("ports", TERSE).unwrap();
        assert_eq!(set.set_type, "bitmap:port");
        assert_eq!(set.header.range.as_deref(), Some("1-1024"));
        assert_eq!(set.header.hash_size, None);
        assert!(set.members.is_none());
        assert!(set.entries().is_empty());
    }

    #[test]
    fn test_decode_empty_members_element() {
        let xml = r#"<ipsets><ipset name="e"><type>hash:ip</type><members>
</members></ipset></ipsets>"#;
        let set = decode_single("e", xml).unwrap();
        assert_eq!(set.members, Some(Vec::new()));
    }

    #[test]
    fn test_decode_names_only() {
        let sets = decode_sets(NAMES).unwrap();
        let names: Vec<_> = sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(sets[0].set_type.is_empty());
    }

    #[test]
    fn test_decode_empty_document() {
        assert!(decode_sets("<ipsets>\n</ipsets>\n").unwrap().is_empty());
        assert!(decode_sets("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_single_rejects_zero_results() {
        let err = decode_single("missing", "<ipsets></ipsets>").unwrap_err();
        assert!(matches!(
            err,
            IpsetError::AmbiguousResult { ref name, count: 0 } if name == "missing"
        ));
    }

    #[test]
    fn test_decode_single_rejects_many_results() {
        let err = decode_single("a", NAMES).unwrap_err();
        assert!(matches!(err, IpsetError::AmbiguousResult { count: 2, .. }));
    }

    #[test]
    fn test_decode_malformed() {
        let xml = "<ipsets><ipset name=\"x\"><header><hashsize>big</hashsize>";
        let err = decode_sets(xml).unwrap_err();
        assert!(matches!(err, IpsetError::Decode(_)));
    }
}
