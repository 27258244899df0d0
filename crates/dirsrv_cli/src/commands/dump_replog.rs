//! Dump replog command implementation.

use dirsrv_replog::{Change, ReplogEntry, ReplogReader};
use serde::Serialize;
use std::path::Path;

/// Replog record representation for output.
#[derive(Debug, Serialize)]
pub struct ReplogRecordInfo {
    /// Position of the record in the file, from 0.
    pub index: usize,
    /// Unix seconds.
    pub time: i64,
    /// Target DN.
    pub dn: String,
    /// `add`, `modify` or `delete`.
    pub changetype: String,
    /// Replica hosts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replicas: Vec<String>,
    /// Attributes of an add, or `op attr` lines of a modify.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

impl ReplogRecordInfo {
    fn from_entry(index: usize, entry: ReplogEntry) -> Self {
        let changes = match &entry.change {
            Change::Add(added) => added
                .attributes()
                .iter()
                .map(|a| format!("{} ({} values)", a.name(), a.values().len()))
                .collect(),
            Change::Modify(mods) => mods
                .iter()
                .map(|m| format!("{}: {} ({} values)", m.op.keyword(), m.attr_type, m.values.len()))
                .collect(),
            Change::Delete => Vec::new(),
        };
        Self {
            index,
            time: entry.time,
            dn: entry.dn,
            changetype: entry.change.changetype().to_string(),
            replicas: entry.replicas,
            changes,
        }
    }
}

/// Runs the dump-replog command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("replog not found at {:?}", path).into());
    }

    let records = read_records(path, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

/// Reads up to `limit` records.
pub fn read_records(
    path: &Path,
    limit: Option<usize>,
) -> Result<Vec<ReplogRecordInfo>, Box<dyn std::error::Error>> {
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    for (index, entry) in ReplogReader::open(path)?.take(max_records).enumerate() {
        records.push(ReplogRecordInfo::from_entry(index, entry?));
    }
    Ok(records)
}

fn print_text_output(records: &[ReplogRecordInfo]) {
    println!("Replog Records ({} total)", records.len());
    println!("================");
    println!();

    for record in records {
        print!(
            "[{:06}] {:8} time={} dn=\"{}\"",
            record.index, record.changetype, record.time, record.dn
        );
        if !record.replicas.is_empty() {
            print!(" replicas={}", record.replicas.join(","));
        }
        println!();
        for change in &record.changes {
            println!("         {}", change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_core::{Dn, Entry, Modification};
    use dirsrv_replog::{FileSink, ReplicationRecord, ReplicationSink};

    #[test]
    fn reads_records_with_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slapd.replog");
        let mut sink = FileSink::open(&path, vec!["replica.example.com:389".into()]).unwrap();

        let dn = Dn::parse("cn=foo,dc=example,dc=com").unwrap();
        let entry = Entry::from_modifications(
            dn.clone(),
            vec![Modification::add("cn", vec![b"foo".to_vec()])],
        )
        .unwrap();
        sink.enqueue(&ReplicationRecord::new("example", 1, dn.as_str(), Change::Add(entry)))
            .unwrap();
        sink.enqueue(&ReplicationRecord::new(
            "example",
            2,
            dn.as_str(),
            Change::Modify(vec![Modification::replace_one("sn", "bar")]),
        ))
        .unwrap();
        sink.enqueue(&ReplicationRecord::new("example", 3, dn.as_str(), Change::Delete))
            .unwrap();

        let all = read_records(&path, None).unwrap();
        let kinds: Vec<_> = all.iter().map(|r| r.changetype.as_str()).collect();
        assert_eq!(kinds, ["add", "modify", "delete"]);
        assert_eq!(all[0].replicas, vec!["replica.example.com:389".to_string()]);
        assert_eq!(all[1].changes, vec!["replace: sn (1 values)".to_string()]);

        assert_eq!(read_records(&path, Some(2)).unwrap().len(), 2);
    }
}
