//! slurpd-style replog files.
//!
//! Each record is a block of `key: value` lines ended by a blank line:
//!
//! ```text
//! replica: ldap2.example.com:389
//! time: 1700000000
//! dn: cn=foo,dc=example,dc=com
//! changetype: modify
//! replace: sn
//! sn: bar
//! -
//!
//! ```
//!
//! Values that are not safe strings are written as `attr:: <base64>`.

use crate::error::SinkError;
use crate::record::{Change, ReplicationRecord};
use crate::sink::ReplicationSink;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A sink appending slurpd-style text to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    replicas: Vec<String>,
}

impl FileSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>, replicas: Vec<String>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            replicas,
        })
    }

    /// Path of the replog.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReplicationSink for FileSink {
    fn enqueue(&mut self, record: &ReplicationRecord) -> Result<(), SinkError> {
        let text = format_record(record, &self.replicas);
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

/// Renders one record, blank line included.
pub fn format_record(record: &ReplicationRecord, replicas: &[String]) -> String {
    let mut out = String::new();
    for replica in replicas {
        push_line(&mut out, "replica", replica.as_bytes());
    }
    push_line(&mut out, "time", record.time.to_string().as_bytes());
    push_line(&mut out, "dn", record.dn.as_bytes());
    push_line(&mut out, "changetype", record.change.changetype().as_bytes());
    match record.change {
        Change::Add(ref entry) => {
            for attr in entry.attributes() {
                for value in attr.values() {
                    push_line(&mut out, attr.name(), value);
                }
            }
        }
        Change::Modify(ref mods) => {
            for m in mods {
                push_line(&mut out, m.op.keyword(), m.attr_type.as_bytes());
                for value in &m.values {
                    push_line(&mut out, &m.attr_type, value);
                }
                out.push_str("-\n");
            }
        }
        Change::Delete => {}
    }
    out.push('\n');
    out
}

fn push_line(out: &mut String, key: &str, value: &[u8]) {
    out.push_str(key);
    match std::str::from_utf8(value) {
        Ok(text) if is_safe_string(value) => {
            out.push(':');
            if !text.is_empty() {
                out.push(' ');
                out.push_str(text);
            }
        }
        _ => {
            out.push_str(":: ");
            out.push_str(&STANDARD.encode(value));
        }
    }
    out.push('\n');
}

/// True if `value` can be written without base64.
pub fn is_safe_string(value: &[u8]) -> bool {
    let Some((&first, _)) = value.split_first() else {
        return true;
    };
    if matches!(first, b' ' | b':' | b'<') || value.last() == Some(&b' ') {
        return false;
    }
    value
        .iter()
        .all(|&b| b != 0 && b != b'\n' && b != b'\r' && b.is_ascii())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_core::{Dn, Entry, Modification};

    fn add_record() -> ReplicationRecord {
        let entry = Entry::from_modifications(
            Dn::parse("cn=foo,dc=example,dc=com").unwrap(),
            vec![
                Modification::add("objectClass", vec![b"person".to_vec()]),
                Modification::add("cn", vec![b"foo".to_vec()]),
                Modification::add("jpegPhoto", vec![vec![0xff, 0xd8, 0x00]]),
            ],
        )
        .unwrap();
        ReplicationRecord::new("userRoot", 1, "cn=foo,dc=example,dc=com", Change::Add(entry))
            .with_time(1_700_000_000)
    }

    #[test]
    fn add_record_format() {
        let text = format_record(&add_record(), &["ldap2:389".to_string()]);
        assert_eq!(
            text,
            "replica: ldap2:389\n\
             time: 1700000000\n\
             dn: cn=foo,dc=example,dc=com\n\
             changetype: add\n\
             objectClass: person\n\
             cn: foo\n\
             jpegPhoto:: /9gA\n\
             \n"
        );
    }

    #[test]
    fn modify_record_format() {
        let record = ReplicationRecord::new(
            "userRoot",
            2,
            "cn=foo,dc=example,dc=com",
            Change::Modify(vec![
                Modification::replace_one("sn", "bar"),
                Modification::delete("mail", vec![]),
            ]),
        );
        let text = format_record(&record, &[]);
        assert!(text.ends_with("changetype: modify\nreplace: sn\nsn: bar\n-\ndelete: mail\n-\n\n"));
    }

    #[test]
    fn unsafe_strings() {
        assert!(is_safe_string(b"plain value"));
        assert!(is_safe_string(b""));
        assert!(!is_safe_string(b" leading"));
        assert!(!is_safe_string(b"trailing "));
        assert!(!is_safe_string(b":colon"));
        assert!(!is_safe_string(b"<url"));
        assert!(!is_safe_string(b"two\nlines"));
        assert!(!is_safe_string("caf\u{e9}".as_bytes()));
    }

    #[test]
    fn file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replog");
        let mut sink = FileSink::open(&path, vec![]).unwrap();
        sink.enqueue(&add_record()).unwrap();
        sink.enqueue(&add_record()).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("changetype: add").count(), 2);
        assert_eq!(sink.path(), path.as_path());
    }
}
