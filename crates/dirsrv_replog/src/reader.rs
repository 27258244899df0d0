//! Reading replog files back.

use crate::error::{ReplogError, ReplogResult};
use crate::record::Change;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dirsrv_core::{Dn, Entry, Modification, ModifyOperation};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One record parsed from a replog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplogEntry {
    /// Replica lines.
    pub replicas: Vec<String>,
    /// Unix seconds.
    pub time: i64,
    /// Target DN.
    pub dn: String,
    /// The change.
    pub change: Change,
}

/// Iterates over the records of a replog.
///
/// The iterator ends after the first error.
pub struct ReplogReader<R> {
    lines: Lines<R>,
    line: usize,
    done: bool,
}

impl ReplogReader<BufReader<File>> {
    /// Opens a replog file.
    pub fn open(path: impl AsRef<Path>) -> ReplogResult<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> ReplogReader<R> {
    /// Reads records from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            done: false,
        }
    }

    fn next_block(&mut self) -> ReplogResult<Vec<(usize, String)>> {
        let mut block = Vec::new();
        for text in self.lines.by_ref() {
            let text = text?;
            self.line += 1;
            if text.is_empty() {
                if block.is_empty() {
                    continue;
                }
                break;
            }
            block.push((self.line, text));
        }
        Ok(block)
    }
}

impl<R: BufRead> Iterator for ReplogReader<R> {
    type Item = ReplogResult<ReplogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match self.next_block() {
            Ok(block) if block.is_empty() => {
                self.done = true;
                return None;
            }
            Ok(block) => parse_block(&block),
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl<R> std::fmt::Debug for ReplogReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplogReader")
            .field("line", &self.line)
            .field("done", &self.done)
            .finish()
    }
}

struct Line<'a> {
    number: usize,
    key: &'a str,
    value: Vec<u8>,
}

impl Line<'_> {
    fn text(&self) -> ReplogResult<String> {
        String::from_utf8(self.value.clone())
            .map_err(|_| ReplogError::parse(self.number, format!("{} is not UTF-8", self.key)))
    }
}

fn parse_line(number: usize, text: &str) -> ReplogResult<Line<'_>> {
    let (key, rest) = text
        .split_once(':')
        .ok_or_else(|| ReplogError::parse(number, "missing ':'"))?;
    let value = match rest.strip_prefix(':') {
        Some(encoded) => STANDARD
            .decode(encoded.trim_start())
            .map_err(|e| ReplogError::parse(number, format!("bad base64: {e}")))?,
        None => rest.trim_start().as_bytes().to_vec(),
    };
    Ok(Line { number, key, value })
}

fn expect_key<'a, I>(lines: &mut std::iter::Peekable<I>, key: &str, last: usize) -> ReplogResult<Line<'a>>
where
    I: Iterator<Item = &'a (usize, String)>,
{
    let (number, text) = lines
        .next()
        .ok_or_else(|| ReplogError::parse(last, format!("missing {key}")))?;
    let line = parse_line(*number, text)?;
    if !line.key.eq_ignore_ascii_case(key) {
        return Err(ReplogError::parse(*number, format!("expected {key}, found {}", line.key)));
    }
    Ok(line)
}

fn parse_block(block: &[(usize, String)]) -> ReplogResult<ReplogEntry> {
    let last = block.last().map_or(0, |(n, _)| *n);
    let mut lines = block.iter().peekable();

    let mut replicas = Vec::new();
    while let Some((number, text)) = lines.peek() {
        let line = parse_line(*number, text)?;
        if !line.key.eq_ignore_ascii_case("replica") {
            break;
        }
        replicas.push(line.text()?);
        lines.next();
    }

    let time_line = expect_key(&mut lines, "time", last)?;
    let time: i64 = time_line
        .text()?
        .parse()
        .map_err(|_| ReplogError::parse(time_line.number, "bad time"))?;
    let dn_line = expect_key(&mut lines, "dn", last)?;
    let dn = dn_line.text()?;
    let changetype_line = expect_key(&mut lines, "changetype", last)?;

    let change = match changetype_line.text()?.as_str() {
        "add" => {
            let mut mods: Vec<Modification> = Vec::new();
            for (number, text) in lines {
                let line = parse_line(*number, text)?;
                match mods.iter_mut().find(|m| m.attr_type.eq_ignore_ascii_case(line.key)) {
                    Some(m) => m.values.push(line.value),
                    None => mods.push(Modification::add(line.key, vec![line.value])),
                }
            }
            let parsed = Dn::parse(&dn)
                .map_err(|e| ReplogError::parse(dn_line.number, e.to_string()))?;
            let entry = Entry::from_modifications(parsed, mods)
                .map_err(|e| ReplogError::parse(changetype_line.number, e.to_string()))?;
            Change::Add(entry)
        }
        "modify" => Change::Modify(parse_modify(lines)?),
        "delete" => match lines.next() {
            Some((number, _)) => return Err(ReplogError::parse(*number, "unexpected line after delete")),
            None => Change::Delete,
        },
        other => {
            return Err(ReplogError::parse(
                changetype_line.number,
                format!("unknown changetype {other}"),
            ))
        }
    };

    Ok(ReplogEntry {
        replicas,
        time,
        dn,
        change,
    })
}

fn parse_modify<'a>(lines: impl Iterator<Item = &'a (usize, String)>) -> ReplogResult<Vec<Modification>> {
    let mut mods = Vec::new();
    let mut current: Option<Modification> = None;
    let mut last = 0;
    for (number, text) in lines {
        last = *number;
        if text == "-" {
            match current.take() {
                Some(m) => mods.push(m),
                None => return Err(ReplogError::parse(*number, "'-' without modification")),
            }
            continue;
        }
        let line = parse_line(*number, text)?;
        match current {
            Some(ref mut m) if m.attr_type.eq_ignore_ascii_case(line.key) => m.values.push(line.value),
            Some(_) => return Err(ReplogError::parse(*number, "value for another attribute")),
            None => {
                let op = match line.key {
                    "add" => ModifyOperation::Add,
                    "delete" => ModifyOperation::Delete,
                    "replace" => ModifyOperation::Replace,
                    other => {
                        return Err(ReplogError::parse(*number, format!("unknown modify keyword {other}")))
                    }
                };
                current = Some(Modification::new(op, line.text()?, Vec::new()));
            }
        }
    }
    match current {
        Some(_) => Err(ReplogError::parse(last, "modification without '-'")),
        None => Ok(mods),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::format_record;
    use crate::record::ReplicationRecord;
    use std::io::Cursor;

    fn read(text: &str) -> Vec<ReplogResult<ReplogEntry>> {
        ReplogReader::new(Cursor::new(text.to_string())).collect()
    }

    #[test]
    fn reads_formatted_records() {
        let mods = vec![
            Modification::replace_one("sn", "bar"),
            Modification::delete("mail", vec![]),
            Modification::add("description", vec![b" padded".to_vec()]),
        ];
        let mut text = format_record(
            &ReplicationRecord::new("r", 1, "cn=foo,dc=example,dc=com", Change::Modify(mods.clone()))
                .with_time(42),
            &["ldap2".to_string(), "ldap3".to_string()],
        );
        text.push_str(&format_record(
            &ReplicationRecord::new("r", 2, "cn=foo,dc=example,dc=com", Change::Delete),
            &[],
        ));

        let entries: Vec<_> = read(&text).into_iter().map(Result::unwrap).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].replicas, vec!["ldap2", "ldap3"]);
        assert_eq!(entries[0].time, 42);
        assert_eq!(entries[0].change, Change::Modify(mods));
        assert_eq!(entries[1].change, Change::Delete);
    }

    #[test]
    fn add_groups_values() {
        let text = "time: 1\ndn: cn=a,dc=x\nchangetype: add\ncn: a\nmail: one\nMAIL: two\n";
        let entries = read(text);
        let entry = match entries[0].as_ref().unwrap().change {
            Change::Add(ref entry) => entry.clone(),
            _ => panic!("not an add"),
        };
        assert_eq!(entry.get("mail").unwrap().values().len(), 2);
    }

    #[test]
    fn errors_fuse() {
        let text = "time: 1\ndn: cn=a\nchangetype: rename\n\ntime: 2\ndn: cn=b\nchangetype: delete\n";
        let entries = read(text);
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], Err(ReplogError::Parse { line: 3, .. })));
    }

    #[test]
    fn empty_input() {
        assert!(read("").is_empty());
        assert!(read("\n\n").is_empty());
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_values_survive_the_text_form(
            values in proptest::collection::vec(proptest::collection::vec(proptest::num::u8::ANY, 1..24), 1..4)
        ) {
            let mods = vec![Modification::replace("description", values)];
            let record = ReplicationRecord::new("r", 1, "cn=foo", Change::Modify(mods.clone()));
            let text = format_record(&record, &[]);
            let entries = read(&text);
            proptest::prop_assert_eq!(entries.len(), 1);
            let entry = entries.into_iter().next().unwrap().unwrap();
            proptest::prop_assert_eq!(entry.change, Change::Modify(mods));
        }
    }
}
