use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::aggregator::AggregatedTable;
use crate::errors::{MigrateError, MigrateResult};
use crate::keys::{KeyEntry, KeyList};
use crate::results::WrittenFile;

/// Rebuilds output files in key list order
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter<'a> {
    destination: &'a Path,
    keys: &'a KeyList,
}

impl<'a> OutputWriter<'a> {
    pub fn new(destination: &'a Path, keys: &'a KeyList) -> Self {
        Self { destination, keys }
    }

    /// Renders one file: blank and comment entries pass through, keys
    /// without a value are dropped. Returns the text and its line count.
    pub fn render(&self, entries: &HashMap<String, String>) -> (String, usize) {
        let mut output = String::new();
        let mut lines = 0;
        for entry in self.keys.entries() {
            let line = match entry {
                KeyEntry::Blank => "",
                KeyEntry::Comment(comment) => comment,
                KeyEntry::Key(key) => match entries.get(key) {
                    Some(value) => value.as_str(),
                    None => continue,
                },
            };
            output.push_str(line);
            output.push('\n');
            lines += 1;
        }
        (output, lines)
    }

    /// Writes every file with at least one entry, in filename order.
    /// The first create or write failure aborts.
    pub fn write_all(&self, table: &AggregatedTable) -> MigrateResult<Vec<WrittenFile>> {
        if table.is_empty() {
            info!("No matches collected, nothing written");
            return Ok(Vec::new());
        }
        let mut written = Vec::with_capacity(table.len());
        for (filename, entries) in table.files() {
            if entries.is_empty() {
                continue;
            }
            let path = self.destination.join(filename);
            let (contents, lines) = self.render(entries);
            write_file(&path, contents.as_bytes())?;
            debug!("Wrote {} lines to {}", lines, path.display());
            written.push(WrittenFile { path, lines });
        }
        info!(
            "Wrote {} files to {}",
            written.len(),
            self.destination.display()
        );
        Ok(written)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> MigrateResult<()> {
    let file = File::create(path).map_err(|e| MigrateError::destination_write(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents)
        .and_then(|()| writer.flush())
        .map_err(|e| MigrateError::destination_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::MatchRecord;
    use std::fs;
    use tempfile::tempdir;

    fn table(records: &[(&str, &str, &str)]) -> AggregatedTable {
        let mut table = AggregatedTable::default();
        for (filename, key, value) in records {
            table.insert(MatchRecord::new(*key, *value, *filename));
        }
        table
    }

    #[test]
    fn test_render_follows_key_list_order() {
        let keys = KeyList::from_lines(["", "# greetings", "GREETING", "FAREWELL", "UNUSED"]);
        let table = table(&[
            ("a.txt", "FAREWELL", "FAREWELL=bye"),
            ("a.txt", "GREETING", "GREETING=hello"),
        ]);
        let writer = OutputWriter::new(Path::new("."), &keys);
        let (_, entries) = table.files().next().unwrap();

        let (text, lines) = writer.render(entries);
        assert_eq!(text, "\n# greetings\nGREETING=hello\nFAREWELL=bye\n");
        assert_eq!(lines, 4);
    }

    #[test]
    fn test_render_duplicate_keys_repeat_value() {
        let keys = KeyList::from_lines(["A", "# again", "A"]);
        let mut entries = HashMap::new();
        entries.insert("A".to_string(), "A=1".to_string());

        let (text, _) = OutputWriter::new(Path::new("."), &keys).render(&entries);
        assert_eq!(text, "A=1\n# again\nA=1\n");
    }

    #[test]
    fn test_render_is_deterministic_across_insertion_order() {
        let keys = KeyList::from_lines(["C", "A", "", "B"]);
        let forward = table(&[
            ("x.txt", "A", "A=1"),
            ("x.txt", "B", "B=2"),
            ("x.txt", "C", "C=3"),
        ]);
        let backward = table(&[
            ("x.txt", "C", "C=3"),
            ("x.txt", "B", "B=2"),
            ("x.txt", "A", "A=1"),
        ]);
        let writer = OutputWriter::new(Path::new("."), &keys);

        let render = |t: &AggregatedTable| writer.render(t.files().next().unwrap().1).0;
        assert_eq!(render(&forward), render(&backward));
        assert_eq!(render(&forward), "C=3\nA=1\n\nB=2\n");
    }

    #[test]
    fn test_write_all_creates_one_file_per_name() {
        let dir = tempdir().unwrap();
        let keys = KeyList::from_lines(["# header", "A", "B"]);
        let table = table(&[
            ("en.txt", "A", "A=hello"),
            ("fr.txt", "B", "B=salut"),
        ]);

        let written = OutputWriter::new(dir.path(), &keys)
            .write_all(&table)
            .unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].path, dir.path().join("en.txt"));
        assert_eq!(written[0].lines, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("en.txt")).unwrap(),
            "# header\nA=hello\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("fr.txt")).unwrap(),
            "# header\nB=salut\n"
        );
    }

    #[test]
    fn test_write_all_empty_table_writes_nothing() {
        let dir = tempdir().unwrap();
        let keys = KeyList::from_lines(["# header", "A"]);

        let written = OutputWriter::new(dir.path(), &keys)
            .write_all(&AggregatedTable::default())
            .unwrap();

        assert!(written.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_all_truncates_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("en.txt"), "old content\nmore old content\n").unwrap();
        let keys = KeyList::from_lines(["A"]);

        OutputWriter::new(dir.path(), &keys)
            .write_all(&table(&[("en.txt", "A", "A=new")]))
            .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("en.txt")).unwrap(),
            "A=new\n"
        );
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let keys = KeyList::from_lines(["A"]);

        let err = OutputWriter::new(&missing, &keys)
            .write_all(&table(&[("en.txt", "A", "A=1")]))
            .unwrap_err();

        match err {
            MigrateError::DestinationWrite { path, .. } => {
                assert_eq!(path, missing.join("en.txt"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
