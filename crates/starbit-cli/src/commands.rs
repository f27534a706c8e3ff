//! Subcommand implementations.
//!
//! Every command writes to the given writer so the binary can pass
//! stdout and tests can pass a buffer.

use crate::config::{CliConfig, Command};
use crate::search;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};
use starbit_formats::bcsv::{BcsvTable, FieldValue};
use starbit_formats::msbf::{FlowKind, FlowNode, MsbfFile};
use starbit_formats::msbt::MsbtFile;
use starbit_formats::rarc::RarcArchive;
use starbit_hash::{FieldNameTable, field_name_to_hash};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Run the configured command.
pub fn run(config: &CliConfig, stop: &AtomicBool, out: &mut impl Write) -> Result<()> {
    let json = config.json;
    match &config.command {
        Command::Hash { names } => hash(names, json, out),
        Command::Ls { archive } => ls(archive, json, out),
        Command::Extract { archive, output } => extract(archive, output, out),
        Command::Bcsv { archive, path } => {
            let names = config.load_names().context("Failed to load field names")?;
            bcsv(archive, path, &names, json, out)
        }
        Command::Msbt { archive, path } => msbt(archive, path, json, out),
        Command::Msbf { archive, path } => msbf(archive, path, json, out),
        Command::Search {
            dir,
            query,
            max_hits,
        } => {
            let names = config.load_names().context("Failed to load field names")?;
            let report = search::run(dir, query, &names, &config.search_config(*max_hits), stop)?;
            if json {
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            } else {
                for hit in &report.hits {
                    writeln!(
                        out,
                        "{}\t{}\t{}\t{}",
                        hit.archive.display(),
                        hit.file,
                        hit.location,
                        hit.value
                    )?;
                }
            }
            Ok(())
        }
        Command::Learn { names } => {
            let path = config
                .names_file
                .as_deref()
                .context("learn needs a lookup file")?;
            learn(path, names, out)
        }
    }
}

#[derive(Serialize)]
struct HashLine<'a> {
    name: &'a str,
    hash: String,
}

/// Print the JMap hash of each name.
pub fn hash(names: &[String], json: bool, out: &mut impl Write) -> Result<()> {
    let lines: Vec<HashLine<'_>> = names
        .iter()
        .map(|name| HashLine {
            name,
            hash: format!("{:08X}", field_name_to_hash(name)),
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &lines)?;
        writeln!(out)?;
    } else {
        for line in &lines {
            writeln!(out, "{}  {}", line.hash, line.name)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ListedFile {
    path: String,
    size: usize,
    attributes: u8,
    magic: String,
}

/// List the files of an archive with size, attributes, and leading bytes.
pub fn ls(archive: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let archive = open_archive(archive)?;
    let files: Vec<ListedFile> = archive
        .walk()
        .map(|(path, file)| ListedFile {
            path,
            size: file.data.len(),
            attributes: file.attributes,
            magic: hex::encode(&file.data[..file.data.len().min(4)]),
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &files)?;
        writeln!(out)?;
    } else {
        for file in &files {
            writeln!(
                out,
                "{:<8}  {:>8}  {:02X}  {}",
                file.magic, file.size, file.attributes, file.path
            )?;
        }
    }
    Ok(())
}

/// Write every file of an archive below `output`.
pub fn extract(archive: &Path, output: &Path, out: &mut impl Write) -> Result<()> {
    let decoded = open_archive(archive)?;
    let mut count = 0;

    for dir in decoded.directories() {
        std::fs::create_dir_all(output.join(&dir))
            .with_context(|| format!("Failed to create {}", output.join(&dir).display()))?;
    }
    for (path, file) in decoded.walk() {
        let target = output.join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &file.data)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        count += 1;
    }

    info!("Extracted {} files from {}", count, archive.display());
    writeln!(out, "Extracted {count} files to {}", output.display())?;
    Ok(())
}

/// Dump a BCSV table.
pub fn bcsv(
    archive: &Path,
    path: &str,
    names: &FieldNameTable,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let decoded = open_archive(archive)?;
    let table = BcsvTable::parse(decoded.read_file(path)?)
        .with_context(|| format!("{path} is not a BCSV table"))?;
    let columns = table.column_names(names);

    if json {
        let rows: Vec<Value> = table
            .entries()
            .iter()
            .map(|entry| {
                let row: Map<String, Value> = columns
                    .iter()
                    .zip(entry.values())
                    .map(|(column, value)| (column.to_string(), json_value(value)))
                    .collect();
                Value::Object(row)
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{}", columns.join("\t"))?;
    for entry in table.entries() {
        let cells: Vec<String> = entry.values().iter().map(FieldValue::display).collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

/// Dump an MSBT message table.
pub fn msbt(archive: &Path, path: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let decoded = open_archive(archive)?;
    let messages = MsbtFile::parse(decoded.read_file(path)?)
        .with_context(|| format!("{path} is not a message table"))?;

    if json {
        let rows: Vec<Value> = messages
            .messages()
            .iter()
            .enumerate()
            .map(|(index, message)| {
                json!({
                    "index": index,
                    "label": message.label,
                    "trigger": format!("{:?}", message.attributes.trigger),
                    "sound_id": message.attributes.sound_id,
                    "camera_id": message.attributes.camera_id,
                    "text": message.text.to_string_lossy(),
                })
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    for (index, message) in messages.messages().iter().enumerate() {
        writeln!(
            out,
            "{index}\t{}\t{:?}\t{}",
            message.label,
            message.attributes.trigger,
            message.text.to_string_lossy().replace('\n', "\\n")
        )?;
    }
    Ok(())
}

/// Dump an MSBF flow graph.
pub fn msbf(archive: &Path, path: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let decoded = open_archive(archive)?;
    let graph = MsbfFile::parse(decoded.read_file(path)?)
        .with_context(|| format!("{path} is not a flow graph"))?;
    let warnings: Vec<String> = graph.validate().iter().map(ToString::to_string).collect();

    let describe = |node: &FlowNode| match node {
        FlowNode::Entry(entry) => ("Entry".to_string(), entry.label.clone()),
        FlowNode::Flow(flow) => (
            match flow.kind {
                FlowKind::Other(code) => format!("Kind{code}"),
                kind => format!("{kind:?}"),
            },
            String::new(),
        ),
    };

    if json {
        let nodes: Vec<Value> = graph
            .nodes()
            .iter()
            .map(|node| {
                let (kind, label) = describe(node);
                json!({
                    "kind": kind,
                    "label": label,
                    "subtype": node.attributes().subtype,
                    "params": node.attributes().params,
                })
            })
            .collect();
        let dump = json!({
            "nodes": nodes,
            "chars": graph.chars(),
            "warnings": warnings,
        });
        serde_json::to_writer_pretty(&mut *out, &dump)?;
        writeln!(out)?;
        return Ok(());
    }

    for (index, node) in graph.nodes().iter().enumerate() {
        let (kind, label) = describe(node);
        let attributes = node.attributes();
        writeln!(
            out,
            "{index}\t{kind}\t{label}\t{}\t{:?}",
            attributes.subtype, attributes.params
        )?;
    }
    writeln!(out, "chars: {:?}", graph.chars())?;
    for warning in &warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

/// Append names to the lookup file.
pub fn learn(path: &Path, names: &[String], out: &mut impl Write) -> Result<()> {
    let mut table = FieldNameTable::empty();
    table
        .load(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for name in names {
        let hash = table
            .append_to_file(path, name)
            .with_context(|| format!("Failed to record {name:?}"))?;
        writeln!(out, "{hash:08X}  {name}")?;
    }
    Ok(())
}

fn open_archive(path: &Path) -> Result<RarcArchive> {
    RarcArchive::open_path(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Int(v) => json!(v),
        FieldValue::String(s) => json!(s),
        FieldValue::Float(f) => json!(f64::from(*f)),
        FieldValue::UnsignedInt(v) => json!(v),
        FieldValue::Short(v) => json!(v),
        FieldValue::Byte(v) => json!(v),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use starbit_formats::bcsv::FieldType;
    use starbit_formats::msbt::Message;

    fn stage(dir: &Path) -> std::path::PathBuf {
        let mut table = BcsvTable::new();
        table.add_field("name", FieldType::StringOffset).unwrap();
        table.add_field("pos_x", FieldType::Float).unwrap();
        let row = table.add_entry();
        table
            .set_value(row, "name", FieldValue::String("Kuribo".to_string()))
            .unwrap();
        table
            .set_value(row, "pos_x", FieldValue::Float(1.5))
            .unwrap();

        let mut messages = MsbtFile::new();
        messages.add_message(Message::new("Hello", "Hi"));

        let mut graph = MsbfFile::new();
        graph.add_empty_node(true);
        graph.push_char(300);

        let mut archive = RarcArchive::new("Stage");
        archive.create_directory("", "jmp").unwrap();
        let handle = archive.create_file("jmp", "ObjInfo").unwrap();
        archive.set_contents(&handle, table.build().unwrap()).unwrap();
        let handle = archive.create_file("", "Talk.msbt").unwrap();
        archive.set_contents(&handle, messages.build().unwrap()).unwrap();
        let handle = archive.create_file("", "Talk.msbf").unwrap();
        archive.set_contents(&handle, graph.build().unwrap()).unwrap();

        let path = dir.join("Stage.arc");
        archive.set_compressed(true);
        archive.save_to(&path).unwrap();
        path
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_hash() {
        let text = output(|out| hash(&["name".to_string()], false, out));
        assert_eq!(text, "00337A8B  name\n");

        let text = output(|out| hash(&["name".to_string()], true, out));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["hash"], "00337A8B");
    }

    #[test]
    fn test_ls() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage(dir.path());

        let text = output(|out| ls(&path, false, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("jmp/ObjInfo"));
        assert!(lines[1].starts_with("4d736753"));
        assert!(lines[1].ends_with("Talk.msbt"));
    }

    #[test]
    fn test_extract() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage(dir.path());
        let target = dir.path().join("out");

        let text = output(|out| extract(&path, &target, out));
        assert!(text.starts_with("Extracted 3 files"));
        let data = std::fs::read(target.join("Talk.msbt")).unwrap();
        assert_eq!(&data[..8], b"MsgStdBn");
        assert!(target.join("jmp/ObjInfo").is_file());
    }

    #[test]
    fn test_bcsv_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage(dir.path());
        let names = FieldNameTable::with_defaults();

        let text = output(|out| bcsv(&path, "jmp/ObjInfo", &names, false, out));
        assert_eq!(text, "name\tpos_x\nKuribo\t1.500\n");

        let text = output(|out| bcsv(&path, "jmp/ObjInfo", &names, true, out));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["name"], "Kuribo");
        assert_eq!(parsed[0]["pos_x"], 1.5);
    }

    #[test]
    fn test_msbt_and_msbf_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage(dir.path());

        let text = output(|out| msbt(&path, "Talk.msbt", false, out));
        assert_eq!(text, "0\tHello\tTalk\tHi\n");

        let text = output(|out| msbf(&path, "Talk.msbf", false, out));
        assert!(text.starts_with("0\tEntry\t"));
        assert!(text.contains("chars: [255]"));

        let text = output(|out| msbf(&path, "Talk.msbf", true, out));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["chars"][0], 255);
    }

    #[test]
    fn test_wrong_format_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage(dir.path());
        let mut buffer = Vec::new();
        let error = msbf(&path, "Talk.msbt", false, &mut buffer).unwrap_err();
        assert!(error.to_string().contains("is not a flow graph"));
    }

    #[test]
    fn test_learn_appends() {
        let dir = tempfile::tempdir().unwrap();
        let names = dir.path().join("names.txt");

        let text = output(|out| learn(&names, &["MyField".to_string()], out));
        assert_eq!(text, format!("{:08X}  MyField\n", field_name_to_hash("MyField")));

        let content = std::fs::read_to_string(&names).unwrap();
        assert_eq!(
            content,
            format!("# {:08X}\nMyField\n", field_name_to_hash("MyField"))
        );

        // Learning the same name again writes nothing
        output(|out| learn(&names, &["MyField".to_string()], out));
        assert_eq!(std::fs::read_to_string(&names).unwrap(), content);
    }

    #[test]
    fn test_run_dispatch() {
        let config = CliConfig::parse_from(["starbit", "hash", "l_id"]);
        let stop = AtomicBool::new(false);
        let text = output(|out| run(&config, &stop, out));
        assert!(text.ends_with("  l_id\n"));
    }
}
