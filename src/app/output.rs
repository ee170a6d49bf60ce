//! Record rendering for stdout.

use std::io::{self, Write};

use optical_core::Record;
use serde_json::Value;

/// How records are printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputMode {
    /// One JSON document per record.
    Json { pretty: bool },
    /// One tab-separated line per record with just these fields.
    Fields(Vec<String>),
}

impl OutputMode {
    /// `--just` wins over JSON; its field list keeps first occurrences only.
    pub(crate) fn from_args(just: &[String], pretty: bool) -> Self {
        if just.is_empty() {
            return Self::Json { pretty };
        }
        let mut fields: Vec<String> = Vec::with_capacity(just.len());
        for field in just {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        Self::Fields(fields)
    }
}

pub(crate) fn write_records<W: Write>(
    out: &mut W,
    records: &[Record],
    mode: &OutputMode,
) -> io::Result<()> {
    for record in records {
        match mode {
            OutputMode::Json { pretty: true } => serde_json::to_writer_pretty(&mut *out, record)?,
            OutputMode::Json { pretty: false } => serde_json::to_writer(&mut *out, record)?,
            OutputMode::Fields(fields) => out.write_all(format_fields(record, fields).as_bytes())?,
        }
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn format_fields(record: &Record, fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| format_value(record.get(field)))
        .collect::<Vec<_>>()
        .join("\t")
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
