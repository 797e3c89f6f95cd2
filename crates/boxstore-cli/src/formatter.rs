//! Output formatters for replies.

use clap::ValueEnum;
use comfy_table::Table;

use boxstore_proto::{BoxRecord, Status};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a list of records with the status they came with.
    fn format_records(&self, status: &Status, records: &[BoxRecord]) -> String;

    /// Format a single-record reply.
    fn format_record(&self, status: &Status, record: Option<&BoxRecord>) -> String;

    /// Format a reply that only carries a status.
    fn format_status(&self, status: &Status) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

const COLUMNS: [&str; 7] = [
    "id",
    "name",
    "price",
    "description",
    "category",
    "quantity",
    "created_at",
];

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_records(&self, status: &Status, records: &[BoxRecord]) -> String {
        if status.is_error() {
            return status_line(status);
        }
        if records.is_empty() {
            return "No results".to_string();
        }
        let mut table = Table::new();
        table.set_header(COLUMNS.to_vec());
        for record in records {
            table.add_row(record_row(record));
        }
        format!("{}\n{} box(es)", table, records.len())
    }

    fn format_record(&self, status: &Status, record: Option<&BoxRecord>) -> String {
        match record {
            Some(record) if status.is_ok() => {
                self.format_records(status, std::slice::from_ref(record))
            }
            _ => status_line(status),
        }
    }

    fn format_status(&self, status: &Status) -> String {
        status_line(status)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_records(&self, status: &Status, records: &[BoxRecord]) -> String {
        let mut obj = status_json(status);
        obj.insert("box".into(), records_to_json(records));
        to_pretty(serde_json::Value::Object(obj))
    }

    fn format_record(&self, status: &Status, record: Option<&BoxRecord>) -> String {
        let mut obj = status_json(status);
        let value = match record {
            Some(record) => serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Null,
        };
        obj.insert("box".into(), value);
        to_pretty(serde_json::Value::Object(obj))
    }

    fn format_status(&self, status: &Status) -> String {
        to_pretty(serde_json::Value::Object(status_json(status)))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }
}

fn status_line(status: &Status) -> String {
    match status {
        Status::Ok => "OK".to_string(),
        Status::Error { code, message } => format!("ERROR ({}): {}", code, message),
    }
}

fn record_row(record: &BoxRecord) -> Vec<String> {
    vec![
        record.id.to_string(),
        record.name.clone(),
        optional(record.price),
        record.description.clone().unwrap_or_default(),
        record.category.clone(),
        optional(record.quantity),
        optional(record.created_at),
    ]
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn status_json(status: &Status) -> serde_json::Map<String, serde_json::Value> {
    let mut obj = serde_json::Map::new();
    match status {
        Status::Ok => {
            obj.insert("status".into(), "OK".into());
        }
        Status::Error { code, message } => {
            obj.insert("status".into(), "ERROR".into());
            obj.insert("code".into(), (*code).into());
            obj.insert("message".into(), message.clone().into());
        }
    }
    obj
}

fn records_to_json(records: &[BoxRecord]) -> serde_json::Value {
    serde_json::to_value(records).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}

fn to_pretty(value: serde_json::Value) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxstore_proto::error_codes;

    fn sample() -> Vec<BoxRecord> {
        vec![
            BoxRecord::new(1, "Box1").with_price(10).with_created_at(5),
            BoxRecord::new(2, "Box2").with_category("A"),
        ]
    }

    #[test]
    fn test_table_lists_records() {
        let output = TableFormatter.format_records(&Status::ok(), &sample());
        assert!(output.contains("Box1"));
        assert!(output.contains("Box2"));
        assert!(output.contains("created_at"));
        assert!(output.ends_with("2 box(es)"));
    }

    #[test]
    fn test_table_empty_and_error() {
        assert_eq!(TableFormatter.format_records(&Status::ok(), &[]), "No results");

        let status = Status::error(error_codes::NOT_FOUND, "box 9 not found");
        assert_eq!(
            TableFormatter.format_record(&status, None),
            "ERROR (3): box 9 not found"
        );
    }

    #[test]
    fn test_json_records_parse_back() {
        let output = JsonFormatter.format_records(&Status::ok(), &sample());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["status"], "OK");
        let records: Vec<BoxRecord> = serde_json::from_value(value["box"].clone()).unwrap();
        assert_eq!(records, sample());
    }

    #[test]
    fn test_json_missing_record_is_null() {
        let status = Status::error(error_codes::NOT_FOUND, "box 9 not found");
        let output = JsonFormatter.format_record(&status, None);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["status"], "ERROR");
        assert_eq!(value["code"], error_codes::NOT_FOUND);
        assert!(value["box"].is_null());
    }
}
