//! The CSV task-report interface: the one output contract the engine owns.
//!
//! Rows list leaf tasks in declaration order with fully qualified dotted
//! ids; timestamps follow the report's `timeformat`. The bundled reader
//! auto-detects comma or semicolon delimiters so external reference files
//! can be compared directly.

use crate::model::{Project, TaskId};
use chronoplan_common::AttrValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Name,
    Start,
    End,
    Effort,
    Cost,
}

impl Column {
    pub fn header(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Start => "start",
            Column::End => "end",
            Column::Effort => "effort",
            Column::Cost => "cost",
        }
    }
}

/// A tabular task report over one scenario.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub columns: Vec<Column>,
    pub timeformat: String,
    pub scenario: usize,
    /// Containers are skipped by default; enable to emit aggregate rows too.
    pub include_containers: bool,
}

impl Default for TaskReport {
    fn default() -> Self {
        Self {
            columns: vec![Column::Id, Column::Start, Column::End],
            timeformat: "%Y-%m-%d-%H:%M".to_string(),
            scenario: 0,
            include_containers: false,
        }
    }
}

impl TaskReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_timeformat(mut self, fmt: impl Into<String>) -> Self {
        self.timeformat = fmt.into();
        self
    }

    pub fn for_scenario(mut self, scenario: usize) -> Self {
        self.scenario = scenario;
        self
    }

    /// The raw cell value for one task and column.
    pub fn cell(&self, project: &Project, tid: TaskId, column: Column) -> AttrValue {
        let task = project.task(tid);
        match column {
            Column::Id => AttrValue::from(task.full_id()),
            Column::Name => AttrValue::from(task.name.as_str()),
            Column::Start => task
                .start(self.scenario)
                .map(AttrValue::from)
                .unwrap_or(AttrValue::Empty),
            Column::End => task
                .end(self.scenario)
                .map(AttrValue::from)
                .unwrap_or(AttrValue::Empty),
            Column::Effort => AttrValue::Float(task.effort_done(self.scenario) / 3600.0),
            Column::Cost => AttrValue::Float(project.task_cost(tid, self.scenario)),
        }
    }

    fn render(&self, value: &AttrValue) -> String {
        match value {
            AttrValue::Date(d) => d.format(&self.timeformat).to_string(),
            AttrValue::Float(x) => format!("{x:.1}"),
            other => other.to_string(),
        }
    }

    /// Render the report; rows follow task declaration order.
    pub fn to_csv(&self, project: &Project) -> String {
        let mut out = String::new();
        let header: Vec<&str> = self.columns.iter().map(|c| c.header()).collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for (tid, task) in project.tasks() {
            if !self.include_containers && !task.is_leaf() {
                continue;
            }
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|&c| escape_csv(&self.render(&self.cell(project, tid, c))))
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', ';', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// A parsed CSV table with named-column access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parse CSV text, sniffing the delimiter from the header line; commas
    /// and semicolons are accepted.
    pub fn parse(text: &str) -> Option<CsvTable> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header_line = lines.next()?;
        let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
            ';'
        } else {
            ','
        };
        let header = split_csv_line(header_line, delimiter)
            .into_iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let rows = lines
            .map(|line| split_csv_line(line, delimiter))
            .collect();
        Some(CsvTable { header, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Value of `column` in the row whose `id` column matches.
    pub fn get(&self, id: &str, column: &str) -> Option<&str> {
        let id_col = self.column("id")?;
        let col = self.column(column)?;
        self.rows
            .iter()
            .find(|r| r.get(id_col).map(String::as_str) == Some(id))
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn split_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_delimiter() {
        let table = CsvTable::parse("id;start;end\na.b;x;y\n").unwrap();
        assert_eq!(table.header, vec!["id", "start", "end"]);
        assert_eq!(table.get("a.b", "start"), Some("x"));
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let table = CsvTable::parse("id,name\nt1,\"a, b\"\n").unwrap();
        assert_eq!(table.get("t1", "name"), Some("a, b"));
    }

    #[test]
    fn doubled_quotes_unescape() {
        let table = CsvTable::parse("id,name\nt1,\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(table.get("t1", "name"), Some("say \"hi\""));
    }

    #[test]
    fn escape_round_trips_through_parse() {
        let escaped = escape_csv("a;b \"c\"");
        let line = format!("id,name\nt1,{escaped}\n");
        let table = CsvTable::parse(&line).unwrap();
        assert_eq!(table.get("t1", "name"), Some("a;b \"c\""));
    }
}
