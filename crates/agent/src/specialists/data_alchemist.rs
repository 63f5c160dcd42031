//! DataAlchemist: assesses raw data items and summarises scraped tables.

use std::collections::BTreeMap;

use agora_core::memory::Document;
use agora_core::scrape::{ScrapeResult, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{bullets, context_lines, finding_metadata, put_json};
use crate::contract::{Finding, Retrieval, Specialist, TaskContext};
use crate::extract::{lenient, truncate_chars};

pub const NAME: &str = "DataAlchemist";

/// Tables summarised per task.
const MAX_TABLES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    #[serde(deserialize_with = "lenient::string")]
    pub data_quality: String,
    #[serde(deserialize_with = "lenient::list")]
    pub cleaning_steps: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub transformation_plan: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub schema: String,
    #[serde(deserialize_with = "lenient::list")]
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTable {
    pub table_id: usize,
    pub rows: usize,
    pub columns: usize,
    /// Numeric columns only.
    pub summary: BTreeMap<String, ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub items_processed: usize,
    pub tables_processed: usize,
    pub quality_score: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataAlchemistOutput {
    pub analysis: Analysis,
    pub processed_tables: Vec<ProcessedTable>,
    pub data_summary: DataSummary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataAlchemist;

fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Row/column counts and per-column numeric statistics.
pub fn summarize_table(table_id: usize, table: &Table) -> ProcessedTable {
    let mut summary = BTreeMap::new();
    for header in &table.headers {
        let values: Vec<f64> = table
            .column(header)
            .into_iter()
            .filter_map(parse_number)
            .collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        summary.insert(
            header.clone(),
            ColumnSummary {
                count: values.len(),
                mean,
                min,
                max,
            },
        );
    }

    ProcessedTable {
        table_id,
        rows: table.rows.len(),
        columns: table.headers.len(),
        summary,
    }
}

fn table_preview(table: &Table) -> String {
    let mut lines = vec![table.headers.join(" | ")];
    lines.extend(table.rows.iter().take(3).map(|row| row.join(" | ")));
    lines.join("\n")
}

impl Specialist for DataAlchemist {
    type Parsed = Analysis;
    type Output = DataAlchemistOutput;

    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> &'static str {
        "Processes, cleans, and transforms scraped data into usable formats"
    }

    fn retrieval(&self, _task: &str, _context: &TaskContext) -> Retrieval {
        Retrieval::Similar {
            query: "data processing".to_string(),
            limit: 5,
        }
    }

    fn prompt(&self, task: &str, context: &TaskContext, relevant: &[&Document], _: &[ScrapeResult]) -> String {
        let items: Vec<String> = context
            .data
            .iter()
            .take(10)
            .map(|item| truncate_chars(item, 200).to_string())
            .collect();
        let tables: Vec<String> = context
            .tables
            .iter()
            .take(3)
            .enumerate()
            .map(|(i, t)| format!("Table {i}:\n{}", table_preview(t)))
            .collect();

        format!(
            "You are a Data Alchemist agent.\n\n\
            Task: {task}\n\n\
            Data items ({} total):\n{}\n\n\
            Tables ({} total):\n{}\n\n\
            Prior context:\n{}\n\n\
            Assess the data and propose how to clean and transform it. Respond with JSON \
            in a ```json block with these keys:\n\
            - data_quality: short assessment\n\
            - cleaning_steps: list of steps\n\
            - transformation_plan: list of transformations\n\
            - schema: description of the target structure\n\
            - insights: list of observations about the data",
            context.data.len(),
            bullets(&items),
            context.tables.len(),
            if tables.is_empty() { "(none)".to_string() } else { tables.join("\n\n") },
            context_lines(relevant, 200)
        )
    }

    fn fallback(&self, _task: &str, _context: &TaskContext) -> Analysis {
        Analysis {
            data_quality: "Good".into(),
            cleaning_steps: vec![
                "Remove duplicates".into(),
                "Handle missing values".into(),
                "Standardize formats".into(),
            ],
            transformation_plan: vec![
                "Convert to structured format".into(),
                "Extract key metrics".into(),
            ],
            schema: "Structured data with multiple fields".into(),
            insights: vec![
                "Data contains valuable information".into(),
                "Some cleaning needed".into(),
            ],
        }
    }

    fn build(&self, _: &str, context: &TaskContext, analysis: Analysis, _: &[ScrapeResult]) -> DataAlchemistOutput {
        let processed_tables: Vec<ProcessedTable> = context
            .tables
            .iter()
            .take(MAX_TABLES)
            .enumerate()
            .map(|(i, table)| summarize_table(i, table))
            .collect();

        let has_data = !context.data.is_empty() || !context.tables.is_empty();
        DataAlchemistOutput {
            analysis,
            processed_tables,
            data_summary: DataSummary {
                items_processed: context.data.len(),
                tables_processed: context.tables.len(),
                quality_score: if has_data { "Good" } else { "No data" }.to_string(),
            },
        }
    }

    fn synthesize(&self, task: &str, context: &TaskContext, output: &DataAlchemistOutput) -> Finding {
        let analysis = &output.analysis;
        let content = format!(
            "Data Processing Summary\n\
            Quality Assessment: {}\n\
            Cleaning Steps:\n{}\n\
            Processed Tables: {}\n\
            Key Insights:\n{}",
            analysis.data_quality,
            bullets(&analysis.cleaning_steps),
            output.processed_tables.len(),
            bullets(&analysis.insights),
        );

        let mut metadata = finding_metadata(task);
        metadata.insert("data_items_processed".into(), Value::from(context.data.len()));
        metadata.insert("tables_processed".into(), Value::from(context.tables.len()));
        put_json(&mut metadata, "analysis", analysis);
        Finding {
            content,
            metadata,
            critique_of: None,
        }
    }

    fn decision(&self, _task: &str, context: &TaskContext, _: &DataAlchemistOutput) -> String {
        format!(
            "Processed {} data items and {} tables",
            context.data.len(),
            context.tables.len()
        )
    }

    fn context_snapshot(&self, context: &TaskContext, relevant: &[&Document]) -> Vec<String> {
        if context.data.is_empty() {
            return relevant.iter().map(|doc| doc.content.clone()).collect();
        }
        context.data.clone()
    }
}
