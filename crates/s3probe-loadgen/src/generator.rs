//! Document generators: container names, folder paths and document content.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use s3probe_core::ProbeError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentContent;

/// Produces the names and content of load-test documents.
///
/// `container` is `None` when documents go directly under the root container.
pub trait DocumentGenerator: Send + Sync + fmt::Debug {
    /// Name of the container with the given index.
    fn container_name(&self, container: u32) -> String;

    /// Folder path (may contain `/`) of a document inside its container.
    fn path_name(&self, container: Option<u32>, document: u32) -> String;

    /// Content and metadata of a document.
    fn content(&self, container: Option<u32>, document: u32) -> DocumentContent;
}

/// The available generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratorKind {
    /// German tax receipts with random dates.
    #[default]
    TaxReceipts,
    /// Deterministic names and content.
    Sequential,
}

impl GeneratorKind {
    /// Instantiate the generator.
    #[must_use]
    pub fn build(self) -> Box<dyn DocumentGenerator> {
        match self {
            Self::TaxReceipts => Box::new(TaxReceipts::new(Utc::now())),
            Self::Sequential => Box::new(Sequential),
        }
    }

    /// Identifier accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaxReceipts => "tax-receipts",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tax-receipts" | "default" => Ok(Self::TaxReceipts),
            "sequential" => Ok(Self::Sequential),
            other => Err(ProbeError::Config(format!(
                "unknown generator '{other}', expected tax-receipts or sequential"
            ))),
        }
    }
}

const MILLIS_PER_YEAR: i64 = 1000 * 3600 * 24 * 365;

const RECEIPT_TYPES: [&str; 3] = ["Rechnungsbeleg", "Spendenquittung", "Sonstiger Beleg"];

const TAX_FOLDERS: [&str; 10] = [
    "Steuer 2014/Handwerkerrechnungen",
    "Steuer 2014/Arbeitsmittel",
    "Steuer 2014/Spendenquittungen",
    "Steuer 2014/Sonderausgaben",
    "Steuer 2014/Sonstige Einkünfte",
    "Steuer 2015/Handwerkerrechnungen",
    "Steuer 2015/Arbeitsmittel",
    "Steuer 2015/Spendenquittungen",
    "Steuer 2015/Sonderausgaben",
    "Steuer 2015/Sonstige Einkünfte",
];

/// Tax receipts filed into yearly folders, dated randomly within the year
/// that started two years before `now`.
#[derive(Debug, Clone)]
pub struct TaxReceipts {
    start_millis: i64,
}

impl TaxReceipts {
    /// Create a generator whose dates are relative to `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            start_millis: now.timestamp_millis() - 2 * MILLIS_PER_YEAR,
        }
    }

    fn random_offset() -> i64 {
        rand::random_range(0..MILLIS_PER_YEAR)
    }
}

impl DocumentGenerator for TaxReceipts {
    fn container_name(&self, container: u32) -> String {
        format!("Container-{container:07}")
    }

    fn path_name(&self, _container: Option<u32>, document: u32) -> String {
        TAX_FOLDERS[document as usize % TAX_FOLDERS.len()].to_owned()
    }

    fn content(&self, _container: Option<u32>, document: u32) -> DocumentContent {
        let time = self.start_millis + Self::random_offset();
        let date = DateTime::from_timestamp_millis(time)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
            .format("%Y-%m-%d")
            .to_string();
        let receipt_type = RECEIPT_TYPES[document as usize % RECEIPT_TYPES.len()];
        let title = format!("{receipt_type}-{date}-{document:06}.pdf");

        let meta_data = BTreeMap::from([
            ("title".to_owned(), title.clone()),
            ("status".to_owned(), "ADDED".to_owned()),
            ("taxYear".to_owned(), "2014".to_owned()),
            ("type".to_owned(), receipt_type.to_owned()),
            ("dateString".to_owned(), date),
        ]);

        DocumentContent {
            uuid: Uuid::new_v4().to_string(),
            time,
            counter: u64::from(document),
            title,
            meta_data,
        }
    }
}

/// Predictable names and content; identical input gives identical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

/// 2020-01-01T00:00:00Z.
const SEQUENTIAL_EPOCH_MILLIS: i64 = 1_577_836_800_000;

impl DocumentGenerator for Sequential {
    fn container_name(&self, container: u32) -> String {
        format!("container-{container:04}")
    }

    fn path_name(&self, _container: Option<u32>, _document: u32) -> String {
        "docs".to_owned()
    }

    fn content(&self, container: Option<u32>, document: u32) -> DocumentContent {
        let container_id = container.map_or(u128::from(u32::MAX), u128::from);
        let title = match container {
            Some(c) => format!("doc-{c:04}-{document:06}.pdf"),
            None => format!("doc-{document:06}.pdf"),
        };
        DocumentContent {
            uuid: Uuid::from_u128((container_id << 32) | u128::from(document)).to_string(),
            time: SEQUENTIAL_EPOCH_MILLIS + i64::from(document) * 1000,
            counter: u64::from(document),
            title,
            meta_data: BTreeMap::from([("index".to_owned(), document.to_string())]),
        }
    }
}
