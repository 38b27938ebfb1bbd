//! Synthetic document content.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use s3probe_core::ProbeResult;
use serde::{Deserialize, Serialize};

/// Filler paragraph rendered into every generated PDF.
pub const BODY_TEXT: &str = "\
Heute wird Software oft als Dienst geliefert - auch Web App oder Software-As-A-Service genannt.
Die Zwölf-Faktoren-App ist eine Methode um Software-As-A-Service Apps zu bauen die:
deklarative Formate benutzen für die Automatisierung der Konfiguration, um Zeit und Kosten für neue Entwickler im Projekt zu minimieren;
einen sauberen Vertrag mit dem zugrundeliegenden Betriebssystem haben, maximale Portierbarkeit zwischen Ausführungsumgebungen bieten;
sich für das Deployment auf modernen Cloud-Plattformen eignen, die Notwendigkeit von Servern und Serveradministration vermeiden;
die Abweichung minimieren zwischen Entwicklung und Produktion, um Continuous Deployment für maximale Agilität ermöglichen;
und skalieren können ohne wesentliche Änderungen im Tooling, in der Architektur oder in den Entwicklungsverfahren.

Die Zwölf-Faktoren-Methode kann auf Apps angewendet werden, die in einer beliebigen Programmiersprache geschrieben sind,
und die eine beliebige Kombination von unterstützenden Diensten benutzen (Datenbank, Queue, Cache, ...)

Hintergrund

Die Mitwirkenden an diesem Dokument waren direkt beteiligt an der Entwicklung und dem Deployment von hunderten von
Apps und wurden Zeugen bei der Entwicklung, beim Betrieb und der Skalierung von hunderttausenden von Apps im Rahmen
unserer Arbeit an der Heroku-Plattform.";

/// Everything needed to render one document and its metadata record.
///
/// Serialized as the JSON sidecar; keys are camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    /// Random document ID.
    pub uuid: String,
    /// Document date in milliseconds since the epoch.
    pub time: i64,
    /// Document index within its container.
    pub counter: u64,
    /// Human-readable title, also used as the object name.
    pub title: String,
    /// Generator-specific attributes.
    pub meta_data: BTreeMap<String, String>,
}

impl DocumentContent {
    /// Document date; out-of-range values fall back to the epoch.
    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.time).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// User metadata for the uploaded object: title, uuid and date plus every
    /// generator attribute.
    #[must_use]
    pub fn user_metadata(&self) -> HashMap<String, String> {
        let mut metadata: HashMap<String, String> = self
            .meta_data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        metadata.insert("title".to_owned(), self.title.clone());
        metadata.insert("uuid".to_owned(), self.uuid.clone());
        metadata.insert("date".to_owned(), self.date().to_rfc2822());
        metadata
    }

    /// JSON metadata record.
    pub fn to_json(&self) -> ProbeResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Lines rendered into the PDF, before wrapping.
    #[must_use]
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.title.clone(),
            format!("UUID = {}", self.uuid),
            format!("Counter = {}", self.counter),
            format!("Time Millis = {}", self.time),
            format!("Date = {}", self.date().to_rfc2822()),
        ];
        lines.extend(self.meta_data.iter().map(|(k, v)| format!("{k} = {v}")));
        lines.push("-".repeat(71));
        lines.extend(BODY_TEXT.lines().map(ToOwned::to_owned));
        lines
    }
}
