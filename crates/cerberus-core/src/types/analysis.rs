use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use super::common::{Address, Extra};
use crate::error::{CerberusError, Result};

/// Names of the sections that carry analytical findings
pub const ANALYTICAL_SECTIONS: [&str; 5] = [
    "instruction_statistics",
    "ml_operations",
    "section_analysis",
    "summary",
    "framework_analysis",
];

/// Report written by the analysis engine
///
/// Every section is optional at the type level so that partially populated
/// reports can still be parsed and classified; [`AnalysisResult::validate`]
/// decides whether the report is usable. Fields the engine adds beyond the
/// known ones are kept in `extra` and written back out unchanged, nulls
/// included.
///
/// A known field the engine sets to `null` reads as absent and is left out
/// when the report is written back: `"summary": null` does not count as a
/// summary section, and a stored record never carries it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Facts about the input file (size, format, architecture, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Instruction mix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_statistics: Option<InstructionStatistics>,

    /// Detected ML operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_operations: Option<MlOperations>,

    /// Binary sections in file order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_analysis: Option<Vec<Section>>,

    /// Summary metrics, scalar or nested breakdowns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,

    /// Detected ML frameworks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_analysis: Option<FrameworkAnalysis>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Input file metadata: string keys to scalar values
pub type Metadata = BTreeMap<String, Value>;

/// Summary metrics keyed by metric name
pub type Summary = BTreeMap<String, SummaryValue>;

/// Instruction statistics section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructionStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_instructions_analyzed: Option<u64>,

    /// Mnemonic to occurrence count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_types: Option<BTreeMap<String, u64>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl InstructionStatistics {
    /// Most frequent mnemonics, highest count first
    #[must_use]
    pub fn top_instructions(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .instruction_types
            .iter()
            .flatten()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}

/// ML operations section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlOperations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<OperationSummary>,

    /// Detected operations in detection order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<MlOperation>>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Summary block inside [`MlOperations`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_operations: Option<u64>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A single detected ML operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlOperation {
    /// Operation type tag (e.g. `matmul`, `conv2d`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_address: Option<Address>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Number of instructions contributing to the match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_count: Option<u64>,

    /// Detection duration in milliseconds, kept as the engine wrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_time_ms: Option<Number>,

    /// Literal instruction sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<Instruction>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl MlOperation {
    /// Detection duration as a float
    #[must_use]
    pub fn detection_time_ms(&self) -> Option<f64> {
        self.detection_time_ms.as_ref().and_then(Number::as_f64)
    }
}

/// One entry of an operation's instruction sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instruction {
    /// Disassembly text (`"vfmadd231ps ymm0, ymm1, ymm2"`)
    Text(String),
    /// Structured entry (address, mnemonic, operands, ...)
    Structured(Extra),
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(fields) => {
                let mnemonic = fields.get("mnemonic").and_then(Value::as_str);
                let operands = fields.get("operands").and_then(Value::as_str);
                match (mnemonic, operands) {
                    (Some(m), Some(o)) => write!(f, "{m} {o}"),
                    (Some(m), None) => f.write_str(m),
                    _ => write!(f, "{}", Value::Object(fields.clone())),
                }
            }
        }
    }
}

/// A binary section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// ML pattern hits inside this section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_patterns_found: Option<u64>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A summary metric: a scalar, or a nested breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryValue {
    /// Nested mapping such as `operation_breakdown`
    Breakdown(BTreeMap<String, Value>),
    /// Plain value
    Scalar(Value),
}

impl SummaryValue {
    /// Returns the nested mapping if this is a breakdown
    #[must_use]
    pub const fn as_breakdown(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Breakdown(map) => Some(map),
            Self::Scalar(_) => None,
        }
    }
}

/// Framework detection section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_frameworks: Option<Vec<String>>,

    /// Framework to number of matched references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_counts: Option<BTreeMap<String, u64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_references: Option<Vec<StringReference>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl FrameworkAnalysis {
    /// Per-framework reference counts
    ///
    /// Uses `framework_counts` when the engine filled it in, otherwise
    /// tallies `sample_references` by framework.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<String, u64> {
        if let Some(counts) = self.framework_counts.as_ref().filter(|c| !c.is_empty()) {
            return counts.clone();
        }

        let mut tally = BTreeMap::new();
        for reference in self.sample_references.iter().flatten() {
            if let Some(framework) = &reference.framework {
                *tally.entry(framework.clone()).or_insert(0) += 1;
            }
        }
        tally
    }
}

/// A string in the binary attributed to a framework
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// The matched string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Headline numbers for one report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Instructions analysed
    pub instructions: u64,
    /// ML operations detected
    pub ml_operations: u64,
    /// Frameworks detected
    pub frameworks: usize,
    /// Sections listed
    pub sections: usize,
}

impl AnalysisResult {
    /// Check that the report has metadata and at least one analytical section
    ///
    /// An engine that ran but found nothing still emits empty sections; a
    /// report without them is a broken report, not an empty one.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.metadata.is_none() {
            missing.push("metadata".to_string());
        }

        let has_analysis = self.instruction_statistics.is_some()
            || self.ml_operations.is_some()
            || self.section_analysis.is_some()
            || self.summary.is_some()
            || self.framework_analysis.is_some();
        if !has_analysis {
            missing.push(format!("one of {}", ANALYTICAL_SECTIONS.join("/")));
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CerberusError::IncompleteResult { missing })
        }
    }

    /// Headline numbers, treating absent sections as zero
    #[must_use]
    pub fn stats(&self) -> AnalysisStats {
        let ml_operations = self.ml_operations.as_ref().map_or(0, |ops| {
            ops.summary
                .as_ref()
                .and_then(|s| s.total_operations)
                .unwrap_or_else(|| ops.operations.as_ref().map_or(0, |o| o.len() as u64))
        });

        AnalysisStats {
            instructions: self
                .instruction_statistics
                .as_ref()
                .and_then(|s| s.total_instructions_analyzed)
                .unwrap_or(0),
            ml_operations,
            frameworks: self
                .framework_analysis
                .as_ref()
                .and_then(|f| f.detected_frameworks.as_ref())
                .map_or(0, Vec::len),
            sections: self.section_analysis.as_ref().map_or(0, Vec::len),
        }
    }

    /// Per-type operation counts from `summary.operation_breakdown`
    #[must_use]
    pub fn operation_breakdown(&self) -> Option<&BTreeMap<String, Value>> {
        self.summary
            .as_ref()?
            .get("operation_breakdown")?
            .as_breakdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_report() -> Value {
        json!({
            "metadata": {"file": "model.so", "size": 4096, "arch": "x86_64"},
            "instruction_statistics": {
                "total_instructions_analyzed": 1200,
                "instruction_types": {"mov": 500, "vfmadd231ps": 80, "add": 120}
            },
            "ml_operations": {
                "summary": {"total_operations": 1},
                "operations": [{
                    "type": "matmul",
                    "start_address": "0x401000",
                    "end_address": "0x401080",
                    "details": "AVX2 FMA loop",
                    "instruction_count": 24,
                    "detection_time_ms": 0.42,
                    "instructions": ["vfmadd231ps ymm0, ymm1, ymm2"]
                }]
            },
            "section_analysis": [
                {"name": ".text", "address": "0x401000", "size": 2048, "ml_patterns_found": 1}
            ],
            "summary": {
                "total_ml_operations": 1,
                "operation_breakdown": {"matmul": 1}
            },
            "framework_analysis": {
                "detected_frameworks": ["onnxruntime"],
                "framework_counts": {},
                "sample_references": [
                    {"address": "0x500000", "framework": "onnxruntime", "string": "OrtGetApiBase"},
                    {"address": "0x500040", "framework": "onnxruntime", "string": "OrtSession"}
                ]
            },
            "engine_version": "1.4.2"
        })
    }

    #[test]
    fn test_full_report_round_trips_unchanged() {
        let raw = full_report();
        let parsed: AnalysisResult = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
        assert_eq!(parsed.extra.get("engine_version"), Some(&json!("1.4.2")));
    }

    #[test]
    fn test_stats_and_derived_counts() {
        let parsed: AnalysisResult = serde_json::from_value(full_report()).unwrap();
        assert!(parsed.validate().is_ok());

        let stats = parsed.stats();
        assert_eq!(stats.instructions, 1200);
        assert_eq!(stats.ml_operations, 1);
        assert_eq!(stats.frameworks, 1);
        assert_eq!(stats.sections, 1);

        let counts = parsed.framework_analysis.as_ref().unwrap().counts();
        assert_eq!(counts.get("onnxruntime"), Some(&2));

        let breakdown = parsed.operation_breakdown().unwrap();
        assert_eq!(breakdown.get("matmul"), Some(&json!(1)));

        let top = parsed.instruction_statistics.as_ref().unwrap().top_instructions(2);
        assert_eq!(top, vec![("mov", 500), ("add", 120)]);
    }

    #[test]
    fn test_validate_rejects_degenerate_reports() {
        let empty = AnalysisResult::default();
        let err = empty.validate().unwrap_err();
        match err {
            CerberusError::IncompleteResult { missing } => assert_eq!(missing.len(), 2),
            other => panic!("unexpected error: {other}"),
        }

        let metadata_only: AnalysisResult =
            serde_json::from_value(json!({"metadata": {"size": 1}})).unwrap();
        assert!(metadata_only.validate().is_err());

        let zero_findings: AnalysisResult =
            serde_json::from_value(json!({"metadata": {"size": 1}, "section_analysis": []}))
                .unwrap();
        assert!(zero_findings.validate().is_ok());
        assert_eq!(zero_findings.stats(), AnalysisStats::default());
    }

    #[test]
    fn test_structured_instruction_display() {
        let op: MlOperation = serde_json::from_value(json!({
            "instructions": [{"mnemonic": "vmulps", "operands": "ymm0, ymm1, ymm2"}],
            "detection_time_ms": 3
        }))
        .unwrap();
        let instructions = op.instructions.as_ref().unwrap();
        assert_eq!(instructions[0].to_string(), "vmulps ymm0, ymm1, ymm2");
        assert_eq!(op.detection_time_ms(), Some(3.0));
        assert_eq!(serde_json::to_value(&op).unwrap()["detection_time_ms"], json!(3));
    }

    #[test]
    fn test_null_known_fields_read_as_absent() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "metadata": {"size": 1},
            "summary": null,
            "ml_operations": {"summary": null, "operations": [], "vendor_note": null},
            "engine_build": null
        }))
        .unwrap();

        assert!(result.summary.is_none());
        assert!(result.ml_operations.as_ref().unwrap().summary.is_none());
        assert!(result.validate().is_ok());

        let written = serde_json::to_value(&result).unwrap();
        assert_eq!(
            written,
            json!({
                "metadata": {"size": 1},
                "ml_operations": {"operations": [], "vendor_note": null},
                "engine_build": null
            })
        );
    }
}
