//! 报告生成器模块
//!
//! 汇总一个或多个捕获的解码结果，生成markdown报告

use ctvd_core::{DecodeError, DecodeOutcome, Verdict};

/// 单个捕获的汇总
#[derive(Debug, Clone)]
pub enum CaptureSummary {
    /// 解码完成（可能包含限值失败）
    Decoded { label: String, outcome: DecodeOutcome },
    /// 解码基础设施错误，与器件失败区分
    Error { label: String, error: DecodeError },
}

impl CaptureSummary {
    pub fn label(&self) -> &str {
        match self {
            CaptureSummary::Decoded { label, .. } | CaptureSummary::Error { label, .. } => label,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, CaptureSummary::Decoded { outcome, .. } if outcome.passed)
    }
}

/// 报告生成器
pub struct ReportGenerator {
    report_title: String,
    captures: Vec<CaptureSummary>,
}

impl ReportGenerator {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            report_title: title.into(),
            captures: Vec::new(),
        }
    }

    /// 添加解码结果
    pub fn add_outcome(&mut self, label: impl Into<String>, outcome: DecodeOutcome) {
        self.captures.push(CaptureSummary::Decoded {
            label: label.into(),
            outcome,
        });
    }

    /// 添加解码错误
    pub fn add_error(&mut self, label: impl Into<String>, error: DecodeError) {
        self.captures.push(CaptureSummary::Error {
            label: label.into(),
            error,
        });
    }

    pub fn captures(&self) -> &[CaptureSummary] {
        &self.captures
    }

    /// 所有捕获均解码成功且通过
    pub fn all_passed(&self) -> bool {
        !self.captures.is_empty() && self.captures.iter().all(CaptureSummary::passed)
    }

    /// 生成汇总报告
    pub fn generate_summary_report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("# {}\n\n", self.report_title));

        let passed_count = self.captures.iter().filter(|c| c.passed()).count();
        let error_count = self
            .captures
            .iter()
            .filter(|c| matches!(c, CaptureSummary::Error { .. }))
            .count();
        report.push_str(&format!(
            "**Summary: {} out of {} captures passed, {} decode errors**\n\n",
            passed_count,
            self.captures.len(),
            error_count
        ));

        for capture in &self.captures {
            match capture {
                CaptureSummary::Decoded { label, outcome } => {
                    Self::write_outcome(&mut report, label, outcome)
                }
                CaptureSummary::Error { label, error } => {
                    report.push_str(&format!("## {label}\n\n"));
                    report.push_str(&format!(
                        "⚠️ DECODE ERROR [{}]: {}\n\n",
                        error.category(),
                        error
                    ));
                }
            }
        }

        report.push_str("## Conclusion\n\n");
        if self.all_passed() {
            report.push_str("✅ All captures passed.\n");
        } else if error_count > 0 {
            report.push_str("⚠️ Decode infrastructure errors present.\n");
        } else {
            report.push_str("❌ Device failed limit checks.\n");
        }

        report
    }

    fn write_outcome(report: &mut String, label: &str, outcome: &DecodeOutcome) {
        let status = if outcome.passed {
            "✅ PASS"
        } else {
            "❌ FAIL"
        };
        report.push_str(&format!("## {label} ({}) - {status}\n\n", outcome.layout));

        let failures = outcome.failed_fields().count();
        report.push_str(&format!(
            "Fields: {}, failed: {}\n\n",
            outcome.fields.len(),
            failures
        ));

        report.push_str("| Field | Values | Verdict |\n|---|---|---|\n");
        for field in &outcome.fields {
            let values: Vec<String> = field.values.iter().map(i128::to_string).collect();
            let verdict = match field.verdict {
                Verdict::Pass => "PASS",
                Verdict::Fail => "**FAIL**",
                Verdict::Unchecked => "-",
            };
            report.push_str(&format!(
                "| {} | {} | {} |\n",
                field.name,
                values.join(", "),
                verdict
            ));
        }
        report.push('\n');

        for error in &outcome.field_errors {
            report.push_str(&format!("- Skipped: {error}\n"));
        }
        if !outcome.field_errors.is_empty() {
            report.push('\n');
        }
    }

    /// 重置报告生成器
    pub fn reset(&mut self) {
        self.captures.clear();
    }
}
