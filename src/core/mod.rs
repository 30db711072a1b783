mod finding;
mod report;
mod severity;

pub use finding::{ContextDetail, Finding, FindingContext, text_sample};
pub use report::{
    AuditData, AuditOptions, AuditResult, AuditSummary, LoadError, RunReport, RunSummary,
};
pub use severity::{Category, Severity};
