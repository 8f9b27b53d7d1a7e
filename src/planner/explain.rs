//! Explain plan output
//!
//! Produces deterministic, human-readable explain output showing which part
//! of a query runs remotely and which part falls back to the client.

use std::fmt;

use super::errors::PlannerError;
use super::planner::{CountStrategy, ExecutionPlan};

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// Content type queried
    pub content: Option<String>,
    /// One line per remote request set
    pub remote_queries: Vec<String>,
    /// IDs the fan-out members are restricted to
    pub fan_out_ids: Vec<i64>,
    /// Residual predicate evaluated per record
    pub residual: Option<String>,
    /// Local operators in order
    pub local_ops: Vec<String>,
    /// Terminal reducer
    pub reducer: Option<String>,
    /// How count is answered
    pub count_strategy: Option<String>,
    /// Local-fallback disclosures
    pub notes: Vec<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a finalized execution plan
    pub fn from_plan(plan: &ExecutionPlan) -> Self {
        let count_strategy = match plan.count_strategy {
            CountStrategy::Totals { window } => match window.take {
                Some(take) => format!("TOTALS (skip {}, take {})", window.skip, take),
                None => format!("TOTALS (skip {})", window.skip),
            },
            CountStrategy::Stream => "STREAM".to_string(),
        };

        Self {
            accepted: true,
            content: Some(plan.content.to_string()),
            remote_queries: plan.members.iter().map(|q| q.to_string()).collect(),
            fan_out_ids: plan.ids.clone(),
            residual: plan.residual.as_ref().map(|r| r.to_string()),
            local_ops: plan.local.iter().map(|op| op.to_string()).collect(),
            reducer: plan.reducer.map(|r| r.as_str().to_string()),
            count_strategy: Some(count_strategy),
            notes: plan.notes.clone(),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            content: None,
            remote_queries: Vec::new(),
            fan_out_ids: Vec::new(),
            residual: None,
            local_ops: Vec::new(),
            reducer: None,
            count_strategy: None,
            notes: Vec::new(),
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }

    /// Whether any part of the query runs on the client
    pub fn has_local_fallback(&self) -> bool {
        self.residual.is_some() || !self.local_ops.is_empty()
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        if let Some(content) = &self.content {
            writeln!(f, "Content: {}", content)?;
        }
        writeln!(f, "Remote Queries:")?;
        for (i, query) in self.remote_queries.iter().enumerate() {
            match self.fan_out_ids.get(i) {
                Some(id) => writeln!(f, "  - {} (id {})", query, id)?,
                None => writeln!(f, "  - {}", query)?,
            }
        }
        if let Some(residual) = &self.residual {
            writeln!(f, "Residual: {}", residual)?;
        }
        if !self.local_ops.is_empty() {
            writeln!(f, "Local:")?;
            for op in &self.local_ops {
                writeln!(f, "  - {}", op)?;
            }
        }
        if let Some(reducer) = &self.reducer {
            writeln!(f, "Reducer: {}", reducer)?;
        }
        if let Some(strategy) = &self.count_strategy {
            writeln!(f, "Count: {}", strategy)?;
        }
        if !self.notes.is_empty() {
            writeln!(f, "Notes:")?;
            for note in &self.notes {
                writeln!(f, "  - {}", note)?;
            }
        }

        Ok(())
    }
}
