//! Local residual pipeline
//!
//! Records are pushed through the stages one at a time as they arrive, so
//! arrival order is preserved and the enumeration can stop fetching as soon
//! as a `Take` stage is exhausted. Sort stages buffer until the remote side
//! is drained and release their records on `finish`.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::planner::{ExecutionPlan, LocalOp, ManyFn, MapFn};

use super::filters::{FieldMap, RecordPredicate};
use super::sorter::LocalSorter;

#[derive(Debug)]
enum Stage {
    Filter(RecordPredicate),
    Select(Vec<&'static str>),
    Project(MapFn),
    ProjectMany(ManyFn),
    Sort {
        sorter: LocalSorter,
        buffer: Vec<Value>,
    },
    Skip(u64),
    Take(u64),
}

#[derive(Debug)]
pub(crate) struct LocalPipeline {
    stages: Vec<Stage>,
}

impl LocalPipeline {
    /// Builds the stages for a plan: residual first, then the local operators
    pub(crate) fn new(plan: &ExecutionPlan) -> Self {
        let fields = FieldMap::new(&plan.fields);
        let mut stages = Vec::with_capacity(plan.local.len() + 1);

        if let Some(residual) = &plan.residual {
            stages.push(Stage::Filter(RecordPredicate::new(
                residual.clone(),
                fields.clone(),
            )));
        }

        for op in &plan.local {
            stages.push(match op {
                LocalOp::Filter(expr) => {
                    Stage::Filter(RecordPredicate::new(expr.clone(), fields.clone()))
                }
                LocalOp::Select(columns) => Stage::Select(
                    columns
                        .iter()
                        .filter_map(|p| fields.column(*p))
                        .collect(),
                ),
                LocalOp::Project(f) => Stage::Project(f.clone()),
                LocalOp::ProjectMany(f) => Stage::ProjectMany(f.clone()),
                LocalOp::OrderBy(spec) => Stage::Sort {
                    sorter: LocalSorter::new(spec.clone(), fields.clone()),
                    buffer: Vec::new(),
                },
                LocalOp::Skip(n) => Stage::Skip(*n),
                LocalOp::Take(n) => Stage::Take(*n),
            });
        }

        Self { stages }
    }

    /// Whether no further record can ever reach the output
    pub(crate) fn is_done(&self) -> bool {
        self.stages.iter().any(|s| matches!(s, Stage::Take(0)))
    }

    pub(crate) fn push(&mut self, record: Value, out: &mut VecDeque<Value>) {
        feed(&mut self.stages, record, out);
    }

    /// Releases buffered sorts, upstream first
    pub(crate) fn finish(&mut self, out: &mut VecDeque<Value>) {
        for index in 0..self.stages.len() {
            let (head, rest) = self.stages.split_at_mut(index + 1);
            if let Stage::Sort { sorter, buffer } = &mut head[index] {
                let mut records = std::mem::take(buffer);
                sorter.sort(&mut records);
                for record in records {
                    feed(rest, record, out);
                }
            }
        }
    }
}

fn feed(stages: &mut [Stage], record: Value, out: &mut VecDeque<Value>) {
    let Some((stage, rest)) = stages.split_first_mut() else {
        out.push_back(record);
        return;
    };

    match stage {
        Stage::Filter(predicate) => {
            if predicate.matches(&record) {
                feed(rest, record, out);
            }
        }
        Stage::Select(columns) => feed(rest, select(record, columns), out),
        Stage::Project(f) => feed(rest, f(&record), out),
        Stage::ProjectMany(f) => {
            for item in f(&record) {
                feed(rest, item, out);
            }
        }
        Stage::Sort { buffer, .. } => buffer.push(record),
        Stage::Skip(n) => {
            if *n > 0 {
                *n -= 1;
            } else {
                feed(rest, record, out);
            }
        }
        Stage::Take(n) => {
            if *n > 0 {
                *n -= 1;
                feed(rest, record, out);
            }
        }
    }
}

/// Keeps only the given columns of an object record
fn select(record: Value, columns: &[&'static str]) -> Value {
    match record {
        Value::Object(mut map) => {
            let mut narrowed = Map::with_capacity(columns.len());
            for column in columns {
                if let Some(value) = map.remove(*column) {
                    narrowed.insert((*column).to_string(), value);
                }
            }
            Value::Object(narrowed)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::model::{ContentType, Property, StandardCatalog};
    use crate::planner::{
        prop, Callback, Expr, OrderSpec, PlanNode, Planner, Projection, QueryPlan, SortDirection,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn pipeline(plan: QueryPlan) -> LocalPipeline {
        let config = QueryConfig::permissive();
        let exec = Planner::new(&StandardCatalog, &config)
            .plan(ContentType::Sensors, &plan)
            .unwrap();
        LocalPipeline::new(&exec)
    }

    fn run(pipeline: &mut LocalPipeline, records: Vec<Value>) -> Vec<Value> {
        let mut out = VecDeque::new();
        for record in records {
            if pipeline.is_done() {
                break;
            }
            pipeline.push(record, &mut out);
        }
        pipeline.finish(&mut out);
        out.into_iter().collect()
    }

    fn record(id: i64, name: &str) -> Value {
        json!({ "objid": id, "name": name })
    }

    #[test]
    fn test_local_filter_then_take_stops() {
        let mut p = pipeline(
            QueryPlan::new()
                .push(PlanNode::Filter(Expr::local(|r: &Value| {
                    r["objid"].as_i64().unwrap_or(0) % 2 == 0
                })))
                .push(PlanNode::Take(1)),
        );
        let mut out = VecDeque::new();
        p.push(record(1, "a"), &mut out);
        assert!(!p.is_done());
        p.push(record(2, "b"), &mut out);
        assert!(p.is_done());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_sort_releases_on_finish() {
        let mut p = pipeline(
            QueryPlan::new()
                .push(PlanNode::OrderBy(OrderSpec::by_property(
                    Property::Tags,
                    SortDirection::Asc,
                )))
                .push(PlanNode::OrderBy(OrderSpec::by_property(
                    Property::Name,
                    SortDirection::Desc,
                ))),
        );
        let out = run(&mut p, vec![record(1, "a"), record(2, "c"), record(3, "b")]);
        let names: Vec<&str> = out.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_project_many_then_skip() {
        let mut p = pipeline(
            QueryPlan::new()
                .push(PlanNode::ProjectMany(Callback::from_arc(Arc::new(
                    |r: &Value| vec![r["objid"].clone(), r["objid"].clone()],
                ))))
                .push(PlanNode::Skip(3)),
        );
        let out = run(&mut p, vec![record(1, "a"), record(2, "b")]);
        assert_eq!(out, vec![json!(2)]);
    }

    #[test]
    fn test_residual_runs_first_and_select_trims() {
        let mut p = pipeline(
            QueryPlan::new()
                .push(PlanNode::Project(Projection::Columns(vec![Property::Name])))
                .push(PlanNode::Filter(prop(Property::Tags).ne("x"))),
        );
        let out = run(
            &mut p,
            vec![
                json!({ "name": "a", "tags": ["x"] }),
                json!({ "name": "b", "tags": ["y"] }),
            ],
        );
        assert_eq!(out, vec![json!({ "name": "b" })]);
    }
}
