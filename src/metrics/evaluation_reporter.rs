use std::io::Write;

use crate::io::UserId;
use crate::metrics::{EvaluationRun, UserMetric};

/// Collects the output rows of one metric over one evaluation run.
pub struct EvaluationReporter {
    run: EvaluationRun,
    user_columns: Vec<String>,
    columns: Vec<String>,
    user_rows: Vec<(UserId, Vec<Option<f64>>)>,
}

impl EvaluationReporter {
    pub fn new<M: UserMetric>(metric: &M, run: &EvaluationRun) -> EvaluationReporter {
        EvaluationReporter {
            run: run.clone(),
            user_columns: metric.user_column_labels(),
            columns: metric.column_labels(),
            user_rows: Vec::new(),
        }
    }

    pub fn add(&mut self, user_id: UserId, user_row: Vec<Option<f64>>) {
        self.user_rows.push((user_id, user_row));
    }

    pub fn qty_users(&self) -> usize {
        self.user_rows.len()
    }

    /// Users whose row has at least one value.
    pub fn qty_users_with_value(&self) -> usize {
        self.user_rows
            .iter()
            .filter(|(_user_id, row)| row.iter().any(Option::is_some))
            .count()
    }

    /// Per-user rows as csv. A missing value is written as an empty cell.
    pub fn write_user_rows<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["user_id".to_string()];
        header.extend(self.user_columns.iter().cloned());
        wtr.write_record(&header)?;
        for (user_id, row) in self.user_rows.iter() {
            let mut record = vec![user_id.to_string()];
            record.extend(row.iter().map(|value| match value {
                Some(value) => value.to_string(),
                None => String::new(),
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn result(&self, final_row: &[f64]) -> String {
        let scores = final_row
            .iter()
            .map(|value| format!("{:.4}", value))
            .collect::<Vec<_>>();
        format!("{},{},{}", self.run.algorithm, self.run.dataset, scores.join(","))
    }

    pub fn get_name(&self) -> String {
        format!("Algorithm,DataSet,{}", self.columns.join(","))
    }
}
