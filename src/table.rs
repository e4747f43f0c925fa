//! Long-form sample tables and the column-oriented [`Frame`] used to hand
//! tabular data to plotting and export collaborators.
use crate::error::{DiagnosticsError, Result};
use crate::utils::check_shape;
use crate::Array2;
use serde::Serialize;
use std::fmt;

/// Parameter label used when the caller does not name the parameter.
pub const DEFAULT_PARAMETER: &str = "lambda";

/// One typed column of a [`Frame`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Column {
    Index(Vec<usize>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Index(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn type_name(&self) -> &'static str {
        match self {
            Column::Index(_) => "index",
            Column::Float(_) => "float",
            Column::Text(_) => "text",
        }
    }

    /// Renders one cell as text.
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Index(v) => v[row].to_string(),
            Column::Float(v) => v[row].to_string(),
            Column::Text(v) => v[row].clone(),
        }
    }
}

/// A table of named, equal-length columns, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Frame {
    columns: Vec<(String, Column)>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frame from columns the caller knows have equal length.
    pub(crate) fn from_columns(columns: Vec<(String, Column)>) -> Self {
        debug_assert!(columns.windows(2).all(|w| w[0].1.len() == w[1].1.len()));
        Frame { columns }
    }

    /// Appends a column, replacing any existing column of the same name.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self> {
        if let Some((_, existing)) = self.columns.iter().find(|(n, _)| n != name) {
            if existing.len() != column.len() {
                return Err(DiagnosticsError::ColumnLength {
                    field: name.to_string(),
                    expected: existing.len(),
                    found: column.len(),
                });
            }
        }
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(self)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Fails with a schema error naming the first of `fields` that is
    /// absent from this frame.
    pub fn require(&self, fields: &[&str]) -> Result<()> {
        match fields.iter().find(|f| self.column(f).is_none()) {
            Some(missing) => Err(DiagnosticsError::MissingField {
                field: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn typed(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| DiagnosticsError::MissingField {
                field: name.to_string(),
            })
    }

    pub fn floats(&self, name: &str) -> Result<&[f64]> {
        match self.typed(name)? {
            Column::Float(v) => Ok(v),
            other => Err(self.type_error(name, "float", other)),
        }
    }

    pub fn indices(&self, name: &str) -> Result<&[usize]> {
        match self.typed(name)? {
            Column::Index(v) => Ok(v),
            other => Err(self.type_error(name, "index", other)),
        }
    }

    pub fn texts(&self, name: &str) -> Result<&[String]> {
        match self.typed(name)? {
            Column::Text(v) => Ok(v),
            other => Err(self.type_error(name, "text", other)),
        }
    }

    fn type_error(&self, name: &str, expected: &'static str, found: &Column) -> DiagnosticsError {
        tracing::debug!(column = name, expected, found = found.type_name(), "column type mismatch");
        DiagnosticsError::ColumnType {
            field: name.to_string(),
            expected,
        }
    }

    /// Iterates over rows, each rendered as one string per column.
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        (0..self.n_rows()).map(move |row| self.columns.iter().map(|(_, c)| c.cell(row)).collect())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<&str> = self.names().collect();
        let body: Vec<Vec<String>> = self.rows().collect();
        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| body.iter().map(|r| r[i].len()).fold(h.len(), usize::max))
            .collect();
        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>width$}", c, width = w))
                .collect::<Vec<_>>()
                .join("  ")
        };
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        writeln!(f, "{}", line(&header[..]))?;
        for row in &body {
            writeln!(f, "{}", line(&row[..]))?;
        }
        Ok(())
    }
}

/// One draw of one chain in long form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub sample_index: usize,
    pub chain_id: String,
    pub parameter: String,
    pub value: f64,
}

/// Every draw of a chain matrix, one record per (chain, sample), ordered
/// chain-major then by sample index.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SampleTable {
    pub records: Vec<SampleRecord>,
}

/// Label of chain `c` in long-form tables.
pub fn chain_label(c: usize) -> String {
    format!("chains_{}", c)
}

/// Reshapes a chains × samples matrix into long form, labelling every
/// record with [`DEFAULT_PARAMETER`].
pub fn to_long_form(chains: &[Vec<f64>]) -> Result<SampleTable> {
    to_long_form_with(chains, DEFAULT_PARAMETER)
}

/// Reshapes a chains × samples matrix into long form.  Fails before
/// emitting any record if the matrix is empty or ragged.
pub fn to_long_form_with(chains: &[Vec<f64>], parameter: &str) -> Result<SampleTable> {
    let num_draws = check_shape(chains)?;
    let mut records = Vec::with_capacity(chains.len() * num_draws);
    for (c, chain) in chains.iter().enumerate() {
        let chain_id = chain_label(c);
        records.extend(chain.iter().enumerate().map(|(s, &value)| SampleRecord {
            sample_index: s,
            chain_id: chain_id.clone(),
            parameter: parameter.to_string(),
            value,
        }));
    }
    Ok(SampleTable { records })
}

impl SampleTable {
    pub const FIELDS: [&'static str; 4] = ["chain_id", "sample_index", "parameter", "value"];

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_frame(&self) -> Frame {
        let r = &self.records;
        Frame::from_columns(vec![
            (
                "sample_index".to_string(),
                Column::Index(r.iter().map(|x| x.sample_index).collect()),
            ),
            (
                "chain_id".to_string(),
                Column::Text(r.iter().map(|x| x.chain_id.clone()).collect()),
            ),
            (
                "parameter".to_string(),
                Column::Text(r.iter().map(|x| x.parameter.clone()).collect()),
            ),
            (
                "value".to_string(),
                Column::Float(r.iter().map(|x| x.value).collect()),
            ),
        ])
    }

    /// Rebuilds a table from a frame that must carry all of
    /// [`SampleTable::FIELDS`] with the expected column types.
    pub fn try_from_frame(frame: &Frame) -> Result<Self> {
        frame.require(&Self::FIELDS)?;
        let sample_index = frame.indices("sample_index")?;
        let chain_id = frame.texts("chain_id")?;
        let parameter = frame.texts("parameter")?;
        let value = frame.floats("value")?;
        let records = (0..frame.n_rows())
            .map(|i| SampleRecord {
                sample_index: sample_index[i],
                chain_id: chain_id[i].clone(),
                parameter: parameter[i].clone(),
                value: value[i],
            })
            .collect();
        Ok(SampleTable { records })
    }

    /// Inverse of [`to_long_form`]: chains in order of first appearance,
    /// each chain's values ordered by sample index.
    pub fn to_matrix(&self) -> Result<Array2> {
        let mut ids: Vec<&str> = Vec::new();
        let mut chains: Vec<Vec<(usize, f64)>> = Vec::new();
        for r in &self.records {
            let pos = match ids.iter().position(|id| *id == r.chain_id) {
                Some(pos) => pos,
                None => {
                    ids.push(&r.chain_id);
                    chains.push(Vec::new());
                    ids.len() - 1
                }
            };
            chains[pos].push((r.sample_index, r.value));
        }
        let matrix: Array2 = chains
            .into_iter()
            .map(|mut c| {
                c.sort_by_key(|(s, _)| *s);
                c.into_iter().map(|(_, v)| v).collect()
            })
            .collect();
        check_shape(&matrix)?;
        Ok(matrix)
    }
}
