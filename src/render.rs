//! Hand-off of computed tables to visualization collaborators.
//!
//! Plotting itself lives outside this crate.  A [`Renderer`] receives the
//! autocorrelation table and the long-form sample table as [`Frame`]s once
//! their schema has been checked; [`CsvRenderer`] writes them to disk so any
//! plotting tool can pick them up.
use crate::error::{DiagnosticsError, Result};
use crate::table::Frame;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub trait Renderer {
    /// Lag against autocorrelation, columns `lag` and `autocorrelation`.
    fn autocorrelation(&mut self, table: &Frame) -> Result<()>;

    /// Trace and density of every chain, columns `chain_id`,
    /// `sample_index`, `parameter` and `value`.
    fn trace(&mut self, samples: &Frame) -> Result<()>;
}

/// Writes `frame` as CSV with a header row.
pub fn write_csv<W: io::Write>(frame: &Frame, writer: W) -> std::result::Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(frame.names())?;
    for row in frame.rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Renders tables as CSV files under one directory.
#[derive(Debug, Clone)]
pub struct CsvRenderer {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvRenderer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvRenderer {
            dir: dir.as_ref().to_path_buf(),
            written: Vec::new(),
        }
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, target: &'static str, file_name: &str, frame: &Frame) -> Result<()> {
        let path = self.dir.join(file_name);
        let render_err = |message: String| DiagnosticsError::Render { target, message };
        let file = std::fs::File::create(&path)
            .map_err(|e| render_err(format!("{}: {}", path.display(), e)))?;
        write_csv(frame, io::BufWriter::new(file))
            .map_err(|e| render_err(format!("{}: {}", path.display(), e)))?;
        info!(rows = frame.n_rows(), path = %path.display(), "wrote {} table", target);
        self.written.push(path);
        Ok(())
    }
}

impl Renderer for CsvRenderer {
    fn autocorrelation(&mut self, table: &Frame) -> Result<()> {
        self.write("autocorrelation", "autocorrelation.csv", table)
    }

    fn trace(&mut self, samples: &Frame) -> Result<()> {
        self.write("trace", "samples.csv", samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acf::autocorrelation;
    use crate::error::ErrorKind;
    use crate::table::to_long_form;

    #[test]
    fn test_write_csv() {
        let frame = to_long_form(&[vec![0.5, 1.5]]).unwrap().to_frame();
        let mut buf = Vec::new();
        write_csv(&frame, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "sample_index,chain_id,parameter,value\n0,chains_0,lambda,0.5\n1,chains_0,lambda,1.5\n"
        );
    }

    #[test]
    fn test_csv_renderer() {
        let dir = std::env::temp_dir().join(format!("mcmc_diag_render_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut renderer = CsvRenderer::new(&dir);

        let acf = autocorrelation(&[1.0, 3.0, 2.0, 5.0, 4.0], 3).unwrap();
        renderer.autocorrelation(&acf.to_frame()).unwrap();
        let samples = to_long_form(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        renderer.trace(&samples.to_frame()).unwrap();

        assert_eq!(renderer.written().len(), 2);
        let text = std::fs::read_to_string(dir.join("autocorrelation.csv")).unwrap();
        assert!(text.starts_with("lag,autocorrelation\n0,1\n"));
        let text = std::fs::read_to_string(dir.join("samples.csv")).unwrap();
        assert_eq!(text.lines().count(), 5);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_csv_renderer_missing_dir() {
        let mut renderer = CsvRenderer::new("/nonexistent/mcmc_diag");
        let frame = to_long_form(&[vec![1.0, 2.0]]).unwrap().to_frame();
        let err = renderer.trace(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert!(renderer.written().is_empty());
    }
}
