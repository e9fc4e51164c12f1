//! XML-shaped run report and the prediction-count side file.
//!
//! stdout carries exactly one `<Run>` element per invocation; everything
//! else the binary has to say goes to stderr as log events. Batch scripts
//! collect the XML across many runs, so element names are a stable
//! contract.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;

use mp_common::ResearchQuestion;

use crate::driver::{EvalCounters, QueryCounts};
use crate::stats::TrieShape;

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Streaming writer for the `<Run>` report element.
pub struct XmlReport<W: Write> {
    out: W,
}

impl<W: Write> XmlReport<W> {
    /// Open the `<Run>` element, stamped with the wall-clock start.
    pub fn begin(mut out: W) -> io::Result<Self> {
        writeln!(out, "<Run started=\"{}\">", Utc::now().format("%+"))?;
        Ok(Self { out })
    }

    fn element(&mut self, name: &str, value: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.out, "   <{name}>{value}</{name}>")
    }

    pub fn question(&mut self, question: ResearchQuestion) -> io::Result<()> {
        self.element("ResearchQuestion", question)
    }

    pub fn training_file(&mut self, path: &Path) -> io::Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.element("TrainingFile", xml_escape(&name))
    }

    /// Test file name and its directory, split the way the result
    /// collectors expect.
    pub fn test_file(&mut self, path: &Path) -> io::Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.element("TestFile", xml_escape(&name))?;
        let dir = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.element("SourceDir", xml_escape(&format!("{dir}/")))
    }

    /// Prediction accounting. With a confidence level in force the
    /// correctness element switches to the confidence-accepted counter.
    pub fn counters(
        &mut self,
        counters: &EvalCounters,
        confidence: Option<u8>,
    ) -> io::Result<()> {
        self.element("NumTests", counters.num_tests)?;
        self.element("FallbackNum", counters.fallback_num)?;
        self.element("FallbackNumCorrect", counters.fallback_num_correct)?;
        match confidence {
            None => {
                self.element("MostProb_NumCorrect", counters.most_prob_num_correct)?;
                self.element(
                    "MostProb_MultiplePredictions",
                    counters.most_prob_multiple,
                )?;
                self.element("LessProb_NumCorrect", counters.less_prob_num_correct)?;
                self.element(
                    "LessProb_MultiplePredictions",
                    counters.less_prob_multiple,
                )?;
            }
            Some(level) => {
                self.element("ConfidenceLevel", level)?;
                self.element(
                    "ConfidenceLevel_NumCorrect",
                    counters.confidence_num_correct,
                )?;
            }
        }
        Ok(())
    }

    pub fn logloss(&mut self, order: usize, average: f64) -> io::Result<()> {
        writeln!(
            self.out,
            "   <AvgLogLoss order=\"{order}\">{average:.6}</AvgLogLoss>"
        )
    }

    pub fn model_stats(&mut self, shape: &TrieShape) -> io::Result<()> {
        writeln!(self.out, "   <ModelStats>")?;
        writeln!(
            self.out,
            "      <TotalNumChildren>{}</TotalNumChildren>",
            shape.root_children
        )?;
        writeln!(
            self.out,
            "      <NumContextTables>{}</NumContextTables>",
            shape.child_counts.len()
        )?;
        if let Some(summary) = &shape.summary {
            writeln!(
                self.out,
                "      <MaxNumChildren>{}</MaxNumChildren>",
                summary.max
            )?;
            writeln!(
                self.out,
                "      <MinNumChildren>{}</MinNumChildren>",
                summary.min
            )?;
            writeln!(
                self.out,
                "      <AveNumChildren>{:.2}</AveNumChildren>",
                summary.mean
            )?;
            writeln!(
                self.out,
                "      <StdDevChildren>{:.2}</StdDevChildren>",
                summary.std_dev
            )?;
            writeln!(
                self.out,
                "      <MedianNumChildren>{:.2}</MedianNumChildren>",
                summary.median
            )?;
        }
        writeln!(self.out, "   </ModelStats>")
    }

    /// Close the `<Run>` element and flush.
    pub fn finish(mut self) -> io::Result<()> {
        writeln!(self.out, "</Run>")?;
        self.out.flush()
    }
}

/// Append one CSV row per query to the prediction-count side file, writing
/// the mode's header first when the file is empty.
pub fn append_prediction_counts(
    path: &Path,
    test_file: &str,
    confidence: Option<u8>,
    per_query: &[QueryCounts],
) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        match confidence {
            None => writeln!(
                file,
                "test_file_name, num_best_predictions, num_less_predictions, num_predictions"
            )?,
            Some(_) => writeln!(
                file,
                "test_file_name, confidence_level, num_conf_predictions, total_num_predictions"
            )?,
        }
    }
    for counts in per_query {
        match confidence {
            None => writeln!(
                file,
                "{test_file}, {}, {}, {}",
                counts.best, counts.less, counts.total
            )?,
            Some(level) => writeln!(
                file,
                "{test_file}, {level}, {}, {}",
                counts.accepted.unwrap_or(0),
                counts.total
            )?,
        }
    }
    Ok(())
}
