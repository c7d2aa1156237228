// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Loads one split (through the cache) and renders a single
// assembled instance, decoded run by run of equal segment id:
//
//   [knowledge] <|endoftext|> jazz is a music genre
//   [user]      <|endoftext|> do you like jazz
//   [bot]       <|endoftext|> yes very much <|endoftext|>
//
// Useful for checking truncation and the special-token layout
// of a real tokenizer by eye.

use anyhow::{anyhow, ensure, Result};

use crate::application::{config::PipelineConfig, loader_builder::load_dataset};
use crate::domain::sample::Instance;
use crate::domain::segment::Segment;
use crate::domain::traits::TextTokenizer;
use crate::infra::tokenizer_store::TokenizerStore;

/// One decoded run of tokens sharing a segment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRun {
    pub segment: Option<Segment>,
    pub ids:     Vec<u32>,
    pub text:    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub split:      String,
    pub index:      usize,
    pub samples:    usize,
    pub input_len:  usize,
    pub target_len: usize,
    pub runs:       Vec<SegmentRun>,
}

impl InspectReport {
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} #{} of {}: {} input tokens, {} label tokens\n",
            self.split, self.index, self.samples, self.input_len, self.target_len
        );
        for run in &self.runs {
            let label = match run.segment {
                Some(Segment::Knowledge) => "knowledge",
                Some(Segment::User)      => "user",
                Some(Segment::Bot)       => "bot",
                Some(Segment::Pad)       => "pad",
                None                     => "?",
            };
            out.push_str(&format!("  {:<11} {}\n", format!("[{label}]"), run.text));
        }
        out
    }
}

pub struct InspectUseCase {
    config: PipelineConfig,
    split:  String,
    index:  usize,
}

impl InspectUseCase {
    pub fn new(config: PipelineConfig, split: impl Into<String>, index: usize) -> Self {
        Self { config, split: split.into(), index }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let tokenizer = TokenizerStore::new(&self.config.tokenizer_path)
            .load(&self.config.special_tokens)?;
        self.run(&tokenizer)
    }

    pub(crate) fn run<T: TextTokenizer + ?Sized>(&self, tokenizer: &T) -> Result<InspectReport> {
        let cfg = &self.config;
        ensure!(
            cfg.stage.splits().contains(&self.split.as_str()),
            "split '{}' is not part of the {} stage",
            self.split,
            cfg.stage
        );

        let dataset = load_dataset(cfg, &self.split, tokenizer)?;
        let samples = dataset.instances().len();

        let instance = dataset.instance(self.index).ok_or_else(|| {
            anyhow!("index {} is out of range ({} samples in '{}')", self.index, samples, self.split)
        })?;

        Ok(InspectReport {
            split:      self.split.clone(),
            index:      self.index,
            samples,
            input_len:  instance.len(),
            target_len: instance.target_len(dataset.special_ids().pad),
            runs:       segment_runs(instance, tokenizer)?,
        })
    }
}

/// Group consecutive positions of equal segment id and decode each group.
fn segment_runs<T: TextTokenizer + ?Sized>(instance: &Instance, tokenizer: &T) -> Result<Vec<SegmentRun>> {
    let mut runs: Vec<(u32, Vec<u32>)> = Vec::new();
    for (&id, &seg) in instance.input_ids.iter().zip(&instance.token_type_ids) {
        match runs.last_mut() {
            Some((last, ids)) if *last == seg => ids.push(id),
            _ => runs.push((seg, vec![id])),
        }
    }

    runs.into_iter()
        .map(|(seg, ids)| {
            let text = tokenizer.decode(&ids)?;
            Ok::<_, anyhow::Error>(SegmentRun { segment: Segment::from_id(seg), ids, text })
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::Stage;
    use crate::data::test_support::{WordTokenizer, BOS, EOS};

    const DIALOGUES: &str = r#"[[
        {"role": "user", "utter": "hi there"},
        {"role": "bot",  "utter": "hello", "klg": "greeting"}
    ]]"#;

    fn use_case(dir: &std::path::Path, split: &str, index: usize) -> InspectUseCase {
        std::fs::write(dir.join("test.json"), DIALOGUES).unwrap();
        let cfg = PipelineConfig {
            stage:      Stage::Infer,
            data_path:  dir.display().to_string(),
            cache_path: dir.join("cache").display().to_string(),
            ..Default::default()
        };
        InspectUseCase::new(cfg, split, index)
    }

    #[test]
    fn test_instance_is_decoded_by_segment() {
        let dir    = tempfile::tempdir().unwrap();
        let tok    = WordTokenizer::new();
        let report = use_case(dir.path(), "test", 0).run(&tok).unwrap();

        let hi    = tok.id("hi");
        let there = tok.id("there");
        let klg   = tok.id("greeting");
        let reply = tok.id("hello");

        let segments: Vec<Option<Segment>> = report.runs.iter().map(|r| r.segment).collect();
        assert_eq!(
            segments,
            vec![Some(Segment::Knowledge), Some(Segment::User), Some(Segment::Bot)]
        );
        assert_eq!(report.runs[0].ids, vec![BOS, klg]);
        assert_eq!(report.runs[1].ids, vec![EOS, hi, there]);
        assert_eq!(report.runs[2].ids, vec![EOS, reply, EOS]);
        assert_eq!(report.runs[2].text, "<2> hello <2>");
        assert_eq!(report.target_len, 3);
        assert!(report.render().contains("[user]"));
    }

    #[test]
    fn test_out_of_range_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = use_case(dir.path(), "test", 5).run(&WordTokenizer::new()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_split_outside_stage() {
        let dir = tempfile::tempdir().unwrap();
        assert!(use_case(dir.path(), "train", 0).run(&WordTokenizer::new()).is_err());
    }
}
