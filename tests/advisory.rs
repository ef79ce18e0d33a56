// 该文件是 Malaeng （แมลง） 项目的一部分。
// tests/advisory.rs - 内置建议表的分类行为
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use malaeng::{
  advisory::{AdvisoryTable, Category, Tone, Verdict},
  model::{DetectItem, DetectResult, LabelSet},
};

fn summary_sets(labels: &[&str]) -> (Vec<String>, Vec<String>, Vec<String>, Verdict) {
  let summary = AdvisoryTable::builtin().classify(labels.iter().copied());
  (
    summary.found_good,
    summary.found_bad,
    summary.found_unknown,
    summary.verdict,
  )
}

#[test]
fn single_beneficial_insect() {
  let (good, bad, unknown, verdict) = summary_sets(&["orange ladybird"]);
  assert_eq!(good, ["orange ladybird"]);
  assert!(bad.is_empty());
  assert!(unknown.is_empty());
  assert_eq!(verdict, Verdict::BeneficialDominant);
}

#[test]
fn two_pests() {
  let (good, bad, _, verdict) = summary_sets(&["moth", "rice borer"]);
  assert!(good.is_empty());
  assert_eq!(bad, ["moth", "rice borer"]);
  assert_eq!(verdict, Verdict::HarmfulDominant);
}

#[test]
fn nothing_detected_is_balanced() {
  let (good, bad, unknown, verdict) = summary_sets(&[]);
  assert!(good.is_empty() && bad.is_empty() && unknown.is_empty());
  assert_eq!(verdict, Verdict::Balanced);
}

#[test]
fn unlisted_label_is_unknown() {
  let (good, bad, unknown, verdict) = summary_sets(&["mantis"]);
  assert!(good.is_empty() && bad.is_empty());
  assert_eq!(unknown, ["mantis"]);
  assert_eq!(verdict, Verdict::Balanced);
}

#[test]
fn one_of_each_is_balanced() {
  let (good, bad, _, verdict) = summary_sets(&["orange ladybird", "moth"]);
  assert_eq!(good.len(), 1);
  assert_eq!(bad.len(), 1);
  assert_eq!(verdict, Verdict::Balanced);
}

#[test]
fn every_label_lands_in_exactly_one_set() {
  let table = AdvisoryTable::builtin();
  let mut labels: Vec<String> = LabelSet::builtin().names().to_vec();
  labels.extend(["mantis", "", "MOTH", "moth"].map(String::from));

  let summary = table.classify(&labels);
  assert_eq!(summary.total(), labels.len());
  assert_eq!(summary.messages.len(), labels.len());

  for (label, message) in labels.iter().zip(&summary.messages) {
    assert_eq!(&message.label, label);
    let expected = match table.category_of(label) {
      Some(Category::Beneficial) => Tone::Positive,
      Some(Category::Harmful) => Tone::Negative,
      None => Tone::Neutral,
    };
    assert_eq!(message.tone, expected, "{label}");
  }
}

#[test]
fn verdict_is_balanced_only_on_equal_counts() {
  let cases: [&[&str]; 5] = [
    &["moth", "orange ladybird", "bph", "orange ladybird"],
    &["moth", "bph", "orange ladybird"],
    &["orange ladybird", "orange ladybird", "fruit fly"],
    &["mantis", "grasshopper"],
    &["goldfly"],
  ];
  for labels in cases {
    let summary = AdvisoryTable::builtin().classify(labels.iter().copied());
    let balanced = summary.found_good.len() == summary.found_bad.len();
    assert_eq!(summary.verdict == Verdict::Balanced, balanced, "{labels:?}");
  }
}

#[test]
fn classification_is_repeatable() {
  let table = AdvisoryTable::builtin();
  let labels = ["water beetle", "orange ladybird", "mantis"];
  assert_eq!(table.classify(labels), table.classify(labels));
}

#[test]
fn every_vocabulary_label_has_guidance() {
  let table = AdvisoryTable::builtin();
  for label in LabelSet::builtin().names() {
    assert!(table.lookup(label).is_some(), "{label}");
  }
}

#[test]
fn advice_keeps_detections_alongside_summary() {
  let detections: DetectResult = vec![
    DetectItem {
      label: "black beetle".to_string(),
      score: 0.91,
      bbox: [0.1, 0.1, 0.3, 0.3],
    },
    DetectItem {
      label: "orange ladybird".to_string(),
      score: 0.55,
      bbox: [0.5, 0.5, 0.7, 0.7],
    },
  ]
  .into();

  let advice = AdvisoryTable::builtin().advise(detections.clone());
  assert_eq!(advice.detections, detections);
  assert_eq!(
    advice.categories,
    [Some(Category::Harmful), Some(Category::Beneficial)]
  );
  assert_eq!(advice.summary.verdict, Verdict::Balanced);
}
