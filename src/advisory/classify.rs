// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/advisory/classify.rs - 检测标签分类与汇总
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

use std::cmp::Ordering;

use serde::Serialize;

use crate::advisory::{AdvisoryTable, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
  Positive,
  Negative,
  Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryMessage {
  pub label: String,
  pub tone: Tone,
  pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
  HarmfulDominant,
  BeneficialDominant,
  Balanced,
}

impl Verdict {
  /// 比较害虫与益虫的数量，相等（包括均为零）视为平衡
  pub fn from_counts(harmful: usize, beneficial: usize) -> Self {
    match harmful.cmp(&beneficial) {
      Ordering::Greater => Verdict::HarmfulDominant,
      Ordering::Less => Verdict::BeneficialDominant,
      Ordering::Equal => Verdict::Balanced,
    }
  }
}

/// 一次检测的分类汇总，三个列表按输入顺序排列且不去重
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
  pub found_good: Vec<String>,
  pub found_bad: Vec<String>,
  pub found_unknown: Vec<String>,
  pub messages: Vec<AdvisoryMessage>,
  pub verdict: Verdict,
}

impl ClassificationSummary {
  pub fn total(&self) -> usize {
    self.found_good.len() + self.found_bad.len() + self.found_unknown.len()
  }
}

pub const UNKNOWN_LABEL_PREFIX: &str = "❓ ไม่ทราบชนิด";

impl AdvisoryTable {
  pub fn classify<I, S>(&self, labels: I) -> ClassificationSummary
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut found_good = Vec::new();
    let mut found_bad = Vec::new();
    let mut found_unknown = Vec::new();
    let mut messages = Vec::new();

    for label in labels {
      let label = label.as_ref();
      let (tone, text) = match self.lookup(label) {
        Some(entry) if entry.category == Category::Beneficial => {
          found_good.push(label.to_string());
          (Tone::Positive, entry.guidance.to_string())
        }
        Some(entry) => {
          found_bad.push(label.to_string());
          (Tone::Negative, entry.guidance.to_string())
        }
        None => {
          found_unknown.push(label.to_string());
          (Tone::Neutral, format!("{}: {}", UNKNOWN_LABEL_PREFIX, label))
        }
      };
      messages.push(AdvisoryMessage {
        label: label.to_string(),
        tone,
        text,
      });
    }

    let verdict = Verdict::from_counts(found_bad.len(), found_good.len());
    ClassificationSummary {
      found_good,
      found_bad,
      found_unknown,
      messages,
      verdict,
    }
  }
}
