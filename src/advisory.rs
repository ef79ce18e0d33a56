// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/advisory.rs - 益虫/害虫建议表
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

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::DetectResult;

mod classify;
pub use self::classify::{AdvisoryMessage, ClassificationSummary, Tone, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Beneficial,
  Harmful,
}

/// 建议表中的一条记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisoryEntry<'a> {
  pub label: &'a str,
  pub guidance: &'a str,
  pub category: Category,
}

#[derive(Error, Debug)]
pub enum AdvisoryError {
  #[error("无法读取建议表 {0}: {1}")]
  Io(String, std::io::Error),
  #[error("建议表格式错误: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("标签 '{0}' 同时出现在益虫表和害虫表中")]
  DuplicateLabel(String),
}

const BUILTIN_ADVISORY: &str = include_str!("../labels/advisory.toml");

/// 只读的建议表，进程启动时加载一次
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdvisoryTable {
  #[serde(default)]
  beneficial: BTreeMap<String, String>,
  #[serde(default)]
  harmful: BTreeMap<String, String>,
}

impl AdvisoryTable {
  pub fn builtin() -> Self {
    Self::from_toml_str(BUILTIN_ADVISORY).expect("无法解析内置建议表")
  }

  pub fn from_toml_str(content: &str) -> Result<Self, AdvisoryError> {
    let table: AdvisoryTable = toml::from_str(content)?;
    if let Some(label) = table
      .beneficial
      .keys()
      .find(|label| table.harmful.contains_key(*label))
    {
      return Err(AdvisoryError::DuplicateLabel(label.clone()));
    }
    debug!(
      "建议表: 益虫 {} 条, 害虫 {} 条",
      table.beneficial.len(),
      table.harmful.len()
    );
    Ok(table)
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AdvisoryError> {
    let path = path.as_ref();
    info!("加载建议表: {}", path.display());
    let content = std::fs::read_to_string(path)
      .map_err(|e| AdvisoryError::Io(path.display().to_string(), e))?;
    Self::from_toml_str(&content)
  }

  pub fn lookup(&self, label: &str) -> Option<AdvisoryEntry<'_>> {
    if let Some((label, guidance)) = self.beneficial.get_key_value(label) {
      return Some(AdvisoryEntry {
        label,
        guidance,
        category: Category::Beneficial,
      });
    }
    self
      .harmful
      .get_key_value(label)
      .map(|(label, guidance)| AdvisoryEntry {
        label,
        guidance,
        category: Category::Harmful,
      })
  }

  pub fn category_of(&self, label: &str) -> Option<Category> {
    self.lookup(label).map(|entry| entry.category)
  }

  pub fn entries(&self) -> impl Iterator<Item = AdvisoryEntry<'_>> {
    let beneficial = self.beneficial.iter().map(|(label, guidance)| AdvisoryEntry {
      label,
      guidance,
      category: Category::Beneficial,
    });
    let harmful = self.harmful.iter().map(|(label, guidance)| AdvisoryEntry {
      label,
      guidance,
      category: Category::Harmful,
    });
    beneficial.chain(harmful)
  }
}

/// 一次上传的完整结果：检测框、各检测框的类别以及分类汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
  pub detections: DetectResult,
  /// 与 `detections.items` 一一对应，未知标签为 `None`
  pub categories: Vec<Option<Category>>,
  pub summary: ClassificationSummary,
}

impl AdvisoryTable {
  pub fn advise(&self, detections: DetectResult) -> Advice {
    let categories = detections
      .labels()
      .map(|label| self.category_of(label))
      .collect();
    let summary = self.classify(detections.labels());
    Advice {
      detections,
      categories,
      summary,
    }
  }
}
