// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/model.rs - 模型
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测目标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectItem {
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，归一化坐标
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// 按检测顺序返回标签，重复检测保留重复标签
  pub fn labels(&self) -> impl Iterator<Item = &str> {
    self.items.iter().map(|item| item.label.as_str())
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

#[derive(Error, Debug)]
pub enum LabelSetError {
  #[error("无法读取类别文件 {0}: {1}")]
  Io(String, std::io::Error),
  #[error("类别文件格式错误: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("类别列表为空")]
  Empty,
}

const BUILTIN_LABELS: &str = include_str!("../labels/insects.toml");

/// 模型的固定输出词表，按类别编号排列
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelSet {
  names: Vec<String>,
}

impl LabelSet {
  pub fn builtin() -> Self {
    Self::from_toml_str(BUILTIN_LABELS).expect("无法解析内置类别文件")
  }

  pub fn from_toml_str(content: &str) -> Result<Self, LabelSetError> {
    let labels: LabelSet = toml::from_str(content)?;
    if labels.names.is_empty() {
      return Err(LabelSetError::Empty);
    }
    Ok(labels)
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelSetError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|e| LabelSetError::Io(path.display().to_string(), e))?;
    Self::from_toml_str(&content)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 按类别编号排列的名称
  pub fn names(&self) -> &[String] {
    &self.names
  }

  /// 未在词表中的类别编号以 `class_<id>` 命名
  pub fn name(&self, class_id: usize) -> String {
    self
      .names
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| format!("class_{}", class_id))
  }
}

mod gateway;
pub use self::gateway::{GatewayError, ModelGateway};

mod yolov5;
pub use self::yolov5::{DEFAULT_MODEL_PATH, YoloV5, YoloV5Builder, YoloV5Error};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_labels_cover_advisory_vocabulary() {
    let labels = LabelSet::builtin();
    assert_eq!(labels.len(), 8);
    assert!((0..labels.len()).any(|id| labels.name(id) == "orange ladybird"));
  }

  #[test]
  fn unknown_class_id_gets_placeholder_name() {
    let labels = LabelSet::from_toml_str(r#"names = ["moth"]"#).unwrap();
    assert_eq!(labels.name(0), "moth");
    assert_eq!(labels.name(3), "class_3");
  }

  #[test]
  fn empty_label_file_is_rejected() {
    assert!(matches!(
      LabelSet::from_toml_str("names = []"),
      Err(LabelSetError::Empty)
    ));
  }

  #[test]
  fn labels_keep_detection_order() {
    let result = DetectResult::from(vec![
      DetectItem {
        label: "moth".into(),
        score: 0.9,
        bbox: [0.0, 0.0, 0.5, 0.5],
      },
      DetectItem {
        label: "moth".into(),
        score: 0.8,
        bbox: [0.5, 0.5, 1.0, 1.0],
      },
    ]);
    assert_eq!(result.labels().collect::<Vec<_>>(), ["moth", "moth"]);
  }
}
