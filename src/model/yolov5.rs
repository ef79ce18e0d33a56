// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/model/yolov5.rs - YOLOv5 ONNX 模型
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

use image::imageops::{self, FilterType};
use thiserror::Error;
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  model::{DetectItem, DetectResult, LabelSet, Model},
};

const YOLOV5_INPUT_SIZE: u32 = 640;
const YOLOV5_BOX_FIELDS: usize = 5; // cx, cy, w, h, objectness
const YOLOV5_CONFIDENCE_THRESH: f32 = 0.25;
const YOLOV5_IOU_THRESH: f32 = 0.45;
const YOLOV5_MAX_DETECTIONS: usize = 300;

/// 相对于启动时的工作目录
pub const DEFAULT_MODEL_PATH: &str = "best.onnx";

#[derive(Error, Debug)]
pub enum YoloV5Error {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(String),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("推理错误: {0}")]
  Inference(String),
}

impl YoloV5Error {
  fn invalid(msg: &str, e: TractError) -> Self {
    YoloV5Error::ModelInvalid(msg.to_string(), format!("{:#}", e))
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloV5Params {
  pub input_size: u32,
  pub confidence: f32,
  pub iou: f32,
  pub max_detections: usize,
}

impl Default for YoloV5Params {
  fn default() -> Self {
    Self {
      input_size: YOLOV5_INPUT_SIZE,
      confidence: YOLOV5_CONFIDENCE_THRESH,
      iou: YOLOV5_IOU_THRESH,
      max_detections: YOLOV5_MAX_DETECTIONS,
    }
  }
}

pub struct YoloV5 {
  plan: TypedRunnableModel<TypedModel>,
  labels: LabelSet,
  params: YoloV5Params,
}

pub struct YoloV5Builder {
  model_path: String,
  labels: LabelSet,
  params: YoloV5Params,
}

impl FromUrlWithScheme for YoloV5Builder {
  const SCHEME: &'static str = "yolov5";
}

impl FromUrl for YoloV5Builder {
  type Error = YoloV5Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloV5Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(YoloV5Builder::new(crate::url_file_path(url)))
  }
}

impl YoloV5Builder {
  pub fn new<S: Into<String>>(model_path: S) -> Self {
    YoloV5Builder {
      model_path: model_path.into(),
      labels: LabelSet::builtin(),
      params: YoloV5Params::default(),
    }
  }

  pub fn labels(mut self, labels: LabelSet) -> Self {
    self.labels = labels;
    self
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.params.confidence = confidence;
    self
  }

  pub fn iou(mut self, iou: f32) -> Self {
    self.params.iou = iou;
    self
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.params.max_detections = max_detections;
    self
  }

  pub fn build(self) -> Result<YoloV5, YoloV5Error> {
    info!("加载模型文件: {}", self.model_path);
    if !Path::new(&self.model_path).is_file() {
      error!("模型文件不存在: {}", self.model_path);
      return Err(YoloV5Error::ModelNotFound(self.model_path));
    }

    let size = self.params.input_size as usize;
    let model = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .map_err(|e| YoloV5Error::invalid("无法解析 ONNX 模型", e))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )
      .map_err(|e| YoloV5Error::invalid("无法设置模型输入", e))?
      .into_optimized()
      .map_err(|e| YoloV5Error::invalid("无法优化模型", e))?;

    let expected = YOLOV5_BOX_FIELDS + self.labels.len();
    let output_shape = model
      .output_fact(0)
      .ok()
      .and_then(|fact| fact.shape.as_concrete().map(|shape| shape.to_vec()));
    match output_shape {
      Some(shape) if shape.len() == 3 && shape[2] == expected => {
        debug!("模型输出形状: {:?}", shape);
      }
      Some(shape) => {
        error!("模型输出形状 {:?} 与类别数 {} 不符", shape, self.labels.len());
        return Err(YoloV5Error::ModelInvalid(
          format!("预期输出形状为 [1, N, {}]", expected),
          format!("实际为 {:?}", shape),
        ));
      }
      None => debug!("模型输出形状未知，推理时再检查"),
    }

    let plan = model
      .into_runnable()
      .map_err(|e| YoloV5Error::invalid("无法构建推理计划", e))?;
    info!("模型加载完成");

    Ok(YoloV5 {
      plan,
      labels: self.labels,
      params: self.params,
    })
  }
}

impl YoloV5 {
  fn preprocess(&self, frame: &RgbNhwcFrame) -> Tensor {
    let size = self.params.input_size;
    let resized = imageops::resize(&frame.to_rgb_image(), size, size, FilterType::Triangle);

    tract_ndarray::Array4::from_shape_fn(
      (1, 3, size as usize, size as usize),
      |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
    )
    .into_tensor()
  }
}

impl Model for YoloV5 {
  type Input = RgbNhwcFrame;
  type Output = DetectResult;
  type Error = YoloV5Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入: {}x{}", input.width(), input.height());
    let tensor = self.preprocess(input);

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| YoloV5Error::Inference(format!("{:#}", e)))?;

    let output = outputs
      .first()
      .ok_or_else(|| YoloV5Error::Inference("模型没有输出".to_string()))?;
    let row_len = YOLOV5_BOX_FIELDS + self.labels.len();
    if output.shape().last() != Some(&row_len) {
      return Err(YoloV5Error::Inference(format!(
        "输出形状 {:?} 与类别数 {} 不符",
        output.shape(),
        self.labels.len()
      )));
    }
    let data = output
      .as_slice::<f32>()
      .map_err(|e| YoloV5Error::Inference(format!("{:#}", e)))?;

    Ok(postprocess(data, &self.labels, &self.params))
  }
}

#[derive(Debug, Clone, PartialEq)]
struct Candidate {
  class_id: usize,
  score: f32,
  bbox: [f32; 4],
}

/// 解码 `[N, 5 + C]` 输出并执行 NMS
fn postprocess(data: &[f32], labels: &LabelSet, params: &YoloV5Params) -> DetectResult {
  let row_len = YOLOV5_BOX_FIELDS + labels.len();
  let size = params.input_size as f32;
  let mut candidates = Vec::new();

  for row in data.chunks_exact(row_len) {
    let objectness = row[4];
    if objectness < params.confidence {
      continue;
    }

    let (class_id, class_score) = row[YOLOV5_BOX_FIELDS..]
      .iter()
      .copied()
      .enumerate()
      .fold((0usize, f32::MIN), |best, (id, score)| {
        if score > best.1 { (id, score) } else { best }
      });

    let score = objectness * class_score;
    if score < params.confidence {
      continue;
    }

    let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
    candidates.push(Candidate {
      class_id,
      score,
      bbox: [
        ((cx - w / 2.0) / size).clamp(0.0, 1.0),
        ((cy - h / 2.0) / size).clamp(0.0, 1.0),
        ((cx + w / 2.0) / size).clamp(0.0, 1.0),
        ((cy + h / 2.0) / size).clamp(0.0, 1.0),
      ],
    });
  }
  debug!("置信度过滤后剩余 {} 个候选框", candidates.len());

  let items: Vec<DetectItem> = nms(candidates, params.iou)
    .into_iter()
    .take(params.max_detections)
    .map(|c| DetectItem {
      label: labels.name(c.class_id),
      score: c.score,
      bbox: c.bbox,
    })
    .collect();

  debug!("检测到 {} 个物体", items.len());
  items.into()
}

/// 按类别的非极大值抑制
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
  // 按置信度降序排序
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == candidate.class_id && iou(&kept.bbox, &candidate.bbox) >= iou_threshold);
    if !suppressed {
      result.push(candidate);
    }
  }
  result
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels() -> LabelSet {
    LabelSet::from_toml_str(r#"names = ["moth", "orange ladybird"]"#).unwrap()
  }

  fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, classes: [f32; 2]) -> Vec<f32> {
    vec![cx, cy, w, h, obj, classes[0], classes[1]]
  }

  #[test]
  fn decodes_rows_into_normalised_boxes() {
    let data = row(320.0, 320.0, 64.0, 128.0, 0.9, [0.1, 0.8]);
    let result = postprocess(&data, &labels(), &YoloV5Params::default());

    assert_eq!(result.len(), 1);
    let item = &result.items[0];
    assert_eq!(item.label, "orange ladybird");
    assert!((item.score - 0.72).abs() < 1e-6);
    assert_eq!(item.bbox, [0.45, 0.4, 0.55, 0.6]);
  }

  #[test]
  fn drops_low_confidence_rows() {
    let mut data = row(100.0, 100.0, 20.0, 20.0, 0.2, [0.9, 0.0]);
    // 目标置信度高但类别分数低
    data.extend(row(200.0, 200.0, 20.0, 20.0, 0.9, [0.2, 0.1]));
    let result = postprocess(&data, &labels(), &YoloV5Params::default());
    assert!(result.is_empty());
  }

  #[test]
  fn suppresses_overlapping_boxes_of_same_class_only() {
    let mut data = row(100.0, 100.0, 50.0, 50.0, 0.9, [0.9, 0.0]);
    data.extend(row(102.0, 101.0, 50.0, 50.0, 0.8, [0.9, 0.0]));
    data.extend(row(101.0, 100.0, 50.0, 50.0, 0.9, [0.0, 0.7]));
    data.extend(row(500.0, 500.0, 50.0, 50.0, 0.6, [0.9, 0.0]));
    let result = postprocess(&data, &labels(), &YoloV5Params::default());

    let labels: Vec<_> = result.labels().collect();
    assert_eq!(labels, ["moth", "orange ladybird", "moth"]);
  }

  #[test]
  fn caps_number_of_detections() {
    let data: Vec<f32> = (0..10)
      .flat_map(|i| row(30.0 + 60.0 * i as f32, 30.0, 20.0, 20.0, 0.9, [0.9, 0.0]))
      .collect();
    let params = YoloV5Params {
      max_detections: 4,
      ..Default::default()
    };
    assert_eq!(postprocess(&data, &labels(), &params).len(), 4);
  }

  #[test]
  fn boxes_are_clamped_to_image() {
    let data = row(5.0, 635.0, 40.0, 40.0, 0.9, [0.9, 0.0]);
    let result = postprocess(&data, &labels(), &YoloV5Params::default());
    let bbox = result.items[0].bbox;
    assert_eq!(bbox[0], 0.0);
    assert_eq!(bbox[3], 1.0);
  }

  #[test]
  fn iou_of_disjoint_and_identical_boxes() {
    let a = [0.0, 0.0, 0.5, 0.5];
    assert_eq!(iou(&a, &a), 1.0);
    assert_eq!(iou(&a, &[0.6, 0.6, 0.9, 0.9]), 0.0);
  }

  #[test]
  fn missing_model_file_is_reported() {
    let result = YoloV5Builder::new("/nonexistent/best.onnx").build();
    assert!(matches!(result, Err(YoloV5Error::ModelNotFound(_))));
  }

  #[test]
  fn builder_requires_yolov5_scheme() {
    let url = Url::parse("image:best.onnx").unwrap();
    assert!(matches!(
      YoloV5Builder::from_url(&url),
      Err(YoloV5Error::ModelPathError(_))
    ));
  }
}
