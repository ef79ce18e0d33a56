// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{io::Stdout, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme,
  advisory::AdvisoryTable,
  model::{DEFAULT_MODEL_PATH, LabelSet, ModelGateway, YoloV5, YoloV5Builder},
  output::{ConsoleReport, OutputWrapper, Outputs},
  task::Advisor,
};

/// 两个程序共用的参数
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
  /// ONNX 模型路径或 `yolov5:<path>` URL
  #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL_PATH)]
  pub model: String,

  /// 类别文件（TOML，`names = [...]`），缺省使用内置类别
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 建议表文件（TOML，`[beneficial]` 与 `[harmful]`），缺省使用内置建议表
  #[arg(long, value_name = "FILE")]
  pub advisory: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每张图像最多保留的检测数
  #[arg(long, default_value = "300", value_name = "COUNT")]
  pub max_detections: usize,

  /// 额外输出，可重复
  /// 支持格式:
  /// - 标注图像: image:<path>.png，可加 ?font=<ttf>
  /// - 目录记录: folder:<dir>，可加 ?always 与 ?font=<ttf>
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<String>,

  /// 模型缓存目录，缺省为平台缓存目录下的 malaeng
  #[arg(long, value_name = "DIR")]
  pub cache_dir: Option<PathBuf>,
}

impl CommonArgs {
  pub fn advisory_table(&self) -> Result<AdvisoryTable> {
    match &self.advisory {
      Some(path) => AdvisoryTable::from_file(path).context("无法加载建议表"),
      None => Ok(AdvisoryTable::builtin()),
    }
  }

  pub fn label_set(&self) -> Result<LabelSet> {
    match &self.labels {
      Some(path) => LabelSet::from_file(path).context("无法加载类别文件"),
      None => Ok(LabelSet::builtin()),
    }
  }

  /// 构建网关；模型本身在首次使用时才加载
  pub fn gateway(&self) -> Result<ModelGateway<YoloV5>> {
    let url = crate::url_or_path(&self.model, YoloV5Builder::SCHEME)
      .with_context(|| format!("无效的模型路径: {}", self.model))?;
    let labels = self.label_set()?;
    let (confidence, iou, max_detections) = (self.confidence, self.iou, self.max_detections);
    info!("模型: {}，类别数: {}", url, labels.len());

    Ok(ModelGateway::new(move || {
      YoloV5Builder::from_url(&url)?
        .labels(labels.clone())
        .confidence(confidence)
        .iou(iou)
        .max_detections(max_detections)
        .build()
    }))
  }

  pub fn advisor(&self) -> Result<Advisor<YoloV5>> {
    Ok(Advisor::new(self.gateway()?, self.advisory_table()?))
  }

  pub fn outputs(&self) -> Result<Outputs<Stdout>> {
    let mut outputs = Outputs::new(ConsoleReport::stdout());
    for output in &self.output {
      let url = crate::url_or_path(output, "image")
        .with_context(|| format!("无效的输出: {}", output))?;
      let wrapper =
        OutputWrapper::from_url(&url).with_context(|| format!("无法创建输出: {}", url))?;
      info!("输出: {}", url);
      outputs = outputs.with_file(wrapper);
    }
    Ok(outputs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct TestArgs {
    #[command(flatten)]
    common: CommonArgs,
  }

  #[test]
  fn defaults_point_at_best_onnx_in_working_directory() {
    let args = TestArgs::parse_from(["malaeng"]);
    assert_eq!(args.common.model, "best.onnx");
    let url = crate::url_or_path(&args.common.model, YoloV5Builder::SCHEME).unwrap();
    assert_eq!(url.as_str(), "yolov5:best.onnx");
    assert_eq!(args.common.confidence, 0.25);
    assert_eq!(args.common.iou, 0.45);
    assert!(args.common.output.is_empty());
  }

  #[test]
  fn gateway_reports_missing_model_as_unavailable() {
    let args = TestArgs::parse_from(["malaeng", "--model", "/nonexistent/best.onnx"]);
    let gateway = args.common.gateway().unwrap();
    assert!(matches!(
      gateway.preload(),
      Err(crate::model::GatewayError::ModelUnavailable(_))
    ));
  }

  #[test]
  fn unknown_output_scheme_is_rejected() {
    let args = TestArgs::parse_from(["malaeng", "--output", "rtsp://camera/stream"]);
    assert!(args.common.outputs().is_err());
  }

  #[test]
  #[cfg(feature = "directory_record")]
  fn repeated_outputs_are_collected() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("out/result.png");
    let folder = format!("folder:{}?always", dir.path().join("records").display());
    let args = TestArgs::parse_from([
      "malaeng",
      "--output",
      image.to_str().unwrap(),
      "--output",
      folder.as_str(),
    ]);
    assert_eq!(args.common.output.len(), 2);
    assert!(args.common.outputs().is_ok());
  }

  #[test]
  #[cfg(feature = "save_image_file")]
  fn bare_output_path_keeps_hash_and_percent() {
    use crate::{
      advisory::AdvisoryTable, frame::RgbNhwcFrame, model::DetectResult, output::Render,
    };

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("run#2/50%25.png");
    let args = TestArgs::parse_from(["malaeng", "--output", image.to_str().unwrap()]);

    let outputs = args.common.outputs().unwrap();
    let frame = RgbNhwcFrame::from(image::RgbImage::new(4, 4));
    let advice = AdvisoryTable::builtin().advise(DetectResult::default());
    outputs.render_result(&frame, &advice).unwrap();
    assert!(image.is_file());
  }
}
