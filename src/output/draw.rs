// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{advisory::Advice, advisory::Category, frame::RgbNhwcFrame};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;

const BENEFICIAL_COLOR: [u8; 3] = [0, 170, 0];
const HARMFUL_COLOR: [u8; 3] = [220, 0, 0];
const UNKNOWN_COLOR: [u8; 3] = [0, 0, 255];

const FONT_QUERY_KEY: &str = "font";

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件 {0}: {1}")]
  Io(String, std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(String),
}

pub fn category_color(category: Option<Category>) -> [u8; 3] {
  match category {
    Some(Category::Beneficial) => BENEFICIAL_COLOR,
    Some(Category::Harmful) => HARMFUL_COLOR,
    None => UNKNOWN_COLOR,
  }
}

/// 在图像上绘制检测框；配置了字体时同时绘制标签文字
pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font: None,
    }
  }
}

impl Draw {
  pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let path = path.as_ref();
    let data =
      std::fs::read(path).map_err(|e| DrawError::Io(path.display().to_string(), e))?;
    let font = FontVec::try_from_vec(data).map_err(|e| DrawError::InvalidFont(e.to_string()))?;
    debug!("已加载字体: {}", path.display());
    self.font = Some(font);
    Ok(self)
  }

  /// 读取输出 URL 中的 `font=<path>` 查询参数
  pub fn from_url_query(url: &Url) -> Result<Self, DrawError> {
    let font = url
      .query_pairs()
      .find(|(k, _)| k == FONT_QUERY_KEY)
      .map(|(_, v)| v.into_owned());

    match font {
      Some(path) => Draw::default().with_font_file(path),
      None => {
        warn!("未配置字体，只绘制检测框");
        Ok(Draw::default())
      }
    }
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(
    &self,
    image: &mut RgbImage,
    bbox: &[f32; 4],
    label: &str,
    score: f32,
    color: [u8; 3],
  ) {
    let (w, h) = (image.width() as f32, image.height() as f32);

    let x_min = ((bbox[0] * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((bbox[1] * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((bbox[2] * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((bbox[3] * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框加粗为 2 像素
    let rect = Rect::at(x_min, y_min).of_size((x_max - x_min) as u32, (y_max - y_min) as u32);
    draw_hollow_rect_mut(image, rect, Rgb(color));
    if x_max - x_min > 2 && y_max - y_min > 2 {
      let inner = Rect::at(x_min + 1, y_min + 1)
        .of_size((x_max - x_min - 2) as u32, (y_max - y_min - 2) as u32);
      draw_hollow_rect_mut(image, inner, Rgb(color));
    }

    let Some(font) = &self.font else {
      return;
    };

    let text = format!("{} {:.2}", label, score);
    let text_width = (text.chars().count() as f32 * self.label_char_width) as i32;
    let label_x = x_min;
    let label_y = (y_min - self.label_text_height).max(0);
    let label_width = text_width.min(w as i32 - label_x).max(0) as u32;
    let label_height = self.label_text_height as u32;

    if label_width > 0 {
      let background = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, background, Rgb(color));
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        font,
        &text,
      );
    }
  }

  pub fn draw_advice(&self, image: &mut RgbImage, advice: &Advice) {
    let items = advice.detections.items.iter();
    for (item, category) in items.zip(advice.categories.iter()) {
      self.draw_bbox_with_label(
        image,
        &item.bbox,
        &item.label,
        item.score,
        category_color(*category),
      );
    }
  }

  pub fn annotate(&self, frame: &RgbNhwcFrame, advice: &Advice) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_advice(&mut image, advice);
    image
  }
}
