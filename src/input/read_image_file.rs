// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  input::{InputError, check_file_type},
};

/// 单张上传图像，迭代时产出一帧
pub struct ImageFileInput {
  path: PathBuf,
  frame: Option<RgbNhwcFrame>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    Self::open(crate::url_file_path(url))
  }
}

impl ImageFileInput {
  /// 命令行或会话中的一项：裸路径或 `image:` URL
  pub fn from_arg(value: &str) -> Result<Self, InputError> {
    match crate::explicit_url(value) {
      Some(url) => Self::from_url(&url),
      None => Self::open(value),
    }
  }

  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
    let path = path.as_ref();
    check_file_type(path)?;

    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!(
      "已读取图像 {}: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(ImageFileInput {
      path: path.to_path_buf(),
      frame: Some(image.to_rgb8().into()),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}
