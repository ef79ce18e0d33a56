// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/input.rs - 图像上传输入
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

use thiserror::Error;

mod read_image_file;
pub use self::read_image_file::ImageFileInput;

mod session_input;
pub use self::session_input::SessionInput;

/// 允许上传的图像格式
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum InputError {
  #[error("不支持的文件类型: {0}（仅支持 jpg、jpeg、png）")]
  UnsupportedFileType(String),
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  Decode(#[from] image::ImageError),
  #[error("没有输入帧")]
  NoFrame,
}

/// 按扩展名检查上传文件，在解码前拒绝不支持的格式
pub fn check_file_type(path: &Path) -> Result<(), InputError> {
  let accepted = path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      ACCEPTED_EXTENSIONS
        .iter()
        .any(|accepted| ext.eq_ignore_ascii_case(accepted))
    })
    .unwrap_or(false);

  if accepted {
    Ok(())
  } else {
    Err(InputError::UnsupportedFileType(
      path.display().to_string(),
    ))
  }
}
