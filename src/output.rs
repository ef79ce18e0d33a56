// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;
use url::Url;

use crate::FromUrl;
#[cfg(feature = "save_image_file")]
use crate::FromUrlWithScheme;
use crate::advisory::Advice;
use crate::frame::RgbNhwcFrame;

pub trait Render<Frame, Output> {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod console_report;
pub use self::console_report::ConsoleReport;

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("控制台输出错误: {0}")]
  Console(#[from] std::io::Error),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 由 `--output` URL 选择的文件输出
pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      scheme => Err(OutputError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl Render<RgbNhwcFrame, Advice> for OutputWrapper {
  type Error = OutputError;

  #[allow(unused_variables)]
  fn render_result(&self, frame: &RgbNhwcFrame, result: &Advice) -> Result<(), Self::Error> {
    // 未启用任何文件输出时枚举没有变体
    #[cfg(not(feature = "save_image_file"))]
    return match *self {};

    #[cfg(feature = "save_image_file")]
    return match self {
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    };
  }
}

/// 控制台报告加上任意数量的文件输出
pub struct Outputs<W: std::io::Write> {
  console: ConsoleReport<W>,
  files: Vec<OutputWrapper>,
}

impl<W: std::io::Write> Outputs<W> {
  pub fn new(console: ConsoleReport<W>) -> Self {
    Self {
      console,
      files: Vec::new(),
    }
  }

  pub fn with_file(mut self, output: OutputWrapper) -> Self {
    self.files.push(output);
    self
  }

  pub fn console(&self) -> &ConsoleReport<W> {
    &self.console
  }

  pub fn into_console(self) -> ConsoleReport<W> {
    self.console
  }
}

impl<W: std::io::Write> Render<RgbNhwcFrame, Advice> for Outputs<W> {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbNhwcFrame, result: &Advice) -> Result<(), Self::Error> {
    self.console.render_result(frame, result)?;
    for output in &self.files {
      output.render_result(frame, result)?;
    }
    Ok(())
  }
}
