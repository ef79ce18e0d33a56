// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod advisory;
pub mod args;
pub mod cache;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 参数本身带有方案时返回对应的 URL，裸路径返回 `None`
pub fn explicit_url(value: &str) -> Option<url::Url> {
  match url::Url::parse(value) {
    // Windows 盘符（如 C:\）会被解析为单字母方案
    Ok(url) if url.scheme().len() > 1 => Some(url),
    _ => None,
  }
}

/// 将命令行参数转换为 URL，裸路径按给定方案处理
///
/// 裸路径逐段百分号编码，`#`、`?`、`%` 等字符经 [`url_file_path`] 原样取回。
pub fn url_or_path(value: &str, scheme: &str) -> Result<url::Url, url::ParseError> {
  if let Some(url) = explicit_url(value) {
    return Ok(url);
  }

  let path = value
    .split('/')
    .map(|segment| urlencoding::encode(segment).into_owned())
    .collect::<Vec<_>>()
    .join("/");
  url::Url::parse(&format!("{}:{}", scheme, path))
}

/// 取出 URL 中的文件路径（已解码）
pub fn url_file_path(url: &url::Url) -> String {
  let path = url.path();
  urlencoding::decode(path)
    .map(|decoded| decoded.into_owned())
    .unwrap_or_else(|_| path.to_string())
}
