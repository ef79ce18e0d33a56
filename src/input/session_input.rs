// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/input/session_input.rs - 交互式会话输入
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

use std::io::BufRead;

use tracing::{debug, info};

use crate::input::{ImageFileInput, InputError};

const QUIT_COMMANDS: [&str; 2] = ["quit", "exit"];

/// 每行一个图像路径（或 `image:` URL），直到输入结束或收到退出命令
pub struct SessionInput<R> {
  reader: R,
  finished: bool,
}

impl<R: BufRead> SessionInput<R> {
  pub fn new(reader: R) -> Self {
    Self {
      reader,
      finished: false,
    }
  }

  fn next_line(&mut self) -> Option<Result<String, InputError>> {
    loop {
      let mut line = String::new();
      match self.reader.read_line(&mut line) {
        Ok(0) => return None,
        Ok(_) => {
          let line = line.trim();
          if !line.is_empty() {
            return Some(Ok(line.to_string()));
          }
        }
        Err(e) => return Some(Err(e.into())),
      }
    }
  }
}

impl<R: BufRead> Iterator for SessionInput<R> {
  type Item = Result<ImageFileInput, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.finished {
      return None;
    }

    let line = match self.next_line() {
      Some(Ok(line)) => line,
      Some(Err(e)) => {
        self.finished = true;
        return Some(Err(e));
      }
      None => {
        debug!("会话输入结束");
        self.finished = true;
        return None;
      }
    };

    if QUIT_COMMANDS.iter().any(|cmd| line.eq_ignore_ascii_case(cmd)) {
      info!("收到退出命令");
      self.finished = true;
      return None;
    }

    Some(ImageFileInput::from_arg(&line))
  }
}
