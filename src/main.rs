// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/main.rs - 单张图像分析
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

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use malaeng::{
  args::CommonArgs,
  cache,
  input::ImageFileInput,
  task::{OneShotTask, Task},
};

/// 上传一张田间昆虫照片，获得益虫 / 害虫判断与防治建议
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像路径或 image:<path> URL（jpg、jpeg、png）
  #[arg(long, value_name = "IMAGE")]
  pub input: String,

  #[command(flatten)]
  pub common: CommonArgs,
}

fn run(args: Args) -> Result<()> {
  info!("输入来源: {}", args.input);
  cache::purge_model_cache(args.common.cache_dir.as_deref());

  let advisor = args.common.advisor()?;
  let outputs = args.common.outputs()?;
  let input = ImageFileInput::from_arg(&args.input);

  OneShotTask.run_task(input, &advisor, &outputs)?;
  Ok(())
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  match run(Args::parse()) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!("{:#}", e);
      ExitCode::FAILURE
    }
  }
}
