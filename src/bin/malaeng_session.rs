// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/bin/malaeng_session.rs - 交互式会话
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

use std::{
  process::ExitCode,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use malaeng::{
  args::CommonArgs,
  cache,
  input::SessionInput,
  task::{SessionTask, Task},
};

/// 逐行读取图像路径并给出建议，输入 quit 或 EOF 结束
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub common: CommonArgs,
}

fn run(args: Args) -> Result<()> {
  cache::purge_model_cache(args.common.cache_dir.as_deref());

  let advisor = args.common.advisor()?;
  let outputs = args.common.outputs()?;

  let stop = Arc::new(AtomicBool::new(false));
  let handler_stop = stop.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    handler_stop.store(true, Ordering::SeqCst);
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .context("无法设置 Ctrl-C 处理器")?;

  let stdin = std::io::stdin();
  let report = SessionTask::default()
    .with_stop_flag(stop)
    .run_task(SessionInput::new(stdin.lock()), &advisor, &outputs)?;
  info!("共处理 {} 张，失败 {} 张", report.processed, report.failed);
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
