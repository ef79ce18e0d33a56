// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/task.rs - 任务流程
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
  fmt::Display,
  io::Write,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  advisory::{Advice, AdvisoryTable},
  frame::RgbNhwcFrame,
  input::{ImageFileInput, InputError},
  model::{DetectResult, GatewayError, Model, ModelGateway},
  output::{OutputError, Outputs, Render},
};

const MODEL_UNAVAILABLE_MESSAGE: &str = "ไม่สามารถโหลดโมเดลได้";
const SESSION_PROMPT: &str = "📸 เลือกภาพแมลง (jpg, jpeg, png): ";

#[derive(Error, Debug)]
pub enum AdvisorError {
  #[error(transparent)]
  Gateway(#[from] GatewayError),
  #[error(transparent)]
  Input(#[from] InputError),
  #[error(transparent)]
  Output(#[from] OutputError),
}

impl AdvisorError {
  /// 模型不可用时整个会话终止，其余错误只影响当前请求
  pub fn is_fatal(&self) -> bool {
    matches!(self, AdvisorError::Gateway(GatewayError::ModelUnavailable(_)))
  }

  pub fn user_message(&self) -> String {
    match self {
      AdvisorError::Gateway(GatewayError::ModelUnavailable(reason)) => {
        format!("{}: {}", MODEL_UNAVAILABLE_MESSAGE, reason)
      }
      other => other.to_string(),
    }
  }
}

/// 模型网关与建议表的组合，处理单张图像
pub struct Advisor<M> {
  gateway: ModelGateway<M>,
  table: AdvisoryTable,
}

impl<M> Advisor<M>
where
  M: Model<Input = RgbNhwcFrame, Output = DetectResult>,
  M::Error: Display,
{
  pub fn new(gateway: ModelGateway<M>, table: AdvisoryTable) -> Self {
    Self { gateway, table }
  }

  pub fn gateway(&self) -> &ModelGateway<M> {
    &self.gateway
  }

  pub fn advise(&self, frame: &RgbNhwcFrame) -> Result<Advice, GatewayError> {
    let detections = self.gateway.detect(frame)?;
    let advice = self.table.advise(detections);
    info!(
      "益虫 {} / 害虫 {} / 未知 {}，结论: {:?}",
      advice.summary.found_good.len(),
      advice.summary.found_bad.len(),
      advice.summary.found_unknown.len(),
      advice.summary.verdict
    );
    Ok(advice)
  }

  fn process<W: Write>(
    &self,
    mut upload: ImageFileInput,
    outputs: &Outputs<W>,
  ) -> Result<Advice, AdvisorError> {
    info!("处理上传图像: {}", upload.path().display());
    let frame = upload.next().ok_or(InputError::NoFrame)?;
    let advice = self.advise(&frame)?;
    outputs.render_result(&frame, &advice)?;
    Ok(advice)
  }
}

/// 任务结束时的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
  pub processed: usize,
  pub failed: usize,
}

pub trait Task<I, M, W: Write>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    advisor: &Advisor<M>,
    outputs: &Outputs<W>,
  ) -> Result<TaskReport, Self::Error>;
}

// 所有错误在此转换为用户可见的信息
fn report<W: Write>(outputs: &Outputs<W>, err: &AdvisorError) {
  error!("{}", err);
  if let Err(e) = outputs.console().report_error(&err.user_message()) {
    error!("无法输出错误信息: {}", e);
  }
}

fn prompt<W: Write>(outputs: &Outputs<W>) {
  if let Err(e) = outputs.console().prompt(SESSION_PROMPT) {
    warn!("无法输出提示: {}", e);
  }
}

fn preload<M, W>(advisor: &Advisor<M>, outputs: &Outputs<W>) -> Result<(), AdvisorError>
where
  M: Model<Input = RgbNhwcFrame, Output = DetectResult>,
  M::Error: Display,
  W: Write,
{
  advisor.gateway().preload().map_err(|e| {
    let err = AdvisorError::from(e);
    report(outputs, &err);
    err
  })
}

/// 单张图像：加载模型、分析、输出
pub struct OneShotTask;

impl<M, W> Task<Result<ImageFileInput, InputError>, M, W> for OneShotTask
where
  M: Model<Input = RgbNhwcFrame, Output = DetectResult>,
  M::Error: Display,
  W: Write,
{
  type Error = AdvisorError;

  fn run_task(
    self,
    input: Result<ImageFileInput, InputError>,
    advisor: &Advisor<M>,
    outputs: &Outputs<W>,
  ) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    preload(advisor, outputs)?;

    match input
      .map_err(AdvisorError::from)
      .and_then(|upload| advisor.process(upload, outputs))
    {
      Ok(_) => Ok(TaskReport {
        processed: 1,
        failed: 0,
      }),
      Err(e) => {
        report(outputs, &e);
        Err(e)
      }
    }
  }
}

/// 交互式会话：模型只加载一次，逐个处理上传的图像
#[derive(Default, Debug)]
pub struct SessionTask {
  stop: Option<Arc<AtomicBool>>,
}

impl SessionTask {
  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = Some(stop);
    self
  }

  fn stop_requested(&self) -> bool {
    self
      .stop
      .as_ref()
      .map(|stop| stop.load(Ordering::SeqCst))
      .unwrap_or(false)
  }
}

impl<I, M, W> Task<I, M, W> for SessionTask
where
  I: Iterator<Item = Result<ImageFileInput, InputError>>,
  M: Model<Input = RgbNhwcFrame, Output = DetectResult>,
  M::Error: Display,
  W: Write,
{
  type Error = AdvisorError;

  fn run_task(
    self,
    input: I,
    advisor: &Advisor<M>,
    outputs: &Outputs<W>,
  ) -> Result<TaskReport, Self::Error> {
    info!("开始会话...");
    preload(advisor, outputs)?;

    let mut stats = TaskReport::default();
    prompt(outputs);
    for upload in input {
      if self.stop_requested() {
        warn!("中断信号接收，退出会话");
        break;
      }

      match upload
        .map_err(AdvisorError::from)
        .and_then(|upload| advisor.process(upload, outputs))
      {
        Ok(_) => stats.processed += 1,
        Err(e) if e.is_fatal() => {
          report(outputs, &e);
          return Err(e);
        }
        Err(e) => {
          report(outputs, &e);
          stats.failed += 1;
        }
      }
      prompt(outputs);
    }

    info!(
      "会话结束: 成功 {} 张，失败 {} 张",
      stats.processed, stats.failed
    );
    Ok(stats)
  }
}
