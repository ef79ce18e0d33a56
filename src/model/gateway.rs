// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/model/gateway.rs - 模型网关（延迟加载、仅加载一次）
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

use std::{fmt::Display, sync::OnceLock};

use thiserror::Error;
use tracing::{error, info};

use crate::model::{DetectResult, Model};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
  #[error("模型不可用: {0}")]
  ModelUnavailable(String),
  #[error("推理失败: {0}")]
  InferenceFailed(String),
}

type Loader<M> = Box<dyn Fn() -> Result<M, String> + Send + Sync>;

/// 持有模型句柄的网关
///
/// 模型在首次使用或 [`ModelGateway::preload`] 时加载，且在进程生命周期内只加载一次；
/// 加载失败的结果同样被缓存，之后的每次调用都直接返回 `ModelUnavailable`。
pub struct ModelGateway<M> {
  loader: Loader<M>,
  model: OnceLock<Result<M, String>>,
}

impl<M> ModelGateway<M>
where
  M: Model<Output = DetectResult>,
  M::Error: Display,
{
  pub fn new<F, E>(loader: F) -> Self
  where
    F: Fn() -> Result<M, E> + Send + Sync + 'static,
    E: Display,
  {
    Self {
      loader: Box::new(move || loader().map_err(|e| e.to_string())),
      model: OnceLock::new(),
    }
  }

  fn handle(&self) -> Result<&M, GatewayError> {
    self
      .model
      .get_or_init(|| {
        info!("正在加载模型...");
        let now = std::time::Instant::now();
        let model = (self.loader)();
        match &model {
          Ok(_) => info!("模型加载完成，耗时: {:.2?}", now.elapsed()),
          Err(e) => error!("模型加载失败: {}", e),
        }
        model
      })
      .as_ref()
      .map_err(|e| GatewayError::ModelUnavailable(e.clone()))
  }

  /// 启动时显式加载模型
  pub fn preload(&self) -> Result<(), GatewayError> {
    self.handle().map(|_| ())
  }

  pub fn is_loaded(&self) -> bool {
    matches!(self.model.get(), Some(Ok(_)))
  }

  pub fn detect(&self, input: &M::Input) -> Result<DetectResult, GatewayError> {
    let model = self.handle()?;
    let now = std::time::Instant::now();
    let result = model
      .infer(input)
      .map_err(|e| GatewayError::InferenceFailed(e.to_string()))?;
    info!(
      "推理完成，检测到 {} 个目标，耗时: {:.2?}",
      result.len(),
      now.elapsed()
    );
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  struct FixedModel(Vec<&'static str>);

  impl Model for FixedModel {
    type Input = ();
    type Output = DetectResult;
    type Error = String;

    fn infer(&self, _input: &()) -> Result<DetectResult, String> {
      Ok(
        self
          .0
          .iter()
          .map(|label| DetectItem {
            label: label.to_string(),
            score: 0.9,
            bbox: [0.1, 0.1, 0.2, 0.2],
          })
          .collect::<Vec<_>>()
          .into(),
      )
    }
  }

  #[test]
  fn loads_lazily_on_first_detect() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let gateway = ModelGateway::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(FixedModel(vec!["moth"]))
    });

    assert!(!gateway.is_loaded());
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    let result = gateway.detect(&()).unwrap();
    assert_eq!(result.labels().collect::<Vec<_>>(), ["moth"]);
    gateway.detect(&()).unwrap();

    assert!(gateway.is_loaded());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn failed_load_is_not_retried() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let gateway = ModelGateway::<FixedModel>::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      Err("best.onnx: No such file or directory")
    });

    for _ in 0..3 {
      assert_eq!(
        gateway.detect(&()),
        Err(GatewayError::ModelUnavailable(
          "best.onnx: No such file or directory".to_string()
        ))
      );
    }
    assert!(gateway.preload().is_err());
    assert!(!gateway.is_loaded());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn concurrent_first_access_loads_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let gateway = Arc::new(ModelGateway::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      std::thread::sleep(std::time::Duration::from_millis(20));
      Ok::<_, String>(FixedModel(vec!["bph", "orange ladybird"]))
    }));

    let workers: Vec<_> = (0..8)
      .map(|_| {
        let gateway = gateway.clone();
        std::thread::spawn(move || gateway.detect(&()).map(|r| r.len()))
      })
      .collect();

    for worker in workers {
      assert_eq!(worker.join().unwrap(), Ok(2));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
  }
}
