// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/cache.rs - 模型文件缓存清理
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

use tracing::{debug, info, warn};

const CACHE_DIR_NAME: &str = "malaeng";

#[derive(Debug)]
pub enum PurgeOutcome {
  Removed(PathBuf),
  Missing(PathBuf),
  Failed(PathBuf, std::io::Error),
  /// 无法确定平台缓存目录
  Unresolved,
}

/// 平台缓存目录下的模型文件缓存，如 `~/.cache/malaeng`
///
/// 本程序不向其中写入，该目录预留给下载得到的模型文件。
pub fn default_cache_dir() -> Option<PathBuf> {
  dirs::cache_dir().map(|dir| dir.join(CACHE_DIR_NAME))
}

/// 在首次加载模型前删除旧的缓存目录
///
/// 目录不存在时不做任何事；删除失败只记录警告，不中断启动。
pub fn purge_model_cache(dir: Option<&Path>) -> PurgeOutcome {
  let dir = match dir.map(Path::to_path_buf).or_else(default_cache_dir) {
    Some(dir) => dir,
    None => {
      warn!("无法确定缓存目录，跳过清理");
      return PurgeOutcome::Unresolved;
    }
  };

  if !dir.exists() {
    debug!("缓存目录不存在: {}", dir.display());
    return PurgeOutcome::Missing(dir);
  }

  // 只清理目录，同名的普通文件保持原样
  let removed = if dir.is_dir() {
    std::fs::remove_dir_all(&dir)
  } else {
    Err(std::io::Error::new(
      std::io::ErrorKind::NotADirectory,
      "缓存路径不是目录",
    ))
  };

  match removed {
    Ok(()) => {
      info!("已清理模型缓存: {}", dir.display());
      PurgeOutcome::Removed(dir)
    }
    Err(e) => {
      warn!("清理模型缓存失败 {}: {}，继续启动", dir.display(), e);
      PurgeOutcome::Failed(dir, e)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_directory_is_a_no_op() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("never-created");
    assert!(matches!(
      purge_model_cache(Some(&dir)),
      PurgeOutcome::Missing(_)
    ));
  }

  #[test]
  fn removes_cache_tree_and_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("hub");
    std::fs::create_dir_all(dir.join("checkpoints")).unwrap();
    std::fs::write(dir.join("checkpoints/best.onnx"), b"weights").unwrap();

    assert!(matches!(
      purge_model_cache(Some(&dir)),
      PurgeOutcome::Removed(_)
    ));
    assert!(!dir.exists());
    assert!(matches!(
      purge_model_cache(Some(&dir)),
      PurgeOutcome::Missing(_)
    ));
  }

  #[test]
  fn regular_file_is_left_in_place() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("malaeng");
    std::fs::write(&file, b"notes").unwrap();

    assert!(matches!(
      purge_model_cache(Some(&file)),
      PurgeOutcome::Failed(_, _)
    ));
    assert_eq!(std::fs::read(&file).unwrap(), b"notes");
  }

  #[test]
  #[cfg(target_os = "linux")]
  fn undeletable_directory_reports_failure() {
    // procfs 的条目即使对 root 也无法删除
    let dir = Path::new("/proc/self/fdinfo");
    if !dir.is_dir() {
      return;
    }

    match purge_model_cache(Some(dir)) {
      PurgeOutcome::Failed(path, _) => assert_eq!(path, dir),
      other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(dir.is_dir());
  }

  #[test]
  fn default_dir_is_named_after_crate() {
    if let Some(dir) = default_cache_dir() {
      assert!(dir.ends_with(CACHE_DIR_NAME));
    }
  }
}
