//! 产物写入
//!
//! ArtifactSink 只在 Persist 终态被调用。FsArtifactSink 绑定根目录，拒绝绝对路径与 ../ 逃逸，
//! 先写同目录临时文件再 rename，取消或崩溃时不会留下截断的产物。

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::schema::{ExecutionPlan, ReflectionVerdict};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("I/O error writing {path}: {message}")]
    Io { path: String, message: String },
}

/// 产物接收方
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// 写入产物，返回实际路径
    async fn write(&self, path: &str, content: &str) -> Result<PathBuf, ArtifactError>;
}

/// 成功 run 的结果
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub run_id: String,
    pub path: PathBuf,
    pub content: String,
    pub plan: ExecutionPlan,
    pub verdict: ReflectionVerdict,
    pub retry_count: u32,
}

/// 本地文件系统产物：所有路径解析到 root_dir 之下
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root_dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    /// 校验相对路径并拼到根目录下
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ArtifactError> {
        let rel = Path::new(path.trim());
        if rel.as_os_str().is_empty() {
            return Err(ArtifactError::PathEscape(path.to_string()));
        }
        let escapes = rel.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(ArtifactError::PathEscape(path.to_string())); // 如 ../../etc/passwd
        }
        Ok(self.root_dir.join(rel))
    }
}

fn write_atomic(target: &Path, content: &str) -> Result<(), ArtifactError> {
    let io_err = |e: std::io::Error| ArtifactError::Io {
        path: target.display().to_string(),
        message: e.to_string(),
    };
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn write(&self, path: &str, content: &str) -> Result<PathBuf, ArtifactError> {
        let target = self.resolve(path)?;
        let content = content.to_string();
        let dest = target.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dest, &content))
            .await
            .map_err(|e| ArtifactError::Io {
                path: target.display().to_string(),
                message: e.to_string(),
            })??;
        tracing::info!(path = %target.display(), "artifact written");
        Ok(target)
    }
}
