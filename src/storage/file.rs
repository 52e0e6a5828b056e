//! Append-only file storage backend
//!
//! Two JSON-lines logs: `<path>` holds every created pair, `<path>.deleted`
//! holds tombstones. Nothing is ever rewritten; reads replay the logs.
//!
//! Each log has its own mutex, taken in the order pairs → tombstones.
//! Appends run on a spawned task that owns the lock guard, so dropping the
//! caller's future cannot leave half a record behind. Lines that fail to
//! decode are skipped with a warning; a partial record at the end of a log
//! is sealed with a newline on open so later appends stay decodable.
//!
//! Conflict detection scans the whole pairs log, which is fine for the
//! single-instance, low-traffic deployments this backend is meant for.

use std::collections::{HashMap, HashSet};
use std::io::SeekFrom;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{Span, debug, info, warn};

use super::{DeletionRequest, Storage, UrlPair};
use crate::errors::{Result, ShortenerError};

/// 墓碑日志的文件后缀
pub const TOMBSTONE_SUFFIX: &str = ".deleted";

#[derive(Debug, Serialize, Deserialize)]
struct PairEntry {
    owner_id: String,
    short_code: String,
    original_url: String,
    created_at: DateTime<Utc>,
}

impl From<PairEntry> for UrlPair {
    fn from(entry: PairEntry) -> Self {
        UrlPair {
            owner_id: entry.owner_id,
            short_code: entry.short_code,
            original_url: entry.original_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TombstoneEntry {
    owner_id: String,
    short_code: String,
    deleted_at: DateTime<Utc>,
}

pub struct FileStorage {
    pairs_path: PathBuf,
    tombstone_path: PathBuf,
    pairs_log: Arc<Mutex<File>>,
    tombstone_log: Arc<Mutex<File>>,
    closed: AtomicBool,
    span: Span,
}

impl FileStorage {
    /// 打开（必要时创建）两个日志文件
    pub async fn open(path: impl AsRef<Path>, span: Span) -> Result<Self> {
        let pairs_path = path.as_ref().to_path_buf();
        let mut tombstone_path = pairs_path.clone().into_os_string();
        tombstone_path.push(TOMBSTONE_SUFFIX);
        let tombstone_path = PathBuf::from(tombstone_path);

        if let Some(parent) = pairs_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                ShortenerError::file_operation(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut pairs_log = open_append(&pairs_path).await?;
        let mut tombstone_log = open_append(&tombstone_path).await?;
        seal_torn_tail(&mut pairs_log, &pairs_path, &span).await?;
        seal_torn_tail(&mut tombstone_log, &tombstone_path, &span).await?;

        info!(
            parent: &span,
            "File storage initialized: {} (tombstones: {})",
            pairs_path.display(),
            tombstone_path.display()
        );

        Ok(Self {
            pairs_path,
            tombstone_path,
            pairs_log: Arc::new(Mutex::new(pairs_log)),
            tombstone_log: Arc::new(Mutex::new(tombstone_log)),
            closed: AtomicBool::new(false),
            span,
        })
    }

    pub fn pairs_path(&self) -> &Path {
        &self.pairs_path
    }

    pub fn tombstone_path(&self) -> &Path {
        &self.tombstone_path
    }

    /// Replays `path` line by line until `visit` breaks.
    async fn replay<T, F>(&self, path: &Path, mut visit: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(T) -> ControlFlow<()>,
    {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(ShortenerError::file_operation(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<T>(&line) {
                Ok(entry) => {
                    if visit(entry).is_break() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        parent: &self.span,
                        "Skipping unreadable line {} in {}: {}",
                        line_no,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(())
    }

    async fn find_pair(&self, short_code: &str) -> Result<Option<PairEntry>> {
        let mut found = None;
        self.replay::<PairEntry, _>(&self.pairs_path, |entry| {
            if entry.short_code == short_code {
                found = Some(entry);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await?;
        Ok(found)
    }

    async fn all_codes(&self) -> Result<HashSet<String>> {
        let mut codes = HashSet::new();
        self.replay::<PairEntry, _>(&self.pairs_path, |entry| {
            codes.insert(entry.short_code);
            ControlFlow::Continue(())
        })
        .await?;
        Ok(codes)
    }

    async fn tombstoned_codes(&self) -> Result<HashSet<String>> {
        let mut codes = HashSet::new();
        self.replay::<TombstoneEntry, _>(&self.tombstone_path, |entry| {
            codes.insert(entry.short_code);
            ControlFlow::Continue(())
        })
        .await?;
        Ok(codes)
    }

    async fn is_tombstoned(&self, short_code: &str) -> Result<bool> {
        let mut hit = false;
        self.replay::<TombstoneEntry, _>(&self.tombstone_path, |entry| {
            if entry.short_code == short_code {
                hit = true;
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await?;
        Ok(hit)
    }
}

async fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| {
            ShortenerError::file_operation(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// 崩溃可能留下没有换行符的半条记录，补一个换行，避免下一条追加和它粘在一起
async fn seal_torn_tail(log: &mut File, path: &Path, span: &Span) -> Result<()> {
    let io_err = |e: std::io::Error| {
        ShortenerError::file_operation(format!("Failed to check tail of {}: {}", path.display(), e))
    };

    let mut reader = File::open(path).await.map_err(io_err)?;
    let len = reader.metadata().await.map_err(io_err)?.len();
    if len == 0 {
        return Ok(());
    }

    reader.seek(SeekFrom::End(-1)).await.map_err(io_err)?;
    let mut last = [0u8; 1];
    reader.read_exact(&mut last).await.map_err(io_err)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    warn!(parent: span, "{} ends with a partial record, sealing it", path.display());
    log.write_all(b"\n").await.map_err(io_err)?;
    log.flush().await.map_err(io_err)?;
    Ok(())
}

fn encode_line<T: Serialize>(entry: &T, buf: &mut Vec<u8>) -> Result<()> {
    serde_json::to_writer(&mut *buf, entry)?;
    buf.push(b'\n');
    Ok(())
}

/// 在独立任务中完成写入，调用方被取消时写入仍会完整落盘
async fn append(mut guard: OwnedMutexGuard<File>, buf: Vec<u8>) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }

    tokio::spawn(async move {
        let file: &mut File = &mut guard;
        file.write_all(&buf).await?;
        file.flush().await
    })
    .await
    .map_err(|e| ShortenerError::file_operation(format!("Append task failed: {}", e)))??;

    Ok(())
}

#[async_trait]
impl Storage for FileStorage {
    async fn add_url_pair(&self, pair: UrlPair) -> Result<()> {
        let guard = self.pairs_log.clone().lock_owned().await;

        if self.find_pair(&pair.short_code).await?.is_some() {
            return Err(ShortenerError::conflict(pair.short_code));
        }

        let entry = PairEntry {
            owner_id: pair.owner_id,
            short_code: pair.short_code,
            original_url: pair.original_url,
            created_at: Utc::now(),
        };
        let mut buf = Vec::new();
        encode_line(&entry, &mut buf)?;
        append(guard, buf).await?;

        debug!(parent: &self.span, "Short link appended: {}", entry.short_code);
        Ok(())
    }

    async fn get_url_pair_by_short(&self, short_code: &str) -> Result<UrlPair> {
        let entry = {
            let _guard = self.pairs_log.lock().await;
            self.find_pair(short_code).await?
        };

        let Some(entry) = entry else {
            return Err(ShortenerError::not_exist(format!(
                "short code '{}' not found",
                short_code
            )));
        };

        let tombstoned = {
            let _guard = self.tombstone_log.lock().await;
            self.is_tombstoned(short_code).await?
        };

        if tombstoned {
            return Err(ShortenerError::deleted(format!(
                "short code '{}' has been deleted",
                short_code
            )));
        }

        Ok(entry.into())
    }

    async fn add_batch_url_pairs(&self, pairs: Vec<UrlPair>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }

        let guard = self.pairs_log.clone().lock_owned().await;
        let mut known = self.all_codes().await?;

        // 顺序追加：遇到第一个冲突即停止，冲突之前的条目照常写入
        let total = pairs.len();
        let mut buf = Vec::new();
        let mut conflict = None;
        for (index, pair) in pairs.into_iter().enumerate() {
            if !known.insert(pair.short_code.clone()) {
                warn!(
                    parent: &self.span,
                    "Batch insert stopped at conflict '{}' after {}/{} links",
                    pair.short_code,
                    index,
                    total
                );
                conflict = Some(pair.short_code);
                break;
            }

            encode_line(
                &PairEntry {
                    owner_id: pair.owner_id,
                    short_code: pair.short_code,
                    original_url: pair.original_url,
                    created_at: Utc::now(),
                },
                &mut buf,
            )?;
        }

        append(guard, buf).await?;

        if let Some(short_code) = conflict {
            return Err(ShortenerError::conflict(short_code));
        }

        debug!(parent: &self.span, "Batch appended {} links", total);
        Ok(())
    }

    async fn get_url_pair_batch_by_user_id(&self, owner_id: &str) -> Result<Vec<UrlPair>> {
        let mut pairs = Vec::new();
        {
            let _guard = self.pairs_log.lock().await;
            self.replay::<PairEntry, _>(&self.pairs_path, |entry| {
                if entry.owner_id == owner_id {
                    pairs.push(UrlPair::from(entry));
                }
                ControlFlow::Continue(())
            })
            .await?;
        }

        if !pairs.is_empty() {
            let tombstoned = {
                let _guard = self.tombstone_log.lock().await;
                self.tombstoned_codes().await?
            };
            pairs.retain(|pair| !tombstoned.contains(&pair.short_code));
        }

        if pairs.is_empty() {
            return Err(ShortenerError::not_exist(format!(
                "user '{}' has no links",
                owner_id
            )));
        }

        Ok(pairs)
    }

    async fn delete_requested_urls(&self, requests: Vec<DeletionRequest>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let _pairs_guard = self.pairs_log.lock().await;
        let tombstone_guard = self.tombstone_log.clone().lock_owned().await;

        let wanted: HashSet<&str> = requests.iter().map(|r| r.short_code.as_str()).collect();
        let mut owners: HashMap<String, String> = HashMap::with_capacity(wanted.len());
        self.replay::<PairEntry, _>(&self.pairs_path, |entry| {
            if wanted.contains(entry.short_code.as_str()) {
                owners.insert(entry.short_code, entry.owner_id);
            }
            ControlFlow::Continue(())
        })
        .await?;

        let mut tombstoned = self.tombstoned_codes().await?;

        let now = Utc::now();
        let mut buf = Vec::new();
        let mut applied = 0usize;
        for request in &requests {
            let owned = owners
                .get(&request.short_code)
                .is_some_and(|owner| *owner == request.owner_id);
            if !owned || !tombstoned.insert(request.short_code.clone()) {
                continue;
            }

            encode_line(
                &TombstoneEntry {
                    owner_id: request.owner_id.clone(),
                    short_code: request.short_code.clone(),
                    deleted_at: now,
                },
                &mut buf,
            )?;
            applied += 1;
        }

        // 整批一次写入
        append(tombstone_guard, buf).await?;

        debug!(
            parent: &self.span,
            "Tombstoned {} of {} requested links",
            applied,
            requests.len()
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ShortenerError::unavailable("file storage is closed"));
        }

        for path in [&self.pairs_path, &self.tombstone_path] {
            fs::metadata(path).await.map_err(|e| {
                ShortenerError::file_operation(format!("{} is not accessible: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        for log in [&self.pairs_log, &self.tombstone_log] {
            let mut file = log.lock().await;
            file.flush().await?;
            file.sync_all().await?;
        }

        info!(parent: &self.span, "File storage closed: {}", self.pairs_path.display());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
