//! In-process record store with optional JSON snapshot persistence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::store::{
    CommitOutcome, IpChangeLog, NewVote, RateLimitLog, RecordStore, Session, SessionRefresh,
    StoreError, StoreResult, Vote, VoteStats,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    sessions: HashMap<String, Session>,
    votes: Vec<Vote>,
    rate_limit_logs: Vec<RateLimitLog>,
    ip_change_logs: Vec<IpChangeLog>,
    next_id: u64,
    /// Unique index over (fingerprint, contestant); rebuilt on load.
    #[serde(skip)]
    vote_keys: HashSet<(String, String)>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn rebuild_index(&mut self) {
        self.vote_keys = self
            .votes
            .iter()
            .map(|v| (v.fingerprint.clone(), v.contestant.clone()))
            .collect();
    }
}

/// Record store keeping every table behind a single lock.
///
/// Each trait call takes the lock once, so every operation is serializable
/// with respect to every other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            snapshot_path,
        }
    }

    /// Load from the snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> StoreResult<Self> {
        let mut tables = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            serde_json::from_reader::<_, Tables>(reader)?
        } else {
            Tables::default()
        };
        tables.rebuild_index();
        tracing::info!(
            sessions = tables.sessions.len(),
            votes = tables.votes.len(),
            path = %path.display(),
            "Loaded record store snapshot"
        );
        Ok(Self {
            tables: Mutex::new(tables),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    /// Write the snapshot file, replacing it atomically.
    pub fn save_to_file(&self) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let encoded = {
            let tables = self.lock()?;
            serde_json::to_vec(&*tables)?
        };
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(&encoded)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), bytes = encoded.len(), "Saved record store snapshot");
        Ok(())
    }

    /// All accepted votes, oldest first.
    pub fn votes(&self) -> StoreResult<Vec<Vote>> {
        Ok(self.lock()?.votes.clone())
    }

    pub fn rate_limit_logs(&self) -> StoreResult<Vec<RateLimitLog>> {
        Ok(self.lock()?.rate_limit_logs.clone())
    }

    pub fn ip_change_logs(&self) -> StoreResult<Vec<IpChangeLog>> {
        Ok(self.lock()?.ip_change_logs.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("record store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_session(&self, fingerprint: &str) -> StoreResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(fingerprint).cloned())
    }

    async fn refresh_session(
        &self,
        fingerprint: &str,
        token: &str,
        expires_at: u64,
        ip: &str,
        now: u64,
    ) -> StoreResult<SessionRefresh> {
        let mut tables = self.lock()?;
        match tables.sessions.get_mut(fingerprint) {
            Some(session) => {
                let (previous_ip, newly_suspicious) = if session.ip_differs(ip) {
                    (session.ip_address.clone(), session.escalate())
                } else {
                    (None, false)
                };
                session.token = token.to_string();
                session.token_expires_at = expires_at;
                session.ip_address = Some(ip.to_string());
                session.updated_at = now;
                Ok(SessionRefresh {
                    session: session.clone(),
                    created: false,
                    previous_ip,
                    newly_suspicious,
                })
            }
            None => {
                let session = Session::new(
                    fingerprint.to_string(),
                    token.to_string(),
                    expires_at,
                    ip.to_string(),
                    now,
                );
                tables.sessions.insert(fingerprint.to_string(), session.clone());
                Ok(SessionRefresh {
                    session,
                    created: true,
                    previous_ip: None,
                    newly_suspicious: false,
                })
            }
        }
    }

    async fn update_session_ip(
        &self,
        fingerprint: &str,
        ip: &str,
        now: u64,
    ) -> StoreResult<Option<String>> {
        let mut tables = self.lock()?;
        let Some(session) = tables.sessions.get_mut(fingerprint) else {
            return Ok(None);
        };
        if session.ip_address.as_deref() == Some(ip) {
            return Ok(None);
        }
        let previous = session.ip_address.replace(ip.to_string());
        session.updated_at = now;
        Ok(previous)
    }

    async fn mark_suspicious(&self, fingerprint: &str, now: u64) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        Ok(match tables.sessions.get_mut(fingerprint) {
            Some(session) => {
                let changed = session.escalate();
                if changed {
                    session.updated_at = now;
                }
                changed
            }
            None => false,
        })
    }

    async fn mark_suspicious_by_ip(&self, ip: &str, now: u64) -> StoreResult<usize> {
        let mut tables = self.lock()?;
        let mut changed = 0;
        for session in tables
            .sessions
            .values_mut()
            .filter(|s| s.ip_address.as_deref() == Some(ip))
        {
            if session.escalate() {
                session.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn has_vote(&self, fingerprint: &str, contestant: &str) -> StoreResult<bool> {
        let tables = self.lock()?;
        Ok(tables
            .vote_keys
            .contains(&(fingerprint.to_string(), contestant.to_string())))
    }

    async fn count_votes_by_ip(&self, ip: &str) -> StoreResult<u64> {
        let tables = self.lock()?;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.ip_address.as_deref() == Some(ip))
            .count() as u64)
    }

    async fn count_votes_since(&self, fingerprint: &str, since: u64) -> StoreResult<u64> {
        let tables = self.lock()?;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.fingerprint == fingerprint && v.created_at > since)
            .count() as u64)
    }

    async fn commit_vote(&self, vote: NewVote, max_votes: u32) -> StoreResult<CommitOutcome> {
        let mut tables = self.lock()?;
        let key = (vote.fingerprint.clone(), vote.contestant.clone());
        if tables.vote_keys.contains(&key) {
            return Ok(CommitOutcome::Duplicate);
        }

        let votes_used = match tables.sessions.get_mut(&vote.fingerprint) {
            None => return Ok(CommitOutcome::NoSession),
            Some(session) if session.votes_used >= max_votes => {
                return Ok(CommitOutcome::CapReached {
                    votes_used: session.votes_used,
                });
            }
            Some(session) => {
                session.votes_used += 1;
                session.updated_at = vote.created_at;
                session.votes_used
            }
        };

        let vote_id = tables.next_id();
        tables.vote_keys.insert(key);
        tables.votes.push(Vote {
            id: vote_id,
            fingerprint: vote.fingerprint,
            contestant: vote.contestant,
            ip_address: Some(vote.ip_address),
            created_at: vote.created_at,
            verified_via_captcha: vote.verified_via_captcha,
            verified_via_sms: vote.verified_via_sms,
        });
        Ok(CommitOutcome::Committed { vote_id, votes_used })
    }

    async fn append_rate_limit_log(
        &self,
        ip: &str,
        fingerprint: Option<&str>,
        endpoint: &str,
        now: u64,
    ) -> StoreResult<()> {
        let mut tables = self.lock()?;
        let id = tables.next_id();
        tables.rate_limit_logs.push(RateLimitLog {
            id,
            ip_address: ip.to_string(),
            fingerprint: fingerprint.map(str::to_string),
            endpoint: endpoint.to_string(),
            created_at: now,
        });
        Ok(())
    }

    async fn append_ip_change_log(
        &self,
        fingerprint: &str,
        old_ip: Option<&str>,
        new_ip: &str,
        now: u64,
    ) -> StoreResult<()> {
        let mut tables = self.lock()?;
        let id = tables.next_id();
        tables.ip_change_logs.push(IpChangeLog {
            id,
            fingerprint: fingerprint.to_string(),
            old_ip: old_ip.map(str::to_string),
            new_ip: new_ip.to_string(),
            created_at: now,
        });
        Ok(())
    }

    async fn stats(&self) -> StoreResult<VoteStats> {
        let tables = self.lock()?;
        let mut stats = VoteStats {
            total_votes: tables.votes.len() as u64,
            total_sessions: tables.sessions.len() as u64,
            suspicious_sessions: tables.sessions.values().filter(|s| s.is_suspicious()).count()
                as u64,
            ..VoteStats::default()
        };
        for vote in &tables.votes {
            *stats
                .votes_by_contestant
                .entry(vote.contestant.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }

    async fn flush(&self) -> StoreResult<()> {
        self.save_to_file()
    }
}
