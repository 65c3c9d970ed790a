// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use xmdq::domain::models::task::{SingletonGroup, TaskFamily, TaskRecord, TaskState};
use xmdq::domain::repositories::task_store::{StoreError, TaskStore};

/// 内存任务存储
///
/// 行为与 Redis 实现一致：列表有界且按插入顺序淘汰。
pub struct MemoryTaskStore {
    max_tracked: usize,
    states: Mutex<HashMap<String, TaskRecord>>,
    lists: Mutex<HashMap<TaskFamily, Vec<String>>>,
    urls: Mutex<HashMap<String, String>>,
    singletons: Mutex<HashMap<SingletonGroup, String>>,
    download_autotag: Mutex<Option<TaskRecord>>,
    fail_reads: AtomicBool,
}

#[allow(dead_code)]
impl MemoryTaskStore {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            max_tracked,
            states: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
            urls: Mutex::new(HashMap::new()),
            singletons: Mutex::new(HashMap::new()),
            download_autotag: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// 模拟 worker 写入状态
    pub fn write(&self, task_id: &str, state: TaskState, result: Value) {
        let result = match result {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.states
            .lock()
            .unwrap()
            .insert(task_id.to_string(), TaskRecord::new(state, result));
    }

    pub fn write_download_autotag(&self, state: TaskState, result: Value) {
        let result = match result {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        *self.download_autotag.lock().unwrap() = Some(TaskRecord::new(state, result));
    }

    pub fn tracked(&self, family: TaskFamily) -> Vec<String> {
        self.lists
            .lock()
            .unwrap()
            .get(&family)
            .cloned()
            .unwrap_or_default()
    }

    pub fn singleton(&self, group: SingletonGroup) -> Option<String> {
        self.singletons.lock().unwrap().get(&group).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn put_state(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError> {
        self.states
            .lock()
            .unwrap()
            .insert(task_id.to_string(), record.clone());
        Ok(())
    }

    async fn put_state_if_absent(
        &self,
        task_id: &str,
        record: &TaskRecord,
    ) -> Result<bool, StoreError> {
        let mut states = self.states.lock().unwrap();
        if states.contains_key(task_id) {
            return Ok(false);
        }
        states.insert(task_id.to_string(), record.clone());
        Ok(true)
    }

    async fn get_state(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        self.check_reads()?;
        Ok(self.states.lock().unwrap().get(task_id).cloned())
    }

    async fn track(&self, family: TaskFamily, task_ids: &[String]) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().unwrap();
        let list = lists.entry(family).or_default();
        list.extend(task_ids.iter().cloned());
        if list.len() > self.max_tracked {
            let excess = list.len() - self.max_tracked;
            let evicted: Vec<String> = list.drain(..excess).collect();
            if family == TaskFamily::Download {
                let mut urls = self.urls.lock().unwrap();
                for id in &evicted {
                    urls.remove(id);
                }
            }
        }
        Ok(())
    }

    async fn recent(&self, family: TaskFamily, limit: usize) -> Result<Vec<String>, StoreError> {
        self.check_reads()?;
        let list = self.tracked(family);
        let start = list.len().saturating_sub(limit);
        Ok(list[start..].to_vec())
    }

    async fn record_url(&self, task_id: &str, url: &str) -> Result<(), StoreError> {
        self.urls
            .lock()
            .unwrap()
            .insert(task_id.to_string(), url.to_string());
        Ok(())
    }

    async fn get_url(&self, task_id: &str) -> Result<Option<String>, StoreError> {
        self.check_reads()?;
        Ok(self.urls.lock().unwrap().get(task_id).cloned())
    }

    async fn set_singleton(&self, group: SingletonGroup, task_id: &str) -> Result<(), StoreError> {
        self.singletons
            .lock()
            .unwrap()
            .insert(group, task_id.to_string());
        Ok(())
    }

    async fn get_singleton(&self, group: SingletonGroup) -> Result<Option<String>, StoreError> {
        self.check_reads()?;
        Ok(self.singleton(group))
    }

    async fn get_download_autotag_state(&self) -> Result<Option<TaskRecord>, StoreError> {
        self.check_reads()?;
        Ok(self.download_autotag.lock().unwrap().clone())
    }
}
