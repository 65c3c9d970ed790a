// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult, Script};

/// KEYS[1] 列表，KEYS[2] 可选的伴随哈希；ARGV[1] 上限，其余为待追加的值
const PUSH_BOUNDED: &str = r#"
redis.call('RPUSH', KEYS[1], unpack(ARGV, 2))
local overflow = redis.call('LLEN', KEYS[1]) - tonumber(ARGV[1])
if overflow <= 0 then
  return 0
end
local evicted = redis.call('LRANGE', KEYS[1], 0, overflow - 1)
redis.call('LTRIM', KEYS[1], overflow, -1)
if #KEYS > 1 then
  for _, member in ipairs(evicted) do
    redis.call('HDEL', KEYS[2], member)
  end
end
return #evicted
"#;

/// Redis客户端
///
/// 启动时建立一条多路复用连接，之后每次调用克隆使用。
#[derive(Clone)]
pub struct RedisClient {
    /// 多路复用连接
    connection: MultiplexedConnection,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(RedisError)` - URL无效或连接失败
    pub async fn new(redis_url: &str) -> RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }

    /// 获取连接句柄，用于构建管道
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// 获取指定键的值
    pub async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut con = self.connection();
        con.get(key).await
    }

    /// 设置键值对并指定过期时间
    ///
    /// # 参数
    ///
    /// * `key` - 键
    /// * `value` - 值
    /// * `ttl_seconds` - 过期时间（秒）
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut con = self.connection();
        con.set_ex::<_, _, ()>(key, value, ttl_seconds).await
    }

    /// 只在键不存在时写入（SET NX EX）
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 已写入
    /// * `Ok(false)` - 键已存在，未改动
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut con = self.connection();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .arg("NX")
            .query_async(&mut con)
            .await?;
        Ok(reply.is_some())
    }

    /// 追加到列表尾部并裁剪为最后 `max_len` 个元素
    ///
    /// 在一个 Lua 脚本中完成 RPUSH、LTRIM，并从 `index` 哈希中删除被淘汰的
    /// 成员，并发写入时长度不会越界，哈希也不会残留已淘汰的字段。
    ///
    /// # 返回值
    ///
    /// 被淘汰的元素个数
    pub async fn push_bounded(
        &self,
        key: &str,
        values: &[String],
        max_len: usize,
        index: Option<&str>,
    ) -> RedisResult<usize> {
        if values.is_empty() {
            return Ok(0);
        }
        let script = Script::new(PUSH_BOUNDED);
        let mut invocation = script.key(key);
        if let Some(index) = index {
            invocation.key(index);
        }
        invocation.arg(max_len.max(1)).arg(values);

        let mut con = self.connection();
        let evicted: usize = invocation.invoke_async(&mut con).await?;
        Ok(evicted)
    }

    /// 按下标范围读取列表
    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> RedisResult<Vec<String>> {
        let mut con = self.connection();
        con.lrange(key, start, stop).await
    }

    /// 写入哈希字段
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> RedisResult<()> {
        let mut con = self.connection();
        con.hset::<_, _, _, ()>(key, field, value).await
    }

    /// 读取哈希字段
    pub async fn hget(&self, key: &str, field: &str) -> RedisResult<Option<String>> {
        let mut con = self.connection();
        con.hget(key, field).await
    }
}
