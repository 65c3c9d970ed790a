// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashSet;
use url::Url;

const TWEET_HOSTS: [&str; 2] = ["x.com", "twitter.com"];

/// 判断是否为可下载的推文链接
///
/// 要求 http(s)，主机为 x.com / twitter.com（允许 `www.`、`mobile.` 前缀），
/// 路径中包含 `/status/`。
pub fn is_download_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("mobile."))
        .unwrap_or(host.as_str());
    TWEET_HOSTS.contains(&host) && url.path().contains("/status/")
}

/// 去重并反转：最新的在前，空白项丢弃
pub fn unique_reverse<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    I::IntoIter: DoubleEndedIterator,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .rev()
        .filter_map(|value| {
            let value = value.as_ref().trim();
            if value.is_empty() || !seen.insert(value.to_string()) {
                None
            } else {
                Some(value.to_string())
            }
        })
        .collect()
}

/// 规范化图片相对路径
///
/// 反斜杠转为 `/`，去掉首部 `/`；空路径或包含 `..` 段时返回 `None`。
pub fn normalize_filepath(raw: &str) -> Option<String> {
    let path = raw.trim().replace('\\', "/");
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(path.to_string())
}

/// 规范化一组路径，保序去重，丢弃无效项
pub fn normalize_filepaths<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|path| normalize_filepath(path.as_ref()))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// 用户名不能为空，也不能包含路径分隔符
pub fn is_valid_username(raw: &str) -> bool {
    let name = raw.trim();
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != ".."
}
